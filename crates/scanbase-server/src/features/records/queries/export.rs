//! Filtered export of scan records to a workbook
//!
//! Applies the same filter set as the listing, without pagination, and
//! renders the result as .xlsx bytes. The processing state becomes its
//! three-valued operator label and the store timestamps are rendered in the
//! fixed `%Y-%m-%d %H:%M:%S` form; `scan_time` stays the opaque text it
//! arrived as.

use scanbase_common::types::{format_timestamp, result_label, ScanRecord};
use scanbase_ingest::store::RecordStore;
use scanbase_ingest::tabular::{write_xlsx, Table};

use crate::api::response::AppError;

use super::list::ListRecordsQuery;

/// Column headers of the exported workbook.
pub const EXPORT_HEADERS: &[&str] = &[
    "id",
    "barcode",
    "model",
    "location",
    "scanner",
    "scan_time",
    "remarks",
    "user",
    "asset_type",
    "result",
    "expected_time",
    "result_remarks",
    "created_at",
    "updated_at",
];

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn record_row(record: &ScanRecord) -> Vec<String> {
    vec![
        record.id.to_string(),
        text(&record.barcode),
        text(&record.model),
        text(&record.location),
        text(&record.scanner),
        text(&record.scan_time),
        text(&record.remarks),
        text(&record.user),
        text(&record.asset_type),
        result_label(record.result).to_string(),
        record.expected_time.map(format_timestamp).unwrap_or_default(),
        text(&record.result_remarks),
        format_timestamp(record.created_at),
        format_timestamp(record.updated_at),
    ]
}

pub async fn handle(
    store: &dyn RecordStore,
    query: ListRecordsQuery,
) -> Result<Vec<u8>, AppError> {
    let filters = query.filters();
    let (records, total) = store.list(&filters).await?;
    tracing::debug!(total, "exporting records");

    let mut table = Table::new(EXPORT_HEADERS.iter().map(|h| h.to_string()).collect());
    for record in &records {
        table.push_row(record_row(record));
    }

    write_xlsx(&table).map_err(|err| AppError::InternalError(err.to_string()))
}
