//! Synchronous bulk import of an uploaded spreadsheet
//!
//! Runs the full ingestion pipeline (normalize, validate, reconcile, write)
//! against the uploaded workbook and answers with the run counters plus the
//! first error samples. Row problems never fail the request; structural
//! problems (missing columns, unreadable workbook) do.

use serde::Serialize;

use scanbase_ingest::reconcile::{existing_keys, partition_import};
use scanbase_ingest::report::{RowError, RunCounters};
use scanbase_ingest::schema::normalize_table;
use scanbase_ingest::store::RecordStore;
use scanbase_ingest::tabular::read_xlsx_bytes;
use scanbase_ingest::validate::prepare_import;
use scanbase_ingest::writer::{BatchWriter, DEFAULT_BATCH_SIZE};
use scanbase_ingest::ImportError;

use crate::api::response::AppError;

#[derive(Debug, Serialize)]
pub struct BulkImportResponse {
    pub input_rows: u64,
    pub success: u64,
    pub skipped_empty_key: u64,
    pub skipped_duplicate: u64,
    pub errors: u64,
    pub error_samples: Vec<RowError>,
}

impl From<RunCounters> for BulkImportResponse {
    fn from(counters: RunCounters) -> Self {
        Self {
            input_rows: counters.input_rows,
            success: counters.success,
            skipped_empty_key: counters.skipped_empty_key,
            skipped_duplicate: counters.skipped_duplicate,
            errors: counters.errors,
            error_samples: counters.error_samples,
        }
    }
}

pub async fn handle(
    store: &dyn RecordStore,
    workbook: Vec<u8>,
) -> Result<BulkImportResponse, AppError> {
    let mut table =
        read_xlsx_bytes(workbook).map_err(|err| AppError::BadRequest(err.to_string()))?;
    normalize_table(&mut table);

    let validated = prepare_import(&table).map_err(|err| match err {
        ImportError::MissingColumns(_) => AppError::ValidationError(err.to_string()),
        other => AppError::BadRequest(other.to_string()),
    })?;

    let keys: Vec<String> = validated
        .rows
        .iter()
        .map(|row| row.draft.barcode.clone())
        .collect();
    let existing = existing_keys(store, &keys).await.map_err(AppError::from)?;

    let mut counters = RunCounters {
        input_rows: validated.input_rows,
        skipped_empty_key: validated.skipped_empty_key,
        ..Default::default()
    };
    let partitioned = partition_import(validated.rows, &existing);
    counters.skipped_duplicate = partitioned.skipped_duplicate;

    let writer = BatchWriter::new(store, DEFAULT_BATCH_SIZE);
    writer.write_imports(&partitioned.fresh, &mut counters).await;

    tracing::info!(
        input_rows = counters.input_rows,
        success = counters.success,
        errors = counters.errors,
        "bulk import finished"
    );
    Ok(counters.into())
}
