//! Create a single scan record

use serde::Deserialize;

use scanbase_common::types::{RecordDraft, ScanRecord};
use scanbase_ingest::store::{RecordStore, StoreError};

use crate::api::response::AppError;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRecordCommand {
    pub barcode: String,
    pub model: Option<String>,
    pub location: Option<String>,
    pub scanner: Option<String>,
    pub scan_time: Option<String>,
    pub remarks: Option<String>,
    pub user: Option<String>,
    pub asset_type: Option<String>,
}

pub async fn handle(
    store: &dyn RecordStore,
    command: CreateRecordCommand,
) -> Result<ScanRecord, AppError> {
    let barcode = command.barcode.trim().to_string();
    if barcode.is_empty() {
        return Err(AppError::ValidationError(
            "barcode must not be empty".to_string(),
        ));
    }

    let draft = RecordDraft {
        barcode,
        model: command.model,
        location: command.location,
        scanner: command.scanner,
        scan_time: command.scan_time,
        remarks: command.remarks,
        user: command.user,
        asset_type: command.asset_type,
    };

    let id = store.create(draft).await?;
    match store.get(id).await? {
        Some(record) => Ok(record),
        // the row we just inserted vanished; only a racing truncate does this
        None => Err(StoreError::NotFound(id).into()),
    }
}
