//! Operator edit of a scan record (full PUT semantics)

use scanbase_common::types::ScanRecord;
use scanbase_ingest::store::{RecordStore, RecordUpdate};

use crate::api::response::AppError;

pub async fn handle(
    store: &dyn RecordStore,
    id: i64,
    update: RecordUpdate,
) -> Result<ScanRecord, AppError> {
    if let Some(ref barcode) = update.barcode {
        if barcode.trim().is_empty() {
            return Err(AppError::ValidationError(
                "barcode must not be empty".to_string(),
            ));
        }
    }
    Ok(store.update(id, update).await?)
}
