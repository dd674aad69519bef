//! Get a single scan record by id

use scanbase_common::types::ScanRecord;
use scanbase_ingest::store::RecordStore;

use crate::api::response::AppError;

pub async fn handle(store: &dyn RecordStore, id: i64) -> Result<ScanRecord, AppError> {
    match store.get(id).await? {
        Some(record) => Ok(record),
        None => Err(AppError::NotFound(format!("record {id} not found"))),
    }
}
