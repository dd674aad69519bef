//! Delete a single scan record

use scanbase_ingest::store::RecordStore;

use crate::api::response::AppError;

pub async fn handle(store: &dyn RecordStore, id: i64) -> Result<(), AppError> {
    let deleted = store.delete_by_ids(&[id]).await?;
    if deleted == 0 {
        return Err(AppError::NotFound(format!("record {id} not found")));
    }
    Ok(())
}
