//! Delete scan records by id set

use serde::{Deserialize, Serialize};

use scanbase_ingest::store::RecordStore;

use crate::api::response::AppError;

#[derive(Debug, Deserialize)]
pub struct BulkDeleteCommand {
    pub ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct BulkDeleteResponse {
    pub deleted: u64,
}

pub async fn handle(
    store: &dyn RecordStore,
    command: BulkDeleteCommand,
) -> Result<BulkDeleteResponse, AppError> {
    if command.ids.is_empty() {
        return Err(AppError::ValidationError(
            "ids must not be empty".to_string(),
        ));
    }
    let deleted = store.delete_by_ids(&command.ids).await?;
    Ok(BulkDeleteResponse { deleted })
}
