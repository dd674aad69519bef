//! List scan records with search, filters, ordering and pagination

use serde::{Deserialize, Serialize};

use scanbase_common::types::ScanRecord;
use scanbase_ingest::store::{RecordQuery, RecordStore};

use crate::api::response::AppError;
use crate::features::shared::pagination::{PaginationMetadata, PaginationParams};

/// Query-string parameters of `GET /records`. Text filters are
/// case-insensitive substring matches; `search` matches across every text
/// column at once; `ordering` takes a field name, `-`-prefixed for
/// descending.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListRecordsQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
    pub barcode: Option<String>,
    pub model: Option<String>,
    pub location: Option<String>,
    pub scanner: Option<String>,
    pub scan_time: Option<String>,
    pub remarks: Option<String>,
    pub user: Option<String>,
    pub asset_type: Option<String>,
    pub result: Option<bool>,
    pub ordering: Option<String>,
}

impl ListRecordsQuery {
    /// The store-level filter set, without pagination.
    pub fn filters(&self) -> RecordQuery {
        RecordQuery {
            search: self.search.clone(),
            barcode: self.barcode.clone(),
            model: self.model.clone(),
            location: self.location.clone(),
            scanner: self.scanner.clone(),
            scan_time: self.scan_time.clone(),
            remarks: self.remarks.clone(),
            user: self.user.clone(),
            asset_type: self.asset_type.clone(),
            result: self.result,
            ordering: self.ordering.clone(),
            limit: None,
            offset: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListRecordsResponse {
    pub items: Vec<ScanRecord>,
    pub pagination: PaginationMetadata,
}

pub async fn handle(
    store: &dyn RecordStore,
    query: ListRecordsQuery,
) -> Result<ListRecordsResponse, AppError> {
    let pagination = PaginationParams::new(query.page, query.per_page);

    let mut filters = query.filters();
    filters.limit = Some(pagination.per_page());
    filters.offset = Some(pagination.offset());

    let (items, total) = store.list(&filters).await?;
    Ok(ListRecordsResponse {
        pagination: PaginationMetadata::from_params(&pagination, total),
        items,
    })
}
