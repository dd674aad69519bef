//! Scan-record API routes
//!
//! # Route Structure
//!
//! - `GET    /api/v1/records` - List records with filters and pagination
//! - `POST   /api/v1/records` - Create a record
//! - `GET    /api/v1/records/:id` - Get a record
//! - `PUT    /api/v1/records/:id` - Update a record (full replace)
//! - `DELETE /api/v1/records/:id` - Delete a record
//! - `GET    /api/v1/records/field-options` - Static field metadata
//! - `GET    /api/v1/records/import-template` - Empty import workbook
//! - `POST   /api/v1/records/bulk-import` - Upload a workbook, run the
//!   ingestion pipeline synchronously
//! - `POST   /api/v1/records/bulk-delete` - Delete records by id set
//! - `GET    /api/v1/records/export` - Filtered export to a workbook

use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;

use scanbase_ingest::store::RecordUpdate;

use crate::api::response::{ApiResponse, ApiResult, AppError};
use crate::features::FeatureState;

use super::commands::{bulk_delete, bulk_import, create, delete as delete_record, update};
use super::queries::{export, get as get_record, list, meta};

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub fn records_routes() -> Router<FeatureState> {
    Router::new()
        .route("/", get(list_records))
        .route("/", post(create_record))
        .route("/field-options", get(field_options))
        .route("/import-template", get(import_template))
        .route("/bulk-import", post(bulk_import_records))
        .route("/bulk-delete", post(bulk_delete_records))
        .route("/export", get(export_records))
        .route("/:id", get(get_one))
        .route("/:id", put(update_record))
        .route("/:id", delete(delete_one))
}

fn workbook_response(filename: &str, bytes: Vec<u8>) -> Result<Response, AppError> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, XLSX_CONTENT_TYPE)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(Body::from(bytes))
        .map_err(|err| AppError::InternalError(err.to_string()))
}

// ============================================================================
// Command Handlers (Write Operations)
// ============================================================================

#[tracing::instrument(skip(state, command), fields(barcode = %command.barcode))]
async fn create_record(
    State(state): State<FeatureState>,
    Json(command): Json<create::CreateRecordCommand>,
) -> Result<Response, AppError> {
    let record = create::handle(state.store.as_ref(), command).await?;
    tracing::info!(id = record.id, "record created via API");
    Ok((StatusCode::CREATED, Json(ApiResponse::success(record))).into_response())
}

#[tracing::instrument(skip(state, command), fields(id = id))]
async fn update_record(
    State(state): State<FeatureState>,
    Path(id): Path<i64>,
    Json(command): Json<RecordUpdate>,
) -> ApiResult<ApiResponse<scanbase_common::types::ScanRecord>> {
    let record = update::handle(state.store.as_ref(), id, command).await?;
    tracing::info!(id = record.id, "record updated via API");
    Ok(ApiResponse::success(record))
}

#[tracing::instrument(skip(state), fields(id = id))]
async fn delete_one(
    State(state): State<FeatureState>,
    Path(id): Path<i64>,
) -> ApiResult<ApiResponse<serde_json::Value>> {
    delete_record::handle(state.store.as_ref(), id).await?;
    tracing::info!(id, "record deleted via API");
    Ok(ApiResponse::success(json!({ "deleted": 1 })))
}

#[tracing::instrument(skip(state, command), fields(count = command.ids.len()))]
async fn bulk_delete_records(
    State(state): State<FeatureState>,
    Json(command): Json<bulk_delete::BulkDeleteCommand>,
) -> ApiResult<ApiResponse<bulk_delete::BulkDeleteResponse>> {
    let response = bulk_delete::handle(state.store.as_ref(), command).await?;
    tracing::info!(deleted = response.deleted, "records bulk-deleted via API");
    Ok(ApiResponse::success(response))
}

#[tracing::instrument(skip(state, multipart))]
async fn bulk_import_records(
    State(state): State<FeatureState>,
    mut multipart: Multipart,
) -> ApiResult<ApiResponse<bulk_import::BulkImportResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::BadRequest(err.to_string()))?
    {
        let named_file = field.name() == Some("file") || field.file_name().is_some();
        if !named_file {
            continue;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|err| AppError::BadRequest(err.to_string()))?;
        let response = bulk_import::handle(state.store.as_ref(), bytes.to_vec()).await?;
        return Ok(ApiResponse::success(response));
    }
    Err(AppError::BadRequest(
        "multipart upload must carry a 'file' field".to_string(),
    ))
}

// ============================================================================
// Query Handlers (Read Operations)
// ============================================================================

#[tracing::instrument(skip(state, query))]
async fn list_records(
    State(state): State<FeatureState>,
    Query(query): Query<list::ListRecordsQuery>,
) -> ApiResult<Response> {
    let response = list::handle(state.store.as_ref(), query).await?;
    tracing::debug!(
        count = response.items.len(),
        total = response.pagination.total,
        "records listed via API"
    );
    let meta = json!({ "pagination": response.pagination });
    Ok(Json(ApiResponse::success_with_meta(response.items, meta)).into_response())
}

#[tracing::instrument(skip(state), fields(id = id))]
async fn get_one(
    State(state): State<FeatureState>,
    Path(id): Path<i64>,
) -> ApiResult<ApiResponse<scanbase_common::types::ScanRecord>> {
    let record = get_record::handle(state.store.as_ref(), id).await?;
    Ok(ApiResponse::success(record))
}

async fn field_options() -> ApiResult<ApiResponse<serde_json::Value>> {
    Ok(ApiResponse::success(meta::field_options()))
}

async fn import_template() -> Result<Response, AppError> {
    let bytes = meta::import_template()?;
    workbook_response("import-template.xlsx", bytes)
}

#[tracing::instrument(skip(state, query))]
async fn export_records(
    State(state): State<FeatureState>,
    Query(query): Query<list::ListRecordsQuery>,
) -> Result<Response, AppError> {
    let bytes = export::handle(state.store.as_ref(), query).await?;
    workbook_response("records.xlsx", bytes)
}
