//! Feature modules implementing the Scanbase API
//!
//! Each feature is a vertical slice with its own commands, queries, and
//! routes:
//!
//! - **records**: scan-record CRUD, search/filter/sort, bulk spreadsheet
//!   import/export, field metadata, template download
//! - **auth**: bearer-token login over the directory seam
//! - **shared**: pagination helpers used by the list queries

use std::sync::Arc;

use axum::{middleware, Router};

use scanbase_ingest::store::RecordStore;

pub mod auth;
pub mod records;
pub mod shared;

use auth::{DirectoryAuthenticator, SessionStore};

/// State shared by every feature handler.
#[derive(Clone)]
pub struct FeatureState {
    pub store: Arc<dyn RecordStore>,
    pub sessions: Arc<SessionStore>,
    pub directory: Arc<dyn DirectoryAuthenticator>,
}

/// Build the full API router. Record routes sit behind the bearer-token
/// guard; auth routes are open (login has nothing to present yet).
pub fn router(state: FeatureState) -> Router {
    let guarded = records::routes::records_routes().layer(middleware::from_fn_with_state(
        state.clone(),
        auth::require_auth,
    ));

    Router::new()
        .nest("/api/v1/records", guarded)
        .nest("/api/v1/auth", auth::auth_routes())
        .with_state(state)
}
