//! Record store seam
//!
//! The persistent table of scan records, addressable by internal id and by
//! the natural key (barcode). The engine only ever talks to this trait; the
//! in-memory implementation backs tests and dry runs, the Postgres one (the
//! `database` feature) backs production.
//!
//! The schema deliberately does NOT make `barcode` unique: duplicates exist
//! in historical data and are tolerated everywhere. Callers that need one
//! row per key must apply their own tie-break (the reconciliation engine
//! picks the lowest internal id).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use scanbase_common::types::{EnrichmentDelta, RecordDraft, ScanRecord};

pub mod memory;
#[cfg(feature = "database")]
pub mod postgres;

pub use memory::MemoryStore;
#[cfg(feature = "database")]
pub use postgres::PgStore;

/// Column width limits, carried over from the original table definition.
/// Both store implementations enforce them so a too-long cell fails the same
/// way everywhere.
pub mod limits {
    pub const BARCODE: usize = 100;
    pub const MODEL: usize = 200;
    pub const LOCATION: usize = 500;
    pub const SCANNER: usize = 100;
    pub const SCAN_TIME: usize = 100;
    pub const USER: usize = 100;
    pub const ASSET_TYPE: usize = 100;
    pub const RESULT_REMARKS: usize = 100;
}

#[derive(Error, Debug)]
pub enum StoreError {
    /// The store itself cannot be reached or answered with a non-row error.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A row violates a schema constraint (width limit, missing key).
    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("record not found: id {0}")]
    NotFound(i64),
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        // SQLSTATE class 22 (data exception, e.g. value too long) and 23
        // (integrity constraint) are row problems; everything else means the
        // store itself is misbehaving.
        if let sqlx::Error::Database(ref db) = err {
            if let Some(code) = db.code() {
                if code.starts_with("22") || code.starts_with("23") {
                    return StoreError::Constraint(err.to_string());
                }
            }
        }
        StoreError::Unavailable(err.to_string())
    }
}

/// Full update of a record's mutable fields (operator edit). Identity fields
/// (`id`, `created_at`) are untouched; `updated_at` is refreshed by the
/// store. `None` clears the field, matching PUT semantics on the REST side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordUpdate {
    pub barcode: Option<String>,
    pub model: Option<String>,
    pub location: Option<String>,
    pub scanner: Option<String>,
    pub scan_time: Option<String>,
    pub remarks: Option<String>,
    pub user: Option<String>,
    pub asset_type: Option<String>,
    #[serde(default)]
    pub result: bool,
    pub expected_time: Option<DateTime<Utc>>,
    pub result_remarks: Option<String>,
}

/// Search / filter / sort / slice parameters for listing records.
///
/// Text filters are case-insensitive substring matches; `search` applies the
/// same match across every text column at once.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordQuery {
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
    /// Sort key, optionally prefixed with `-` for descending
    /// (e.g. "-created_at"). Unknown fields fall back to the default.
    pub ordering: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Fields records can be ordered by.
pub const ORDERABLE_FIELDS: &[&str] = &[
    "id",
    "barcode",
    "model",
    "location",
    "scanner",
    "scan_time",
    "user",
    "asset_type",
    "result",
    "created_at",
    "updated_at",
];

impl RecordQuery {
    /// Resolve the ordering into (field, descending), defaulting to newest
    /// first like the original listing.
    pub fn order(&self) -> (&str, bool) {
        match self.ordering.as_deref() {
            Some(raw) => {
                let (field, desc) = match raw.strip_prefix('-') {
                    Some(rest) => (rest, true),
                    None => (raw, false),
                };
                if ORDERABLE_FIELDS.contains(&field) {
                    (field, desc)
                } else {
                    ("created_at", true)
                }
            },
            None => ("created_at", true),
        }
    }
}

/// The record store collaborator.
///
/// Grouped operations (`batch_create`, `batch_enrich`) are all-or-nothing:
/// one violating row fails the whole call without applying the rest. The
/// batch writer exploits this by retrying a failed group one row at a time.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert one record, returning the store-assigned id.
    async fn create(&self, draft: RecordDraft) -> Result<i64, StoreError>;

    /// Insert a group of records in one operation. Fails as a whole.
    async fn batch_create(&self, drafts: &[RecordDraft]) -> Result<Vec<i64>, StoreError>;

    async fn get(&self, id: i64) -> Result<Option<ScanRecord>, StoreError>;

    /// Operator edit: replace every mutable field.
    async fn update(&self, id: i64, update: RecordUpdate) -> Result<ScanRecord, StoreError>;

    /// Apply one enrichment delta (user / model / asset_type only).
    async fn apply_enrichment(&self, delta: &EnrichmentDelta) -> Result<(), StoreError>;

    /// Apply a group of enrichment deltas in one operation. Fails as a whole.
    async fn batch_enrich(&self, deltas: &[EnrichmentDelta]) -> Result<(), StoreError>;

    /// All records whose barcode is in the given key set. Matching is on the
    /// trimmed barcode, so whitespace-padded legacy rows still resolve. One
    /// call per run, regardless of input size.
    async fn fetch_by_barcodes(&self, barcodes: &[String]) -> Result<Vec<ScanRecord>, StoreError>;

    /// Full scan.
    async fn fetch_all(&self) -> Result<Vec<ScanRecord>, StoreError>;

    /// Filtered, ordered, sliced listing plus the total match count.
    async fn list(&self, query: &RecordQuery) -> Result<(Vec<ScanRecord>, i64), StoreError>;

    async fn count(&self) -> Result<i64, StoreError>;

    /// Delete by id set, returning how many rows went away.
    async fn delete_by_ids(&self, ids: &[i64]) -> Result<u64, StoreError>;

    /// Remove every record (the full-reload import path). Returns the count.
    async fn truncate(&self) -> Result<u64, StoreError>;
}

/// Shared draft validation: both store implementations reject the same rows.
pub(crate) fn check_draft(draft: &RecordDraft) -> Result<(), StoreError> {
    if draft.barcode.trim().is_empty() {
        return Err(StoreError::Constraint("barcode must not be empty".into()));
    }
    check_width("barcode", Some(&draft.barcode), limits::BARCODE)?;
    check_width("model", draft.model.as_deref(), limits::MODEL)?;
    check_width("location", draft.location.as_deref(), limits::LOCATION)?;
    check_width("scanner", draft.scanner.as_deref(), limits::SCANNER)?;
    check_width("scan_time", draft.scan_time.as_deref(), limits::SCAN_TIME)?;
    check_width("user", draft.user.as_deref(), limits::USER)?;
    check_width("asset_type", draft.asset_type.as_deref(), limits::ASSET_TYPE)?;
    Ok(())
}

pub(crate) fn check_delta(delta: &EnrichmentDelta) -> Result<(), StoreError> {
    check_width("user", delta.user.as_deref(), limits::USER)?;
    check_width("model", delta.model.as_deref(), limits::MODEL)?;
    check_width("asset_type", delta.asset_type.as_deref(), limits::ASSET_TYPE)?;
    Ok(())
}

fn check_width(field: &str, value: Option<&str>, limit: usize) -> Result<(), StoreError> {
    match value {
        Some(v) if v.chars().count() > limit => Err(StoreError::Constraint(format!(
            "{field} exceeds {limit} characters"
        ))),
        _ => Ok(()),
    }
}
