//! Run-fatal error taxonomy for the ingestion engine
//!
//! Only structural and source problems abort a run. Row-level failures are
//! never represented here; they are counted and sampled in the run report.

use thiserror::Error;

use crate::store::StoreError;

/// Errors that abort an import or enrichment run before (or instead of)
/// producing a report.
#[derive(Error, Debug)]
pub enum ImportError {
    /// Input file missing or unparsable. Raised before any store mutation.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// A required canonical column is absent from the input entirely.
    /// This is a precondition on the whole batch, not a per-row error.
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// The store itself is unreachable (as opposed to rejecting one row).
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
