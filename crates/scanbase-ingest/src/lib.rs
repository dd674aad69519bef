//! Scanbase ingestion engine
//!
//! Bulk reconciliation of scan-record spreadsheets against the record store.
//!
//! # Flows
//!
//! - **Import**: insert rows whose barcode is not stored yet, skipping
//!   duplicates (in the store and within the batch).
//! - **Enrichment**: update stored records keyed on the asset number,
//!   filling user / model / asset type.
//!
//! Both flows run the same pipeline: read the file, normalize localized
//! headers, validate rows, reconcile against the store in one batched key
//! fetch, write in groups with a per-row fallback, and report counters that
//! account for every input row.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use scanbase_ingest::import::{run_import, ImportOptions};
//! use scanbase_ingest::store::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(MemoryStore::new());
//!     let report = run_import(
//!         store,
//!         std::path::Path::new("./scans.xlsx"),
//!         &ImportOptions::default(),
//!     )
//!     .await?;
//!     println!("{} rows in, {} written", report.counters.input_rows, report.counters.success);
//!     Ok(())
//! }
//! ```

pub mod enrich;
pub mod error;
pub mod import;
pub mod parallel;
pub mod reconcile;
pub mod report;
pub mod schema;
pub mod store;
pub mod tabular;
pub mod validate;
pub mod writer;

pub use error::ImportError;
