//! Scanbase Common Library
//!
//! Shared types, error handling, and logging bootstrap for the scanbase
//! workspace.
//!
//! # Overview
//!
//! - **Error Handling**: the workspace-wide [`ScanbaseError`] and `Result`
//!   alias
//! - **Logging**: `tracing` subscriber configuration shared by the server
//!   and the ingest CLI
//! - **Types**: the canonical [`types::ScanRecord`] domain types

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{Result, ScanbaseError};
