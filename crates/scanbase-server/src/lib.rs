//! Scanbase Server Library
//!
//! REST boundary over the scan-record store: CRUD with search/filter/sort
//! and pagination, bulk spreadsheet import/export, and token-based login
//! wrapping a directory-authentication seam.

pub mod api;
pub mod config;
pub mod features;
