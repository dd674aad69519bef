//! Scan-record feature
//!
//! CRUD and listing over the record store, plus the bulk spreadsheet
//! operations (import, export, template) and field metadata.

pub mod commands;
pub mod queries;
pub mod routes;
