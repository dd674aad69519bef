//! Write operations on scan records

pub mod bulk_delete;
pub mod bulk_import;
pub mod create;
pub mod delete;
pub mod update;
