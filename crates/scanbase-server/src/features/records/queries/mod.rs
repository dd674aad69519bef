//! Read operations on scan records

pub mod export;
pub mod get;
pub mod list;
pub mod meta;
