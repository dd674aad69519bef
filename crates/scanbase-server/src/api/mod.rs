//! API layer modules

pub mod response;
