//! HTTP API layer.

pub mod error;
pub mod routes;
pub mod tasks;
