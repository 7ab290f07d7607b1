//! HTTP server for the NeonPlay betting ledger.
//!
//! The binary wires configuration, logging and metrics around the axum
//! router in [`api`]; the library half exists so integration tests can drive
//! the same router in-process.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
