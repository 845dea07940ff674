//! kvcache - An in-memory key/value cache server
//!
//! Scalar, list and dict entries with per-entry TTL behind an HTTP API, a
//! background sweeper for expired entries and periodic binary snapshots
//! that survive a restart.

pub mod api;
pub mod config;
pub mod error;
pub mod store;

pub use api::{create_router, AppState};
pub use config::Args;
pub use store::Store;
