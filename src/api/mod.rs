//! API Module
//!
//! The HTTP adapter: route table, Basic auth gate, request parsing and the
//! mapping of store errors onto status codes.

mod auth;
mod handlers;
mod routes;

// Re-export public types
pub use auth::{require_basic_auth, Accounts};
pub use handlers::AppState;
pub use routes::create_router;
