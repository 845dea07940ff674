//! API Routes
//!
//! Assembles the router: the key/list/dict/keys route table behind the Basic
//! auth gate, with request tracing and panic recovery layered on top.

use axum::{
    middleware,
    routing::get,
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use super::auth::{require_basic_auth, Accounts};
use super::handlers::{
    delete_entry, get_dict, get_key, get_keys, get_list, put_dict, put_key, put_list, AppState,
};

/// Creates the router with all endpoints configured.
///
/// # Endpoints
/// - `GET|PUT|DELETE /key` - scalar operations
/// - `GET|PUT|DELETE /list` - list operations
/// - `GET|PUT|DELETE /dict` - dict operations
/// - `GET /keys` - all live keys
///
/// Auth applies to the route table only, so an unknown path is 404 whether
/// or not credentials are supplied. A panicking handler answers 500 without
/// tearing the server down.
pub fn create_router(state: AppState, accounts: Accounts) -> Router {
    Router::new()
        .route("/key", get(get_key).put(put_key).delete(delete_entry))
        .route("/list", get(get_list).put(put_list).delete(delete_entry))
        .route("/dict", get(get_dict).put(put_dict).delete(delete_entry))
        .route("/keys", get(get_keys))
        .route_layer(middleware::from_fn_with_state(accounts, require_basic_auth))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
