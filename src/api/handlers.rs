//! API Handlers
//!
//! Query and body parsing for each endpoint, store calls and the mapping of
//! store errors onto HTTP statuses. Success bodies are raw strings (or YAML
//! for `/keys`); every error answers its mapped status with an empty body.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::error::{self, StoreError};
use crate::store::Store;

// == App State ==
/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The cache store
    pub store: Arc<Store>,
}

impl AppState {
    /// Creates a new AppState around the given store.
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

// == API Error ==
/// Adapter-level failures plus pass-through store errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required query param was absent
    #[error("missing {0} query param")]
    MissingParam(&'static str),
    /// A query param was present but unparseable
    #[error("invalid {0} query param: {1}")]
    InvalidParam(&'static str, String),
    /// The request body could not be decoded
    #[error("invalid body: {0}")]
    InvalidBody(String),
    /// The response could not be encoded
    #[error("response encoding failed: {0}")]
    Encoding(String),
    /// A store operation failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingParam(_) | ApiError::InvalidParam(_, _) | ApiError::InvalidBody(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Encoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Store(err) => store_status(err),
        }
    }
}

/// Maps a store error kind onto a status. Shape and absence errors are 404,
/// argument validation is 400, anything else is a server fault.
fn store_status(err: &StoreError) -> StatusCode {
    if [
        error::KEY_MISSING,
        error::NOT_SCALAR,
        error::NOT_LIST,
        error::NOT_DICT,
        error::INDEX_OUT_OF_RANGE,
        error::DICT_KEY_MISSING,
    ]
    .contains(err)
    {
        StatusCode::NOT_FOUND
    } else if *err == error::INVALID_INDEX {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        debug!(status = %status, error = %self, "request rejected");
        status.into_response()
    }
}

/// Convenience Result type for handlers.
type Result<T> = std::result::Result<T, ApiError>;

// == Query Params ==
// Every param is optional at the extractor so a missing param maps to the
// adapter's own 400 and a present-but-empty param stays a valid value.

#[derive(Debug, Deserialize)]
pub struct KeyParams {
    key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PutParams {
    key: Option<String>,
    ttl: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    key: Option<String>,
    index: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DictParams {
    key: Option<String>,
    dkey: Option<String>,
}

// == TTL Parsing ==
/// Parses a wire-format TTL ("10s", "2m", "-500ms"). The empty string is
/// invalid; a leading `-` yields a negative TTL, which stores a born-expired
/// entry.
fn parse_ttl(raw: Option<String>) -> Result<chrono::Duration> {
    let raw = raw.ok_or(ApiError::MissingParam("ttl"))?;
    let (negative, magnitude) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.as_str()),
    };
    if magnitude.is_empty() {
        return Err(ApiError::InvalidParam("ttl", "empty duration".to_string()));
    }
    let duration = humantime::parse_duration(magnitude)
        .map_err(|e| ApiError::InvalidParam("ttl", e.to_string()))?;
    let duration = chrono::Duration::from_std(duration)
        .map_err(|e| ApiError::InvalidParam("ttl", e.to_string()))?;
    Ok(if negative { -duration } else { duration })
}

// == Scalar Handlers ==

/// Handler for GET /key: the scalar value under `key`.
pub async fn get_key(
    State(state): State<AppState>,
    Query(params): Query<KeyParams>,
) -> Result<String> {
    let key = params.key.ok_or(ApiError::MissingParam("key"))?;
    Ok(state.store.get(&key).await?)
}

/// Handler for PUT /key: stores the raw body as a scalar under `key`.
pub async fn put_key(
    State(state): State<AppState>,
    Query(params): Query<PutParams>,
    body: Bytes,
) -> Result<StatusCode> {
    let key = params.key.ok_or(ApiError::MissingParam("key"))?;
    let ttl = parse_ttl(params.ttl)?;
    let value =
        String::from_utf8(body.to_vec()).map_err(|e| ApiError::InvalidBody(e.to_string()))?;
    state.store.set(key, value, ttl).await;
    Ok(StatusCode::OK)
}

// == List Handlers ==

/// Handler for GET /list: the element at `index` of the list under `key`.
/// The index is signed; the store rejects negative values.
pub async fn get_list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<String> {
    let key = params.key.ok_or(ApiError::MissingParam("key"))?;
    let index = params
        .index
        .ok_or(ApiError::MissingParam("index"))?
        .parse::<i64>()
        .map_err(|e| ApiError::InvalidParam("index", e.to_string()))?;
    Ok(state.store.list_get(&key, index).await?)
}

/// Handler for PUT /list: stores the YAML list body under `key`. An empty
/// body is legal and stores a null list.
pub async fn put_list(
    State(state): State<AppState>,
    Query(params): Query<PutParams>,
    body: Bytes,
) -> Result<StatusCode> {
    let key = params.key.ok_or(ApiError::MissingParam("key"))?;
    let ttl = parse_ttl(params.ttl)?;
    let list: Option<Vec<String>> =
        serde_yaml::from_slice(&body).map_err(|e| ApiError::InvalidBody(e.to_string()))?;
    state.store.list_set(key, list, ttl).await;
    Ok(StatusCode::OK)
}

// == Dict Handlers ==

/// Handler for GET /dict: the element under `dkey` of the dict under `key`.
pub async fn get_dict(
    State(state): State<AppState>,
    Query(params): Query<DictParams>,
) -> Result<String> {
    let key = params.key.ok_or(ApiError::MissingParam("key"))?;
    let dkey = params.dkey.ok_or(ApiError::MissingParam("dkey"))?;
    Ok(state.store.dict_get(&key, &dkey).await?)
}

/// Handler for PUT /dict: stores the YAML mapping body under `key`. An
/// empty body is legal and stores a null dict.
pub async fn put_dict(
    State(state): State<AppState>,
    Query(params): Query<PutParams>,
    body: Bytes,
) -> Result<StatusCode> {
    let key = params.key.ok_or(ApiError::MissingParam("key"))?;
    let ttl = parse_ttl(params.ttl)?;
    let dict: Option<HashMap<String, String>> =
        serde_yaml::from_slice(&body).map_err(|e| ApiError::InvalidBody(e.to_string()))?;
    state.store.dict_set(key, dict, ttl).await;
    Ok(StatusCode::OK)
}

// == Shared Handlers ==

/// Handler for DELETE /key, /list and /dict: removes the entry under `key`
/// whatever its variant. Removing an absent key still answers 200.
pub async fn delete_entry(
    State(state): State<AppState>,
    Query(params): Query<KeyParams>,
) -> Result<StatusCode> {
    let key = params.key.ok_or(ApiError::MissingParam("key"))?;
    let _ = state.store.remove(&key).await;
    Ok(StatusCode::OK)
}

/// Handler for GET /keys: all live keys as a YAML list.
pub async fn get_keys(State(state): State<AppState>) -> Result<String> {
    let keys = state.store.keys().await;
    serde_yaml::to_string(&keys).map_err(|e| ApiError::Encoding(e.to_string()))
}
