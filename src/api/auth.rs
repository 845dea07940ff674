//! Basic Auth Middleware
//!
//! Gates every route behind HTTP Basic authentication against an accounts
//! map loaded at startup.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Login to password mapping for the Basic auth realm.
pub type Accounts = Arc<HashMap<String, String>>;

/// Rejects requests whose `Authorization` header does not carry credentials
/// present in the accounts map.
pub async fn require_basic_auth(
    State(accounts): State<Accounts>,
    request: Request,
    next: Next,
) -> Response {
    if authorized(&accounts, request.headers()) {
        next.run(request).await
    } else {
        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Basic realm=\"kvcache\"")],
        )
            .into_response()
    }
}

fn authorized(accounts: &HashMap<String, String>, headers: &HeaderMap) -> bool {
    let Some(header) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    else {
        return false;
    };
    let Some(encoded) = header.strip_prefix("Basic ") else {
        return false;
    };
    let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
        return false;
    };
    let Ok(credentials) = String::from_utf8(decoded) else {
        return false;
    };
    let Some((login, password)) = credentials.split_once(':') else {
        return false;
    };
    accounts
        .get(login)
        .is_some_and(|expected| expected == password)
}
