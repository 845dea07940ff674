//! Integration Tests for API Endpoints
//!
//! Tests the full request/response cycle for each endpoint through the
//! assembled router, including the Basic auth gate and the error-to-status
//! mapping.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use kvcache::store::{FileSnapshotter, Params, Store, SystemClock};
use kvcache::{create_router, AppState};
use tempfile::TempDir;
use tower::util::ServiceExt;

// == Helper Functions ==

fn test_params() -> Params {
    Params {
        cleaning_period: Duration::from_millis(100),
        dumping_period: Duration::from_secs(60),
    }
}

fn create_test_app() -> (Router, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = Store::new(
        test_params(),
        Arc::new(SystemClock),
        Arc::new(FileSnapshotter::new(dir.path().join("dump"))),
    )
    .unwrap();

    let mut accounts = HashMap::new();
    accounts.insert("admin".to_string(), "secret".to_string());

    let app = create_router(AppState::new(Arc::new(store)), Arc::new(accounts));
    (app, dir)
}

fn authed(method: Method, uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::AUTHORIZATION,
            format!("Basic {}", STANDARD.encode("admin:secret")),
        )
        .body(body.into())
        .unwrap()
}

async fn body_string(body: Body) -> String {
    let bytes = to_bytes(body, usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// == Auth Tests ==

#[tokio::test]
async fn test_unauthenticated_request_is_401() {
    let (app, _dir) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/key?key=a")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let www = response
        .headers()
        .get(header::WWW_AUTHENTICATE)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(www.starts_with("Basic"));
}

#[tokio::test]
async fn test_wrong_credentials_are_401() {
    let (app, _dir) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/keys")
                .header(
                    header::AUTHORIZATION,
                    format!("Basic {}", STANDARD.encode("admin:wrong")),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (app, _dir) = create_test_app();

    let response = app
        .oneshot(authed(Method::GET, "/unknown", Body::empty()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// == Scalar Endpoint Tests ==

#[tokio::test]
async fn test_scalar_round_trip() {
    let (app, _dir) = create_test_app();

    let response = app
        .clone()
        .oneshot(authed(Method::PUT, "/key?key=a&ttl=10s", "v"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response.into_body()).await.is_empty());

    let response = app
        .oneshot(authed(Method::GET, "/key?key=a", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response.into_body()).await, "v");
}

#[tokio::test]
async fn test_empty_key_param_is_a_valid_key() {
    let (app, _dir) = create_test_app();

    let response = app
        .clone()
        .oneshot(authed(Method::PUT, "/key?key=&ttl=10s", "empty"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(authed(Method::GET, "/key?key=", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response.into_body()).await, "empty");
}

#[tokio::test]
async fn test_get_key_missing_param_is_400() {
    let (app, _dir) = create_test_app();

    let response = app
        .oneshot(authed(Method::GET, "/key", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(response.into_body()).await.is_empty());
}

#[tokio::test]
async fn test_get_absent_key_is_404() {
    let (app, _dir) = create_test_app();

    let response = app
        .oneshot(authed(Method::GET, "/key?key=nope", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_string(response.into_body()).await.is_empty());
}

#[tokio::test]
async fn test_put_key_requires_ttl() {
    let (app, _dir) = create_test_app();

    let response = app
        .oneshot(authed(Method::PUT, "/key?key=a", "v"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_put_key_rejects_empty_and_malformed_ttl() {
    let (app, _dir) = create_test_app();

    for uri in ["/key?key=a&ttl=", "/key?key=a&ttl=soon"] {
        let response = app
            .clone()
            .oneshot(authed(Method::PUT, uri, "v"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "uri {uri}");
    }
}

#[tokio::test]
async fn test_expired_entry_is_404() {
    let (app, _dir) = create_test_app();

    // 1ns TTL is long gone by the time of the read
    let response = app
        .clone()
        .oneshot(authed(Method::PUT, "/key?key=a&ttl=1ns", "v"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(authed(Method::GET, "/key?key=a", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_negative_ttl_stores_born_expired_entry() {
    let (app, _dir) = create_test_app();

    let response = app
        .clone()
        .oneshot(authed(Method::PUT, "/key?key=a&ttl=-10s", "v"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(authed(Method::GET, "/key?key=a", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// == List Endpoint Tests ==

#[tokio::test]
async fn test_list_round_trip() {
    let (app, _dir) = create_test_app();

    let response = app
        .clone()
        .oneshot(authed(Method::PUT, "/list?key=l&ttl=10s", "- x\n- y\n"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(authed(Method::GET, "/list?key=l&index=1", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response.into_body()).await, "y");
}

#[tokio::test]
async fn test_list_variant_mismatch_maps_to_404() {
    let (app, _dir) = create_test_app();

    app.clone()
        .oneshot(authed(Method::PUT, "/list?key=l&ttl=10s", "- x\n- y\n"))
        .await
        .unwrap();

    // scalar read of a list entry
    let response = app
        .clone()
        .oneshot(authed(Method::GET, "/key?key=l", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // list read of a scalar entry
    app.clone()
        .oneshot(authed(Method::PUT, "/key?key=s&ttl=10s", "v"))
        .await
        .unwrap();
    let response = app
        .oneshot(authed(Method::GET, "/list?key=s&index=0", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_index_out_of_range_is_404() {
    let (app, _dir) = create_test_app();

    app.clone()
        .oneshot(authed(Method::PUT, "/list?key=l&ttl=10s", "- x\n- y\n"))
        .await
        .unwrap();

    let response = app
        .oneshot(authed(Method::GET, "/list?key=l&index=5", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_negative_index_is_400() {
    let (app, _dir) = create_test_app();

    app.clone()
        .oneshot(authed(Method::PUT, "/list?key=l&ttl=10s", "- x\n- y\n"))
        .await
        .unwrap();

    let response = app
        .oneshot(authed(Method::GET, "/list?key=l&index=-1", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(response.into_body()).await.is_empty());
}

#[tokio::test]
async fn test_list_unparseable_index_is_400() {
    let (app, _dir) = create_test_app();

    let response = app
        .oneshot(authed(Method::GET, "/list?key=l&index=first", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_put_list_empty_body_stores_null_list() {
    let (app, _dir) = create_test_app();

    let response = app
        .clone()
        .oneshot(authed(Method::PUT, "/list?key=l&ttl=10s", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // any index on the null list is out of range
    let response = app
        .clone()
        .oneshot(authed(Method::GET, "/list?key=l&index=0", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // but the key itself is live
    let response = app
        .oneshot(authed(Method::GET, "/keys", Body::empty()))
        .await
        .unwrap();
    assert!(body_string(response.into_body()).await.contains("l"));
}

#[tokio::test]
async fn test_put_list_malformed_yaml_is_400() {
    let (app, _dir) = create_test_app();

    let response = app
        .oneshot(authed(Method::PUT, "/list?key=l&ttl=10s", "{not: [valid"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// == Dict Endpoint Tests ==

#[tokio::test]
async fn test_dict_round_trip() {
    let (app, _dir) = create_test_app();

    let response = app
        .clone()
        .oneshot(authed(Method::PUT, "/dict?key=d&ttl=10s", "x: \"1\"\n"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(authed(Method::GET, "/dict?key=d&dkey=x", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response.into_body()).await, "1");
}

#[tokio::test]
async fn test_dict_missing_dkey_is_404() {
    let (app, _dir) = create_test_app();

    app.clone()
        .oneshot(authed(Method::PUT, "/dict?key=d&ttl=10s", "x: \"1\"\n"))
        .await
        .unwrap();

    let response = app
        .oneshot(authed(Method::GET, "/dict?key=d&dkey=y", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dict_missing_dkey_param_is_400() {
    let (app, _dir) = create_test_app();

    let response = app
        .oneshot(authed(Method::GET, "/dict?key=d", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_put_dict_empty_body_stores_null_dict() {
    let (app, _dir) = create_test_app();

    let response = app
        .clone()
        .oneshot(authed(Method::PUT, "/dict?key=d&ttl=10s", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(authed(Method::GET, "/dict?key=d&dkey=x", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// == Delete Endpoint Tests ==

#[tokio::test]
async fn test_delete_removes_entry() {
    let (app, _dir) = create_test_app();

    app.clone()
        .oneshot(authed(Method::PUT, "/key?key=a&ttl=10s", "v"))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(authed(Method::DELETE, "/key?key=a", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(authed(Method::GET, "/key?key=a", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_absent_key_still_answers_200() {
    let (app, _dir) = create_test_app();

    let response = app
        .oneshot(authed(Method::DELETE, "/key?key=nope", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_delete_works_across_variant_routes() {
    let (app, _dir) = create_test_app();

    app.clone()
        .oneshot(authed(Method::PUT, "/list?key=l&ttl=10s", "- x\n"))
        .await
        .unwrap();

    // the dict route's delete removes a list entry all the same
    let response = app
        .clone()
        .oneshot(authed(Method::DELETE, "/dict?key=l", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(authed(Method::GET, "/list?key=l&index=0", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_missing_key_param_is_400() {
    let (app, _dir) = create_test_app();

    let response = app
        .oneshot(authed(Method::DELETE, "/key", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// == Keys Endpoint Tests ==

#[tokio::test]
async fn test_keys_lists_live_entries_as_yaml() {
    let (app, _dir) = create_test_app();

    app.clone()
        .oneshot(authed(Method::PUT, "/key?key=a&ttl=10s", "v"))
        .await
        .unwrap();
    app.clone()
        .oneshot(authed(Method::PUT, "/list?key=b&ttl=10s", "- x\n"))
        .await
        .unwrap();
    app.clone()
        .oneshot(authed(Method::PUT, "/key?key=gone&ttl=1ns", "v"))
        .await
        .unwrap();

    let response = app
        .oneshot(authed(Method::GET, "/keys", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_string(response.into_body()).await;
    let keys: Vec<String> = serde_yaml::from_str(&body).unwrap();
    let mut keys = keys;
    keys.sort();
    assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
}

#[tokio::test]
async fn test_keys_on_empty_store_is_empty_yaml_list() {
    let (app, _dir) = create_test_app();

    let response = app
        .oneshot(authed(Method::GET, "/keys", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_string(response.into_body()).await;
    let keys: Vec<String> = serde_yaml::from_str(&body).unwrap();
    assert!(keys.is_empty());
}

// == Restart Tests ==

#[tokio::test(start_paused = true)]
async fn test_snapshot_survives_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dump");

    let mut accounts = HashMap::new();
    accounts.insert("admin".to_string(), "secret".to_string());
    let accounts = Arc::new(accounts);

    // first server: populate over HTTP, let one dump tick fire
    let store = Arc::new(
        Store::new(
            test_params(),
            Arc::new(SystemClock),
            Arc::new(FileSnapshotter::new(&path)),
        )
        .unwrap(),
    );
    let app = create_router(AppState::new(store.clone()), accounts.clone());

    app.clone()
        .oneshot(authed(Method::PUT, "/key?key=a&ttl=10h", "v"))
        .await
        .unwrap();
    app.clone()
        .oneshot(authed(Method::PUT, "/list?key=l&ttl=10h", "- x\n- y\n"))
        .await
        .unwrap();
    app.clone()
        .oneshot(authed(Method::PUT, "/dict?key=d&ttl=10h", "k: v\n"))
        .await
        .unwrap();

    store.start_dump().await.unwrap();
    tokio::time::sleep(Duration::from_secs(61)).await;
    store.stop_dump().await.unwrap();

    // second server over the same dump path resumes all three entries
    let restarted = Arc::new(
        Store::new(
            test_params(),
            Arc::new(SystemClock),
            Arc::new(FileSnapshotter::new(&path)),
        )
        .unwrap(),
    );
    let restarted_app = create_router(AppState::new(restarted), accounts);

    let response = restarted_app
        .clone()
        .oneshot(authed(Method::GET, "/key?key=a", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response.into_body()).await, "v");

    let response = restarted_app
        .clone()
        .oneshot(authed(Method::GET, "/list?key=l&index=1", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response.into_body()).await, "y");

    let response = restarted_app
        .oneshot(authed(Method::GET, "/dict?key=d&dkey=k", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response.into_body()).await, "v");
}
