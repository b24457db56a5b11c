use std::sync::Arc;

use axum::body::Body;
use axum::extract::Request;
use axum::http::{Method, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::state::UsersState;
use crate::state::test_helpers::{TEST_KEY, seed_user, send, test_key, users_state};
use crate::users::password::verify_password;
use crate::users::store::MemoryUserStore;

#[tokio::test]
async fn create_user_returns_201_without_password() {
    let app = crate::users::router(users_state());
    let (status, body) = send(
        app,
        Method::POST,
        "/api/users",
        None,
        Some(json!({"username": "ann", "email": "ann@example.com", "password": "pw"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({"id": 1, "username": "ann", "email": "ann@example.com"}));
}

#[tokio::test]
async fn create_user_stores_argon2_hash_not_plaintext() {
    let store = MemoryUserStore::new();
    let state = UsersState { store: Arc::new(store.clone()), internal_key: test_key() };
    let (status, _) = send(
        crate::users::router(state),
        Method::POST,
        "/api/users",
        None,
        Some(json!({"username": "ann", "email": "ann@example.com", "password": "hunter2"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let stored = store.password_hash(1).await.unwrap();
    assert!(stored.starts_with("$argon2id$"));
    assert!(!stored.contains("hunter2"));
    assert!(verify_password(&stored, "hunter2"));
    assert!(!verify_password(&stored, "hunter3"));
}

#[tokio::test]
async fn create_user_missing_field_is_400() {
    let state = users_state();
    let app = crate::users::router(state.clone());
    let (status, body) =
        send(app, Method::POST, "/api/users", None, Some(json!({"username": "ann", "password": "pw"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required field: email");
    assert!(state.store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn create_user_malformed_json_is_400_with_error_body() {
    let app = crate::users::router(users_state());
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/users")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn duplicate_username_is_400() {
    let state = users_state();
    seed_user(&state, "ann").await;
    let app = crate::users::router(state);
    let (status, body) = send(
        app,
        Method::POST,
        "/api/users/",
        None,
        Some(json!({"username": "ann", "email": "new@example.com", "password": "pw"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Username already exists");
}

#[tokio::test]
async fn list_and_get_users() {
    let state = users_state();
    seed_user(&state, "ann").await;
    seed_user(&state, "bob").await;

    let (status, body) = send(crate::users::router(state.clone()), Method::GET, "/api/users", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = send(crate::users::router(state), Method::GET, "/api/users/2", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "bob");
}

#[tokio::test]
async fn repeated_get_is_identical() {
    let state = users_state();
    seed_user(&state, "ann").await;
    let (_, first) = send(crate::users::router(state.clone()), Method::GET, "/api/users/1", None, None).await;
    let (_, second) = send(crate::users::router(state.clone()), Method::GET, "/api/users/1", None, None).await;
    assert_eq!(first, second);
    assert_eq!(state.store.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_user_is_404() {
    let app = crate::users::router(users_state());
    let (status, body) = send(app, Method::GET, "/api/users/99", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "User not found"}));
}

#[tokio::test]
async fn non_numeric_user_id_is_400() {
    let app = crate::users::router(users_state());
    let (status, body) = send(app, Method::GET, "/api/users/abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn verify_with_key_reports_verified() {
    let state = users_state();
    seed_user(&state, "ann").await;
    let app = crate::users::router(state);
    let (status, body) = send(app, Method::GET, "/internal/api/users/verify/1", Some(TEST_KEY), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"id": 1, "username": "ann", "email": "ann@example.com", "verified": true}));
}

#[tokio::test]
async fn verify_unknown_user_is_404() {
    let app = crate::users::router(users_state());
    let (status, body) = send(app, Method::GET, "/internal/api/users/verify/5", Some(TEST_KEY), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");
}

#[tokio::test]
async fn every_internal_endpoint_requires_key() {
    let state = users_state();
    seed_user(&state, "ann").await;

    let calls: [(Method, &str, Option<Value>); 2] = [
        (Method::GET, "/internal/api/users/verify/1", None),
        (Method::POST, "/internal/api/users/batch", Some(json!({"user_ids": [1]}))),
    ];
    for (method, uri, body) in calls {
        for key in [None, Some("wrong-key")] {
            let (status, response) =
                send(crate::users::router(state.clone()), method.clone(), uri, key, body.clone()).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri} with {key:?}");
            assert_eq!(response, json!({"error": "Unauthorized"}));
        }
    }
}

#[tokio::test]
async fn batch_skips_unknown_ids_and_keeps_order() {
    let state = users_state();
    seed_user(&state, "ann").await;
    seed_user(&state, "bob").await;
    let app = crate::users::router(state);
    let (status, body) = send(
        app,
        Method::POST,
        "/internal/api/users/batch",
        Some(TEST_KEY),
        Some(json!({"user_ids": [2, 77, 1]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["bob", "ann"]);
}

#[tokio::test]
async fn healthz_is_ok() {
    let app = crate::users::router(users_state());
    let (status, _) = send(app, Method::GET, "/healthz", None, None).await;
    assert_eq!(status, StatusCode::OK);
}
