use super::*;
use std::time::Duration;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::get;

use crate::state::test_helpers::{spawn_router, test_client, unreachable_url};

#[test]
fn strip_hop_by_hop_keeps_end_to_end_headers() {
    let mut headers = HeaderMap::new();
    headers.insert(header::HOST, HeaderValue::from_static("gateway:5000"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("12"));
    headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert("x-custom", HeaderValue::from_static("1"));

    let out = strip_hop_by_hop(&headers);
    assert_eq!(out.len(), 2);
    assert_eq!(out.get(header::CONTENT_TYPE).unwrap(), "application/json");
    assert_eq!(out.get("x-custom").unwrap(), "1");
}

#[test]
fn strip_hop_by_hop_preserves_repeated_headers() {
    let mut headers = HeaderMap::new();
    headers.append(header::SET_COOKIE, HeaderValue::from_static("a=1"));
    headers.append(header::SET_COOKIE, HeaderValue::from_static("b=2"));
    let out = strip_hop_by_hop(&headers);
    assert_eq!(out.get_all(header::SET_COOKIE).iter().count(), 2);
}

#[tokio::test]
async fn unreachable_peer_is_classified_as_unreachable() {
    let err = test_client()
        .send(Method::GET, &format!("{}/anything", unreachable_url()), HeaderMap::new(), Bytes::new())
        .await
        .unwrap_err();
    assert!(matches!(err, UpstreamError::Unreachable(_)), "got {err:?}");
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn slow_peer_hits_request_deadline() {
    let router = Router::new().route(
        "/slow",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "late"
        }),
    );
    let base = spawn_router(router).await;
    let client = UpstreamClient::new(UpstreamTimeouts {
        request: Duration::from_millis(200),
        connect: Duration::from_millis(200),
    })
    .unwrap();

    let err = client.get_json::<serde_json::Value>(&format!("{base}/slow")).await.unwrap_err();
    assert!(matches!(err, UpstreamError::Timeout(_)), "got {err:?}");
}

#[tokio::test]
async fn non_success_status_carries_body() {
    let router = Router::new().route(
        "/missing",
        get(|| async { (StatusCode::NOT_FOUND, axum::Json(serde_json::json!({"error": "gone"}))) }),
    );
    let base = spawn_router(router).await;

    let err = test_client()
        .get_json::<serde_json::Value>(&format!("{base}/missing"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    let UpstreamError::Status { body, .. } = err else {
        panic!("expected status error");
    };
    let decoded: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(decoded["error"], "gone");
}

#[tokio::test]
async fn get_internal_attaches_credential() {
    let router = Router::new().route(
        "/internal/echo",
        get(|headers: HeaderMap| async move {
            headers
                .get(&INTERNAL_KEY_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("none")
                .to_owned()
        }),
    );
    let base = spawn_router(router).await;

    let response = test_client()
        .get_internal(&format!("{base}/internal/echo"), &InternalKey::new("shh"))
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(&response.body[..], b"shh");
}

#[tokio::test]
async fn post_json_round_trips_payload() {
    let router = Router::new().route(
        "/echo",
        axum::routing::post(|axum::Json(v): axum::Json<serde_json::Value>| async move {
            (StatusCode::CREATED, axum::Json(v))
        }),
    );
    let base = spawn_router(router).await;

    let echoed: serde_json::Value = test_client()
        .post_json(&format!("{base}/echo"), &serde_json::json!({"title": "Hi"}))
        .await
        .unwrap();
    assert_eq!(echoed["title"], "Hi");
}

#[tokio::test]
async fn relayed_response_keeps_status_and_body() {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
    let upstream = UpstreamResponse { status: StatusCode::IM_A_TEAPOT, headers, body: Bytes::from_static(b"{\"a\":1}") };

    let response = upstream.into_response();
    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    assert!(response.headers().get(header::TRANSFER_ENCODING).is_none());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"{\"a\":1}");
}
