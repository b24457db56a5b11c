use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::http::StatusCode;

use super::*;
use crate::internal_auth::InternalKey;
use crate::state::test_helpers::{spawn_users_service, test_client, test_key, unreachable_url};

struct Fixed {
    answer: fn(i64) -> Result<VerifiedUser, VerifyError>,
    calls: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl AuthorVerifier for Fixed {
    async fn verify(&self, author_id: i64) -> Result<VerifiedUser, VerifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.answer)(author_id)
    }
}

fn user(id: i64, verified: bool) -> VerifiedUser {
    VerifiedUser { id, username: format!("user{id}"), email: format!("user{id}@example.com"), verified }
}

fn draft(author_id: i64) -> PostDraft {
    PostDraft { title: "Hi".into(), content: "Hello world".into(), author_id }
}

// =============================================================================
// ERROR MAPPING
// =============================================================================

#[test]
fn unknown_author_maps_to_404_user_not_found() {
    let api: ApiError = VerifyError::UnknownAuthor(9).into();
    assert_eq!(api.status(), StatusCode::NOT_FOUND);
    assert_eq!(api.to_string(), "User not found");
}

#[test]
fn other_failures_map_to_500_verification_failed() {
    let status_err = VerifyError::Failed(UpstreamError::Status { status: StatusCode::BAD_GATEWAY, body: "x".into() });
    let mismatch = VerifyError::Mismatch { requested: 1, returned: 2, verified: true };
    for err in [status_err, mismatch] {
        let api: ApiError = err.into();
        assert_eq!(api.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.to_string(), "Verification failed");
    }
}

// =============================================================================
// PAYLOAD CHECKS
// =============================================================================

#[tokio::test]
async fn matching_payload_verifies() {
    let calls = Arc::new(AtomicUsize::new(0));
    let verifier = Fixed { answer: |id| Ok(user(id, true)), calls: calls.clone() };
    let verified = verify_draft(&verifier, draft(3)).await.unwrap();
    let (draft, author) = verified.into_parts();
    assert_eq!(draft.author_id, 3);
    assert_eq!(author.id, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn payload_for_another_user_is_a_mismatch() {
    let verifier = Fixed { answer: |_| Ok(user(42, true)), calls: Arc::default() };
    let err = verify_author(&verifier, 3).await.unwrap_err();
    assert!(matches!(err, VerifyError::Mismatch { requested: 3, returned: 42, .. }));
}

#[tokio::test]
async fn unverified_payload_is_a_mismatch() {
    let verifier = Fixed { answer: |id| Ok(user(id, false)), calls: Arc::default() };
    let err = verify_author(&verifier, 3).await.unwrap_err();
    assert!(matches!(err, VerifyError::Mismatch { verified: false, .. }));
}

#[tokio::test]
async fn unknown_author_is_passed_through() {
    let verifier = Fixed { answer: |id| Err(VerifyError::UnknownAuthor(id)), calls: Arc::default() };
    let err = verify_draft(&verifier, draft(9999)).await.unwrap_err();
    assert!(matches!(err, VerifyError::UnknownAuthor(9999)));
}

// =============================================================================
// LIVE USERS SERVICE
// =============================================================================

#[tokio::test]
async fn live_existing_user_verifies() {
    let (users_url, _) = spawn_users_service(&["ann"]).await;
    let verifier = UsersServiceVerifier::new(test_client(), &users_url, test_key());
    let author = verify_author(&verifier, 1).await.unwrap();
    assert_eq!(author.username, "ann");
    assert!(author.verified);
}

#[tokio::test]
async fn live_missing_user_is_unknown_author() {
    let (users_url, _) = spawn_users_service(&["ann"]).await;
    let verifier = UsersServiceVerifier::new(test_client(), &users_url, test_key());
    let err = verify_author(&verifier, 9999).await.unwrap_err();
    assert!(matches!(err, VerifyError::UnknownAuthor(9999)));
}

#[tokio::test]
async fn live_trailing_slash_in_base_url_is_tolerated() {
    let (users_url, _) = spawn_users_service(&["ann"]).await;
    let verifier = UsersServiceVerifier::new(test_client(), &format!("{users_url}/"), test_key());
    assert!(verify_author(&verifier, 1).await.is_ok());
}

#[tokio::test]
async fn unreachable_users_service_is_a_failure_not_a_404() {
    let verifier = UsersServiceVerifier::new(test_client(), &unreachable_url(), test_key());
    let err = verify_author(&verifier, 1).await.unwrap_err();
    assert!(matches!(err, VerifyError::Failed(_)));
    assert_eq!(ApiError::from(err).status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn wrong_key_is_a_failure_not_a_404() {
    let (users_url, _) = spawn_users_service(&["ann"]).await;
    let verifier = UsersServiceVerifier::new(test_client(), &users_url, InternalKey::new("not-the-key"));
    let err = verify_author(&verifier, 1).await.unwrap_err();
    match err {
        VerifyError::Failed(upstream) => assert_eq!(upstream.status(), Some(StatusCode::UNAUTHORIZED)),
        other => panic!("expected Failed, got {other:?}"),
    }
}
