//! Author verification: the Service B → Service A call chain.
//!
//! DESIGN
//! ======
//! Post creation is a two-phase contract. Phase one turns a validated
//! `PostDraft` into a `VerifiedDraft` by asking Service A whether the author
//! exists. Phase two (`PostStore::insert`) accepts only a `VerifiedDraft`,
//! and the only way to build one is `verify_draft`, so a post can never be
//! persisted without a successful verification of its own `authorId`.
//!
//! Outcomes of phase one:
//! - A answers 200 with that user: verified, payload kept for enrichment
//! - A answers 404: `UnknownAuthor`, surfaced as 404 "User not found"
//! - anything else (unreachable, timeout, other status, bad payload):
//!   `Failed`/`Mismatch`, surfaced as 500 "Verification failed"

use axum::http::StatusCode;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::internal_auth::InternalKey;
use crate::models::VerifiedUser;
use crate::upstream::{UpstreamClient, UpstreamError};

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("author {0} not found")]
    UnknownAuthor(i64),
    #[error("verification call failed: {0}")]
    Failed(#[from] UpstreamError),
    #[error("verification for author {requested} returned user {returned} (verified={verified})")]
    Mismatch { requested: i64, returned: i64, verified: bool },
}

impl From<VerifyError> for ApiError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::UnknownAuthor(_) => Self::NotFound("User not found"),
            VerifyError::Failed(_) | VerifyError::Mismatch { .. } => Self::Internal("Verification failed".into()),
        }
    }
}

/// Existence check against the users service. Mockable in tests.
#[async_trait::async_trait]
pub trait AuthorVerifier: Send + Sync {
    /// Ask whether `author_id` exists.
    ///
    /// # Errors
    ///
    /// Returns `UnknownAuthor` on a definitive "no", `Failed` when the answer
    /// could not be obtained.
    async fn verify(&self, author_id: i64) -> Result<VerifiedUser, VerifyError>;
}

/// Calls `GET /internal/api/users/verify/:id` on Service A with the shared key.
pub struct UsersServiceVerifier {
    client: UpstreamClient,
    users_url: String,
    key: InternalKey,
}

impl UsersServiceVerifier {
    #[must_use]
    pub fn new(client: UpstreamClient, users_url: &str, key: InternalKey) -> Self {
        Self { client, users_url: users_url.trim_end_matches('/').to_owned(), key }
    }
}

#[async_trait::async_trait]
impl AuthorVerifier for UsersServiceVerifier {
    async fn verify(&self, author_id: i64) -> Result<VerifiedUser, VerifyError> {
        let url = format!("{}/internal/api/users/verify/{author_id}", self.users_url);
        let response = self.client.get_internal(&url, &self.key).await?;
        match response.status {
            StatusCode::OK => Ok(response.json()?),
            StatusCode::NOT_FOUND => Err(VerifyError::UnknownAuthor(author_id)),
            status => Err(VerifyError::Failed(UpstreamError::Status { status, body: response.body })),
        }
    }
}

/// Verify `author_id` and check the answer is about that exact user.
///
/// # Errors
///
/// Propagates the verifier's error, or `Mismatch` if the payload does not
/// confirm the requested id.
pub async fn verify_author(verifier: &dyn AuthorVerifier, author_id: i64) -> Result<VerifiedUser, VerifyError> {
    debug!(author_id, "verifying author");
    let author = verifier.verify(author_id).await.inspect_err(|e| match e {
        VerifyError::UnknownAuthor(_) => debug!(author_id, "author unknown"),
        VerifyError::Failed(upstream) => {
            let status = upstream.status().map(|s| s.as_u16());
            warn!(author_id, ?status, error = %upstream, "author verification failed");
        }
        VerifyError::Mismatch { .. } => warn!(author_id, error = %e, "author verification failed"),
    })?;

    if author.id != author_id || !author.verified {
        warn!(author_id, returned = author.id, "verification payload does not match request");
        return Err(VerifyError::Mismatch { requested: author_id, returned: author.id, verified: author.verified });
    }
    Ok(author)
}

// =============================================================================
// DRAFTS
// =============================================================================

/// A post that passed field validation but has not been verified yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub author_id: i64,
}

/// A draft whose author Service A confirmed. Only `verify_draft` builds one.
#[derive(Debug, Clone)]
pub struct VerifiedDraft {
    draft: PostDraft,
    author: VerifiedUser,
}

impl VerifiedDraft {
    pub(super) fn into_parts(self) -> (PostDraft, VerifiedUser) {
        (self.draft, self.author)
    }
}

/// Phase one of post creation.
///
/// # Errors
///
/// See [`verify_author`].
pub async fn verify_draft(verifier: &dyn AuthorVerifier, draft: PostDraft) -> Result<VerifiedDraft, VerifyError> {
    let author = verify_author(verifier, draft.author_id).await?;
    Ok(VerifiedDraft { draft, author })
}

#[cfg(test)]
#[path = "verify_test.rs"]
mod tests;
