//! Service B handlers.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::info;

use super::verify::{PostDraft, verify_author, verify_draft};
use crate::error::{ApiError, required};
use crate::models::{CreatePostRequest, Post, PostView};
use crate::state::PostsState;

impl PostDraft {
    /// Field validation, done before any network call.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` naming the first missing field.
    pub fn from_request(body: CreatePostRequest) -> Result<Self, ApiError> {
        let title = required(body.title, "title")?;
        let content = required(body.content, "content")?;
        let author_id = body.author_id.ok_or_else(|| ApiError::missing_field("authorId"))?;
        Ok(Self { title, content, author_id })
    }
}

/// `GET /api/posts`: all posts in creation order.
pub async fn list_posts(State(state): State<PostsState>) -> Json<Vec<Post>> {
    Json(state.store.list().await)
}

/// `GET /api/posts/:id`.
pub async fn get_post(
    State(state): State<PostsState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Post>, ApiError> {
    let Path(post_id) = path?;
    state
        .store
        .get(post_id)
        .await
        .map(Json)
        .ok_or(ApiError::NotFound("Post not found"))
}

/// `POST /api/posts`: validate, verify the author with Service A, then persist.
pub async fn create_post(
    State(state): State<PostsState>,
    payload: Result<Json<CreatePostRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PostView>), ApiError> {
    let Json(body) = payload?;
    let draft = PostDraft::from_request(body)?;
    let verified = verify_draft(state.verifier.as_ref(), draft).await?;
    let created = state.store.insert(verified).await;
    let total = state.store.len().await;

    info!(post_id = created.post.id, author_id = created.post.author_id, total, "post created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// `GET /api/posts/user/:userId` and `GET /api/users/:userId/posts`.
///
/// No verification: an unknown author simply has no posts.
pub async fn posts_by_user(
    State(state): State<PostsState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let Path(user_id) = path?;
    Ok(Json(state.store.by_author(user_id).await))
}

/// `GET /internal/api/posts/user/:userId`: verified author plus their posts.
pub async fn internal_posts_by_user(
    State(state): State<PostsState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<PostView>>, ApiError> {
    let Path(user_id) = path?;
    let author = verify_author(state.verifier.as_ref(), user_id).await?;
    let posts = state
        .store
        .by_author(user_id)
        .await
        .into_iter()
        .map(|post| PostView::with_author(post, author.clone()))
        .collect();
    Ok(Json(posts))
}

#[cfg(test)]
#[path = "routes_test.rs"]
mod tests;
