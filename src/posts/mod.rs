//! Service B: owns post records.
//!
//! SYSTEM CONTEXT
//! ==============
//! Public CRUD under `/api/posts`, author listings under both
//! `/api/posts/user/:id` and `/api/users/:id/posts`, and a privileged
//! `/internal/api/posts` namespace. Creating a post synchronously verifies
//! the author against Service A before anything is written (see `verify`).

pub mod routes;
pub mod store;
pub mod verify;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::internal_auth::require_internal_key;
use crate::server::{ServerError, healthz};
use crate::state::PostsState;
use crate::upstream::UpstreamClient;
use store::PostStore;
use verify::UsersServiceVerifier;

/// Build the Service B router.
pub fn router(state: PostsState) -> Router {
    let internal = Router::new()
        .route("/internal/api/posts/user/{user_id}", get(routes::internal_posts_by_user))
        .route_layer(middleware::from_fn_with_state(state.internal_key.clone(), require_internal_key));

    Router::new()
        .route("/api/posts", get(routes::list_posts).post(routes::create_post))
        .route("/api/posts/", get(routes::list_posts).post(routes::create_post))
        .route("/api/posts/{post_id}", get(routes::get_post))
        .route("/api/posts/user/{user_id}", get(routes::posts_by_user))
        .route("/api/users/{user_id}/posts", get(routes::posts_by_user))
        .merge(internal)
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wire the verifier to the configured users service.
///
/// # Errors
///
/// Returns an error if the outbound HTTP client cannot be built.
pub fn build_state(config: &Config) -> Result<PostsState, ServerError> {
    let client = UpstreamClient::new(config.timeouts)?;
    let verifier = UsersServiceVerifier::new(client, &config.urls.users, config.internal_key.clone());
    Ok(PostsState { store: PostStore::new(), verifier: Arc::new(verifier), internal_key: config.internal_key.clone() })
}
