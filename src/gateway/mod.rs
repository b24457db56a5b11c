//! Public gateway.
//!
//! SYSTEM CONTEXT
//! ==============
//! The single entry point clients talk to. `/api/users`, `/api/posts` and
//! `/api/calculator` are forwarded unchanged to A, B and C; `/api/verify/...`
//! calls the internal endpoints of A and B with the shared key attached. The
//! gateway holds no state beyond its configuration.

pub mod proxy;
pub mod verify;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{any, get};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::server::{ServerError, healthz};
use crate::state::GatewayState;
use crate::upstream::UpstreamClient;

pub fn router(state: GatewayState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/users", any(proxy::users))
        .route("/api/users/", any(proxy::users))
        .route("/api/users/{*rest}", any(proxy::users))
        .route("/api/posts", any(proxy::posts))
        .route("/api/posts/", any(proxy::posts))
        .route("/api/posts/{*rest}", any(proxy::posts))
        .route("/api/calculator", any(proxy::calculator))
        .route("/api/calculator/", any(proxy::calculator))
        .route("/api/calculator/{*rest}", any(proxy::calculator))
        .route("/api/verify/user/{user_id}", get(verify::verify_user))
        .route("/api/verify/user/{user_id}/posts", get(verify::verify_user_posts))
        .route("/healthz", get(healthz))
        .layer(DefaultBodyLimit::max(proxy::MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// # Errors
///
/// Returns an error if the outbound HTTP client cannot be built.
pub fn build_state(config: &Config) -> Result<GatewayState, ServerError> {
    let client = UpstreamClient::new(config.timeouts)?;
    Ok(GatewayState { client, urls: Arc::new(config.urls.clone()), internal_key: config.internal_key.clone() })
}

#[cfg(test)]
#[path = "gateway_test.rs"]
mod tests;
