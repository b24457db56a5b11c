//! Public verification endpoints backed by the internal APIs of A and B.
//!
//! The gateway is the only public component holding the internal key. The
//! backend's answer is relayed as-is, success or not; only a missing answer
//! becomes a gateway-authored 500.

use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use tracing::warn;

use super::proxy::Backend;
use crate::error::ApiError;
use crate::state::GatewayState;

/// `GET /api/verify/user/:userId` → A's `/internal/api/users/verify/:userId`.
pub async fn verify_user(State(state): State<GatewayState>, path: Result<Path<i64>, PathRejection>) -> Response {
    match path {
        Ok(Path(user_id)) => {
            let url = format!("{}/internal/api/users/verify/{user_id}", state.urls.users);
            relay_internal(&state, Backend::Users, &url).await
        }
        Err(rejection) => ApiError::from(rejection).into_response(),
    }
}

/// `GET /api/verify/user/:userId/posts` → B's `/internal/api/posts/user/:userId`.
pub async fn verify_user_posts(State(state): State<GatewayState>, path: Result<Path<i64>, PathRejection>) -> Response {
    match path {
        Ok(Path(user_id)) => {
            let url = format!("{}/internal/api/posts/user/{user_id}", state.urls.posts);
            relay_internal(&state, Backend::Posts, &url).await
        }
        Err(rejection) => ApiError::from(rejection).into_response(),
    }
}

async fn relay_internal(state: &GatewayState, backend: Backend, url: &str) -> Response {
    match state.client.get_internal(url, &state.internal_key).await {
        Ok(response) => {
            if !response.status.is_success() {
                warn!(backend = backend.name(), status = response.status.as_u16(), "internal call rejected");
            }
            response.into_response()
        }
        Err(e) => {
            warn!(backend = backend.name(), error = %e, "internal call failed");
            backend.unavailable().into_response()
        }
    }
}
