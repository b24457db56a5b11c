//! Transparent pass-through to the backend services.
//!
//! DESIGN
//! ======
//! The gateway owns no business logic for proxied paths. Method, path, query,
//! end-to-end headers and body go out unchanged; status, end-to-end headers
//! and body come back unchanged, error statuses included. Only a failure to
//! get any answer at all is turned into a gateway-authored 500.

use axum::body::Bytes;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::{HeaderMap, Method, Uri};
use axum::response::{IntoResponse, Response};
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::GatewayState;
use crate::upstream::strip_hop_by_hop;

/// Largest request body the gateway will buffer and forward.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// One backend the gateway forwards to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Users,
    Posts,
    Calculator,
}

impl Backend {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Posts => "posts",
            Self::Calculator => "calculator",
        }
    }

    fn base_url(self, state: &GatewayState) -> &str {
        match self {
            Self::Users => &state.urls.users,
            Self::Posts => &state.urls.posts,
            Self::Calculator => &state.urls.calculator,
        }
    }

    /// Error message when the backend could not be reached.
    #[must_use]
    pub fn unavailable(self) -> ApiError {
        let name = match self {
            Self::Users => "Users",
            Self::Posts => "Posts",
            Self::Calculator => "Calculator",
        };
        ApiError::Internal(format!("{name} service unavailable"))
    }
}

/// True when any segment is `.` or `..`, raw or percent-encoded. The outbound
/// URL parser would resolve those and move the request out of its prefix.
fn has_dot_segment(path: &str) -> bool {
    path.split(['/', '\\']).any(|segment| {
        let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
        decoded == "." || decoded == ".."
    })
}

/// Forward one inbound request to `backend` and relay its answer.
///
/// # Errors
///
/// Returns 400 for a path with dot segments, 413 for an oversized body and
/// 500 when the backend gave no answer.
pub async fn forward(
    state: &GatewayState,
    backend: Backend,
    method: Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let body = body?;
    if has_dot_segment(uri.path()) {
        warn!(backend = backend.name(), path = uri.path(), "rejected dot segment");
        return Err(ApiError::Validation("Invalid path".into()));
    }
    let path = uri.path_and_query().map_or(uri.path(), |pq| pq.as_str());
    let target = format!("{}{path}", backend.base_url(state));

    let span = info_span!("proxy", request_id = %Uuid::new_v4(), backend = backend.name(), %method, path = uri.path());
    async move {
        match state.client.send(method, &target, strip_hop_by_hop(headers), body).await {
            Ok(response) => {
                info!(status = response.status.as_u16(), "relayed");
                Ok(response.into_response())
            }
            Err(e) => {
                warn!(error = %e, "backend unreachable");
                Err(backend.unavailable())
            }
        }
    }
    .instrument(span)
    .await
}

pub async fn users(
    State(state): State<GatewayState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    forward(&state, Backend::Users, method, &uri, &headers, body).await.into_response()
}

pub async fn posts(
    State(state): State<GatewayState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    forward(&state, Backend::Posts, method, &uri, &headers, body).await.into_response()
}

pub async fn calculator(
    State(state): State<GatewayState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    forward(&state, Backend::Calculator, method, &uri, &headers, body).await.into_response()
}
