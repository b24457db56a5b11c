//! Internal authentication gate for service-to-service routes.
//!
//! DESIGN
//! ======
//! One shared secret per deployment, presented in `X-Internal-API-Key`.
//! The gate is binary: the header either matches the configured key or the
//! request is rejected with 401 before the wrapped handler runs. There is no
//! notion of caller identity or per-operation scope.

use std::fmt;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::ApiError;

pub static INTERNAL_KEY_HEADER: HeaderName = HeaderName::from_static("x-internal-api-key");

/// Key used when `INTERNAL_API_KEY` is not configured. Development only.
pub const DEV_INTERNAL_KEY: &str = "dev_internal_key_123";

/// The shared internal credential. `Debug` never prints the secret.
#[derive(Clone)]
pub struct InternalKey(Arc<str>);

impl InternalKey {
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self(Arc::from(secret))
    }

    /// Constant-time comparison against a presented credential.
    #[must_use]
    pub fn matches(&self, presented: &[u8]) -> bool {
        self.0.as_bytes().ct_eq(presented).into()
    }

    /// Header value for outbound internal calls.
    ///
    /// # Errors
    ///
    /// Fails if the configured secret contains bytes not allowed in a header.
    pub fn header_value(&self) -> Result<HeaderValue, axum::http::header::InvalidHeaderValue> {
        let mut value = HeaderValue::from_str(&self.0)?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Debug for InternalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InternalKey(<redacted>)")
    }
}

/// Middleware guarding `/internal` routes.
///
/// Install with `axum::middleware::from_fn_with_state(key, require_internal_key)`
/// as a `route_layer` so unmatched paths still 404.
pub async fn require_internal_key(State(key): State<InternalKey>, request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(&INTERNAL_KEY_HEADER)
        .is_some_and(|value| key.matches(value.as_bytes()));

    if !authorized {
        warn!(method = %request.method(), path = %request.uri().path(), "rejected internal call");
        return ApiError::Unauthorized.into_response();
    }

    next.run(request).await
}

#[cfg(test)]
#[path = "internal_auth_test.rs"]
mod tests;
