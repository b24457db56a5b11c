//! Outbound HTTP client shared by the gateway, Service B and the façade.
//!
//! DESIGN
//! ======
//! A thin wrapper over `reqwest::Client` that owns the deadlines (every call
//! has a request and connect timeout) and classifies failures into the three
//! cases callers care about: the peer could not be reached, the peer answered
//! with a non-success status, or the peer answered with something we could
//! not decode. No retries; one attempt per call.

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderName, Method, StatusCode, header};
use axum::response::Response;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::UpstreamTimeouts;
use crate::internal_auth::{INTERNAL_KEY_HEADER, InternalKey};

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("http client build failed: {0}")]
    ClientBuild(reqwest::Error),
    #[error("upstream timed out: {0}")]
    Timeout(reqwest::Error),
    #[error("upstream unreachable: {0}")]
    Unreachable(reqwest::Error),
    #[error("upstream returned {status}")]
    Status { status: StatusCode, body: Bytes },
    #[error("upstream response decode failed: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("internal key is not a valid header value")]
    InvalidKey,
}

impl UpstreamError {
    /// Status returned by the peer, if it answered at all.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { Self::Timeout(err) } else { Self::Unreachable(err) }
    }
}

/// Buffered response from a peer service.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamResponse {
    /// Turn a non-success response into `UpstreamError::Status`.
    ///
    /// # Errors
    ///
    /// Returns the status and body when the peer did not answer 2xx.
    pub fn error_for_status(self) -> Result<Self, UpstreamError> {
        if self.status.is_success() { Ok(self) } else { Err(UpstreamError::Status { status: self.status, body: self.body }) }
    }

    /// Decode the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamError::Decode` if the body is not the expected shape.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, UpstreamError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Relay the response to our own caller unchanged, minus hop-by-hop headers.
    #[must_use]
    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = strip_hop_by_hop(&self.headers);
        response
    }
}

/// Headers that describe a single connection rather than the message.
const HOP_BY_HOP: [HeaderName; 9] = [
    header::CONNECTION,
    header::CONTENT_LENGTH,
    header::HOST,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Copy `headers` without connection-scoped entries.
#[must_use]
pub fn strip_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if HOP_BY_HOP.contains(name) || name.as_str() == "keep-alive" {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
}

impl UpstreamClient {
    /// Build a client with the configured deadlines.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new(timeouts: UpstreamTimeouts) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(timeouts.request)
            .connect_timeout(timeouts.connect)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(UpstreamError::ClientBuild)?;
        Ok(Self { http })
    }

    /// Send an arbitrary request and buffer the response, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns `Timeout` or `Unreachable` when no response was received.
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let mut request = self.http.request(method, url).headers(headers);
        if !body.is_empty() {
            request = request.body(body);
        }
        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(UpstreamResponse { status, headers, body })
    }

    /// `GET` an internal endpoint with the shared credential attached.
    ///
    /// # Errors
    ///
    /// Returns `Timeout` or `Unreachable` when no response was received.
    pub async fn get_internal(&self, url: &str, key: &InternalKey) -> Result<UpstreamResponse, UpstreamError> {
        let mut headers = HeaderMap::new();
        headers.insert(&INTERNAL_KEY_HEADER, key.header_value().map_err(|_| UpstreamError::InvalidKey)?);
        self.send(Method::GET, url, headers, Bytes::new()).await
    }

    /// `GET` a public endpoint and decode a 2xx JSON body.
    ///
    /// # Errors
    ///
    /// Returns `Status` on a non-2xx answer, `Decode` on an unexpected body.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, UpstreamError> {
        self.send(Method::GET, url, HeaderMap::new(), Bytes::new())
            .await?
            .error_for_status()?
            .json()
    }

    /// `POST` a JSON body and decode a 2xx JSON answer.
    ///
    /// # Errors
    ///
    /// Returns `Status` on a non-2xx answer, `Decode` on an unexpected body.
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(&self, url: &str, body: &B) -> Result<T, UpstreamError> {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));
        let payload = Bytes::from(serde_json::to_vec(body)?);
        self.send(Method::POST, url, headers, payload)
            .await?
            .error_for_status()?
            .json()
    }
}

#[cfg(test)]
#[path = "upstream_test.rs"]
mod tests;
