//! Query-aggregation façade.
//!
//! SYSTEM CONTEXT
//! ==============
//! `POST /query` accepts a small GraphQL-like document and answers it by
//! calling the public APIs of Service A and Service B: a user's `posts` come
//! from B, a post's `author` from A. It holds no records of its own.
//!
//! DESIGN
//! ======
//! parse (`parse`) -> validate against the static schema (`schema`) -> execute
//! with a fresh request-scoped `Loader` (`resolve`, `loader`). Anything that
//! fails before execution is a 400 with `{errors: [{message}]}`; once
//! execution starts the answer is always 200 with `data` and, if some fields
//! failed, `errors` carrying their paths.

pub mod ast;
pub mod loader;
pub mod parse;
pub mod resolve;
pub mod schema;

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::config::Config;
use crate::server::{ServerError, healthz};
use crate::state::FacadeState;
use crate::upstream::UpstreamClient;
use loader::Loader;
use resolve::Executor;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
struct Message {
    message: String,
}

/// 400 answer for a document that never reached execution.
#[derive(Debug, Serialize)]
pub struct RejectedDocument {
    errors: Vec<Message>,
}

impl RejectedDocument {
    fn new(messages: impl IntoIterator<Item = String>) -> Self {
        Self { errors: messages.into_iter().map(|message| Message { message }).collect() }
    }
}

impl IntoResponse for RejectedDocument {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(self)).into_response()
    }
}

pub fn router(state: FacadeState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/query", post(query))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// `POST /query`.
async fn query(
    State(state): State<FacadeState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<resolve::ExecutionResult>, RejectedDocument> {
    let Json(request) = payload.map_err(|rejection| RejectedDocument::new([rejection.body_text()]))?;
    let text = request
        .query
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| RejectedDocument::new(["Missing query".to_owned()]))?;

    let document = parse::parse(&text).map_err(|message| {
        debug!(%message, "query rejected by parser");
        RejectedDocument::new([message])
    })?;
    schema::validate(&document).map_err(|messages| {
        debug!(count = messages.len(), "query rejected by schema");
        RejectedDocument::new(messages)
    })?;

    let executor = Executor::new(Loader::new(state.client.clone(), state.urls.clone()));
    let result = executor.execute(&document).await;
    if !result.errors.is_empty() {
        info!(errors = result.errors.len(), "query resolved with field errors");
    }
    Ok(Json(result))
}

/// # Errors
///
/// Returns an error if the outbound HTTP client cannot be built.
pub fn build_state(config: &Config) -> Result<FacadeState, ServerError> {
    let client = UpstreamClient::new(config.timeouts)?;
    Ok(FacadeState { client, urls: Arc::new(config.urls.clone()) })
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
