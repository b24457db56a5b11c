//! Service A: owns user records.
//!
//! SYSTEM CONTEXT
//! ==============
//! Public CRUD under `/api/users` and a privileged `/internal/api/users`
//! namespace used by Service B (verification) and the gateway. Only the
//! internal namespace sits behind the shared-key gate.

pub mod password;
pub mod routes;
pub mod store;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::internal_auth::require_internal_key;
use crate::server::{ServerError, healthz};
use crate::state::UsersState;
use store::{MemoryUserStore, PgUserStore, UserStore};

/// Build the Service A router.
pub fn router(state: UsersState) -> Router {
    let internal = Router::new()
        .route("/internal/api/users/verify/{user_id}", get(routes::verify_user))
        .route("/internal/api/users/batch", post(routes::users_batch))
        .route_layer(middleware::from_fn_with_state(state.internal_key.clone(), require_internal_key));

    Router::new()
        .route("/api/users", get(routes::list_users).post(routes::create_user))
        .route("/api/users/", get(routes::list_users).post(routes::create_user))
        .route("/api/users/{user_id}", get(routes::get_user))
        .merge(internal)
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Pick the store from config: Postgres when `DATABASE_URL` is set, memory otherwise.
///
/// # Errors
///
/// Returns an error if the database is configured but unreachable.
pub async fn build_state(config: &Config) -> Result<UsersState, ServerError> {
    let store: Arc<dyn UserStore> = match &config.database_url {
        Some(url) => {
            info!("users service using postgres storage");
            Arc::new(PgUserStore::connect(url).await.map_err(ServerError::Database)?)
        }
        None => {
            info!("users service using in-memory storage");
            Arc::new(MemoryUserStore::new())
        }
    };
    Ok(UsersState { store, internal_key: config.internal_key.clone() })
}
