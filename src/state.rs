//! Per-service application state.
//!
//! DESIGN
//! ======
//! Each service gets its own state struct, injected into Axum handlers via
//! the `State` extractor. Clone is required by Axum, so every field is either
//! `Arc`-wrapped or cheap to clone. The only mutable data lives in the record
//! stores; everything else is fixed at startup.

use std::sync::Arc;

use crate::config::ServiceUrls;
use crate::internal_auth::InternalKey;
use crate::posts::store::PostStore;
use crate::posts::verify::AuthorVerifier;
use crate::upstream::UpstreamClient;
use crate::users::store::UserStore;

/// Service A.
#[derive(Clone)]
pub struct UsersState {
    pub store: Arc<dyn UserStore>,
    pub internal_key: InternalKey,
}

/// Service B. The verifier is the only path to Service A.
#[derive(Clone)]
pub struct PostsState {
    pub store: PostStore,
    pub verifier: Arc<dyn AuthorVerifier>,
    pub internal_key: InternalKey,
}

/// Public gateway.
#[derive(Clone)]
pub struct GatewayState {
    pub client: UpstreamClient,
    pub urls: Arc<ServiceUrls>,
    pub internal_key: InternalKey,
}

/// Query-aggregation façade.
#[derive(Clone)]
pub struct FacadeState {
    pub client: UpstreamClient,
    pub urls: Arc<ServiceUrls>,
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use std::time::Duration;

    use axum::Router;
    use axum::body::Body;
    use axum::extract::Request;
    use axum::http::{Method, StatusCode, header};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::config::UpstreamTimeouts;
    use crate::internal_auth::INTERNAL_KEY_HEADER;
    use crate::models::User;
    use crate::posts::verify::UsersServiceVerifier;
    use crate::users::store::{MemoryUserStore, NewUser};

    pub const TEST_KEY: &str = "test-internal-key";

    #[must_use]
    pub fn test_key() -> InternalKey {
        InternalKey::new(TEST_KEY)
    }

    /// Client with short deadlines so failure tests stay fast.
    #[must_use]
    pub fn test_client() -> UpstreamClient {
        UpstreamClient::new(UpstreamTimeouts { request: Duration::from_secs(2), connect: Duration::from_secs(1) })
            .expect("client should build")
    }

    /// Drive one request through `app` in-process and decode the JSON answer.
    pub async fn send(
        app: Router,
        method: Method,
        uri: &str,
        key: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(key) = key {
            builder = builder.header(&INTERNAL_KEY_HEADER, key);
        }
        let body = match body {
            Some(v) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let response = app.oneshot(builder.body(body).expect("request")).await.expect("infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).expect("json body") };
        (status, value)
    }

    /// Serve `router` on an ephemeral localhost port and return its base URL.
    pub async fn spawn_router(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });
        format!("http://{addr}")
    }

    /// A base URL nothing is listening on.
    #[must_use]
    pub fn unreachable_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);
        format!("http://{addr}")
    }

    #[must_use]
    pub fn urls(users: &str, posts: &str, calculator: &str) -> Arc<ServiceUrls> {
        Arc::new(ServiceUrls { users: users.to_owned(), posts: posts.to_owned(), calculator: calculator.to_owned() })
    }

    #[must_use]
    pub fn users_state() -> UsersState {
        UsersState { store: Arc::new(MemoryUserStore::new()), internal_key: test_key() }
    }

    /// Insert a user directly into a users-service store.
    pub async fn seed_user(state: &UsersState, username: &str) -> User {
        state
            .store
            .create(NewUser {
                username: username.to_owned(),
                email: format!("{username}@example.com"),
                password_hash: "x".into(),
            })
            .await
            .expect("seed user")
    }

    /// Posts state wired to a live users service at `users_url`.
    #[must_use]
    pub fn posts_state(users_url: &str) -> PostsState {
        let verifier = UsersServiceVerifier::new(test_client(), users_url, test_key());
        PostsState { store: PostStore::new(), verifier: Arc::new(verifier), internal_key: test_key() }
    }

    /// Start a users service with the given usernames seeded (ids 1..).
    pub async fn spawn_users_service(usernames: &[&str]) -> (String, UsersState) {
        let state = users_state();
        for name in usernames {
            seed_user(&state, name).await;
        }
        let url = spawn_router(crate::users::router(state.clone())).await;
        (url, state)
    }

    /// Start a posts service verifying against `users_url`.
    pub async fn spawn_posts_service(users_url: &str) -> (String, PostsState) {
        let state = posts_state(users_url);
        let url = spawn_router(crate::posts::router(state.clone())).await;
        (url, state)
    }
}
