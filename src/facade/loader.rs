//! Request-scoped fetches against Services A and B.
//!
//! DESIGN
//! ======
//! One `Loader` per document. Every keyed read goes through a `OnceCell`
//! slot, so concurrent resolutions asking for the same user (or the same
//! author's posts) share a single outbound call and its result. Nothing
//! outlives the request; there is no cross-request cache.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::StatusCode;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

use crate::config::ServiceUrls;
use crate::error::ErrorBody;
use crate::models::{CreatePostRequest, CreateUserRequest, Post, PostView, User};
use crate::upstream::{UpstreamClient, UpstreamError};

/// Why a field could not be resolved. Rendered into the response `errors`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("User {0} not found")]
    UserNotFound(i64),
    #[error("{service} service unavailable")]
    Unavailable { service: &'static str },
    /// The service answered with an error; carries its `{error}` message.
    #[error("{0}")]
    Rejected(String),
    #[error("Unexpected response from {service} service")]
    Decode { service: &'static str },
    #[error("Missing argument \"{0}\"")]
    MissingArgument(&'static str),
}

impl QueryError {
    fn upstream(service: &'static str, err: UpstreamError) -> Self {
        match err {
            UpstreamError::Status { status, body } => {
                let message = serde_json::from_slice::<ErrorBody>(&body)
                    .map_or_else(|_| format!("{service} service answered {status}"), |b| b.error);
                Self::Rejected(message)
            }
            UpstreamError::Decode(_) => Self::Decode { service },
            _ => Self::Unavailable { service },
        }
    }
}

const USERS: &str = "Users";
const POSTS: &str = "Posts";

type Slot<T> = Arc<OnceCell<Result<T, QueryError>>>;

async fn slot<T>(slots: &Mutex<HashMap<i64, Slot<T>>>, key: i64) -> Slot<T> {
    slots.lock().await.entry(key).or_default().clone()
}

pub struct Loader {
    client: UpstreamClient,
    urls: Arc<ServiceUrls>,
    users: Mutex<HashMap<i64, Slot<Option<User>>>>,
    posts: Mutex<HashMap<i64, Slot<Option<Post>>>>,
    posts_by_user: Mutex<HashMap<i64, Slot<Vec<Post>>>>,
    all_users: Slot<Vec<User>>,
    all_posts: Slot<Vec<Post>>,
}

impl Loader {
    #[must_use]
    pub fn new(client: UpstreamClient, urls: Arc<ServiceUrls>) -> Self {
        Self {
            client,
            urls,
            users: Mutex::default(),
            posts: Mutex::default(),
            posts_by_user: Mutex::default(),
            all_users: Arc::default(),
            all_posts: Arc::default(),
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, service: &'static str, url: String) -> Result<T, QueryError> {
        debug!(%url, "facade fetch");
        self.client.get_json(&url).await.map_err(|e| QueryError::upstream(service, e))
    }

    /// Like `fetch`, but a 404 is an absent record rather than an error.
    async fn fetch_optional<T: DeserializeOwned>(
        &self,
        service: &'static str,
        url: String,
    ) -> Result<Option<T>, QueryError> {
        debug!(%url, "facade fetch");
        match self.client.get_json(&url).await {
            Ok(value) => Ok(Some(value)),
            Err(UpstreamError::Status { status, .. }) if status == StatusCode::NOT_FOUND => Ok(None),
            Err(e) => Err(QueryError::upstream(service, e)),
        }
    }

    pub async fn users(&self) -> Result<Vec<User>, QueryError> {
        let url = format!("{}/api/users", self.urls.users);
        self.all_users.get_or_init(|| self.fetch(USERS, url)).await.clone()
    }

    pub async fn posts(&self) -> Result<Vec<Post>, QueryError> {
        let url = format!("{}/api/posts", self.urls.posts);
        self.all_posts.get_or_init(|| self.fetch(POSTS, url)).await.clone()
    }

    pub async fn user(&self, id: i64) -> Result<Option<User>, QueryError> {
        let url = format!("{}/api/users/{id}", self.urls.users);
        slot(&self.users, id).await.get_or_init(|| self.fetch_optional(USERS, url)).await.clone()
    }

    pub async fn post(&self, id: i64) -> Result<Option<Post>, QueryError> {
        let url = format!("{}/api/posts/{id}", self.urls.posts);
        slot(&self.posts, id).await.get_or_init(|| self.fetch_optional(POSTS, url)).await.clone()
    }

    pub async fn posts_by_user(&self, user_id: i64) -> Result<Vec<Post>, QueryError> {
        let url = format!("{}/api/users/{user_id}/posts", self.urls.posts);
        slot(&self.posts_by_user, user_id).await.get_or_init(|| self.fetch(POSTS, url)).await.clone()
    }

    /// Seed the user slot with a record another call already returned.
    async fn prime_user(&self, user: User) {
        let id = user.id;
        slot(&self.users, id).await.set(Ok(Some(user))).ok();
    }

    pub async fn create_user(&self, body: &CreateUserRequest) -> Result<User, QueryError> {
        let url = format!("{}/api/users", self.urls.users);
        let user: User = self.client.post_json(&url, body).await.map_err(|e| QueryError::upstream(USERS, e))?;
        self.prime_user(user.clone()).await;
        Ok(user)
    }

    /// Service B answers with the verified author attached; keep it for `Post.author`.
    pub async fn create_post(&self, body: &CreatePostRequest) -> Result<Post, QueryError> {
        let url = format!("{}/api/posts", self.urls.posts);
        let created: PostView = self.client.post_json(&url, body).await.map_err(|e| QueryError::upstream(POSTS, e))?;
        if let Some(author) = created.author {
            self.prime_user(User { id: author.id, username: author.username, email: author.email }).await;
        }
        Ok(created.post)
    }
}
