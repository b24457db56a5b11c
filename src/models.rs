//! Shapes that cross service boundaries.
//!
//! Field names follow the JSON each service emits (`authorId`,
//! `randomNumber`), so every struct here is the single source of truth for
//! its wire format on both the producing and the consuming side.

use serde::{Deserialize, Serialize};

// =============================================================================
// USERS
// =============================================================================

/// Public user record owned by Service A.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
}

/// Answer of Service A's internal verify endpoint.
///
/// `verified` is derived: it is `true` whenever the user exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub verified: bool,
}

impl From<User> for VerifiedUser {
    fn from(user: User) -> Self {
        Self { id: user.id, username: user.username, email: user.email, verified: true }
    }
}

/// Body of `POST /api/users`. Fields are optional so absence can be reported
/// as a 400 naming the field rather than a generic decode failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Body of `POST /internal/api/users/batch`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserBatchRequest {
    #[serde(default)]
    pub user_ids: Vec<i64>,
}

// =============================================================================
// POSTS
// =============================================================================

/// Post record owned by Service B.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub author_id: i64,
}

/// A post as returned to callers, optionally enriched with its verified author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<VerifiedUser>,
}

impl PostView {
    #[must_use]
    pub fn with_author(post: Post, author: VerifiedUser) -> Self {
        Self { post, author: Some(author) }
    }
}

/// Body of `POST /api/posts`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub author_id: Option<i64>,
}

// =============================================================================
// CALCULATOR
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResult {
    pub number1: i32,
    pub number2: i32,
    pub sum: i64,
    pub random_number: u32,
    pub timestamp: String,
}
