//! Service A handlers: public user CRUD plus the internal verify/batch API.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::{debug, error, info};

use super::password::hash_password;
use super::store::{NewUser, StoreError};
use crate::error::{ApiError, required};
use crate::models::{CreateUserRequest, User, UserBatchRequest, VerifiedUser};
use crate::state::UsersState;

const USER_NOT_FOUND: &str = "User not found";

pub(crate) fn store_error(err: StoreError) -> ApiError {
    match err {
        StoreError::Conflict(msg) => ApiError::Validation(msg.to_owned()),
        StoreError::Db(e) => {
            error!(error = %e, "user store failure");
            ApiError::Internal("Internal server error".into())
        }
    }
}

async fn find_user(state: &UsersState, user_id: i64) -> Result<User, ApiError> {
    state
        .store
        .get(user_id)
        .await
        .map_err(store_error)?
        .ok_or(ApiError::NotFound(USER_NOT_FOUND))
}

/// `GET /api/users`: list all users.
pub async fn list_users(State(state): State<UsersState>) -> Result<Json<Vec<User>>, ApiError> {
    let users = state.store.list().await.map_err(store_error)?;
    debug!(count = users.len(), "listed users");
    Ok(Json(users))
}

/// `GET /api/users/:id`: fetch one user.
pub async fn get_user(
    State(state): State<UsersState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<User>, ApiError> {
    let Path(user_id) = path?;
    Ok(Json(find_user(&state, user_id).await?))
}

/// `POST /api/users`: create a user from `{username, email, password}`.
pub async fn create_user(
    State(state): State<UsersState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let Json(body) = payload?;
    let username = required(body.username, "username")?;
    let email = required(body.email, "email")?;
    let password = required(body.password, "password")?;

    let password_hash = hash_password(&password).map_err(|e| {
        error!(error = %e, "password hashing failed");
        ApiError::Internal("Internal server error".into())
    })?;

    let user = state
        .store
        .create(NewUser { username, email, password_hash })
        .await
        .map_err(store_error)?;

    info!(user_id = user.id, username = %user.username, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

/// `GET /internal/api/users/verify/:id`: existence check for peer services.
pub async fn verify_user(
    State(state): State<UsersState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<VerifiedUser>, ApiError> {
    let Path(user_id) = path?;
    let user = find_user(&state, user_id).await?;
    debug!(user_id, "internal verify succeeded");
    Ok(Json(VerifiedUser::from(user)))
}

/// `POST /internal/api/users/batch`: resolve many ids, skipping unknown ones.
pub async fn users_batch(
    State(state): State<UsersState>,
    payload: Result<Json<UserBatchRequest>, JsonRejection>,
) -> Result<Json<Vec<User>>, ApiError> {
    let Json(body) = payload?;
    let mut users = Vec::with_capacity(body.user_ids.len());
    for id in body.user_ids {
        if let Some(user) = state.store.get(id).await.map_err(store_error)? {
            users.push(user);
        }
    }
    Ok(Json(users))
}

#[cfg(test)]
#[path = "routes_test.rs"]
mod tests;
