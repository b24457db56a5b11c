//! User storage behind a narrow async interface.
//!
//! DESIGN
//! ======
//! `MemoryUserStore` is the default and what the tests run against.
//! `PgUserStore` is selected when `DATABASE_URL` is set. Both enforce unique
//! usernames and emails and assign ids from 1 upward.

use std::sync::Arc;

use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tokio::sync::RwLock;

use crate::models::User;

/// A user ready to be inserted. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    Conflict(&'static str),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;
    async fn get(&self, id: i64) -> Result<Option<User>, StoreError>;
    async fn list(&self) -> Result<Vec<User>, StoreError>;
}

// =============================================================================
// IN-MEMORY
// =============================================================================

/// Mirrors the `users` table row, hash included, so both stores persist the
/// same columns. Nothing in the service authenticates against it yet.
struct StoredUser {
    user: User,
    #[cfg_attr(not(test), allow(dead_code))]
    password_hash: String,
}

#[derive(Default)]
struct UserTable {
    rows: Vec<StoredUser>,
    next_id: i64,
}

#[derive(Clone, Default)]
pub struct MemoryUserStore {
    table: Arc<RwLock<UserTable>>,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut table = self.table.write().await;
        if table.rows.iter().any(|r| r.user.username == user.username) {
            return Err(StoreError::Conflict("Username already exists"));
        }
        if table.rows.iter().any(|r| r.user.email == user.email) {
            return Err(StoreError::Conflict("Email already exists"));
        }

        table.next_id += 1;
        let created = User { id: table.next_id, username: user.username, email: user.email };
        table.rows.push(StoredUser { user: created.clone(), password_hash: user.password_hash });
        Ok(created)
    }

    async fn get(&self, id: i64) -> Result<Option<User>, StoreError> {
        let table = self.table.read().await;
        Ok(table.rows.iter().find(|r| r.user.id == id).map(|r| r.user.clone()))
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let table = self.table.read().await;
        Ok(table.rows.iter().map(|r| r.user.clone()).collect())
    }
}

#[cfg(test)]
impl MemoryUserStore {
    pub async fn password_hash(&self, id: i64) -> Option<String> {
        let table = self.table.read().await;
        table.rows.iter().find(|r| r.user.id == id).map(|r| r.password_hash.clone())
    }
}

// =============================================================================
// POSTGRES
// =============================================================================

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Connect and run the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or migrations fail.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

fn user_from_row(row: &PgRow) -> User {
    User { id: row.get("id"), username: row.get("username"), email: row.get("email") }
}

fn conflict_from(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return match db_err.constraint() {
                Some(c) if c.contains("email") => StoreError::Conflict("Email already exists"),
                _ => StoreError::Conflict("Username already exists"),
            };
        }
    }
    StoreError::Db(err)
}

#[async_trait::async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let row = sqlx::query(
            r"INSERT INTO users (username, email, password_hash)
              VALUES ($1, $2, $3)
              RETURNING id, username, email",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(conflict_from)?;
        Ok(user_from_row(&row))
    }

    async fn get(&self, id: i64) -> Result<Option<User>, StoreError> {
        let row = sqlx::query("SELECT id, username, email FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query("SELECT id, username, email FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(user_from_row).collect())
    }
}
