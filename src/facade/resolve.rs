//! Document execution.
//!
//! Sibling fields of a query resolve concurrently; root mutation fields run
//! one after another in document order. A field that fails resolves to
//! `null` and records an error carrying its path, so one missing author does
//! not take the rest of the response down with it.

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tokio::sync::Mutex;

use super::ast::{Document, Field, Literal, Operation};
use super::loader::{Loader, QueryError};
use crate::models::{CreatePostRequest, CreateUserRequest, Post, User};

/// One entry of the response `errors` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub message: String,
    pub path: Vec<Value>,
}

/// Body of a `/query` answer for a valid document.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub data: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

/// The object a selection set is applied to.
enum Parent {
    Root,
    User(User),
    Post(Post),
}

fn child(path: &[Value], segment: impl Into<Value>) -> Vec<Value> {
    let mut out = path.to_vec();
    out.push(segment.into());
    out
}

fn int_arg(field: &Field, name: &'static str) -> Result<i64, QueryError> {
    match field.argument(name) {
        Some(Literal::Int(n)) => Ok(*n),
        _ => Err(QueryError::MissingArgument(name)),
    }
}

fn str_arg(field: &Field, name: &'static str) -> Result<String, QueryError> {
    match field.argument(name) {
        Some(Literal::Str(s)) => Ok(s.clone()),
        _ => Err(QueryError::MissingArgument(name)),
    }
}

pub struct Executor {
    loader: Loader,
    errors: Mutex<Vec<FieldError>>,
}

impl Executor {
    #[must_use]
    pub fn new(loader: Loader) -> Self {
        Self { loader, errors: Mutex::default() }
    }

    /// Run a validated document.
    pub async fn execute(self, document: &Document) -> ExecutionResult {
        let root = Parent::Root;
        let data = match document.operation {
            Operation::Query => self.resolve_object(&root, &document.selection, Vec::new()).await,
            Operation::Mutation => {
                let mut data = Map::new();
                for field in &document.selection {
                    let value = self.resolve_field(&root, field, vec![Value::from(field.name.as_str())]).await;
                    data.insert(field.name.clone(), value);
                }
                Value::Object(data)
            }
        };
        ExecutionResult { data, errors: self.errors.into_inner() }
    }

    fn resolve_object<'a>(&'a self, parent: &'a Parent, selection: &'a [Field], path: Vec<Value>) -> BoxFuture<'a, Value> {
        async move {
            let values = join_all(
                selection
                    .iter()
                    .map(|field| self.resolve_field(parent, field, child(&path, field.name.as_str()))),
            )
            .await;
            Value::Object(selection.iter().map(|f| f.name.clone()).zip(values).collect())
        }
        .boxed()
    }

    fn resolve_field<'a>(&'a self, parent: &'a Parent, field: &'a Field, path: Vec<Value>) -> BoxFuture<'a, Value> {
        async move {
            match self.field_value(parent, field, &path).await {
                Ok(value) => value,
                Err(e) => {
                    self.errors.lock().await.push(FieldError { message: e.to_string(), path });
                    Value::Null
                }
            }
        }
        .boxed()
    }

    async fn user_object(&self, user: User, selection: &[Field], path: Vec<Value>) -> Value {
        self.resolve_object(&Parent::User(user), selection, path).await
    }

    async fn post_object(&self, post: Post, selection: &[Field], path: Vec<Value>) -> Value {
        self.resolve_object(&Parent::Post(post), selection, path).await
    }

    async fn user_list(&self, users: Vec<User>, selection: &[Field], path: &[Value]) -> Value {
        let items = users
            .into_iter()
            .enumerate()
            .map(|(i, user)| self.user_object(user, selection, child(path, i)));
        Value::Array(join_all(items).await)
    }

    async fn post_list(&self, posts: Vec<Post>, selection: &[Field], path: &[Value]) -> Value {
        let items = posts
            .into_iter()
            .enumerate()
            .map(|(i, post)| self.post_object(post, selection, child(path, i)));
        Value::Array(join_all(items).await)
    }

    async fn field_value(&self, parent: &Parent, field: &Field, path: &[Value]) -> Result<Value, QueryError> {
        let selection = &field.selection;
        let value = match (parent, field.name.as_str()) {
            // Query roots.
            (Parent::Root, "users") => self.user_list(self.loader.users().await?, selection, path).await,
            (Parent::Root, "posts") => self.post_list(self.loader.posts().await?, selection, path).await,
            (Parent::Root, "user") => match self.loader.user(int_arg(field, "id")?).await? {
                Some(user) => self.user_object(user, selection, path.to_vec()).await,
                None => Value::Null,
            },
            (Parent::Root, "post") => match self.loader.post(int_arg(field, "id")?).await? {
                Some(post) => self.post_object(post, selection, path.to_vec()).await,
                None => Value::Null,
            },

            // Mutation roots.
            (Parent::Root, "createUser") => {
                let body = CreateUserRequest {
                    username: Some(str_arg(field, "username")?),
                    email: Some(str_arg(field, "email")?),
                    password: Some(str_arg(field, "password")?),
                };
                let user = self.loader.create_user(&body).await?;
                self.user_object(user, selection, path.to_vec()).await
            }
            (Parent::Root, "createPost") => {
                let body = CreatePostRequest {
                    title: Some(str_arg(field, "title")?),
                    content: Some(str_arg(field, "content")?),
                    author_id: Some(int_arg(field, "authorId")?),
                };
                let post = self.loader.create_post(&body).await?;
                self.post_object(post, selection, path.to_vec()).await
            }

            (Parent::User(user), "id") => json!(user.id),
            (Parent::User(user), "username") => json!(user.username),
            (Parent::User(user), "email") => json!(user.email),
            (Parent::User(user), "posts") => {
                self.post_list(self.loader.posts_by_user(user.id).await?, selection, path).await
            }

            (Parent::Post(post), "id") => json!(post.id),
            (Parent::Post(post), "title") => json!(post.title),
            (Parent::Post(post), "content") => json!(post.content),
            (Parent::Post(post), "authorId") => json!(post.author_id),
            (Parent::Post(post), "author") => match self.loader.user(post.author_id).await? {
                Some(user) => self.user_object(user, selection, path.to_vec()).await,
                None => return Err(QueryError::UserNotFound(post.author_id)),
            },

            // Unreachable after validation.
            _ => Value::Null,
        };
        Ok(value)
    }
}
