//! In-memory, append-only post table.
//!
//! Referential integrity with Service A is not checked here; `insert` only
//! accepts a `VerifiedDraft`, which carries that guarantee.

use std::sync::Arc;

use tokio::sync::RwLock;

use super::verify::VerifiedDraft;
use crate::models::{Post, PostView};

#[derive(Default)]
struct PostTable {
    rows: Vec<Post>,
    next_id: i64,
}

#[derive(Clone, Default)]
pub struct PostStore {
    table: Arc<RwLock<PostTable>>,
}

impl PostStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase two of post creation: persist and return the post with its author.
    pub async fn insert(&self, verified: VerifiedDraft) -> PostView {
        let (draft, author) = verified.into_parts();
        let mut table = self.table.write().await;
        table.next_id += 1;
        let post = Post { id: table.next_id, title: draft.title, content: draft.content, author_id: draft.author_id };
        table.rows.push(post.clone());
        PostView::with_author(post, author)
    }

    pub async fn get(&self, id: i64) -> Option<Post> {
        let table = self.table.read().await;
        table.rows.iter().find(|p| p.id == id).cloned()
    }

    pub async fn list(&self) -> Vec<Post> {
        self.table.read().await.rows.clone()
    }

    pub async fn by_author(&self, author_id: i64) -> Vec<Post> {
        let table = self.table.read().await;
        table.rows.iter().filter(|p| p.author_id == author_id).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }
}
