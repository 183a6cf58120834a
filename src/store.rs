//! Persistence collaborator interface
//!
//! The sync driver only needs a handful of operations from the record store:
//! the known-id snapshot, author and post upserts, and the notification-side
//! queries. [`Database`](crate::db::Database) is the SQLite implementation.

use crate::error::Result;
use crate::normalize::Batch;
use crate::types::{Post, User};
use async_trait::async_trait;
use std::collections::HashSet;
use tracing::{debug, info};

/// A post as persisted, with its notification flag
#[derive(Clone, Debug, PartialEq)]
pub struct StoredPost {
    /// The stored post
    pub post: Post,
    /// Whether the notification dispatcher already announced it
    pub sent: bool,
}

/// Record store for posts and their authors
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Ids of every stored post
    async fn known_post_ids(&self) -> Result<HashSet<String>>;

    /// Every stored author
    async fn known_users(&self) -> Result<Vec<User>>;

    /// Insert an author or overwrite its name and icon
    async fn upsert_user(&self, user: &User) -> Result<()>;

    /// Insert a post or rewrite it in place
    ///
    /// Never deletes, and keeps the existing `sent` flag so a re-sync does
    /// not announce a post twice.
    async fn upsert_post(&self, post: &Post) -> Result<()>;

    /// Posts not yet announced, oldest publication first
    async fn unsent_posts(&self) -> Result<Vec<StoredPost>>;

    /// Flag a post as announced; returns false if the id is unknown
    async fn mark_sent(&self, post_id: &str) -> Result<bool>;
}

/// Counts from one [`persist_batch`] call
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PersistSummary {
    /// Authors that were not stored before
    pub users_inserted: usize,
    /// Authors that already existed and were refreshed
    pub users_updated: usize,
    /// Posts written
    pub posts_written: usize,
}

/// Write a normalized batch: authors first, then posts
pub async fn persist_batch(store: &dyn PostStore, batch: &Batch) -> Result<PersistSummary> {
    let known: HashSet<String> = store
        .known_users()
        .await?
        .into_iter()
        .map(|user| user.user_id)
        .collect();

    let mut summary = PersistSummary::default();
    for author in &batch.authors {
        if known.contains(&author.user_id) {
            summary.users_updated += 1;
        } else {
            summary.users_inserted += 1;
        }
        store.upsert_user(author).await?;
    }

    for post in &batch.posts {
        debug!(post_id = %post.id, "Persisting post");
        store.upsert_post(post).await?;
        summary.posts_written += 1;
    }

    info!(
        users_inserted = summary.users_inserted,
        users_updated = summary.users_updated,
        posts = summary.posts_written,
        "Batch persisted"
    );
    Ok(summary)
}
