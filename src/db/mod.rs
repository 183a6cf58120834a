//! Database layer for feed-mirror
//!
//! SQLite persistence for mirrored posts and their authors.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`users`] - Author upserts and listing
//! - [`posts`] - Post upserts, read-back and the notification flag
//!
//! [`Database`] implements [`PostStore`](crate::store::PostStore) by
//! delegating to these methods.

use crate::error::Result;
use crate::store::{PostStore, StoredPost};
use crate::types::{Post, User};
use async_trait::async_trait;
use sqlx::{FromRow, sqlite::SqlitePool};
use std::collections::HashSet;

mod migrations;
mod posts;
mod users;

/// Author record from database
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    /// Platform-assigned identity
    pub user_id: String,
    /// Display name
    pub name: String,
    /// Avatar URL
    pub icon_url: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            user_id: row.user_id,
            name: row.name,
            icon_url: row.icon_url,
        }
    }
}

/// Post record joined with its author (raw from SQLite)
#[derive(Debug, Clone, FromRow)]
pub struct PostRow {
    /// Post identity
    pub id: String,
    /// Post title
    pub title: String,
    /// Cover image URL
    pub cover_image_url: Option<String>,
    /// Minimum plan fee
    pub fee_required: i64,
    /// Publication time, Unix milliseconds
    pub published_at: i64,
    /// Last edit time, Unix milliseconds
    pub updated_at: i64,
    /// Post kind
    pub kind: String,
    /// Tags as a JSON array
    pub tags_json: String,
    /// Short excerpt
    pub excerpt: String,
    /// Liked by the session user
    pub is_liked: bool,
    /// Like counter
    pub like_count: i64,
    /// Comment counter
    pub comment_count: i64,
    /// Author id
    pub user_id: String,
    /// Author display name
    pub user_name: String,
    /// Author avatar URL
    pub user_icon_url: Option<String>,
    /// Creator handle
    pub creator_id: String,
    /// Adult content flag
    pub has_adult_content: bool,
    /// Content body as JSON
    pub body_json: String,
    /// Notification flag
    pub sent: bool,
}

/// Database handle for feed-mirror
pub struct Database {
    pool: SqlitePool,
}

#[async_trait]
impl PostStore for Database {
    async fn known_post_ids(&self) -> Result<HashSet<String>> {
        self.list_post_ids().await
    }

    async fn known_users(&self) -> Result<Vec<User>> {
        self.list_users().await
    }

    async fn upsert_user(&self, user: &User) -> Result<()> {
        self.save_user(user).await
    }

    async fn upsert_post(&self, post: &Post) -> Result<()> {
        self.save_post(post).await
    }

    async fn unsent_posts(&self) -> Result<Vec<StoredPost>> {
        self.list_unsent_posts().await
    }

    async fn mark_sent(&self, post_id: &str) -> Result<bool> {
        self.set_sent(post_id).await
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
