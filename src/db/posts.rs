//! Post persistence and the notification flag.

use crate::store::StoredPost;
use crate::types::{Post, User};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;

use super::{Database, PostRow};

const SELECT_POST: &str = r#"
    SELECT p.id, p.title, p.cover_image_url, p.fee_required, p.published_at,
           p.updated_at, p.kind, p.tags_json, p.excerpt, p.is_liked,
           p.like_count, p.comment_count, p.user_id,
           u.name AS user_name, u.icon_url AS user_icon_url,
           p.creator_id, p.has_adult_content, p.body_json, p.sent
    FROM posts p
    JOIN users u ON u.user_id = p.user_id
"#;

fn timestamp_from_millis(millis: i64, column: &str) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| Error::Other(format!("{} out of range: {}", column, millis)))
}

fn count_from_column(value: i64, column: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::Other(format!("{} out of range: {}", column, value)))
}

impl TryFrom<PostRow> for StoredPost {
    type Error = Error;

    fn try_from(row: PostRow) -> Result<Self> {
        let post = Post {
            id: row.id,
            title: row.title,
            cover_image_url: row.cover_image_url,
            fee_required: count_from_column(row.fee_required, "fee_required")?,
            published_at: timestamp_from_millis(row.published_at, "published_at")?,
            updated_at: timestamp_from_millis(row.updated_at, "updated_at")?,
            kind: row.kind,
            tags: serde_json::from_str(&row.tags_json)?,
            excerpt: row.excerpt,
            is_liked: row.is_liked,
            like_count: count_from_column(row.like_count, "like_count")?,
            comment_count: count_from_column(row.comment_count, "comment_count")?,
            user: Arc::new(User {
                user_id: row.user_id,
                name: row.user_name,
                icon_url: row.user_icon_url,
            }),
            creator_id: row.creator_id,
            has_adult_content: row.has_adult_content,
            body: serde_json::from_str(&row.body_json)?,
        };
        Ok(StoredPost {
            post,
            sent: row.sent,
        })
    }
}

impl Database {
    /// Insert a post, or rewrite every field except `sent` and `first_seen_at`
    ///
    /// The author must already be stored.
    pub async fn save_post(&self, post: &Post) -> Result<()> {
        let now = Utc::now().timestamp();
        let tags_json = serde_json::to_string(&post.tags)?;
        let body_json = serde_json::to_string(&post.body)?;

        sqlx::query(
            r#"
            INSERT INTO posts (
                id, title, cover_image_url, fee_required, published_at, updated_at,
                kind, tags_json, excerpt, is_liked, like_count, comment_count,
                user_id, creator_id, has_adult_content, body_json,
                sent, first_seen_at, last_synced_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                cover_image_url = excluded.cover_image_url,
                fee_required = excluded.fee_required,
                published_at = excluded.published_at,
                updated_at = excluded.updated_at,
                kind = excluded.kind,
                tags_json = excluded.tags_json,
                excerpt = excluded.excerpt,
                is_liked = excluded.is_liked,
                like_count = excluded.like_count,
                comment_count = excluded.comment_count,
                user_id = excluded.user_id,
                creator_id = excluded.creator_id,
                has_adult_content = excluded.has_adult_content,
                body_json = excluded.body_json,
                last_synced_at = excluded.last_synced_at
            "#,
        )
        .bind(&post.id)
        .bind(&post.title)
        .bind(&post.cover_image_url)
        .bind(i64::from(post.fee_required))
        .bind(post.published_at.timestamp_millis())
        .bind(post.updated_at.timestamp_millis())
        .bind(&post.kind)
        .bind(tags_json)
        .bind(&post.excerpt)
        .bind(post.is_liked)
        .bind(i64::from(post.like_count))
        .bind(i64::from(post.comment_count))
        .bind(&post.user.user_id)
        .bind(&post.creator_id)
        .bind(post.has_adult_content)
        .bind(body_json)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(())
    }

    /// Ids of every stored post
    pub async fn list_post_ids(&self) -> Result<HashSet<String>> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM posts")
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Sqlx)?;

        Ok(ids.into_iter().collect())
    }

    /// Read back one post with its author and notification flag
    pub async fn get_post(&self, id: &str) -> Result<Option<StoredPost>> {
        let row = sqlx::query_as::<_, PostRow>(&format!("{SELECT_POST} WHERE p.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Sqlx)?;

        row.map(StoredPost::try_from).transpose()
    }

    /// Posts whose notification has not gone out, oldest publication first
    pub async fn list_unsent_posts(&self) -> Result<Vec<StoredPost>> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "{SELECT_POST} WHERE p.sent = 0 ORDER BY p.published_at ASC, p.id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        rows.into_iter().map(StoredPost::try_from).collect()
    }

    /// Flag a post as announced
    ///
    /// Returns `false` when no post has that id.
    pub async fn set_sent(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE posts SET sent = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Sqlx)?;

        Ok(result.rows_affected() > 0)
    }

    /// Number of stored posts
    pub async fn count_posts(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Sqlx)?;

        Ok(count)
    }
}
