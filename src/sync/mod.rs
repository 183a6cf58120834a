//! Sync driver
//!
//! Walks the feed page by page. For each page it hydrates every stub, then
//! materializes the assets of every hydrated post (known ones included, since
//! their files may be missing locally), then keeps the page's new posts.
//!
//! The walk stops after the first page whose hydrated posts include an
//! already-known one, unless `fetch_to_end` is set. Posts dropped during
//! hydration do not count, so a page where every body fetch failed never
//! stops the walk. This assumes the feed is served newest first;
//! a feed that backfills older posts behind known ones will have them missed.
//!
//! Nothing is persisted until the walk ends. Authors are unified once over the
//! whole batch, then authors and posts are upserted.

use crate::client::FeedClient;
use crate::config::{AssetNamespaces, RetryConfig, SyncConfig};
use crate::error::Result;
use crate::materializer::{AssetJob, AssetMaterializer};
use crate::normalize::{assign_order, unify_authors};
use crate::pagination::FeedMode;
use crate::retry::with_retry;
use crate::store::{PostStore, persist_batch};
use crate::types::{Post, PostStub};
use futures::{StreamExt, stream};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

mod report;

pub use report::{SyncPhase, SyncReport};

/// Collect one materialize job per distinct asset across `posts`
///
/// Images use their full-size URL, files their download URL. Cover images and
/// thumbnails are not mirrored.
pub fn asset_jobs<'a>(posts: impl IntoIterator<Item = &'a Post>, namespaces: &AssetNamespaces) -> Vec<AssetJob> {
    let mut seen = HashSet::new();
    let mut jobs = Vec::new();
    for post in posts {
        let images = post
            .body
            .images()
            .map(|image| AssetJob::new(image.original_url.clone(), namespaces.images.clone()));
        let files = post
            .body
            .files()
            .map(|file| AssetJob::new(file.url.clone(), namespaces.files.clone()));
        for job in images.chain(files) {
            if seen.insert((job.url.clone(), job.namespace.clone())) {
                jobs.push(job);
            }
        }
    }
    jobs
}

/// Orchestrates one incremental pass over the feed
pub struct SyncDriver {
    client: FeedClient,
    materializer: AssetMaterializer,
    store: Arc<dyn PostStore>,
    mode: FeedMode,
    config: SyncConfig,
    namespaces: AssetNamespaces,
    retry: RetryConfig,
}

impl SyncDriver {
    /// Assemble a driver from its collaborators
    pub fn new(
        client: FeedClient,
        materializer: AssetMaterializer,
        store: Arc<dyn PostStore>,
        mode: FeedMode,
        config: SyncConfig,
        namespaces: AssetNamespaces,
        retry: RetryConfig,
    ) -> Self {
        Self {
            client,
            materializer,
            store,
            mode,
            config,
            namespaces,
            retry,
        }
    }

    /// Run one full pass and persist what it kept
    ///
    /// # Errors
    /// Fails the whole run on a listing error that survives retries (including
    /// an undecodable page envelope) or on a persistence error. Per-post body
    /// failures and per-asset failures are logged and counted instead.
    pub async fn run(&self) -> Result<SyncReport> {
        let known = self.store.known_post_ids().await?;
        info!(known = known.len(), mode = ?self.mode, "Starting sync");

        let mut report = SyncReport::default();
        let mut kept: Vec<Post> = Vec::new();
        let mut kept_ids: HashSet<String> = HashSet::new();
        let mut cursor = self.client.start(&self.mode).await?;

        while let Some(current) = cursor.take() {
            let page_number = report.pages_fetched + 1;
            debug!(phase = %SyncPhase::FetchingPage, page = page_number);
            let page = with_retry(&self.retry, || self.client.list_page(current.clone())).await?;
            report.pages_fetched += 1;
            report.posts_listed += page.posts.len();

            if page.posts.is_empty() {
                info!(page = page_number, "Empty page, ending walk");
                break;
            }

            let listed = page.posts.len();

            debug!(phase = %SyncPhase::HydratingBodies, page = page_number, posts = listed);
            let hydrated = self.hydrate(page.posts).await;
            report.posts_dropped += listed - hydrated.len();

            // Only posts that survived hydration count; a known post that was
            // dropped for lack of a body does not end the walk
            let all_new = hydrated.iter().all(|post| !known.contains(&post.id));

            debug!(phase = %SyncPhase::DownloadingAssets, page = page_number);
            let jobs = asset_jobs(&hydrated, &self.namespaces);
            let assets = self
                .materializer
                .materialize_all(jobs, self.config.max_concurrent_assets)
                .await;
            report.add_assets(assets);

            debug!(phase = %SyncPhase::NormalizingBatch, page = page_number);
            let keep_known = self.config.fetch_to_end || self.config.re_add_known;
            let mut page_kept = 0;
            for mut post in hydrated {
                if !keep_known && known.contains(&post.id) {
                    continue;
                }
                if !kept_ids.insert(post.id.clone()) {
                    continue;
                }
                assign_order(&mut post);
                kept.push(post);
                page_kept += 1;
            }

            info!(
                page = page_number,
                listed,
                kept = page_kept,
                all_new,
                assets_stored = assets.stored,
                assets_failed = assets.failed,
                "Page processed"
            );

            if !all_new && !self.config.fetch_to_end {
                info!(page = page_number, "Reached known posts, stopping");
                report.stopped_on_known = true;
                break;
            }
            cursor = page.next;
        }

        let batch = unify_authors(kept);
        report.posts_kept = batch.posts.len();
        report.authors = batch.authors.len();

        if !batch.posts.is_empty() {
            persist_batch(self.store.as_ref(), &batch).await?;
        }

        info!(
            phase = %SyncPhase::Done,
            pages = report.pages_fetched,
            kept = report.posts_kept,
            dropped = report.posts_dropped,
            assets_stored = report.assets_stored,
            assets_failed = report.assets_failed,
            "Sync complete"
        );
        Ok(report)
    }

    /// Fetch bodies for a page, keeping listing order
    ///
    /// Stubs without a body, or whose fetch fails after retries, are dropped.
    async fn hydrate(&self, stubs: Vec<PostStub>) -> Vec<Post> {
        let limit = self.config.max_concurrent_hydrations.max(1);
        let fetched: Vec<(PostStub, Result<_>)> = stream::iter(stubs)
            .map(|stub| async move {
                let body = with_retry(&self.retry, || self.client.fetch_body(&stub.id)).await;
                (stub, body)
            })
            .buffered(limit)
            .collect()
            .await;

        fetched
            .into_iter()
            .filter_map(|(stub, body)| match body {
                Ok(Some(body)) => Some(stub.hydrate(body)),
                Ok(None) => {
                    debug!(post_id = %stub.id, "No body available, dropping post");
                    None
                }
                Err(e) => {
                    warn!(post_id = %stub.id, error = %e, "Failed to fetch post body, dropping post");
                    None
                }
            })
            .collect()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentBody, File, FlatBody, Image, StructuredBody, User};
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn namespaces() -> AssetNamespaces {
        AssetNamespaces {
            images: "images".into(),
            files: "files".into(),
        }
    }

    fn image(id: &str) -> Image {
        Image {
            id: id.into(),
            extension: "jpg".into(),
            width: 1,
            height: 1,
            original_url: format!("https://downloads.example/{id}.jpg"),
            thumbnail_url: Some(format!("https://thumbs.example/{id}.jpg")),
            order: 0,
        }
    }

    fn file(id: &str) -> File {
        File {
            id: id.into(),
            name: id.into(),
            extension: "zip".into(),
            size: 10,
            url: format!("https://downloads.example/{id}.zip"),
            order: 0,
        }
    }

    fn post(id: &str, body: ContentBody) -> Post {
        PostStub {
            id: id.into(),
            title: id.into(),
            cover_image_url: Some("https://covers.example/c.jpg".into()),
            fee_required: 0,
            published_at: Utc::now(),
            updated_at: Utc::now(),
            kind: "article".into(),
            tags: vec![],
            excerpt: String::new(),
            is_liked: false,
            like_count: 0,
            comment_count: 0,
            user: User {
                user_id: "U1".into(),
                name: "Artist".into(),
                icon_url: None,
            },
            creator_id: "artist".into(),
            has_adult_content: false,
        }
        .hydrate(body)
    }

    #[test]
    fn test_asset_jobs_cover_both_body_shapes() {
        let mut image_map = BTreeMap::new();
        image_map.insert("s1".to_string(), image("s1"));
        let mut file_map = BTreeMap::new();
        file_map.insert("f1".to_string(), file("f1"));
        let structured = post(
            "1",
            ContentBody::Structured(StructuredBody {
                image_map,
                file_map,
                ..StructuredBody::default()
            }),
        );
        let flat = post(
            "2",
            ContentBody::Flat(FlatBody {
                text: String::new(),
                images: vec![image("p1")],
                files: vec![file("f2")],
            }),
        );

        let jobs = asset_jobs([&structured, &flat], &namespaces());
        let urls: Vec<(&str, &str)> = jobs
            .iter()
            .map(|job| (job.url.as_str(), job.namespace.as_str()))
            .collect();

        assert_eq!(
            urls,
            [
                ("https://downloads.example/s1.jpg", "images"),
                ("https://downloads.example/f1.zip", "files"),
                ("https://downloads.example/p1.jpg", "images"),
                ("https://downloads.example/f2.zip", "files"),
            ]
        );
    }

    #[test]
    fn test_asset_jobs_skip_duplicates() {
        let body = || {
            ContentBody::Flat(FlatBody {
                text: String::new(),
                images: vec![image("same")],
                files: vec![],
            })
        };
        let a = post("1", body());
        let b = post("2", body());

        assert_eq!(asset_jobs([&a, &b], &namespaces()).len(), 1);
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(SyncPhase::FetchingPage.to_string(), "fetching_page");
        assert_eq!(SyncPhase::Done.to_string(), "done");
    }
}
