//! Asset materializer
//!
//! Ensures exactly one durable copy of a remote asset exists in the configured
//! [`AssetStore`]. The storage key is `namespace/file_name`, where the file name
//! is the final path segment of the asset's origin URL. An existing key is never
//! downloaded or written again.

use crate::client::FeedClient;
use crate::config::RetryConfig;
use crate::error::{Error, Result};
use crate::retry::with_retry;
use crate::storage::{AssetStore, asset_key};
use futures::{StreamExt, stream};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// What a single materialize call did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaterializeOutcome {
    /// The key already existed; nothing was downloaded
    AlreadyPresent,
    /// The asset was downloaded and written
    Stored {
        /// Bytes written to the backend
        bytes: u64,
    },
}

/// One asset to materialize
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetJob {
    /// Origin URL of the asset
    pub url: String,
    /// Destination namespace (directory or key prefix)
    pub namespace: String,
}

impl AssetJob {
    /// Create a job for `url` under `namespace`
    pub fn new(url: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            namespace: namespace.into(),
        }
    }
}

/// Counters for a batch of materialize calls
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MaterializeSummary {
    /// Assets downloaded and written
    pub stored: usize,
    /// Assets skipped because the key already existed
    pub already_present: usize,
    /// Assets that failed after retries
    pub failed: usize,
}

/// Derive the stable file name of an asset from its origin URL
///
/// # Errors
/// [`Error::InvalidAssetUrl`] when the URL does not parse or its final path
/// segment cannot be used as a file name.
pub fn file_name_for(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|e| Error::InvalidAssetUrl(format!("{url}: {e}")))?;
    let segment = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();

    if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
        return Err(Error::InvalidAssetUrl(format!(
            "{url}: no usable file name in path"
        )));
    }
    Ok(segment.to_string())
}

/// Downloads assets into a storage backend, skipping ones already present
#[derive(Clone)]
pub struct AssetMaterializer {
    client: FeedClient,
    store: Arc<dyn AssetStore>,
    retry: RetryConfig,
}

impl AssetMaterializer {
    /// Create a materializer sharing one store handle
    pub fn new(client: FeedClient, store: Arc<dyn AssetStore>, retry: RetryConfig) -> Self {
        Self {
            client,
            store,
            retry,
        }
    }

    /// Backend this materializer writes to
    pub fn store(&self) -> &Arc<dyn AssetStore> {
        &self.store
    }

    /// Make sure `url` is stored under `namespace`
    ///
    /// Idempotent: a second call for the same asset only performs the
    /// existence check.
    pub async fn materialize(&self, url: &str, namespace: &str) -> Result<MaterializeOutcome> {
        let file_name = file_name_for(url)?;
        let key = asset_key(namespace, &file_name);

        if self.store.exists(&key).await? {
            debug!(key = %key, "Asset already present");
            return Ok(MaterializeOutcome::AlreadyPresent);
        }

        let download = self.client.fetch_asset(url).await?;
        let mime_type = mime_guess::from_path(&file_name).first_or_octet_stream();
        let bytes = self
            .store
            .put(
                &key,
                download.stream,
                download.content_length,
                mime_type.essence_str(),
            )
            .await?;

        debug!(key = %key, bytes, backend = self.store.name(), "Asset stored");
        Ok(MaterializeOutcome::Stored { bytes })
    }

    /// Materialize every job with at most `limit` in flight
    ///
    /// Each job is retried on transient errors. A job that still fails is
    /// logged and counted; it never cancels its siblings.
    pub async fn materialize_all(&self, jobs: Vec<AssetJob>, limit: usize) -> MaterializeSummary {
        let outcomes: Vec<(AssetJob, Result<MaterializeOutcome>)> = stream::iter(jobs)
            .map(|job| async move {
                let result =
                    with_retry(&self.retry, || self.materialize(&job.url, &job.namespace)).await;
                (job, result)
            })
            .buffer_unordered(limit.max(1))
            .collect()
            .await;

        let mut summary = MaterializeSummary::default();
        for (job, outcome) in outcomes {
            match outcome {
                Ok(MaterializeOutcome::Stored { .. }) => summary.stored += 1,
                Ok(MaterializeOutcome::AlreadyPresent) => summary.already_present += 1,
                Err(e) => {
                    warn!(url = %job.url, namespace = %job.namespace, error = %e, "Failed to materialize asset");
                    summary.failed += 1;
                }
            }
        }
        summary
    }
}
