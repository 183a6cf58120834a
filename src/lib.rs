//! # feed-mirror
//!
//! Incremental mirror for paginated creator feeds.
//!
//! Each pass walks the remote feed newest first, hydrates post bodies, copies
//! every referenced image and file into a storage backend exactly once, and
//! upserts the new posts and their authors into SQLite.
//!
//! ## Design Philosophy
//!
//! feed-mirror is designed to be:
//! - **Incremental** - A pass stops at the first page holding posts it already has
//! - **Idempotent** - Re-running against an unchanged feed writes no new assets and no duplicates
//! - **Failure-isolated** - One broken post or asset never aborts the pass
//!
//! ## Quick Start
//!
//! ```no_run
//! use feed_mirror::{Config, FeedMirror};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.remote.session_id = "session-cookie-value".to_string();
//!
//!     let mirror = FeedMirror::new(config).await?;
//!     let report = mirror.run_once().await?;
//!     println!("kept {} new posts", report.posts_kept);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Remote feed HTTP client
pub mod client;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// Asset download into storage backends
pub mod materializer;
/// Author unification and order stamping
pub mod normalize;
/// Feed pagination cursors
pub mod pagination;
/// Retry logic with exponential backoff
pub mod retry;
/// Asset storage backends
pub mod storage;
/// Persistence interface
pub mod store;
/// Sync driver
pub mod sync;
/// Core feed types
pub mod types;

// Re-export commonly used types
pub use client::FeedClient;
pub use config::{Config, StorageBackend};
pub use db::Database;
pub use error::{DatabaseError, Error, Result};
pub use materializer::{AssetMaterializer, MaterializeOutcome};
pub use pagination::FeedMode;
pub use storage::{AssetStore, FilesystemStore, S3Store};
pub use store::{PostStore, StoredPost};
pub use sync::{SyncDriver, SyncPhase, SyncReport};
pub use types::{ContentBody, Post, PostStub, User};

use std::sync::Arc;

/// A configured mirror: feed client, asset store and database wired together
pub struct FeedMirror {
    config: Config,
    db: Arc<Database>,
    driver: SyncDriver,
}

impl FeedMirror {
    /// Validate `config` and open every collaborator
    ///
    /// The object store client, when configured, is created here once and
    /// shared by all uploads.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let client = FeedClient::new(&config.remote)?;
        let assets = storage::build_asset_store(&config.assets).await?;
        let db = Arc::new(Database::new(&config.persistence.database_path).await?);

        let materializer = AssetMaterializer::new(client.clone(), assets, config.retry.clone());
        let store: Arc<dyn PostStore> = db.clone();
        let driver = SyncDriver::new(
            client,
            materializer,
            store,
            FeedMode::from_config(&config.remote),
            config.sync.clone(),
            config.assets.namespaces(),
            config.retry.clone(),
        );

        tracing::info!(
            backend = ?config.assets.storage,
            database = %config.persistence.database_path.display(),
            "Feed mirror ready"
        );

        Ok(Self { config, db, driver })
    }

    /// Run a single pass over the feed
    pub async fn run_once(&self) -> Result<SyncReport> {
        self.driver.run().await
    }

    /// Run a pass every `sync.poll_interval`, forever
    ///
    /// A failed pass is logged and the next one is attempted on schedule.
    ///
    /// # Errors
    /// Returns a config error if no poll interval is configured.
    pub async fn run_forever(&self) -> Result<()> {
        let interval = self.config.sync.poll_interval.ok_or_else(|| {
            Error::config(
                "sync.poll_interval",
                "a poll interval is required to run continuously",
            )
        })?;

        loop {
            match self.run_once().await {
                Ok(report) => {
                    tracing::info!(
                        kept = report.posts_kept,
                        assets_stored = report.assets_stored,
                        "Pass finished"
                    );
                }
                Err(e) if e.is_fatal_for_run() => {
                    tracing::error!(error = %e, "Pass aborted");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Pass failed");
                }
            }

            tracing::debug!(interval_secs = interval.as_secs(), "Waiting for next pass");
            tokio::time::sleep(interval).await;
        }
    }

    /// Database holding the mirrored posts
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Configuration the mirror was built from
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Helper function to poll the feed until a termination signal arrives.
///
/// Runs [`FeedMirror::run_forever`] and returns once a signal is received. A
/// pass in progress at that moment is abandoned; nothing from it is persisted.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use feed_mirror::{Config, FeedMirror, run_with_shutdown};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut config = Config::default();
///     config.remote.session_id = "session-cookie-value".to_string();
///     config.sync.poll_interval = Some(Duration::from_secs(600));
///
///     let mirror = FeedMirror::new(config).await?;
///     run_with_shutdown(&mirror).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(mirror: &FeedMirror) -> Result<()> {
    tokio::select! {
        result = mirror.run_forever() => result,
        _ = wait_for_signal() => {
            tracing::info!("Shutting down");
            Ok(())
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
