//! Test configuration helpers for creating mirrors against a mock feed

use feed_mirror::{Config, FeedMirror};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::MockServer;

/// A mirror whose database and asset directories live in a temp directory
pub struct TestMirror {
    /// The mirror under test
    pub mirror: FeedMirror,
    /// Keeps the temp directory alive for the test's duration
    pub dir: TempDir,
}

impl TestMirror {
    /// Where image assets land
    pub fn image_path(&self, file_name: &str) -> PathBuf {
        self.dir.path().join("images").join(file_name)
    }

    /// Where file attachments land
    pub fn file_path(&self, file_name: &str) -> PathBuf {
        self.dir.path().join("files").join(file_name)
    }
}

/// Configuration pointing at `server`, with storage under `dir`
///
/// Retries are disabled so failure tests see exactly one request per item.
pub fn test_config(server: &MockServer, dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.remote.session_id = "test-session".to_string();
    config.remote.api_base_url = server.uri();
    config.remote.origin = "https://www.example.test".to_string();
    config.remote.request_timeout = Duration::from_secs(10);
    config.assets.filesystem.image_dir = dir.path().join("images");
    config.assets.filesystem.file_dir = dir.path().join("files");
    config.persistence.database_path = dir.path().join("mirror.db");
    config.retry.max_attempts = 0;
    config.retry.initial_delay = Duration::from_millis(1);
    config.retry.jitter = false;
    config
}

/// Build a mirror against `server`, letting the test adjust the config first
pub async fn mirror_for(server: &MockServer, tweak: impl FnOnce(&mut Config)) -> TestMirror {
    let dir = TempDir::new().expect("temp dir");
    let mut config = test_config(server, &dir);
    tweak(&mut config);
    let mirror = FeedMirror::new(config).await.expect("mirror should build");
    TestMirror { mirror, dir }
}
