//! Configuration types for feed-mirror

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for [`FeedMirror`](crate::FeedMirror)
///
/// Fields are organized into logical sub-configs:
/// - [`remote`](RemoteConfig) - platform endpoints, session credential, pagination mode
/// - [`sync`](SyncConfig) - resync behavior and concurrency limits
/// - [`assets`](AssetsConfig) - storage backend selection and destinations
/// - [`persistence`](PersistenceConfig) - local database location
/// - [`retry`](RetryConfig) - backoff policy for hydration and asset downloads
///
/// Every field has a default, so a config file only needs the settings it changes.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote platform settings
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Sync driver behavior
    #[serde(default)]
    pub sync: SyncConfig,

    /// Asset storage settings
    #[serde(default)]
    pub assets: AssetsConfig,

    /// Local post/user persistence
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Retry policy for transient failures
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Config {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config {
            message: format!("invalid TOML: {}", e),
            key: None,
        })
    }

    /// Load a configuration file from disk
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| Error::Config {
            message: format!("cannot read {}: {}", path.display(), e),
            key: None,
        })?;
        Self::from_toml_str(&text)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.remote.session_id.trim().is_empty() {
            return Err(Error::config("remote.session_id", "must not be empty"));
        }
        if let Some(creator) = &self.remote.creator_id
            && creator.trim().is_empty()
        {
            return Err(Error::config(
                "remote.creator_id",
                "must not be empty when set",
            ));
        }
        if self.remote.page_size == 0 {
            return Err(Error::config("remote.page_size", "must be greater than 0"));
        }
        if self.sync.max_concurrent_hydrations == 0 {
            return Err(Error::config(
                "sync.max_concurrent_hydrations",
                "must be greater than 0",
            ));
        }
        if self.sync.max_concurrent_assets == 0 {
            return Err(Error::config(
                "sync.max_concurrent_assets",
                "must be greater than 0",
            ));
        }
        if self.assets.storage == StorageBackend::ObjectStore
            && self.assets.object_store.bucket.trim().is_empty()
        {
            return Err(Error::config(
                "assets.object_store.bucket",
                "required when storage = \"object_store\"",
            ));
        }
        Ok(())
    }
}

/// Remote platform settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Platform session credential, sent as a cookie on every request
    #[serde(default)]
    pub session_id: String,

    /// Cookie name carrying the session credential (default: "FANBOXSESSID")
    #[serde(default = "default_session_cookie_name")]
    pub session_cookie_name: String,

    /// Base URL of the feed API (default: "https://api.fanbox.cc")
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Origin/Referer the API expects (default: "https://www.fanbox.cc")
    #[serde(default = "default_origin")]
    pub origin: String,

    /// User-Agent header for every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-process HTTP timeout (default: 3600 seconds)
    ///
    /// Large file assets stream through the same client, so this bounds the
    /// slowest single transfer rather than an API round-trip.
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Number of posts per home feed page (default: 10)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Creator to mirror; when set, creator pagination replaces the home feed
    #[serde(default)]
    pub creator_id: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            session_id: String::new(),
            session_cookie_name: default_session_cookie_name(),
            api_base_url: default_api_base_url(),
            origin: default_origin(),
            user_agent: default_user_agent(),
            request_timeout: default_request_timeout(),
            page_size: default_page_size(),
            creator_id: None,
        }
    }
}

/// Sync driver behavior
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Keep paginating past the first page that contains a known post, and
    /// re-emit every fetched post (known or not)
    #[serde(default)]
    pub fetch_to_end: bool,

    /// Re-emit known posts from fetched pages without disabling stop-on-known
    #[serde(default)]
    pub re_add_known: bool,

    /// Maximum body fetches in flight per page (default: 8)
    #[serde(default = "default_max_concurrent_hydrations")]
    pub max_concurrent_hydrations: usize,

    /// Maximum asset downloads in flight per page (default: 4)
    #[serde(default = "default_max_concurrent_assets")]
    pub max_concurrent_assets: usize,

    /// Interval between passes for `run_forever` (None = single pass)
    #[serde(default, with = "optional_duration_serde")]
    pub poll_interval: Option<Duration>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            fetch_to_end: false,
            re_add_known: false,
            max_concurrent_hydrations: default_max_concurrent_hydrations(),
            max_concurrent_assets: default_max_concurrent_assets(),
            poll_interval: None,
        }
    }
}

/// Storage backend for materialized assets
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Local directories
    #[default]
    Filesystem,
    /// S3-compatible object store
    ObjectStore,
}

/// Asset storage settings
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// Which backend receives assets
    #[serde(default)]
    pub storage: StorageBackend,

    /// Filesystem destinations
    #[serde(default)]
    pub filesystem: FilesystemConfig,

    /// Object store destinations and credentials
    #[serde(default)]
    pub object_store: ObjectStoreConfig,
}

impl AssetsConfig {
    /// Destination namespaces (images, files) for the selected backend
    pub fn namespaces(&self) -> AssetNamespaces {
        match self.storage {
            StorageBackend::Filesystem => AssetNamespaces {
                images: self.filesystem.image_dir.to_string_lossy().into_owned(),
                files: self.filesystem.file_dir.to_string_lossy().into_owned(),
            },
            StorageBackend::ObjectStore => AssetNamespaces {
                images: self.object_store.image_prefix.clone(),
                files: self.object_store.file_prefix.clone(),
            },
        }
    }
}

/// Where images and file attachments land inside the selected backend
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetNamespaces {
    /// Namespace for images
    pub images: String,
    /// Namespace for file attachments
    pub files: String,
}

/// Filesystem destinations
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FilesystemConfig {
    /// Directory for images (default: "./mirror/images")
    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,

    /// Directory for file attachments (default: "./mirror/files")
    #[serde(default = "default_file_dir")]
    pub file_dir: PathBuf,
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self {
            image_dir: default_image_dir(),
            file_dir: default_file_dir(),
        }
    }
}

/// S3-compatible object store settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    /// Custom endpoint for S3-compatible services (None = AWS)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Region (default: "us-east-1")
    #[serde(default = "default_region")]
    pub region: String,

    /// Bucket receiving assets
    #[serde(default)]
    pub bucket: String,

    /// Static access key (None = default credential chain)
    #[serde(default)]
    pub access_key_id: Option<String>,

    /// Static secret key
    #[serde(default)]
    pub secret_access_key: Option<String>,

    /// Key prefix for images (default: "images")
    #[serde(default = "default_image_prefix")]
    pub image_prefix: String,

    /// Key prefix for file attachments (default: "files")
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    /// Use path-style addressing (most self-hosted S3 servers need this)
    #[serde(default = "default_true")]
    pub force_path_style: bool,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: default_region(),
            bucket: String::new(),
            access_key_id: None,
            secret_access_key: None,
            image_prefix: default_image_prefix(),
            file_prefix: default_file_prefix(),
            force_path_style: true,
        }
    }
}

/// Local persistence settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// SQLite database path (default: "./feed-mirror.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_session_cookie_name() -> String {
    "FANBOXSESSID".to_string()
}

fn default_api_base_url() -> String {
    "https://api.fanbox.cc".to_string()
}

fn default_origin() -> String {
    "https://www.fanbox.cc".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/127.0.0.0 Safari/537.36".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_page_size() -> u32 {
    10
}

fn default_max_concurrent_hydrations() -> usize {
    8
}

fn default_max_concurrent_assets() -> usize {
    4
}

fn default_image_dir() -> PathBuf {
    PathBuf::from("./mirror/images")
}

fn default_file_dir() -> PathBuf {
    PathBuf::from("./mirror/files")
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_image_prefix() -> String {
    "images".to_string()
}

fn default_file_prefix() -> String {
    "files".to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./feed-mirror.db")
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.remote.session_id = "session".to_string();
        config
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();

        assert_eq!(config.remote.api_base_url, "https://api.fanbox.cc");
        assert_eq!(config.remote.page_size, 10);
        assert_eq!(config.remote.request_timeout, Duration::from_secs(3600));
        assert!(config.remote.creator_id.is_none());
        assert!(!config.sync.fetch_to_end);
        assert_eq!(config.sync.max_concurrent_assets, 4);
        assert_eq!(config.assets.storage, StorageBackend::Filesystem);
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_full_toml_round_trip_of_recognized_options() {
        let text = r#"
            [remote]
            session_id = "abc"
            creator_id = "some-creator"
            request_timeout = 120

            [sync]
            fetch_to_end = true
            max_concurrent_assets = 2
            poll_interval = 900

            [assets]
            storage = "object_store"

            [assets.object_store]
            endpoint = "https://s3.example.internal"
            bucket = "mirror"
            image_prefix = "img"
            file_prefix = "bin"
        "#;

        let config = Config::from_toml_str(text).unwrap();

        assert_eq!(config.remote.session_id, "abc");
        assert_eq!(config.remote.creator_id.as_deref(), Some("some-creator"));
        assert_eq!(config.remote.request_timeout, Duration::from_secs(120));
        assert!(config.sync.fetch_to_end);
        assert_eq!(config.sync.max_concurrent_assets, 2);
        assert_eq!(config.sync.poll_interval, Some(Duration::from_secs(900)));
        assert_eq!(config.assets.storage, StorageBackend::ObjectStore);
        assert_eq!(
            config.assets.namespaces(),
            AssetNamespaces {
                images: "img".into(),
                files: "bin".into(),
            }
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_filesystem_namespaces_follow_directories() {
        let mut config = valid_config();
        config.assets.filesystem.image_dir = PathBuf::from("/srv/mirror/img");
        config.assets.filesystem.file_dir = PathBuf::from("/srv/mirror/files");

        let namespaces = config.assets.namespaces();
        assert_eq!(namespaces.images, "/srv/mirror/img");
        assert_eq!(namespaces.files, "/srv/mirror/files");
    }

    #[test]
    fn test_validate_rejects_missing_session() {
        let err = Config::default().validate().unwrap_err();
        match err {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("remote.session_id")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = valid_config();
        config.sync.max_concurrent_assets = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.sync.max_concurrent_hydrations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_object_store_without_bucket() {
        let mut config = valid_config();
        config.assets.storage = StorageBackend::ObjectStore;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("required"));
    }

    #[test]
    fn test_validate_rejects_blank_creator() {
        let mut config = valid_config();
        config.remote.creator_id = Some("  ".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = Config::from_toml_str("[sync\nfetch_to_end = ").unwrap_err();
        assert!(matches!(err, Error::Config { key: None, .. }));
    }
}
