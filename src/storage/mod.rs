//! Storage backends for materialized assets
//!
//! An [`AssetStore`] holds assets under string keys of the form
//! `namespace/file_name`. Two implementations exist:
//!
//! - [`FilesystemStore`]: keys are file paths, namespaces are directories
//! - [`S3Store`]: keys are object keys in one bucket, namespaces are prefixes
//!
//! The backend is picked by [`StorageBackend`](crate::config::StorageBackend),
//! never hardcoded.

use crate::config::{AssetsConfig, StorageBackend};
use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::sync::Arc;

mod filesystem;
mod s3;

pub use filesystem::FilesystemStore;
pub use s3::S3Store;

/// Stream of asset bytes flowing from the feed client into a backend
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Durable destination for asset bytes
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Whether an asset is already stored under `key`
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Store a byte stream under `key`, returning the number of bytes written
    ///
    /// `length` is the expected size when the origin reported one; a stream
    /// that ends short of it is an error and leaves nothing under `key`.
    async fn put(
        &self,
        key: &str,
        body: ByteStream,
        length: Option<u64>,
        mime_type: &str,
    ) -> Result<u64>;

    /// Read back a stored asset
    async fn get(&self, key: &str) -> Result<ByteStream>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Build the configured backend
///
/// The object store client is created here, once per process, and shared by
/// every upload through the returned `Arc`.
pub async fn build_asset_store(config: &AssetsConfig) -> Result<Arc<dyn AssetStore>> {
    match config.storage {
        StorageBackend::Filesystem => Ok(Arc::new(FilesystemStore::new())),
        StorageBackend::ObjectStore => Ok(Arc::new(S3Store::connect(&config.object_store).await?)),
    }
}

/// Storage key for a file inside a namespace
pub fn asset_key(namespace: &str, file_name: &str) -> String {
    let namespace = namespace.trim_end_matches('/');
    if namespace.is_empty() {
        file_name.to_string()
    } else {
        format!("{}/{}", namespace, file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_key_joins_namespace_and_file() {
        assert_eq!(asset_key("images", "a.png"), "images/a.png");
        assert_eq!(asset_key("images/", "a.png"), "images/a.png");
        assert_eq!(asset_key("/srv/mirror/files", "b.zip"), "/srv/mirror/files/b.zip");
        assert_eq!(asset_key("", "c.jpg"), "c.jpg");
    }
}
