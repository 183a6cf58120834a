//! Local filesystem backend

use super::{AssetStore, ByteStream};
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

/// Stores each asset as a file; the key is the file path
#[derive(Clone, Debug, Default)]
pub struct FilesystemStore;

impl FilesystemStore {
    /// Create a filesystem store
    pub fn new() -> Self {
        Self
    }

    fn partial_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(".part");
        PathBuf::from(name)
    }

    async fn write_stream(path: &Path, mut body: ByteStream) -> Result<u64> {
        let mut file = tokio::fs::File::create(path).await?;
        let mut written = 0u64;
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }
}

#[async_trait]
impl AssetStore for FilesystemStore {
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(key).await?)
    }

    async fn put(
        &self,
        key: &str,
        body: ByteStream,
        length: Option<u64>,
        _mime_type: &str,
    ) -> Result<u64> {
        let path = Path::new(key);
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write beside the target and rename, so an interrupted transfer never
        // leaves a file that the existence check would accept.
        let partial = Self::partial_path(path);
        let written = match Self::write_stream(&partial, body).await {
            Ok(written) => written,
            Err(e) => {
                tokio::fs::remove_file(&partial).await.ok();
                return Err(e);
            }
        };

        if let Some(expected) = length
            && expected != written
        {
            tokio::fs::remove_file(&partial).await.ok();
            return Err(Error::storage(format!(
                "short transfer for {}: expected {} bytes, got {}",
                key, expected, written
            )));
        }

        tokio::fs::rename(&partial, path).await?;
        Ok(written)
    }

    async fn get(&self, key: &str) -> Result<ByteStream> {
        let file = tokio::fs::File::open(key).await?;
        Ok(ReaderStream::new(file).map_err(Error::from).boxed())
    }

    fn name(&self) -> &'static str {
        "filesystem"
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tempfile::TempDir;

    fn body(chunks: &[&'static [u8]]) -> ByteStream {
        let chunks: Vec<Result<Bytes>> = chunks
            .iter()
            .map(|chunk| Ok(Bytes::from_static(chunk)))
            .collect();
        futures::stream::iter(chunks).boxed()
    }

    #[tokio::test]
    async fn test_put_creates_directories_and_file() {
        let dir = TempDir::new().unwrap();
        let key = dir.path().join("images/nested/a.png");
        let key = key.to_str().unwrap();
        let store = FilesystemStore::new();

        assert!(!store.exists(key).await.unwrap());
        let written = store
            .put(key, body(&[b"abc", b"def"]), Some(6), "image/png")
            .await
            .unwrap();

        assert_eq!(written, 6);
        assert!(store.exists(key).await.unwrap());
        assert_eq!(std::fs::read(key).unwrap(), b"abcdef");
        assert!(!Path::new(&format!("{key}.part")).exists());
    }

    #[tokio::test]
    async fn test_get_streams_stored_bytes() {
        let dir = TempDir::new().unwrap();
        let key = dir.path().join("b.txt");
        let key = key.to_str().unwrap();
        let store = FilesystemStore::new();
        store
            .put(key, body(&[b"hello"]), None, "text/plain")
            .await
            .unwrap();

        let chunks: Vec<Bytes> = store.get(key).await.unwrap().try_collect().await.unwrap();
        assert_eq!(chunks.concat(), b"hello");
    }

    #[tokio::test]
    async fn test_short_transfer_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let key = dir.path().join("c.bin");
        let key = key.to_str().unwrap();
        let store = FilesystemStore::new();

        let err = store
            .put(key, body(&[b"12"]), Some(10), "application/octet-stream")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Storage { transient: false, .. }));
        assert!(!store.exists(key).await.unwrap());
        assert!(!Path::new(&format!("{key}.part")).exists());
    }

    #[tokio::test]
    async fn test_failed_stream_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let key = dir.path().join("d.bin");
        let key = key.to_str().unwrap();
        let store = FilesystemStore::new();

        let failing: ByteStream = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset",
            ))),
        ])
        .boxed();

        assert!(store.put(key, failing, None, "x/y").await.is_err());
        assert!(!store.exists(key).await.unwrap());
    }
}
