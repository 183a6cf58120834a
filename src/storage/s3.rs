//! S3-compatible object store backend

use super::{AssetStore, ByteStream};
use crate::config::ObjectStoreConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::{Credentials, Region, RequestChecksumCalculation};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream as S3ByteStream;
use futures::{StreamExt, TryStreamExt};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

/// Stores assets as objects in a single bucket
#[derive(Clone, Debug)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    /// Build the shared client from configuration
    ///
    /// Static keys are used when both are configured, otherwise the default
    /// AWS credential chain applies. SDK-level retries are off; transient
    /// failures surface as [`Error::Storage`] with `transient` set and are
    /// retried by the caller.
    pub async fn connect(config: &ObjectStoreConfig) -> Result<Self> {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));
        if let (Some(key_id), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            loader = loader.credentials_provider(Credentials::new(
                key_id.clone(),
                secret.clone(),
                None,
                None,
                "feed-mirror",
            ));
        }
        let shared = loader.load().await;

        // Checksums only where an operation demands them: self-hosted S3
        // servers commonly reject the aws-chunked PUT bodies otherwise
        let mut builder = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(config.force_path_style)
            .retry_config(RetryConfig::disabled())
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        tracing::info!(bucket = %config.bucket, endpoint = ?config.endpoint, "Object store client ready");
        Ok(Self::with_client(
            Client::from_conf(builder.build()),
            config.bucket.clone(),
        ))
    }

    /// Wrap an existing client
    pub fn with_client(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl AssetStore for S3Store {
    async fn exists(&self, key: &str) -> Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.as_service_error().is_some_and(|se| se.is_not_found()) {
                    Ok(false)
                } else {
                    Err(sdk_error(format!("stat {key} failed"), &e))
                }
            }
        }
    }

    async fn put(
        &self,
        key: &str,
        mut body: ByteStream,
        length: Option<u64>,
        mime_type: &str,
    ) -> Result<u64> {
        // PUT needs a sized, replayable body; spool the transfer to disk first
        let spool = tempfile::NamedTempFile::new()?;
        let mut file = tokio::fs::File::create(spool.path()).await?;
        let mut written = 0u64;
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        if let Some(expected) = length
            && expected != written
        {
            return Err(Error::storage(format!(
                "short transfer for {}: expected {} bytes, got {}",
                key, expected, written
            )));
        }

        let upload = S3ByteStream::from_path(spool.path())
            .await
            .map_err(|e| Error::storage(format!("cannot read spooled upload: {}", e)))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(mime_type)
            .content_length(written as i64)
            .body(upload)
            .send()
            .await
            .map_err(|e| sdk_error(format!("put {key} failed"), &e))?;

        Ok(written)
    }

    async fn get(&self, key: &str) -> Result<ByteStream> {
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| sdk_error(format!("get {key} failed"), &e))?;

        let reader = object.body.into_async_read();
        Ok(ReaderStream::new(reader).map_err(Error::from).boxed())
    }

    fn name(&self) -> &'static str {
        "object_store"
    }
}

/// Map an SDK failure to a storage error, flagging the ones worth retrying
///
/// Timeouts, dispatch failures, unreadable responses, throttling and 5xx
/// answers are transient. Everything else (403, 404 on GET, ...) is not.
fn sdk_error<E>(context: String, err: &SdkError<E>) -> Error
where
    E: std::error::Error + 'static,
{
    let transient = match err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            true
        }
        SdkError::ServiceError(_) => err.raw_response().is_some_and(|response| {
            let status = response.status().as_u16();
            status == 429 || (500..600).contains(&status)
        }),
        _ => false,
    };

    Error::Storage {
        message: format!("{}: {}", context, DisplayErrorContext(err)),
        transient,
    }
}
