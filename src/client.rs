//! Authenticated HTTP client for the remote feed platform
//!
//! Wraps the listing, detail and asset endpoints. The client never retries:
//! transport failures come back as [`Error::Network`] or [`Error::HttpStatus`]
//! (classified by [`IsRetryable`](crate::retry::IsRetryable)), malformed JSON as
//! [`Error::Decode`]. Retry policy belongs to the caller.

use crate::config::RemoteConfig;
use crate::error::{Error, Result};
use crate::pagination::{Cursor, FeedMode, Page};
use crate::storage::ByteStream;
use crate::types::{ContentBody, PostStub};
use futures::TryStreamExt;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue, ORIGIN, REFERER};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use tracing::{debug, info, trace};
use url::Url;

/// Envelope every API response is wrapped in
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    body: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HomeListing {
    items: Vec<PostStub>,
    #[serde(default)]
    next_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PostDetail {
    #[serde(default)]
    body: Option<ContentBody>,
}

/// Byte stream of one remote asset
pub struct AssetDownload {
    /// Response body chunks
    pub stream: ByteStream,
    /// Content-Length header, when the host sent one
    pub content_length: Option<u64>,
}

/// Client for the remote feed API
#[derive(Clone, Debug)]
pub struct FeedClient {
    http: reqwest::Client,
    base_url: Url,
    page_size: u32,
}

impl FeedClient {
    /// Create a client carrying the session credential on every request
    ///
    /// # Errors
    /// Returns a config error if the base URL or a header value is invalid
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let base_url = Url::parse(config.api_base_url.trim_end_matches('/'))
            .map_err(|e| Error::config("remote.api_base_url", e.to_string()))?;

        let mut headers = HeaderMap::new();
        let origin = HeaderValue::from_str(&config.origin)
            .map_err(|e| Error::config("remote.origin", e.to_string()))?;
        let referer = HeaderValue::from_str(&format!("{}/", config.origin.trim_end_matches('/')))
            .map_err(|e| Error::config("remote.origin", e.to_string()))?;
        let mut cookie = HeaderValue::from_str(&format!(
            "{}={}",
            config.session_cookie_name, config.session_id
        ))
        .map_err(|e| Error::config("remote.session_id", e.to_string()))?;
        cookie.set_sensitive(true);
        headers.insert(ORIGIN, origin);
        headers.insert(REFERER, referer);
        headers.insert(COOKIE, cookie);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            page_size: config.page_size,
        })
    }

    /// Cursor for the first page of a walk
    ///
    /// Creator mode fetches the creator's page URL list once, up front. A
    /// creator without pages yields `None`.
    pub async fn start(&self, mode: &FeedMode) -> Result<Option<Cursor>> {
        match mode {
            FeedMode::Home => Ok(Some(Cursor::HomeStart)),
            FeedMode::Creator(creator_id) => {
                let pages = self.creator_page_urls(creator_id).await?;
                info!(creator_id = %creator_id, pages = pages.len(), "Fetched creator pagination");
                Ok((!pages.is_empty()).then_some(Cursor::CreatorPages(pages)))
            }
        }
    }

    /// Fetch one listing page
    ///
    /// # Errors
    /// [`Error::Precondition`] for a cursor that cannot name a page (an empty
    /// next URL or an exhausted creator list); [`Error::Decode`] for a malformed
    /// listing envelope.
    pub async fn list_page(&self, cursor: Cursor) -> Result<Page> {
        match cursor {
            Cursor::HomeStart => {
                let mut url = self.endpoint("post.listHome");
                url.query_pairs_mut()
                    .append_pair("limit", &self.page_size.to_string());
                self.list_home(url.as_str()).await
            }
            Cursor::HomeNext(next_url) => {
                if next_url.trim().is_empty() {
                    return Err(Error::Precondition(
                        "home feed next page requested without a next URL from a previous page"
                            .to_string(),
                    ));
                }
                self.list_home(&next_url).await
            }
            Cursor::CreatorPages(pages) => {
                let (url, next) = Cursor::pop_creator_page(pages).ok_or_else(|| {
                    Error::Precondition(
                        "creator page requested after the page list was exhausted".to_string(),
                    )
                })?;
                info!(url = %url, "Fetching posts");
                let posts: Vec<PostStub> = self.get_json::<Envelope<_>>(&url).await?.body;
                Ok(Page { posts, next })
            }
        }
    }

    /// Fetch the full body of one post
    ///
    /// Returns `Ok(None)` when the platform reports no body for the post, which
    /// is how access-restricted posts come back.
    pub async fn fetch_body(&self, post_id: &str) -> Result<Option<ContentBody>> {
        let mut url = self.endpoint("post.info");
        url.query_pairs_mut().append_pair("postId", post_id);

        debug!(post_id = %post_id, "Fetching post body");
        let detail: Envelope<Option<PostDetail>> = self.get_json(url.as_str()).await?;
        Ok(detail.body.and_then(|detail| detail.body))
    }

    /// Open a byte stream for an asset URL
    pub async fn fetch_asset(&self, url: &str) -> Result<AssetDownload> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let content_length = response.content_length();
        let stream = response.bytes_stream().map_err(Error::from);
        Ok(AssetDownload {
            stream: Box::pin(stream),
            content_length,
        })
    }

    async fn creator_page_urls(&self, creator_id: &str) -> Result<VecDeque<String>> {
        let mut url = self.endpoint("post.paginateCreator");
        url.query_pairs_mut().append_pair("creatorId", creator_id);

        let pages: Envelope<Vec<String>> = self.get_json(url.as_str()).await?;
        Ok(pages.body.into())
    }

    async fn list_home(&self, url: &str) -> Result<Page> {
        info!(url = %url, "Fetching posts");
        let listing: Envelope<HomeListing> = self.get_json(url).await?;
        let HomeListing { items, next_url } = listing.body;
        Ok(Page {
            posts: items,
            next: next_url
                .filter(|next| !next.is_empty())
                .map(Cursor::HomeNext),
        })
    }

    fn endpoint(&self, name: &str) -> Url {
        let mut url = self.base_url.clone();
        let path = format!("{}/{}", url.path().trim_end_matches('/'), name);
        url.set_path(&path);
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let text = response.text().await?;
        trace!(url = %url, body = %text, "Response payload");
        serde_json::from_str(&text).map_err(|source| Error::Decode {
            url: url.to_string(),
            source,
        })
    }
}
