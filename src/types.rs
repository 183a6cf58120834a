//! Core types for feed-mirror
//!
//! Wire shapes follow the platform's camelCase JSON. Bodies come in exactly two
//! shapes and are modeled as [`ContentBody`], so every consumer has to branch
//! before touching blocks or flat text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Entities whose display order is carried by an explicit `order` stamp
pub trait Ordered {
    /// Position within the owning sequence
    fn order(&self) -> u32;
    /// Stamp the position within the owning sequence
    fn set_order(&mut self, order: u32);
}

/// Sort a sequence by its `order` stamps (stable for equal stamps)
pub fn sort_by_order<T: Ordered>(items: &mut [T]) {
    items.sort_by_key(Ordered::order);
}

macro_rules! impl_ordered {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Ordered for $ty {
                fn order(&self) -> u32 {
                    self.order
                }

                fn set_order(&mut self, order: u32) {
                    self.order = order;
                }
            }
        )*
    };
}

impl_ordered!(Block, Image, File, Embed, UrlEmbed, LinkSpan);

/// Post author, shared across every post they wrote
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Platform-assigned identity
    pub user_id: String,
    /// Display name
    pub name: String,
    /// Avatar URL
    #[serde(default)]
    pub icon_url: Option<String>,
}

/// Inline style applied to a range of a block's text
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleSpan {
    /// Style kind (e.g. "bold")
    #[serde(rename = "type")]
    pub kind: String,
    /// Start offset in characters
    pub offset: u32,
    /// Length in characters
    pub length: u32,
}

/// Inline link applied to a range of a block's text
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSpan {
    /// Start offset in characters
    pub offset: u32,
    /// Length in characters
    pub length: u32,
    /// Link target
    pub url: String,
    /// Explicit position among the block's links
    #[serde(default)]
    pub order: u32,
}

/// One paragraph-level element of a structured body
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Block kind ("p", "header", "image", "file", "embed", "url_embed")
    #[serde(rename = "type")]
    pub kind: String,
    /// Text content for text-bearing blocks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Key into the body's image map
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    /// Key into the body's file map
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    /// Key into the body's embed map
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed_id: Option<String>,
    /// Key into the body's URL embed map
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_embed_id: Option<String>,
    /// Inline style spans
    #[serde(default)]
    pub styles: Vec<StyleSpan>,
    /// Inline link spans
    #[serde(default)]
    pub links: Vec<LinkSpan>,
    /// Explicit position within the body
    #[serde(default)]
    pub order: u32,
}

/// Image attached to a post
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    /// Asset identity
    pub id: String,
    /// File extension without the dot
    #[serde(default)]
    pub extension: String,
    /// Width in pixels
    #[serde(default)]
    pub width: u32,
    /// Height in pixels
    #[serde(default)]
    pub height: u32,
    /// Full-size origin URL (the one that gets materialized)
    pub original_url: String,
    /// Thumbnail URL
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    /// Explicit position within the body
    #[serde(default)]
    pub order: u32,
}

/// File attachment
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    /// Asset identity
    pub id: String,
    /// Display name without extension
    #[serde(default)]
    pub name: String,
    /// File extension without the dot
    #[serde(default)]
    pub extension: String,
    /// Size in bytes
    #[serde(default)]
    pub size: u64,
    /// Download URL
    pub url: String,
    /// Explicit position within the body
    #[serde(default)]
    pub order: u32,
}

/// Third-party embed (video, music, ...)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Embed {
    /// Embed identity
    pub id: String,
    /// Provider name (e.g. "youtube")
    #[serde(default)]
    pub service_provider: String,
    /// Provider-side content id
    #[serde(default)]
    pub content_id: String,
    /// Explicit position within the body
    #[serde(default)]
    pub order: u32,
}

/// Link card embed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlEmbed {
    /// Embed identity
    pub id: String,
    /// Card kind (e.g. "html", "default")
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Linked host
    #[serde(default)]
    pub host: Option<String>,
    /// Linked URL
    #[serde(default)]
    pub url: Option<String>,
    /// Pre-rendered card HTML
    #[serde(default)]
    pub html: Option<String>,
    /// Explicit position within the body
    #[serde(default)]
    pub order: u32,
}

/// Article-style body: ordered blocks referencing keyed asset maps
///
/// Maps are `BTreeMap`s, so iterating them always walks keys in lexicographic
/// order. That walk is what the normalizer stamps into `order`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StructuredBody {
    /// Ordered blocks
    pub blocks: Vec<Block>,
    /// Images keyed by id
    pub image_map: BTreeMap<String, Image>,
    /// Files keyed by id
    pub file_map: BTreeMap<String, File>,
    /// Embeds keyed by id
    pub embed_map: BTreeMap<String, Embed>,
    /// URL embeds keyed by id
    pub url_embed_map: BTreeMap<String, UrlEmbed>,
}

impl StructuredBody {
    /// Images sorted by their `order` stamps
    pub fn images_in_order(&self) -> Vec<&Image> {
        in_order(self.image_map.values())
    }

    /// Files sorted by their `order` stamps
    pub fn files_in_order(&self) -> Vec<&File> {
        in_order(self.file_map.values())
    }

    /// Embeds sorted by their `order` stamps
    pub fn embeds_in_order(&self) -> Vec<&Embed> {
        in_order(self.embed_map.values())
    }

    /// URL embeds sorted by their `order` stamps
    pub fn url_embeds_in_order(&self) -> Vec<&UrlEmbed> {
        in_order(self.url_embed_map.values())
    }
}

fn in_order<'a, T: Ordered + 'a>(values: impl Iterator<Item = &'a T>) -> Vec<&'a T> {
    let mut items: Vec<&T> = values.collect();
    items.sort_by_key(|item| item.order());
    items
}

/// Plain body: free text plus ordered image and file lists
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlatBody {
    /// Body text
    pub text: String,
    /// Images in display order
    pub images: Vec<Image>,
    /// Files in display order
    pub files: Vec<File>,
}

/// Full content of a post: exactly one of two shapes
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawContentBody", into = "RawContentBody")]
pub enum ContentBody {
    /// Blocks plus keyed asset maps
    Structured(StructuredBody),
    /// Text plus ordered asset lists
    Flat(FlatBody),
}

impl ContentBody {
    /// Every image in the body, whichever shape it has
    pub fn images(&self) -> Box<dyn Iterator<Item = &Image> + '_> {
        match self {
            ContentBody::Structured(body) => Box::new(body.image_map.values()),
            ContentBody::Flat(body) => Box::new(body.images.iter()),
        }
    }

    /// Every file attachment in the body, whichever shape it has
    pub fn files(&self) -> Box<dyn Iterator<Item = &File> + '_> {
        match self {
            ContentBody::Structured(body) => Box::new(body.file_map.values()),
            ContentBody::Flat(body) => Box::new(body.files.iter()),
        }
    }
}

/// Wire representation: one record with every field optional
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawContentBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    blocks: Option<Vec<Block>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_map: Option<BTreeMap<String, Image>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file_map: Option<BTreeMap<String, File>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    embed_map: Option<BTreeMap<String, Embed>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url_embed_map: Option<BTreeMap<String, UrlEmbed>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    images: Option<Vec<Image>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    files: Option<Vec<File>>,
}

impl TryFrom<RawContentBody> for ContentBody {
    type Error = String;

    fn try_from(raw: RawContentBody) -> Result<Self, Self::Error> {
        match raw.blocks {
            Some(blocks) => {
                if raw.text.is_some() || raw.images.is_some() || raw.files.is_some() {
                    return Err(
                        "content body carries both blocks and flat text/images/files".to_string(),
                    );
                }
                Ok(ContentBody::Structured(StructuredBody {
                    blocks,
                    image_map: raw.image_map.unwrap_or_default(),
                    file_map: raw.file_map.unwrap_or_default(),
                    embed_map: raw.embed_map.unwrap_or_default(),
                    url_embed_map: raw.url_embed_map.unwrap_or_default(),
                }))
            }
            None => Ok(ContentBody::Flat(FlatBody {
                text: raw.text.unwrap_or_default(),
                images: raw.images.unwrap_or_default(),
                files: raw.files.unwrap_or_default(),
            })),
        }
    }
}

impl From<ContentBody> for RawContentBody {
    fn from(body: ContentBody) -> Self {
        match body {
            ContentBody::Structured(body) => RawContentBody {
                blocks: Some(body.blocks),
                image_map: Some(body.image_map),
                file_map: Some(body.file_map),
                embed_map: Some(body.embed_map),
                url_embed_map: Some(body.url_embed_map),
                ..Default::default()
            },
            ContentBody::Flat(body) => RawContentBody {
                text: Some(body.text),
                images: Some(body.images),
                files: Some(body.files),
                ..Default::default()
            },
        }
    }
}

/// Summary post record returned by a listing call; carries no body
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostStub {
    /// Globally unique, origin-assigned identity
    pub id: String,
    /// Post title
    pub title: String,
    /// Cover image URL
    #[serde(default)]
    pub cover_image_url: Option<String>,
    /// Minimum plan fee needed to view the post
    #[serde(default)]
    pub fee_required: u32,
    /// First publication time
    #[serde(rename = "publishedDatetime")]
    pub published_at: DateTime<Utc>,
    /// Last edit time
    #[serde(rename = "updatedDatetime")]
    pub updated_at: DateTime<Utc>,
    /// Post kind ("article", "image", "file", "text")
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Tags in display order
    #[serde(default)]
    pub tags: Vec<String>,
    /// Short excerpt
    #[serde(default)]
    pub excerpt: String,
    /// Whether the session user liked the post
    #[serde(default)]
    pub is_liked: bool,
    /// Like counter
    #[serde(default)]
    pub like_count: u32,
    /// Comment counter
    #[serde(default)]
    pub comment_count: u32,
    /// Author
    pub user: User,
    /// Creator handle
    #[serde(default)]
    pub creator_id: String,
    /// Adult content flag
    #[serde(default)]
    pub has_adult_content: bool,
}

impl PostStub {
    /// Attach a fetched body, producing a full post
    pub fn hydrate(self, body: ContentBody) -> Post {
        Post {
            id: self.id,
            title: self.title,
            cover_image_url: self.cover_image_url,
            fee_required: self.fee_required,
            published_at: self.published_at,
            updated_at: self.updated_at,
            kind: self.kind,
            tags: self.tags,
            excerpt: self.excerpt,
            is_liked: self.is_liked,
            like_count: self.like_count,
            comment_count: self.comment_count,
            user: Arc::new(self.user),
            creator_id: self.creator_id,
            has_adult_content: self.has_adult_content,
            body,
        }
    }
}

/// A hydrated post
///
/// `user` is shared: after normalization every post by the same author holds
/// the same `Arc`.
#[derive(Clone, Debug, PartialEq)]
pub struct Post {
    /// Globally unique, origin-assigned identity
    pub id: String,
    /// Post title
    pub title: String,
    /// Cover image URL
    pub cover_image_url: Option<String>,
    /// Minimum plan fee needed to view the post
    pub fee_required: u32,
    /// First publication time
    pub published_at: DateTime<Utc>,
    /// Last edit time
    pub updated_at: DateTime<Utc>,
    /// Post kind
    pub kind: String,
    /// Tags in display order
    pub tags: Vec<String>,
    /// Short excerpt
    pub excerpt: String,
    /// Whether the session user liked the post
    pub is_liked: bool,
    /// Like counter
    pub like_count: u32,
    /// Comment counter
    pub comment_count: u32,
    /// Author
    pub user: Arc<User>,
    /// Creator handle
    pub creator_id: String,
    /// Adult content flag
    pub has_adult_content: bool,
    /// Full content
    pub body: ContentBody,
}
