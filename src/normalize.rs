//! Entity normalization
//!
//! Two passes prepare posts for persistence:
//!
//! - [`assign_order`] stamps an explicit `order` on every element of a body.
//!   Keyed maps are walked in key order (they are `BTreeMap`s), so the same
//!   body always gets the same stamps.
//! - [`unify_authors`] collapses authors by `user_id` so every post by one
//!   author shares a single `Arc<User>`. The first occurrence wins.

use crate::types::{ContentBody, Ordered, Post, User};
use std::collections::HashMap;
use std::sync::Arc;

/// A batch ready for persistence
#[derive(Clone, Debug, Default)]
pub struct Batch {
    /// One canonical instance per author id, in first-seen order
    pub authors: Vec<Arc<User>>,
    /// Posts referencing the canonical authors
    pub posts: Vec<Post>,
}

fn stamp<'a, T: Ordered + 'a>(items: impl Iterator<Item = &'a mut T>) {
    for (position, item) in items.enumerate() {
        item.set_order(position as u32);
    }
}

/// Stamp explicit positions on the blocks and assets of a post's body
///
/// From here on `order` is the ordering contract; consumers sort by it
/// instead of relying on container iteration.
pub fn assign_order(post: &mut Post) {
    match &mut post.body {
        ContentBody::Structured(body) => {
            stamp(body.blocks.iter_mut());
            for block in &mut body.blocks {
                stamp(block.links.iter_mut());
            }
            stamp(body.image_map.values_mut());
            stamp(body.file_map.values_mut());
            stamp(body.embed_map.values_mut());
            stamp(body.url_embed_map.values_mut());
        }
        ContentBody::Flat(body) => {
            stamp(body.images.iter_mut());
            stamp(body.files.iter_mut());
        }
    }
}

/// Rewrite every post's author to one canonical instance per `user_id`
///
/// Authors compare by id only; a later post carrying a different name for an
/// already-seen id still points at the first instance.
pub fn unify_authors(mut posts: Vec<Post>) -> Batch {
    let mut canonical: HashMap<String, Arc<User>> = HashMap::new();
    let mut authors = Vec::new();

    for post in &mut posts {
        let user = canonical
            .entry(post.user.user_id.clone())
            .or_insert_with(|| {
                authors.push(Arc::clone(&post.user));
                Arc::clone(&post.user)
            });
        post.user = Arc::clone(user);
    }

    Batch { authors, posts }
}
