use crate::types::{ContentBody, FlatBody, Image, Post, PostStub, User};
use chrono::{TimeZone, Utc};

mod migrations;
mod posts;

pub(super) fn user(user_id: &str, name: &str) -> User {
    User {
        user_id: user_id.to_string(),
        name: name.to_string(),
        icon_url: Some(format!("https://img.example/{user_id}.png")),
    }
}

/// Flat post by `author`, published `day` days into 2024
pub(super) fn post(id: &str, author: &User, day: u32) -> Post {
    let published = Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap();
    PostStub {
        id: id.to_string(),
        title: format!("Post {id}"),
        cover_image_url: None,
        fee_required: 500,
        published_at: published,
        updated_at: published,
        kind: "image".to_string(),
        tags: vec!["sketch".to_string(), "wip".to_string()],
        excerpt: String::new(),
        is_liked: false,
        like_count: 3,
        comment_count: 1,
        user: author.clone(),
        creator_id: "artist".to_string(),
        has_adult_content: false,
    }
    .hydrate(ContentBody::Flat(FlatBody {
        text: format!("caption {id}"),
        images: vec![Image {
            id: format!("img-{id}"),
            extension: "png".to_string(),
            width: 100,
            height: 50,
            original_url: format!("https://downloads.example/{id}.png"),
            thumbnail_url: None,
            order: 0,
        }],
        files: vec![],
    }))
}
