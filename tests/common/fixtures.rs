//! Mock feed responses and seed data

use chrono::{TimeZone, Utc};
use feed_mirror::types::FlatBody;
use feed_mirror::{ContentBody, Database, PostStub, User};
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Listing entry for one post
pub fn stub_json(id: &str, user_id: &str) -> Value {
    json!({
        "id": id,
        "title": format!("Post {id}"),
        "coverImageUrl": null,
        "feeRequired": 0,
        "publishedDatetime": "2024-03-01T10:00:00+09:00",
        "updatedDatetime": "2024-03-01T10:00:00+09:00",
        "type": "image",
        "tags": ["tag"],
        "excerpt": "",
        "isLiked": false,
        "likeCount": 0,
        "commentCount": 0,
        "user": {"userId": user_id, "name": format!("Author {user_id}"), "iconUrl": null},
        "creatorId": "artist",
        "hasAdultContent": false
    })
}

/// URL of the single image attached to post `id`
pub fn image_url(server: &MockServer, id: &str) -> String {
    format!("{}/assets/{id}.png", server.uri())
}

/// Home listing page
pub fn home_page(items: Vec<Value>, next_url: Option<String>) -> Value {
    json!({"body": {"items": items, "nextUrl": next_url}})
}

/// Mount the first home page
pub async fn mount_first_page(server: &MockServer, body: Value, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/post.listHome"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(expected)
        .mount(server)
        .await;
}

/// URL the home feed hands out for page `n`
pub fn next_page_url(server: &MockServer, n: u32) -> String {
    format!("{}/feed/home?page={n}", server.uri())
}

/// Mount home page `n` (reached through [`next_page_url`])
pub async fn mount_next_page(server: &MockServer, n: u32, body: Value, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/feed/home"))
        .and(query_param("page", n.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(expected)
        .mount(server)
        .await;
}

/// Mount a flat body with one image for post `id`, plus that image's bytes
pub async fn mount_post_with_image(server: &MockServer, id: &str, body_calls: u64, image_calls: u64) {
    let detail = json!({
        "body": {
            "id": id,
            "body": {
                "text": format!("caption {id}"),
                "images": [{
                    "id": format!("img-{id}"),
                    "extension": "png",
                    "width": 4,
                    "height": 4,
                    "originalUrl": image_url(server, id),
                    "thumbnailUrl": format!("{}/thumbs/{id}.png", server.uri())
                }]
            }
        }
    });
    Mock::given(method("GET"))
        .and(path("/post.info"))
        .and(query_param("postId", id))
        .respond_with(ResponseTemplate::new(200).set_body_json(detail))
        .expect(body_calls)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/assets/{id}.png")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, b'P', b'N', b'G']))
        .expect(image_calls)
        .mount(server)
        .await;
}

/// Mount a detail response with no body (access-restricted post)
pub async fn mount_restricted_post(server: &MockServer, id: &str) {
    Mock::given(method("GET"))
        .and(path("/post.info"))
        .and(query_param("postId", id))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"body": {"id": id, "body": null}})),
        )
        .expect(1)
        .mount(server)
        .await;
}

/// Store a post directly, as if an earlier pass had kept it
pub async fn seed_known_post(db: &Database, id: &str, user_id: &str) {
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let user = User {
        user_id: user_id.to_string(),
        name: format!("Author {user_id}"),
        icon_url: None,
    };
    db.save_user(&user).await.expect("seed user");
    let post = PostStub {
        id: id.to_string(),
        title: format!("Post {id}"),
        cover_image_url: None,
        fee_required: 0,
        published_at: at,
        updated_at: at,
        kind: "image".to_string(),
        tags: vec![],
        excerpt: String::new(),
        is_liked: false,
        like_count: 0,
        comment_count: 0,
        user,
        creator_id: "artist".to_string(),
        has_adult_content: false,
    }
    .hydrate(ContentBody::Flat(FlatBody::default()));
    db.save_post(&post).await.expect("seed post");
}
