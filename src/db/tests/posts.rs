use super::{post, user};
use crate::db::*;
use crate::normalize::unify_authors;
use crate::store::{PostStore, persist_batch};
use crate::types::ContentBody;
use tempfile::NamedTempFile;

#[tokio::test]
async fn test_post_round_trips_through_database() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    let author = user("U1", "Artist");
    let original = post("42", &author, 3);

    db.upsert_user(&author).await.unwrap();
    db.upsert_post(&original).await.unwrap();

    let stored = db.get_post("42").await.unwrap().unwrap();
    assert!(!stored.sent);
    assert_eq!(stored.post, original);
    assert!(matches!(stored.post.body, ContentBody::Flat(_)));
    assert!(db.get_post("43").await.unwrap().is_none());

    db.close().await;
}

#[tokio::test]
async fn test_out_of_range_counter_is_an_error() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    let author = user("U1", "Artist");
    db.upsert_user(&author).await.unwrap();
    db.upsert_post(&post("1", &author, 1)).await.unwrap();

    sqlx::query("UPDATE posts SET like_count = -1 WHERE id = '1'")
        .execute(db.pool())
        .await
        .unwrap();
    let err = db.get_post("1").await.unwrap_err();
    assert!(err.to_string().contains("like_count"), "{err}");

    sqlx::query("UPDATE posts SET like_count = 0, fee_required = 5000000000 WHERE id = '1'")
        .execute(db.pool())
        .await
        .unwrap();
    let err = db.get_post("1").await.unwrap_err();
    assert!(err.to_string().contains("fee_required"), "{err}");

    db.close().await;
}

#[tokio::test]
async fn test_post_requires_stored_author() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let result = db.upsert_post(&post("1", &user("ghost", "Nobody"), 1)).await;
    assert!(result.is_err(), "foreign key on user_id should reject the post");

    db.close().await;
}

#[tokio::test]
async fn test_upsert_keeps_sent_flag_and_rewrites_fields() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    let author = user("U1", "Artist");
    db.upsert_user(&author).await.unwrap();

    let mut p = post("1", &author, 1);
    db.upsert_post(&p).await.unwrap();
    assert!(db.mark_sent("1").await.unwrap());

    p.title = "Edited".to_string();
    p.like_count = 10;
    db.upsert_post(&p).await.unwrap();

    let stored = db.get_post("1").await.unwrap().unwrap();
    assert!(stored.sent, "re-sync must not reset the notification flag");
    assert_eq!(stored.post.title, "Edited");
    assert_eq!(stored.post.like_count, 10);
    assert_eq!(db.count_posts().await.unwrap(), 1);

    db.close().await;
}

#[tokio::test]
async fn test_unsent_posts_oldest_first() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    let author = user("U1", "Artist");
    db.upsert_user(&author).await.unwrap();

    db.upsert_post(&post("c", &author, 20)).await.unwrap();
    db.upsert_post(&post("a", &author, 5)).await.unwrap();
    db.upsert_post(&post("b", &author, 10)).await.unwrap();
    db.mark_sent("b").await.unwrap();

    let unsent: Vec<String> = db
        .unsent_posts()
        .await
        .unwrap()
        .into_iter()
        .map(|stored| stored.post.id)
        .collect();
    assert_eq!(unsent, ["a", "c"]);
    assert!(!db.mark_sent("zzz").await.unwrap());

    let ids = db.known_post_ids().await.unwrap();
    assert_eq!(ids.len(), 3);
    assert!(ids.contains("b"));

    db.close().await;
}

#[tokio::test]
async fn test_persist_batch_writes_authors_once() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    let u1 = user("U1", "Artist");
    let u2 = user("U2", "Other");
    db.upsert_user(&u2).await.unwrap();

    let batch = unify_authors(vec![
        post("1", &u1, 1),
        post("2", &u2, 2),
        post("3", &u1, 3),
    ]);
    let summary = persist_batch(&db, &batch).await.unwrap();

    assert_eq!(summary.users_inserted, 1);
    assert_eq!(summary.users_updated, 1);
    assert_eq!(summary.posts_written, 3);
    assert_eq!(db.known_users().await.unwrap().len(), 2);

    // Same batch again: nothing duplicated
    persist_batch(&db, &batch).await.unwrap();
    assert_eq!(db.known_users().await.unwrap().len(), 2);
    assert_eq!(db.count_posts().await.unwrap(), 3);

    db.close().await;
}
