//! Integration tests for the Comments routes.

mod common;

use axum::http::StatusCode;
use sqlx::PgPool;
use uuid::Uuid;

async fn create_story(pool: &PgPool) -> Uuid {
    let (status, json) = common::post_json(
        common::build_test_app(pool.clone()),
        "/api/v1/stories",
        &serde_json::json!({
            "created_by_id": Uuid::new_v4(),
            "name": "Thread Bare",
            "visibility": "public",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["story_id"].as_str().unwrap().parse().unwrap()
}

async fn post_comment(
    pool: &PgPool,
    story_id: Uuid,
    author_id: Uuid,
    parent: Option<Uuid>,
    body: &str,
) -> Uuid {
    let (status, json) = common::post_json(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/stories/{story_id}/comments"),
        &serde_json::json!({
            "author_id": author_id,
            "parent_comment_id": parent,
            "body": body,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["comment_id"].as_str().unwrap().parse().unwrap()
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_thread_listing_with_previews_and_authors(pool: PgPool) {
    // Arrange
    let story_id = create_story(&pool).await;
    let author = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, display_name, avatar_url) VALUES ($1, 'Ines', 'https://img/ines.png')")
        .bind(author)
        .execute(&pool)
        .await
        .unwrap();
    let top = post_comment(&pool, story_id, author, None, "First!").await;
    for i in 0..4 {
        post_comment(&pool, story_id, Uuid::new_v4(), Some(top), &format!("reply {i}")).await;
    }

    // Act
    let (status, json) = common::get_json(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/stories/{story_id}/comments?preview=2"),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    let items = json["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["comment_id"], top.to_string());
    assert_eq!(items[0]["author"]["display_name"], "Ines");
    assert_eq!(items[0]["reply_count"], 4);
    assert_eq!(items[0]["has_replies"], true);
    assert_eq!(items[0]["replies"]["items"].as_array().unwrap().len(), 2);
    let cursor = items[0]["replies"]["next_cursor"].as_str().unwrap();

    let (status, rest) = common::get_json(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/comments/{top}/replies?cursor={cursor}"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rest["items"].as_array().unwrap().len(), 2);
    assert!(rest["next_cursor"].is_null());

    let (status, count) = common::get_json(
        common::build_test_app(pool),
        &format!("/api/v1/stories/{story_id}/comments/count"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(count["count"], 5);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_deleted_comment_is_listed_without_body(pool: PgPool) {
    // Arrange
    let story_id = create_story(&pool).await;
    let comment = post_comment(&pool, story_id, Uuid::new_v4(), None, "regrettable").await;

    // Act
    let status = common::delete(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/comments/{comment}"),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, json) = common::get_json(
        common::build_test_app(pool),
        &format!("/api/v1/stories/{story_id}/comments"),
    )
    .await;
    let item = &json["items"][0];
    assert_eq!(item["comment_id"], comment.to_string());
    assert_eq!(item["is_deleted"], true);
    assert!(item["body"].is_null());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_top_level_listing_rejects_reply_cursor(pool: PgPool) {
    // Arrange
    let story_id = create_story(&pool).await;
    let top = post_comment(&pool, story_id, Uuid::new_v4(), None, "parent").await;
    for i in 0..2 {
        post_comment(&pool, story_id, Uuid::new_v4(), Some(top), &format!("r{i}")).await;
    }
    let (_, replies) = common::get_json(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/comments/{top}/replies?limit=1"),
    )
    .await;
    let reply_cursor = replies["next_cursor"].as_str().unwrap().to_owned();

    // Act
    let (status, json) = common::get_json(
        common::build_test_app(pool),
        &format!("/api/v1/stories/{story_id}/comments?cursor={reply_cursor}"),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid_cursor");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_comment_on_unknown_story_returns_404(pool: PgPool) {
    let (status, _) = common::post_json(
        common::build_test_app(pool),
        &format!("/api/v1/stories/{}/comments", Uuid::new_v4()),
        &serde_json::json!({ "author_id": Uuid::new_v4(), "body": "anyone?" }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
