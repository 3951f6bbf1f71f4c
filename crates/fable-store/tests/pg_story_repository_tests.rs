//! Integration tests for `PgStoryRepository`.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use fable_core::clock::Clock;
use fable_core::error::DomainError;
use fable_core::repository::{AggregateRepository, UnitOfWorkFactory, WriteOutcome};
use fable_core::watermark::WatermarkStore;
use fable_stories::domain::aggregates::{Story, StoryContent, Visibility};
use fable_store::pg_story_repository::{PgStoryRepository, PgStoryRepositoryFactory};
use fable_test_support::{FixedClock, SteppingClock};
use sqlx::PgPool;
use uuid::Uuid;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 1, 9, 30, 0).unwrap()
}

fn frozen() -> Arc<dyn Clock> {
    Arc::new(FixedClock(t0()))
}

fn repo(pool: &PgPool, clock: &Arc<dyn Clock>) -> PgStoryRepository {
    PgStoryRepository::new(pool.clone(), Arc::clone(clock), WatermarkStore::new())
}

fn content(name: &str, cover: Option<Uuid>, tags: &[Uuid]) -> StoryContent {
    StoryContent {
        name: name.to_owned(),
        description: "Lanterns over the harbour".to_owned(),
        visibility: Visibility::Public,
        cover_image_id: cover,
        tag_ids: tags.iter().copied().collect(),
    }
}

async fn seed(pool: &PgPool, clock: &Arc<dyn Clock>, content: StoryContent) -> Story {
    let draft = Story::draft(Uuid::new_v4(), Uuid::new_v4(), content, clock.now()).unwrap();
    repo(pool, clock).insert(draft).await.unwrap()
}

async fn count_rows(pool: &PgPool, table: &str, post_id: Uuid) -> i64 {
    let column = if table == "posts" { "id" } else { "post_id" };
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table} WHERE {column} = $1"))
        .bind(post_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

// --- insert ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_insert_returns_story_as_stored(pool: PgPool) {
    // Arrange
    let clock = frozen();
    let cover = Uuid::new_v4();
    let tags = [Uuid::new_v4(), Uuid::new_v4()];

    // Act
    let stored = seed(&pool, &clock, content("  The Long Tide  ", Some(cover), &tags)).await;

    // Assert
    assert_eq!(stored.name, "The Long Tide");
    assert_eq!(stored.created_at, t0());
    assert_eq!(stored.updated_at, t0());
    assert_eq!(stored.cover_image_id, Some(cover));
    assert_eq!(stored.tag_ids, tags.into_iter().collect::<BTreeSet<_>>());
    let found = repo(&pool, &clock).find_by_id(stored.id).await.unwrap();
    assert_eq!(found, Some(stored));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_find_by_id_returns_none_for_unknown_story(pool: PgPool) {
    let found = repo(&pool, &frozen()).find_by_id(Uuid::new_v4()).await.unwrap();

    assert!(found.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_find_by_id_does_not_record_a_baseline(pool: PgPool) {
    let clock = frozen();
    let story = seed(&pool, &clock, content("Quiet", None, &[])).await;
    let unit = repo(&pool, &clock);

    unit.find_by_id(story.id).await.unwrap();

    assert!(unit.watermarks().baseline(story.id).is_none());
}

// --- update ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_update_without_load_fails_before_touching_storage(pool: PgPool) {
    // Arrange
    let clock = frozen();
    let story = seed(&pool, &clock, content("Untouched", None, &[])).await;
    let mut edited = story.clone();
    edited.name = "Edited".to_owned();

    // Act
    let result = repo(&pool, &clock).update(edited).await;

    // Assert
    assert!(matches!(result, Err(DomainError::MissingBaseline(id)) if id == story.id));
    let stored = repo(&pool, &clock).find_by_id(story.id).await.unwrap().unwrap();
    assert_eq!(stored, story);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_update_advances_token_even_with_frozen_clock(pool: PgPool) {
    // Arrange
    let clock = frozen();
    let story = seed(&pool, &clock, content("Frozen", None, &[])).await;
    let unit = repo(&pool, &clock);
    let mut loaded = unit.load_for_update(story.id).await.unwrap().unwrap();
    loaded.description = "Time stood still".to_owned();

    // Act
    let outcome = unit.update(loaded).await.unwrap();

    // Assert
    let WriteOutcome::Written(written) = outcome else {
        panic!("expected a successful write");
    };
    assert_eq!(written.updated_at, t0() + Duration::microseconds(1));
    assert_eq!(written.created_at, t0());
    assert_eq!(written.description, "Time stood still");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_two_writers_from_same_baseline_exactly_one_wins(pool: PgPool) {
    // Arrange
    let clock = frozen();
    let story = seed(&pool, &clock, content("Contested", None, &[])).await;
    let writer_a = repo(&pool, &clock);
    let writer_b = repo(&pool, &clock);
    let mut a = writer_a.load_for_update(story.id).await.unwrap().unwrap();
    let mut b = writer_b.load_for_update(story.id).await.unwrap().unwrap();
    a.name = "Writer A".to_owned();
    b.name = "Writer B".to_owned();

    // Act
    let first = writer_a.update(a).await.unwrap();
    let second = writer_b.update(b).await.unwrap();

    // Assert
    assert!(!first.is_conflict());
    match second {
        WriteOutcome::Conflict(signal) => {
            assert_eq!(signal.stale.name, "Writer B");
            assert!(!signal.message.is_empty());
        }
        WriteOutcome::Written(_) => panic!("second writer must conflict"),
    }
    let stored = repo(&pool, &clock).find_by_id(story.id).await.unwrap().unwrap();
    assert_eq!(stored.name, "Writer A");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_concurrent_writers_from_same_baseline_exactly_one_wins(pool: PgPool) {
    // Arrange
    let clock = frozen();
    let story = seed(&pool, &clock, content("Raced", None, &[Uuid::new_v4()])).await;
    let writer_a = repo(&pool, &clock);
    let writer_b = repo(&pool, &clock);
    let mut a = writer_a.load_for_update(story.id).await.unwrap().unwrap();
    let mut b = writer_b.load_for_update(story.id).await.unwrap().unwrap();
    a.name = "Writer A".to_owned();
    a.tag_ids = BTreeSet::from([Uuid::new_v4()]);
    b.name = "Writer B".to_owned();
    b.tag_ids = BTreeSet::from([Uuid::new_v4()]);

    // Act
    let (outcome_a, outcome_b) = tokio::join!(writer_a.update(a), writer_b.update(b));

    // Assert
    let outcomes = [outcome_a.unwrap(), outcome_b.unwrap()];
    let winners: Vec<&Story> = outcomes
        .iter()
        .filter_map(|outcome| match outcome {
            WriteOutcome::Written(story) => Some(story),
            WriteOutcome::Conflict(_) => None,
        })
        .collect();
    assert_eq!(winners.len(), 1);
    let stored = repo(&pool, &clock).find_by_id(story.id).await.unwrap().unwrap();
    assert_eq!(stored.name, winners[0].name);
    assert_eq!(stored.tag_ids, winners[0].tag_ids);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_rejected_update_leaves_links_untouched(pool: PgPool) {
    // Arrange
    let clock = frozen();
    let tag = Uuid::new_v4();
    let story = seed(&pool, &clock, content("Linked", Some(Uuid::new_v4()), &[tag])).await;
    let stale_writer = repo(&pool, &clock);
    let mut stale = stale_writer.load_for_update(story.id).await.unwrap().unwrap();
    let winner = repo(&pool, &clock);
    let fresh = winner.load_for_update(story.id).await.unwrap().unwrap();
    winner.update(fresh).await.unwrap();
    stale.cover_image_id = None;
    stale.tag_ids.clear();

    // Act
    let outcome = stale_writer.update(stale).await.unwrap();

    // Assert
    assert!(outcome.is_conflict());
    let stored = repo(&pool, &clock).find_by_id(story.id).await.unwrap().unwrap();
    assert_eq!(stored.cover_image_id, story.cover_image_id);
    assert_eq!(stored.tag_ids, story.tag_ids);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_update_reconciles_cover_and_tags(pool: PgPool) {
    // Arrange
    let clock: Arc<dyn Clock> = Arc::new(SteppingClock::new(t0(), Duration::minutes(5)));
    let kept = Uuid::new_v4();
    let dropped = Uuid::new_v4();
    let added = Uuid::new_v4();
    let new_cover = Uuid::new_v4();
    let story = seed(&pool, &clock, content("Retagged", Some(Uuid::new_v4()), &[kept, dropped]))
        .await;
    let unit = repo(&pool, &clock);
    let mut loaded = unit.load_for_update(story.id).await.unwrap().unwrap();
    loaded.cover_image_id = Some(new_cover);
    loaded.tag_ids = [kept, added].into_iter().collect();

    // Act
    let outcome = unit.update(loaded).await.unwrap();

    // Assert
    let WriteOutcome::Written(written) = outcome else {
        panic!("expected a successful write");
    };
    assert_eq!(written.cover_image_id, Some(new_cover));
    assert_eq!(written.tag_ids, [kept, added].into_iter().collect::<BTreeSet<_>>());
    assert_eq!(count_rows(&pool, "post_images", story.id).await, 1);

    let kept_linked_at: DateTime<Utc> =
        sqlx::query_scalar("SELECT created_at FROM post_tags WHERE post_id = $1 AND tag_id = $2")
            .bind(story.id)
            .bind(kept)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(kept_linked_at, story.created_at);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_update_detaches_cover_and_clears_tags(pool: PgPool) {
    let clock = frozen();
    let story = seed(&pool, &clock, content("Bare", Some(Uuid::new_v4()), &[Uuid::new_v4()])).await;
    let unit = repo(&pool, &clock);
    let mut loaded = unit.load_for_update(story.id).await.unwrap().unwrap();
    loaded.cover_image_id = None;
    loaded.tag_ids.clear();

    unit.update(loaded).await.unwrap();

    assert_eq!(count_rows(&pool, "post_images", story.id).await, 0);
    assert_eq!(count_rows(&pool, "post_tags", story.id).await, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_baseline_is_not_refreshed_by_a_successful_update(pool: PgPool) {
    // Arrange
    let clock = frozen();
    let story = seed(&pool, &clock, content("Twice", None, &[])).await;
    let unit = repo(&pool, &clock);
    let loaded = unit.load_for_update(story.id).await.unwrap().unwrap();
    let WriteOutcome::Written(written) = unit.update(loaded).await.unwrap() else {
        panic!("expected a successful write");
    };

    // Act
    let again = unit.update(written).await.unwrap();

    // Assert
    assert!(again.is_conflict());
}

// --- delete ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_delete_removes_story_and_cascades(pool: PgPool) {
    // Arrange
    let clock = frozen();
    let story = seed(&pool, &clock, content("Gone", Some(Uuid::new_v4()), &[Uuid::new_v4()])).await;
    sqlx::query(
        "INSERT INTO comments (id, post_id, author_id, body, created_at) VALUES ($1, $2, $3, 'hi', $4)",
    )
    .bind(Uuid::new_v4())
    .bind(story.id)
    .bind(Uuid::new_v4())
    .bind(t0())
    .execute(&pool)
    .await
    .unwrap();
    let unit = repo(&pool, &clock);
    let loaded = unit.load_for_update(story.id).await.unwrap().unwrap();

    // Act
    let outcome = unit.delete(loaded).await.unwrap();

    // Assert
    assert!(!outcome.is_conflict());
    for table in ["posts", "stories", "post_images", "post_tags", "comments"] {
        assert_eq!(count_rows(&pool, table, story.id).await, 0, "{table} not emptied");
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_delete_after_concurrent_update_conflicts(pool: PgPool) {
    // Arrange
    let clock = frozen();
    let story = seed(&pool, &clock, content("Survivor", None, &[])).await;
    let deleter = repo(&pool, &clock);
    let stale = deleter.load_for_update(story.id).await.unwrap().unwrap();
    let editor = repo(&pool, &clock);
    let fresh = editor.load_for_update(story.id).await.unwrap().unwrap();
    editor.update(fresh).await.unwrap();

    // Act
    let outcome = deleter.delete(stale).await.unwrap();

    // Assert
    assert!(outcome.is_conflict());
    assert_eq!(count_rows(&pool, "posts", story.id).await, 1);
}

// --- unit of work factory ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_factory_units_do_not_share_baselines(pool: PgPool) {
    // Arrange
    let clock = frozen();
    let story = seed(&pool, &clock, content("Isolated", None, &[])).await;
    let factory = PgStoryRepositoryFactory::new(pool.clone(), Arc::clone(&clock));
    let first = factory.begin();
    first.load_for_update(story.id).await.unwrap();

    // Act
    let result = factory.begin().update(story.clone()).await;

    // Assert
    assert!(matches!(result, Err(DomainError::MissingBaseline(_))));
}
