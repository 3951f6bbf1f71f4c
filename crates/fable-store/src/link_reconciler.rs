//! Keeps the `post_images` and `post_tags` link rows in step with a story.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use fable_core::error::DomainError;
use fable_stories::domain::aggregates::Story;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::schema::COVER_IMAGE_ROLE;

/// The single statement needed to move the cover link from its stored state
/// to the aggregate's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CoverLinkChange {
    Unchanged,
    Attach(Uuid),
    Replace(Uuid),
    Detach,
}

/// Compares by image id only: the role is part of the link's key, so two
/// cover links can differ in nothing else.
pub(crate) fn plan_cover_link(existing: Option<Uuid>, desired: Option<Uuid>) -> CoverLinkChange {
    match (existing, desired) {
        (None, None) => CoverLinkChange::Unchanged,
        (None, Some(image_id)) => CoverLinkChange::Attach(image_id),
        (Some(_), None) => CoverLinkChange::Detach,
        (Some(current), Some(image_id)) if current == image_id => CoverLinkChange::Unchanged,
        (Some(_), Some(image_id)) => CoverLinkChange::Replace(image_id),
    }
}

/// Applies the story's cover image and tag set to the link tables.
pub(crate) async fn reconcile_links(
    conn: &mut PgConnection,
    story: &Story,
    now: DateTime<Utc>,
) -> Result<(), DomainError> {
    reconcile_cover(conn, story.id, story.cover_image_id, now).await?;
    reconcile_tags(conn, story.id, &story.tag_ids, now).await
}

async fn reconcile_cover(
    conn: &mut PgConnection,
    post_id: Uuid,
    desired: Option<Uuid>,
    now: DateTime<Utc>,
) -> Result<(), DomainError> {
    let existing = sqlx::query_scalar::<_, Uuid>(
        "SELECT image_id FROM post_images WHERE post_id = $1 AND role = $2",
    )
    .bind(post_id)
    .bind(COVER_IMAGE_ROLE)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| DomainError::persistence(format!("reading cover link of {post_id}"), e))?;

    let statement = match plan_cover_link(existing, desired) {
        CoverLinkChange::Unchanged => return Ok(()),
        CoverLinkChange::Attach(image_id) => sqlx::query(
            r"
            INSERT INTO post_images (post_id, role, image_id, created_at)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(post_id)
        .bind(COVER_IMAGE_ROLE)
        .bind(image_id)
        .bind(now),
        CoverLinkChange::Replace(image_id) => sqlx::query(
            r"
            UPDATE post_images SET image_id = $3, created_at = $4
            WHERE post_id = $1 AND role = $2
            ",
        )
        .bind(post_id)
        .bind(COVER_IMAGE_ROLE)
        .bind(image_id)
        .bind(now),
        CoverLinkChange::Detach => {
            sqlx::query("DELETE FROM post_images WHERE post_id = $1 AND role = $2")
                .bind(post_id)
                .bind(COVER_IMAGE_ROLE)
        }
    };

    statement
        .execute(&mut *conn)
        .await
        .map_err(|e| DomainError::persistence(format!("writing cover link of {post_id}"), e))?;
    Ok(())
}

/// Makes the stored tag links equal to `tag_ids`. Links for tags that stay
/// attached keep their original `created_at`.
async fn reconcile_tags(
    conn: &mut PgConnection,
    post_id: Uuid,
    tag_ids: &BTreeSet<Uuid>,
    now: DateTime<Utc>,
) -> Result<(), DomainError> {
    let desired: Vec<Uuid> = tag_ids.iter().copied().collect();

    sqlx::query("DELETE FROM post_tags WHERE post_id = $1 AND tag_id <> ALL($2)")
        .bind(post_id)
        .bind(&desired[..])
        .execute(&mut *conn)
        .await
        .map_err(|e| DomainError::persistence(format!("removing tag links of {post_id}"), e))?;

    if desired.is_empty() {
        return Ok(());
    }

    sqlx::query(
        r"
        INSERT INTO post_tags (post_id, tag_id, created_at)
        SELECT $1, tag_id, $3 FROM UNNEST($2::uuid[]) AS t (tag_id)
        ON CONFLICT (post_id, tag_id) DO NOTHING
        ",
    )
    .bind(post_id)
    .bind(&desired[..])
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(|e| DomainError::persistence(format!("adding tag links of {post_id}"), e))?;
    Ok(())
}
