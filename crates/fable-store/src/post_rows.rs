//! Supertype (`posts`) row writer.
//!
//! Every write to an existing row is a compare-and-swap on `updated_at`.

use chrono::{DateTime, Utc};
use fable_core::error::DomainError;
use sqlx::PgConnection;
use uuid::Uuid;

/// Inserts a supertype row with `created_at = updated_at = at`.
pub(crate) async fn insert(
    conn: &mut PgConnection,
    id: Uuid,
    kind: &str,
    created_by_id: Uuid,
    at: DateTime<Utc>,
) -> Result<(), DomainError> {
    sqlx::query(
        r"
        INSERT INTO posts (id, kind, created_by_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $4)
        ",
    )
    .bind(id)
    .bind(kind)
    .bind(created_by_id)
    .bind(at)
    .execute(&mut *conn)
    .await
    .map_err(|e| DomainError::persistence(format!("inserting posts row {id}"), e))?;
    Ok(())
}

/// Advances `updated_at` if the row still carries `baseline`.
///
/// The new value is `max(now, baseline + 1µs)` so that the token strictly
/// increases even when the clock has not moved. Returns `None` when the
/// predicate matched no row.
pub(crate) async fn compare_and_touch(
    conn: &mut PgConnection,
    id: Uuid,
    baseline: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, DomainError> {
    sqlx::query_scalar::<_, DateTime<Utc>>(
        r"
        UPDATE posts
        SET updated_at = GREATEST($3, updated_at + INTERVAL '1 microsecond')
        WHERE id = $1 AND updated_at = $2
        RETURNING updated_at
        ",
    )
    .bind(id)
    .bind(baseline)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| DomainError::persistence(format!("updating posts row {id}"), e))
}

/// Deletes the row if it still carries `baseline`. Subtype and link rows go
/// with it through `ON DELETE CASCADE`. Returns `false` when the predicate
/// matched no row.
pub(crate) async fn compare_and_delete(
    conn: &mut PgConnection,
    id: Uuid,
    baseline: DateTime<Utc>,
) -> Result<bool, DomainError> {
    let result = sqlx::query("DELETE FROM posts WHERE id = $1 AND updated_at = $2")
        .bind(id)
        .bind(baseline)
        .execute(&mut *conn)
        .await
        .map_err(|e| DomainError::persistence(format!("deleting posts row {id}"), e))?;
    Ok(result.rows_affected() > 0)
}
