//! `PostgreSQL` implementation of `AuthorLookup` over the `users` table.

use std::collections::HashMap;

use async_trait::async_trait;
use fable_comments::application::ports::AuthorLookup;
use fable_comments::domain::read_models::AuthorSummary;
use fable_core::error::DomainError;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
struct UserRecord {
    id: Uuid,
    display_name: String,
    avatar_url: Option<String>,
}

/// Resolves author identities with one query per batch.
#[derive(Debug, Clone)]
pub struct PgAuthorLookup {
    pool: PgPool,
}

impl PgAuthorLookup {
    /// Creates a new `PgAuthorLookup`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthorLookup for PgAuthorLookup {
    async fn find_authors(
        &self,
        author_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, AuthorSummary>, DomainError> {
        if author_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let records = sqlx::query_as::<_, UserRecord>(
            "SELECT id, display_name, avatar_url FROM users WHERE id = ANY($1)",
        )
        .bind(author_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::persistence("loading comment authors", e))?;

        Ok(records
            .into_iter()
            .map(|user| {
                (
                    user.id,
                    AuthorSummary {
                        id: user.id,
                        display_name: user.display_name,
                        avatar_url: user.avatar_url,
                    },
                )
            })
            .collect())
    }
}
