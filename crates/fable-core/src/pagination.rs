//! Keyset pagination primitives: opaque cursors, page requests and pages.
//!
//! A cursor pins the `(created_at, id)` position of the last row a caller
//! saw, optionally scoped to the parent the rows belong to. On the wire it is
//! `base64url(JSON{"parentId", "createdAt", "id"})` with `createdAt` in
//! microseconds since the Unix epoch. Callers must treat the token as opaque.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::DomainError;

/// Default number of items per page.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

const REQUIRED_FIELDS: [&str; 3] = ["parentId", "createdAt", "id"];

/// Reasons a cursor token is rejected.
#[derive(Debug, Error)]
pub enum CursorError {
    /// The token is not base64url.
    #[error("cursor is not valid base64url: {0}")]
    Encoding(#[from] base64::DecodeError),

    /// The decoded bytes are not the expected JSON document.
    #[error("cursor payload is malformed: {0}")]
    Payload(#[from] serde_json::Error),

    /// A required field is absent.
    #[error("cursor is missing field `{0}`")]
    MissingField(&'static str),

    /// An id field does not hold a UUID.
    #[error("cursor field `{0}` is not a valid id")]
    InvalidId(&'static str),

    /// The timestamp cannot be represented.
    #[error("cursor timestamp {0} is out of range")]
    TimestampOutOfRange(i64),

    /// The cursor was issued for a different parent than the one being paged.
    #[error("cursor was issued for parent {found:?} but is being used to page parent {expected:?}")]
    ParentMismatch {
        /// The parent being paged (`None` for top-level listings).
        expected: Option<Uuid>,
        /// The parent recorded in the cursor.
        found: Option<Uuid>,
    },
}

/// Decoded keyset position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cursor {
    parent_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CursorToken {
    parent_id: Option<String>,
    created_at: i64,
    id: String,
}

impl Cursor {
    /// Cursor for a top-level listing.
    #[must_use]
    pub fn top_level(created_at: DateTime<Utc>, id: Uuid) -> Self {
        Self {
            parent_id: None,
            created_at,
            id,
        }
    }

    /// Cursor for the children of `parent_id`.
    #[must_use]
    pub fn child_of(parent_id: Uuid, created_at: DateTime<Utc>, id: Uuid) -> Self {
        Self {
            parent_id: Some(parent_id),
            created_at,
            id,
        }
    }

    /// The parent this cursor pages, if any.
    #[must_use]
    pub fn parent_id(&self) -> Option<Uuid> {
        self.parent_id
    }

    /// Timestamp of the last row seen.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Id of the last row seen.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Encodes the cursor as an opaque token.
    #[must_use]
    pub fn encode(&self) -> String {
        let json = serde_json::json!({
            "parentId": self.parent_id.map(|id| id.to_string()),
            "createdAt": self.created_at.timestamp_micros(),
            "id": self.id.to_string(),
        });
        URL_SAFE_NO_PAD.encode(json.to_string())
    }

    /// Decodes a token produced by [`Cursor::encode`].
    ///
    /// # Errors
    ///
    /// Returns `CursorError` for anything that is not a well-formed token.
    /// A malformed token is never treated as "no cursor".
    pub fn decode(token: &str) -> Result<Self, CursorError> {
        let bytes = URL_SAFE_NO_PAD.decode(token.trim())?;
        let value: serde_json::Value = serde_json::from_slice(&bytes)?;
        for field in REQUIRED_FIELDS {
            if value.get(field).is_none() {
                return Err(CursorError::MissingField(field));
            }
        }
        let token: CursorToken = serde_json::from_value(value)?;

        let parent_id = token
            .parent_id
            .map(|raw| Uuid::parse_str(&raw).map_err(|_| CursorError::InvalidId("parentId")))
            .transpose()?;
        let id = Uuid::parse_str(&token.id).map_err(|_| CursorError::InvalidId("id"))?;
        let created_at = DateTime::from_timestamp_micros(token.created_at)
            .ok_or(CursorError::TimestampOutOfRange(token.created_at))?;

        Ok(Self {
            parent_id,
            created_at,
            id,
        })
    }

    /// Accepts the cursor only if it addresses a top-level listing.
    ///
    /// # Errors
    ///
    /// Returns `CursorError::ParentMismatch` for reply cursors.
    pub fn ensure_top_level(self) -> Result<Self, CursorError> {
        self.ensure_parent(None)
    }

    /// Accepts the cursor only if it addresses `expected`.
    ///
    /// # Errors
    ///
    /// Returns `CursorError::ParentMismatch` when the recorded parent differs.
    pub fn ensure_parent(self, expected: Option<Uuid>) -> Result<Self, CursorError> {
        if self.parent_id == expected {
            Ok(self)
        } else {
            Err(CursorError::ParentMismatch {
                expected,
                found: self.parent_id,
            })
        }
    }
}

/// Ordering of a keyset listing over `(created_at, id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Oldest first.
    #[default]
    Asc,
    /// Newest first.
    Desc,
}

/// Caller-supplied paging parameters.
///
/// The limit always lies in `1..=MAX_PAGE_SIZE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    limit: u32,
    sort: SortDirection,
    cursor: Option<String>,
}

impl PageRequest {
    /// Builds a request, applying the default page size.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` when `limit` is outside
    /// `1..=MAX_PAGE_SIZE`.
    pub fn new(
        limit: Option<u32>,
        sort: SortDirection,
        cursor: Option<String>,
    ) -> Result<Self, DomainError> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(DomainError::Validation(format!(
                "page limit must be between 1 and {MAX_PAGE_SIZE}, got {limit}"
            )));
        }
        Ok(Self {
            limit,
            sort,
            cursor: cursor.filter(|token| !token.is_empty()),
        })
    }

    /// First page of `limit` items, with `limit` clamped to
    /// `1..=MAX_PAGE_SIZE`.
    #[must_use]
    pub fn first(limit: u32, sort: SortDirection) -> Self {
        Self {
            limit: limit.clamp(1, MAX_PAGE_SIZE),
            sort,
            cursor: None,
        }
    }

    /// Maximum number of items to return.
    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Ordering of the listing.
    #[must_use]
    pub fn sort(&self) -> SortDirection {
        self.sort
    }

    /// Opaque token from a previous page, if resuming.
    #[must_use]
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// The same request resumed from `cursor`.
    #[must_use]
    pub fn resume(&self, cursor: impl Into<String>) -> Self {
        Self {
            cursor: Some(cursor.into()),
            ..self.clone()
        }
    }

    /// Decodes the cursor, if any, and checks it addresses `parent_id`.
    ///
    /// # Errors
    ///
    /// Returns `CursorError` for malformed or misaddressed tokens.
    pub fn decode_cursor(&self, parent_id: Option<Uuid>) -> Result<Option<Cursor>, CursorError> {
        self.cursor
            .as_deref()
            .map(|token| Cursor::decode(token)?.ensure_parent(parent_id))
            .transpose()
    }
}

/// One page of a keyset listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    /// Items in listing order.
    pub items: Vec<T>,
    /// Token for the next page; `None` once the listing is exhausted.
    pub next_cursor: Option<String>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> Page<T> {
    /// A page with no items and no continuation.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
        }
    }

    /// Builds a page from `limit + 1` fetched rows.
    ///
    /// When more than `limit` rows came back the extra row is dropped and the
    /// continuation cursor points at the last row kept.
    pub fn from_overfetch(
        mut rows: Vec<T>,
        limit: usize,
        cursor_of: impl FnOnce(&T) -> Cursor,
    ) -> Self {
        if rows.len() <= limit {
            return Self {
                items: rows,
                next_cursor: None,
            };
        }
        rows.truncate(limit);
        let next_cursor = rows.last().map(|last| cursor_of(last).encode());
        Self {
            items: rows,
            next_cursor,
        }
    }

    /// Transforms every item, keeping the continuation token.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
        }
    }
}
