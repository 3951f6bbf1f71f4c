//! PostgreSQL persistence for the Fable story platform.
//!
//! - [`pg_story_repository`] writes the `Story` aggregate across its
//!   supertype, subtype and link tables under optimistic concurrency.
//! - [`pg_thread_reader`] serves keyset-paginated comment threads with
//!   batched reply previews.
//! - [`pg_comment_repository`] and [`pg_author_lookup`] back the remaining
//!   comment ports.
//!
//! The schema lives in the workspace `migrations/` directory.

mod link_reconciler;
mod post_rows;
mod reply_previews;

pub mod pg_author_lookup;
pub mod pg_comment_repository;
pub mod pg_story_repository;
pub mod pg_thread_reader;
pub mod schema;
