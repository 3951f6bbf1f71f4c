//! Fable: Stories bounded context.
//!
//! Owns the `Story` aggregate: a post with a name, description, visibility,
//! an optional cover image and a set of tags. Use cases load a story for
//! update, mutate it in memory and hand it back to an
//! `AggregateRepository<Story>` that enforces optimistic concurrency.

pub mod application;
pub mod domain;
