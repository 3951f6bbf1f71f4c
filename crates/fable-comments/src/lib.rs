//! Fable: Comments bounded context.
//!
//! Readers attach comments to stories. Threads are two levels deep: top-level
//! comments and their direct replies. Listings are keyset-paginated and each
//! top-level comment carries a preview of its first replies.

pub mod application;
pub mod domain;
