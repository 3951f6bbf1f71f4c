//! Schema constants shared by the repositories.
//!
//! The tables themselves are created by the SQL files in the workspace
//! `migrations/` directory.

use fable_core::pagination::SortDirection;

/// `posts.kind` discriminator for story rows.
pub const STORY_POST_KIND: &str = "story";

/// `post_images.role` of the cover image link.
pub const COVER_IMAGE_ROLE: &str = "cover";

/// `ORDER BY` keyword for a keyset listing.
pub(crate) fn order_keyword(sort: SortDirection) -> &'static str {
    match sort {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    }
}

/// Row-tuple comparison that selects rows strictly after the cursor in
/// listing order.
pub(crate) fn keyset_operator(sort: SortDirection) -> &'static str {
    match sort {
        SortDirection::Asc => ">",
        SortDirection::Desc => "<",
    }
}
