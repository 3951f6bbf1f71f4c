//! Groups window-ranked reply rows into per-parent preview pages.

use std::collections::HashMap;

use fable_comments::domain::read_models::ReplyRow;
use fable_core::pagination::Page;
use uuid::Uuid;

/// A reply with its position among its siblings and the sibling count.
#[derive(Debug, Clone)]
pub(crate) struct RankedReply {
    pub reply: ReplyRow,
    /// 1-based `ROW_NUMBER()` within the parent, oldest first.
    pub rank: i64,
    /// `COUNT(*)` of the parent's replies.
    pub total: i64,
}

/// Keeps the first `preview_limit` replies of each parent.
///
/// A parent's page carries a continuation cursor, positioned at its last
/// kept reply, exactly when it has more replies than were kept.
pub(crate) fn group_previews(
    rows: Vec<RankedReply>,
    preview_limit: u32,
) -> HashMap<Uuid, Page<ReplyRow>> {
    let limit = i64::from(preview_limit);
    let mut grouped: HashMap<Uuid, (Vec<RankedReply>, i64)> = HashMap::new();
    for row in rows.into_iter().filter(|row| row.rank <= limit) {
        let total = row.total;
        grouped
            .entry(row.reply.parent_comment_id)
            .or_insert_with(|| (Vec::new(), total))
            .0
            .push(row);
    }

    grouped
        .into_iter()
        .map(|(parent_id, (mut ranked, total))| {
            ranked.sort_by_key(|row| row.rank);
            let items: Vec<ReplyRow> = ranked.into_iter().map(|row| row.reply).collect();
            let next_cursor = if total > limit {
                items.last().map(|last| last.cursor().encode())
            } else {
                None
            };
            (parent_id, Page { items, next_cursor })
        })
        .collect()
}
