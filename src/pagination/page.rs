use serde::Serialize;

use super::cursor::Cursor;

/// One page of a larger, ordered result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: usize,
    pub returned_count: usize,
    /// Token for the following page; absent on the last page.
    #[serde(rename = "nextCursor", skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    /// Maps the items of this page, keeping the counts and cursor.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            returned_count: self.returned_count,
            next_cursor: self.next_cursor,
        }
    }
}

/// Slices `items[offset..offset + page_size]` out of an already materialized
/// sequence. An offset past the end yields an empty page, never an error.
pub fn paginate<T>(items: Vec<T>, cursor: Cursor) -> Page<T> {
    let total_count = items.len();
    let page: Vec<T> = items
        .into_iter()
        .skip(cursor.offset)
        .take(cursor.page_size)
        .collect();

    let next_cursor = if cursor.offset.saturating_add(cursor.page_size) < total_count {
        Some(cursor.next().encode())
    } else {
        None
    };

    Page {
        returned_count: page.len(),
        items: page,
        total_count,
        next_cursor,
    }
}
