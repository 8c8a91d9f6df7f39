//! Opaque cursors and page slicing for collection-returning tools.

/// Cursor encoding and validation.
pub mod cursor;

/// Page slicing over materialized result sets.
pub mod page;

pub use cursor::Cursor;
pub use page::{paginate, Page};
