/// Bounded breadth-first search for member reference paths between types.
pub mod path;

pub use path::{PathFinder, TypePath};
