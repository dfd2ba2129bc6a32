//! Dense occupancy matrix backing the grid.
//!
//! Cells hold [`ItemKey`](crate::ItemKey)s into the grid's item arena rather
//! than the items themselves, so the item list stays the single source of
//! truth.

mod core;

pub use core::{Bounds, CountMode, GridMatrix};
