//! Fit testing and empty-space search.
//!
//! The engine is a read-only view over the matrix and the item arena; it
//! reports positions and never moves anything itself. The grid decides what
//! to do with the answers.

mod core;

pub use core::{Direction, Fit, PlacementEngine, SearchOptions, Subject};
