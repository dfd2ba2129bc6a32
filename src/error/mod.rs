//! Error types shared across the grid engine.

mod types;

pub use types::{GridError, PlacementError, Result};
