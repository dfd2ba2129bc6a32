//! The grid: item ownership and placement orchestration.
//!
//! # Example
//! ```
//! use gridfit::{AddOptions, Grid, GridSettings, Item, Position};
//!
//! let settings = GridSettings::default().with_rows(2, 0).with_cols(2, 0);
//! let mut grid = Grid::new(settings)?;
//!
//! let a = grid.add_item(Item::new(1, 1), &AddOptions::default());
//! let b = grid.add_item(Item::new(1, 1), &AddOptions::default());
//! let c = grid.add_item(Item::new(1, 1), &AddOptions::default());
//!
//! assert_eq!(grid.item(c).and_then(Item::position), Some(Position::new(0, 1)));
//! assert_eq!(grid.occupant(1, 0), Some(b));
//! # let _ = a;
//! # Ok::<(), gridfit::GridError>(())
//! ```

mod core;

pub use core::{AddOptions, Grid, GridBuilder, RemoveOptions, SharedGrid};
