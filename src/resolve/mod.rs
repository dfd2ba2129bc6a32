//! Conflict resolution strategies.
//!
//! Strategies are looked up by name in a per-grid [`ResolverRegistry`]. The
//! two built-ins cover the common dashboard behaviours; callers can insert
//! their own implementations (closures work too) under any name.

mod builtins;
mod core;

pub use builtins::{FindEmpty, MoveConflicting};
pub use core::{ConflictResolver, Conflicts, ResolutionOrder, ResolverRegistry, Strategy};
