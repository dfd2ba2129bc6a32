//! Packing engine for rectangular tiles on a growable cell grid.
//!
//! Items are placed into an occupancy matrix; when a requested position is
//! taken, a named conflict-resolution strategy decides who moves. The
//! modules keep the same split as the rest of the workspace: plain data
//! (`geometry`, `settings`), the matrix and search engine, the resolver
//! registry, and the [`Grid`] that ties them together.

pub mod error;
pub mod events;
pub mod geometry;
pub mod grid;
pub mod logging;
pub mod matrix;
pub mod metrics;
pub mod placement;
pub mod resolve;
pub mod settings;

pub use error::{GridError, PlacementError, Result};
pub use events::{
    GridEvent, GridEventRecord, GridEventRecordBuilder, GridObserver, LoggingObserver,
    NullObserver, RecordingObserver,
};
pub use geometry::{Item, ItemKey, Position, Rect, Size};
pub use grid::{AddOptions, Grid, GridBuilder, RemoveOptions, SharedGrid};
pub use logging::{
    JsonLinesSink, LogEvent, LogFields, LogLevel, LogSink, Logger, LoggingError, LoggingResult,
    MemorySink, NullSink,
};
pub use matrix::{Bounds, CountMode, GridMatrix};
pub use metrics::{GridMetrics, MetricSnapshot};
pub use placement::{Direction, Fit, PlacementEngine, SearchOptions, Subject};
pub use resolve::{
    ConflictResolver, Conflicts, FindEmpty, MoveConflicting, ResolutionOrder, ResolverRegistry,
    Strategy,
};
pub use settings::GridSettings;
