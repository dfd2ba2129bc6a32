use thiserror::Error;

/// Unified result type for the gridfit crate.
pub type Result<T> = std::result::Result<T, GridError>;

/// Errors surfaced while constructing or configuring a grid.
#[derive(Debug, Error)]
pub enum GridError {
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    #[error("`{0}` is not a known conflict resolution strategy")]
    UnknownStrategy(String),
    #[error("placement error: {0}")]
    Placement(#[from] PlacementError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Reasons a single item could not be written into the grid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlacementError {
    #[error("item needs {needed} rows but the grid is capped at {max}")]
    RowLimit { needed: u32, max: u32 },
    #[error("item needs {needed} columns but the grid is capped at {max}")]
    ColumnLimit { needed: u32, max: u32 },
    #[error("no empty position available")]
    NoSpace,
    #[error("conflicts could not be resolved")]
    Unresolved,
    #[error("item extent must be at least 1x1")]
    EmptyExtent,
    #[error("item is not part of this grid")]
    UnknownItem,
}
