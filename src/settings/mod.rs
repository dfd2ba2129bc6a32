//! Grid configuration.
//!
//! Settings are plain data: they can be built in code or loaded from JSON,
//! and are validated once when a [`Grid`](crate::Grid) is constructed. After
//! that they never change for the lifetime of the grid.

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};
use crate::matrix::Bounds;
use crate::resolve::Strategy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    pub min_rows: u32,
    /// Zero leaves the row count unbounded.
    pub max_rows: u32,
    pub min_cols: u32,
    /// Zero leaves the column count unbounded.
    pub max_cols: u32,
    /// Report the configured maximum as the effective extent.
    pub fill_max: bool,
    /// Name of the registered strategy used to resolve conflicts.
    pub conflict_resolution: Option<String>,
    /// Direction tokens tried by displacement strategies, e.g. `["up", "left"]`.
    pub resolution_order: Option<Vec<String>>,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            min_rows: 1,
            max_rows: 0,
            min_cols: 1,
            max_cols: 0,
            fill_max: false,
            conflict_resolution: Some(Strategy::FindEmpty.name().to_string()),
            resolution_order: None,
        }
    }
}

impl GridSettings {
    pub fn from_json(source: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(source)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn with_rows(mut self, min: u32, max: u32) -> Self {
        self.min_rows = min;
        self.max_rows = max;
        self
    }

    pub fn with_cols(mut self, min: u32, max: u32) -> Self {
        self.min_cols = min;
        self.max_cols = max;
        self
    }

    pub fn with_fill_max(mut self, fill_max: bool) -> Self {
        self.fill_max = fill_max;
        self
    }

    pub fn with_strategy(mut self, name: impl Into<String>) -> Self {
        self.conflict_resolution = Some(name.into());
        self
    }

    /// Disable conflict resolution; conflicting placements are rejected.
    pub fn without_strategy(mut self) -> Self {
        self.conflict_resolution = None;
        self
    }

    pub fn with_resolution_order<I, S>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resolution_order = Some(order.into_iter().map(Into::into).collect());
        self
    }

    /// Check extent limits. Strategy names are checked against the grid's
    /// registry when the grid is built.
    pub fn validate(&self) -> Result<()> {
        if self.min_rows == 0 {
            return Err(GridError::InvalidSettings(
                "min_rows must be at least 1".into(),
            ));
        }
        if self.min_cols == 0 {
            return Err(GridError::InvalidSettings(
                "min_cols must be at least 1".into(),
            ));
        }
        if self.max_rows != 0 && self.max_rows < self.min_rows {
            return Err(GridError::InvalidSettings(format!(
                "max_rows {} is below min_rows {}",
                self.max_rows, self.min_rows
            )));
        }
        if self.max_cols != 0 && self.max_cols < self.min_cols {
            return Err(GridError::InvalidSettings(format!(
                "max_cols {} is below min_cols {}",
                self.max_cols, self.min_cols
            )));
        }
        Ok(())
    }

    pub fn bounds(&self) -> Bounds {
        Bounds {
            min_rows: self.min_rows,
            max_rows: self.max_rows,
            min_cols: self.min_cols,
            max_cols: self.max_cols,
            fill_max: self.fill_max,
        }
    }
}
