//! Value types describing cells, extents and grid items.

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Handle to an item owned by a [`Grid`](crate::Grid).
    pub struct ItemKey;
}

/// Top-left anchor of an item, measured in grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: u32,
    pub y: u32,
}

impl Position {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Width and height of an item in grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

impl Size {
    pub const fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }
}

/// Rectangle covered by a placed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub fn at(position: Position, size: Size) -> Self {
        Self::new(position.x, position.y, size.w, size.h)
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.w)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.h)
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Every `(x, y)` cell of the rectangle in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32)> + use<> {
        let (x0, x1, y0, y1) = (self.x, self.right(), self.y, self.bottom());
        (y0..y1).flat_map(move |y| (x0..x1).map(move |x| (x, y)))
    }
}

/// A rectangular tile managed by the grid.
///
/// `x`/`y` stay `None` until the placement engine has chosen a position.
/// Items sharing a defined `id` are treated as the same logical tile and
/// never conflict with each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<u32>,
    pub w: u32,
    pub h: u32,
}

impl Item {
    /// Create an unpositioned item.
    ///
    /// # Panics
    /// Panics if either extent is zero
    pub fn new(w: u32, h: u32) -> Self {
        assert!(w > 0 && h > 0, "Item extent must be non-zero");
        Self {
            id: None,
            x: None,
            y: None,
            w,
            h,
        }
    }

    pub fn at(mut self, x: u32, y: u32) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn position(&self) -> Option<Position> {
        match (self.x, self.y) {
            (Some(x), Some(y)) => Some(Position::new(x, y)),
            _ => None,
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.w, self.h)
    }

    /// Covered rectangle; `None` when unpositioned or when an edge would
    /// fall outside the `u32` range.
    pub fn rect(&self) -> Option<Rect> {
        let pos = self.position()?;
        pos.x.checked_add(self.w)?;
        pos.y.checked_add(self.h)?;
        Some(Rect::at(pos, self.size()))
    }

    pub fn set_position(&mut self, position: Position) {
        self.x = Some(position.x);
        self.y = Some(position.y);
    }

    /// True when both items carry the same defined `id`.
    pub fn shares_id(&self, other: &Item) -> bool {
        matches!((&self.id, &other.id), (Some(a), Some(b)) if a == b)
    }
}
