use crate::error::PlacementError;
use crate::geometry::{ItemKey, Rect};

/// Growth limits applied to the matrix. A zero maximum is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min_rows: u32,
    pub max_rows: u32,
    pub min_cols: u32,
    pub max_cols: u32,
    pub fill_max: bool,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min_rows: 1,
            max_rows: 0,
            min_cols: 1,
            max_cols: 0,
            fill_max: false,
        }
    }
}

/// Which extent a row/column count should report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountMode {
    /// Rows/columns actually allocated (0 when empty).
    Current,
    /// Extent used to bound searches: the maximum under `fill_max`, else the
    /// allocated extent, else the configured minimum.
    Effective,
}

type Row = Vec<Option<ItemKey>>;

/// Rectangular matrix of optional item keys that grows on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridMatrix {
    bounds: Bounds,
    rows: Vec<Row>,
    cols: u32,
}

impl GridMatrix {
    pub fn new(bounds: Bounds) -> Self {
        let mut matrix = Self {
            bounds,
            rows: Vec::new(),
            cols: 0,
        };
        matrix.reset();
        matrix
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn row_count(&self, mode: CountMode) -> u32 {
        let current = self.rows.len() as u32;
        match mode {
            CountMode::Current => current,
            CountMode::Effective => {
                if self.bounds.fill_max && self.bounds.max_rows > 0 {
                    self.bounds.max_rows
                } else if current > 0 {
                    current
                } else {
                    self.bounds.min_rows
                }
            }
        }
    }

    pub fn col_count(&self, mode: CountMode) -> u32 {
        let current = if self.rows.is_empty() { 0 } else { self.cols };
        match mode {
            CountMode::Current => current,
            CountMode::Effective => {
                if self.bounds.fill_max && self.bounds.max_cols > 0 {
                    self.bounds.max_cols
                } else if current > 0 {
                    current
                } else {
                    self.bounds.min_cols
                }
            }
        }
    }

    /// Grow to at least `count` rows. Returns `false` when that would exceed
    /// `max_rows`.
    pub fn ensure_rows(&mut self, count: u32) -> bool {
        if count as usize <= self.rows.len() {
            return true;
        }
        if self.bounds.max_rows > 0 && count > self.bounds.max_rows {
            return false;
        }
        let width = self.cols as usize;
        self.rows.resize_with(count as usize, || vec![None; width]);
        true
    }

    /// Grow every row to at least `count` columns. Returns `false` when that
    /// would exceed `max_cols`.
    pub fn ensure_cols(&mut self, count: u32) -> bool {
        if count <= self.cols {
            return true;
        }
        if self.bounds.max_cols > 0 && count > self.bounds.max_cols {
            return false;
        }
        for row in &mut self.rows {
            row.resize(count as usize, None);
        }
        self.cols = count;
        true
    }

    /// Occupant of the cell at `(x, y)`; cells outside the matrix are empty.
    pub fn get(&self, x: u32, y: u32) -> Option<ItemKey> {
        self.rows
            .get(y as usize)
            .and_then(|row| row.get(x as usize))
            .copied()
            .flatten()
    }

    /// Occupy every cell of `rect` with `key`, growing as needed.
    ///
    /// Both limits are checked before any cell changes, so a failed write
    /// leaves the matrix untouched.
    pub fn write(&mut self, key: ItemKey, rect: Rect) -> Result<(), PlacementError> {
        let needed_rows = rect.bottom();
        let needed_cols = rect.right();
        if self.bounds.max_rows > 0 && needed_rows > self.bounds.max_rows {
            return Err(PlacementError::RowLimit {
                needed: needed_rows,
                max: self.bounds.max_rows,
            });
        }
        if self.bounds.max_cols > 0 && needed_cols > self.bounds.max_cols {
            return Err(PlacementError::ColumnLimit {
                needed: needed_cols,
                max: self.bounds.max_cols,
            });
        }

        self.ensure_cols(needed_cols);
        self.ensure_rows(needed_rows);
        for row in &mut self.rows[rect.y as usize..needed_rows as usize] {
            for cell in &mut row[rect.x as usize..needed_cols as usize] {
                *cell = Some(key);
            }
        }
        Ok(())
    }

    /// Empty every cell of `rect` still held by `key`. Returns the number of
    /// cells released.
    pub fn clear(&mut self, key: ItemKey, rect: Rect) -> usize {
        let mut released = 0;
        for (x, y) in rect.cells() {
            let Some(cell) = self
                .rows
                .get_mut(y as usize)
                .and_then(|row| row.get_mut(x as usize))
            else {
                continue;
            };
            if *cell == Some(key) {
                *cell = None;
                released += 1;
            }
        }
        released
    }

    /// Drop every row and regrow to the effective minimum extent.
    pub fn reset(&mut self) {
        self.rows.clear();
        self.cols = 0;
        let cols = self.col_count(CountMode::Effective);
        let rows = self.row_count(CountMode::Effective);
        self.ensure_cols(cols);
        self.ensure_rows(rows);
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Option<ItemKey>]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Cells currently holding `key`, in row-major order.
    pub fn cells_of(&self, key: ItemKey) -> Vec<(u32, u32)> {
        self.rows
            .iter()
            .enumerate()
            .flat_map(|(y, row)| {
                row.iter()
                    .enumerate()
                    .filter(move |(_, cell)| **cell == Some(key))
                    .map(move |(x, _)| (x as u32, y as u32))
            })
            .collect()
    }

    /// Hash of the matrix shape and occupancy. `label` maps each key to a
    /// value that is stable across grids (e.g. its index in the item list).
    pub fn fingerprint(&self, label: impl Fn(ItemKey) -> u64) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(self.rows.len() as u64).to_le_bytes());
        hasher.update(&u64::from(self.cols).to_le_bytes());
        for row in &self.rows {
            for cell in row {
                let value = cell.map(|key| label(key).wrapping_add(1)).unwrap_or(0);
                hasher.update(&value.to_le_bytes());
            }
        }
        hasher.finalize()
    }
}
