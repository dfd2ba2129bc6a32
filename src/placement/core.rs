use slotmap::SlotMap;

use crate::geometry::{Item, ItemKey, Position};
use crate::matrix::{CountMode, GridMatrix};

/// Outcome of testing an item at a candidate anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fit {
    /// Every cell is free (or held by the item itself).
    Fits,
    /// Out of bounds, or conflicting when conflicts were not requested.
    Rejected,
    /// Existing occupants overlapping the candidate, in first-seen order.
    Conflicts(Vec<ItemKey>),
}

impl Fit {
    pub fn is_fit(&self) -> bool {
        matches!(self, Fit::Fits)
    }
}

/// Side of an item searched by the directional scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
    ];

    /// Parse a resolution-order token by its first letter (`l`, `r`, `u`, `d`).
    pub fn from_token(token: &str) -> Option<Self> {
        match token.chars().next()?.to_ascii_lowercase() {
            'l' => Some(Direction::Left),
            'r' => Some(Direction::Right),
            'u' => Some(Direction::Up),
            'd' => Some(Direction::Down),
            _ => None,
        }
    }
}

/// Scan window and direction for [`PlacementEngine::find_empty`].
///
/// Unset bounds default to the item's own position for the start, and to
/// the effective extent (rows get one spare row) or the configured maximum
/// for the end. Ranges are half-open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub start_x: Option<u32>,
    pub start_y: Option<u32>,
    pub end_x: Option<u32>,
    pub end_y: Option<u32>,
    pub reverse: bool,
}

impl SearchOptions {
    /// Scan the whole grid from the origin.
    pub fn from_origin() -> Self {
        Self {
            start_x: Some(0),
            start_y: Some(0),
            ..Self::default()
        }
    }

    pub fn reversed(mut self) -> Self {
        self.reverse = true;
        self
    }

    pub fn columns(mut self, start: u32, end: u32) -> Self {
        self.start_x = Some(start);
        self.end_x = Some(end);
        self
    }

    pub fn rows(mut self, start: u32, end: u32) -> Self {
        self.start_y = Some(start);
        self.end_y = Some(end);
        self
    }
}

/// The item being tested. `key` is `None` for an item not yet in the arena.
#[derive(Debug, Clone, Copy)]
pub struct Subject<'a> {
    pub key: Option<ItemKey>,
    pub item: &'a Item,
}

impl<'a> Subject<'a> {
    pub fn new(key: Option<ItemKey>, item: &'a Item) -> Self {
        Self { key, item }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    x: (u32, u32),
    y: (u32, u32),
}

pub struct PlacementEngine<'a> {
    matrix: &'a GridMatrix,
    items: &'a SlotMap<ItemKey, Item>,
}

impl<'a> PlacementEngine<'a> {
    pub fn new(matrix: &'a GridMatrix, items: &'a SlotMap<ItemKey, Item>) -> Self {
        Self { matrix, items }
    }

    /// Test `subject` anchored at `at`.
    ///
    /// The subject itself and items sharing its `id` are never conflicts.
    /// With `report_conflicts` unset an overlap is reported as `Rejected`.
    pub fn fits(&self, subject: Subject<'_>, at: Position, report_conflicts: bool) -> Fit {
        let bounds = self.matrix.bounds();
        let item = subject.item;
        let bottom = u64::from(at.y) + u64::from(item.h);
        let right = u64::from(at.x) + u64::from(item.w);
        if bottom > u64::from(u32::MAX) || right > u64::from(u32::MAX) {
            return Fit::Rejected;
        }
        if bounds.max_rows > 0 && bottom > u64::from(bounds.max_rows) {
            return Fit::Rejected;
        }
        if bounds.max_cols > 0 && right > u64::from(bounds.max_cols) {
            return Fit::Rejected;
        }

        let rows = u64::from(self.matrix.row_count(CountMode::Current)).min(bottom) as u32;
        let cols = u64::from(self.matrix.col_count(CountMode::Current)).min(right) as u32;
        let mut conflicts = Vec::new();
        for y in at.y..rows {
            for x in at.x..cols {
                let Some(occupant) = self.matrix.get(x, y) else {
                    continue;
                };
                if Some(occupant) == subject.key || conflicts.contains(&occupant) {
                    continue;
                }
                if self
                    .items
                    .get(occupant)
                    .is_some_and(|other| other.shares_id(item))
                {
                    continue;
                }
                conflicts.push(occupant);
            }
        }

        if conflicts.is_empty() {
            Fit::Fits
        } else if report_conflicts {
            Fit::Conflicts(conflicts)
        } else {
            Fit::Rejected
        }
    }

    /// First anchor in the scan window where `subject` fits.
    pub fn find_empty(&self, subject: Subject<'_>, options: &SearchOptions) -> Option<Position> {
        let bounds = self.matrix.bounds();
        let item = subject.item;
        let end_y = options.end_y.unwrap_or(if bounds.max_rows > 0 {
            bounds.max_rows
        } else {
            self.matrix.row_count(CountMode::Effective).saturating_add(1)
        });
        let end_x = options.end_x.unwrap_or(if bounds.max_cols > 0 {
            bounds.max_cols
        } else {
            self.matrix.col_count(CountMode::Effective)
        });
        let window = Window {
            x: (options.start_x.or(item.x).unwrap_or(0), end_x),
            y: (options.start_y.or(item.y).unwrap_or(0), end_y),
        };
        if options.reverse {
            self.scan_reverse(subject, window)
        } else {
            self.scan_forward(subject, window)
        }
    }

    /// Nearest free anchor on one side of the subject, staying in its row
    /// (left/right) or column (up/down). Requires a positioned subject.
    pub fn find_toward(&self, subject: Subject<'_>, direction: Direction) -> Option<Position> {
        let origin = subject.item.position()?;
        let bounds = self.matrix.bounds();
        let row = (origin.y, origin.y.saturating_add(1));
        let col = (origin.x, origin.x.saturating_add(1));
        match direction {
            Direction::Left => self.scan_reverse(
                subject,
                Window {
                    x: (0, origin.x),
                    y: row,
                },
            ),
            Direction::Right => {
                let end = if bounds.max_cols > 0 {
                    bounds.max_cols
                } else {
                    self.matrix.col_count(CountMode::Effective).saturating_add(1)
                };
                self.scan_forward(
                    subject,
                    Window {
                        x: (origin.x, end),
                        y: row,
                    },
                )
            }
            Direction::Up => self.scan_reverse(
                subject,
                Window {
                    x: col,
                    y: (0, origin.y),
                },
            ),
            Direction::Down => {
                let end = if bounds.max_rows > 0 {
                    bounds.max_rows
                } else {
                    self.matrix.row_count(CountMode::Effective).saturating_add(1)
                };
                self.scan_forward(
                    subject,
                    Window {
                        x: col,
                        y: (origin.y, end),
                    },
                )
            }
        }
    }

    // Anchors past `max - extent` are rejected by `fits`; never visit them.
    fn clamp(&self, subject: Subject<'_>, window: Window) -> Window {
        let bounds = self.matrix.bounds();
        let limit = |range: (u32, u32), max: u32, extent: u32| {
            if max == 0 {
                return range;
            }
            let last = u64::from(max) + 1 - u64::from(extent).min(u64::from(max) + 1);
            (range.0, range.1.min(last as u32))
        };
        Window {
            x: limit(window.x, bounds.max_cols, subject.item.w),
            y: limit(window.y, bounds.max_rows, subject.item.h),
        }
    }

    // Runs of cells held by `key` in the rows the subject covers at `at`,
    // one per row: the first run touching the subject's columns, as a
    // half-open column range.
    fn held_runs(&self, key: ItemKey, subject: Subject<'_>, at: Position) -> Vec<(u32, u32)> {
        let rows = self.matrix.row_count(CountMode::Current);
        let cols = self.matrix.col_count(CountMode::Current);
        let bottom = at.y.saturating_add(subject.item.h).min(rows);
        let right = at.x.saturating_add(subject.item.w).min(cols);
        let holds = |x: u32, y: u32| self.matrix.get(x, y) == Some(key);
        (at.y..bottom)
            .filter_map(|y| {
                let hit = (at.x..right).find(|&x| holds(x, y))?;
                let mut start = hit;
                while start > 0 && holds(start - 1, y) {
                    start -= 1;
                }
                let mut end = hit + 1;
                while end < cols && holds(end, y) {
                    end += 1;
                }
                Some((start, end))
            })
            .collect()
    }

    // Ascending rows, then ascending columns. On a conflict the column
    // cursor jumps past the run of cells the first conflict holds: every
    // anchor up to the run's end overlaps it.
    fn scan_forward(&self, subject: Subject<'_>, window: Window) -> Option<Position> {
        let window = self.clamp(subject, window);
        let skip = window.x.1.saturating_sub(window.x.0) > 1;
        for y in window.y.0..window.y.1 {
            let mut x = window.x.0;
            while x < window.x.1 {
                let at = Position::new(x, y);
                match self.fits(subject, at, true) {
                    Fit::Fits => return Some(at),
                    Fit::Conflicts(conflicts) if skip => {
                        let edge = conflicts
                            .first()
                            .and_then(|&key| {
                                self.held_runs(key, subject, at)
                                    .into_iter()
                                    .map(|(_, end)| end)
                                    .max()
                            })
                            .unwrap_or(0);
                        x = (x + 1).max(edge);
                    }
                    _ => x += 1,
                }
            }
        }
        None
    }

    // Descending rows, then descending columns. On a conflict the cursor
    // retreats to the last anchor whose right edge clears the start of the
    // first conflict's run.
    fn scan_reverse(&self, subject: Subject<'_>, window: Window) -> Option<Position> {
        let window = self.clamp(subject, window);
        let skip = window.x.1.saturating_sub(window.x.0) > 1;
        let start = i64::from(window.x.0);
        let width = i64::from(subject.item.w);
        for y in (window.y.0..window.y.1).rev() {
            let mut x = i64::from(window.x.1) - 1;
            while x >= start {
                let at = Position::new(x as u32, y);
                match self.fits(subject, at, true) {
                    Fit::Fits => return Some(at),
                    Fit::Conflicts(conflicts) if skip => {
                        let edge = conflicts
                            .first()
                            .and_then(|&key| {
                                self.held_runs(key, subject, at)
                                    .into_iter()
                                    .map(|(run_start, _)| i64::from(run_start) - width)
                                    .min()
                            })
                            .unwrap_or(i64::MAX);
                        x = (x - 1).min(edge);
                    }
                    _ => x -= 1,
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::matrix::Bounds;

    struct Fixture {
        matrix: GridMatrix,
        items: SlotMap<ItemKey, Item>,
    }

    impl Fixture {
        fn new(bounds: Bounds) -> Self {
            Self {
                matrix: GridMatrix::new(bounds),
                items: SlotMap::with_key(),
            }
        }

        fn unbounded() -> Self {
            Self::new(Bounds::default())
        }

        fn place(&mut self, item: Item) -> ItemKey {
            let rect = item.rect().expect("fixture items are positioned");
            let key = self.items.insert(item);
            self.matrix.write(key, rect).unwrap();
            key
        }

        fn engine(&self) -> PlacementEngine<'_> {
            PlacementEngine::new(&self.matrix, &self.items)
        }
    }

    #[test]
    fn empty_grid_fits_anywhere_unbounded() {
        let fixture = Fixture::unbounded();
        let item = Item::new(3, 2);
        let fit = fixture
            .engine()
            .fits(Subject::new(None, &item), Position::new(7, 9), true);
        assert_eq!(fit, Fit::Fits);
    }

    #[test]
    fn exceeding_max_is_rejected() {
        let fixture = Fixture::new(Bounds {
            max_rows: 3,
            max_cols: 3,
            ..Bounds::default()
        });
        let item = Item::new(2, 2);
        let engine = fixture.engine();
        assert_eq!(
            engine.fits(Subject::new(None, &item), Position::new(2, 2), true),
            Fit::Rejected
        );
        assert_eq!(
            engine.fits(Subject::new(None, &item), Position::new(1, 1), true),
            Fit::Fits
        );
    }

    #[test]
    fn conflicts_are_deduplicated_in_scan_order() {
        let mut fixture = Fixture::unbounded();
        let wide = fixture.place(Item::new(2, 2).at(0, 0));
        let other = fixture.place(Item::new(1, 1).at(2, 1));
        let candidate = Item::new(3, 2);
        let fit = fixture
            .engine()
            .fits(Subject::new(None, &candidate), Position::new(0, 0), true);
        assert_eq!(fit, Fit::Conflicts(vec![wide, other]));
    }

    #[test]
    fn conflicts_can_be_suppressed() {
        let mut fixture = Fixture::unbounded();
        fixture.place(Item::new(1, 1).at(0, 0));
        let candidate = Item::new(1, 1);
        let fit = fixture
            .engine()
            .fits(Subject::new(None, &candidate), Position::new(0, 0), false);
        assert_eq!(fit, Fit::Rejected);
    }

    #[test]
    fn self_and_shared_id_never_conflict() {
        let mut fixture = Fixture::unbounded();
        let key = fixture.place(Item::new(2, 1).at(0, 0).with_id("clock"));
        let engine = fixture.engine();

        let own = &fixture.items[key];
        assert!(engine
            .fits(Subject::new(Some(key), own), Position::new(1, 0), true)
            .is_fit());

        let twin = Item::new(1, 1).with_id("clock");
        assert!(engine
            .fits(Subject::new(None, &twin), Position::new(0, 0), true)
            .is_fit());

        let stranger = Item::new(1, 1).with_id("weather");
        assert_eq!(
            engine.fits(Subject::new(None, &stranger), Position::new(0, 0), true),
            Fit::Conflicts(vec![key])
        );
    }

    #[test]
    fn forward_scan_is_row_major() {
        let mut fixture = Fixture::new(Bounds {
            min_rows: 2,
            min_cols: 2,
            ..Bounds::default()
        });
        fixture.place(Item::new(1, 1).at(0, 0));
        fixture.place(Item::new(1, 1).at(1, 0));
        let candidate = Item::new(1, 1);
        let found = fixture
            .engine()
            .find_empty(Subject::new(None, &candidate), &SearchOptions::default());
        assert_eq!(found, Some(Position::new(0, 1)));
    }

    #[test]
    fn forward_scan_uses_spare_row_when_full() {
        let mut fixture = Fixture::unbounded();
        fixture.place(Item::new(2, 2).at(0, 0));
        let candidate = Item::new(1, 1);
        let found = fixture
            .engine()
            .find_empty(Subject::new(None, &candidate), &SearchOptions::default());
        assert_eq!(found, Some(Position::new(0, 2)));
    }

    #[test]
    fn reverse_scan_starts_from_far_corner() {
        let mut fixture = Fixture::new(Bounds {
            min_rows: 2,
            min_cols: 3,
            max_rows: 2,
            max_cols: 3,
            ..Bounds::default()
        });
        fixture.place(Item::new(1, 1).at(2, 1));
        let candidate = Item::new(1, 1);
        let found = fixture.engine().find_empty(
            Subject::new(None, &candidate),
            &SearchOptions::from_origin().reversed(),
        );
        assert_eq!(found, Some(Position::new(1, 1)));
    }

    #[test]
    fn bounded_grid_without_space_finds_nothing() {
        let mut fixture = Fixture::new(Bounds {
            max_rows: 1,
            max_cols: 2,
            ..Bounds::default()
        });
        fixture.place(Item::new(2, 1).at(0, 0));
        let candidate = Item::new(1, 1);
        let found = fixture
            .engine()
            .find_empty(Subject::new(None, &candidate), &SearchOptions::from_origin());
        assert_eq!(found, None);
    }

    #[test]
    fn skip_ahead_lands_after_blocking_item() {
        let mut fixture = Fixture::unbounded();
        fixture.place(Item::new(3, 1).at(0, 0));
        let candidate = Item::new(1, 1).at(0, 0);
        let found = fixture
            .engine()
            .find_toward(Subject::new(None, &candidate), Direction::Right);
        assert_eq!(found, Some(Position::new(3, 0)));
    }

    #[test]
    fn skip_ahead_does_not_pass_free_cells() {
        // Anchor 2 overlaps the blocker at [0, 3); the next free anchor is 3,
        // not 2 + width.
        let mut fixture = Fixture::unbounded();
        fixture.place(Item::new(3, 1).at(0, 0));
        let candidate = Item::new(1, 1).at(2, 0);
        let found = fixture
            .engine()
            .find_toward(Subject::new(None, &candidate), Direction::Right);
        assert_eq!(found, Some(Position::new(3, 0)));
    }

    #[test]
    fn reverse_skip_keeps_adjacent_gap() {
        // Row: [free][free][B][B][subject]; a 2-wide subject fits at x=0.
        let mut fixture = Fixture::unbounded();
        fixture.place(Item::new(2, 1).at(2, 0));
        let candidate = Item::new(2, 1).at(4, 0);
        let found = fixture
            .engine()
            .find_toward(Subject::new(None, &candidate), Direction::Left);
        assert_eq!(found, Some(Position::new(0, 0)));
    }

    #[test]
    fn left_search_stays_left_of_own_column() {
        let mut fixture = Fixture::unbounded();
        let key = fixture.place(Item::new(1, 1).at(3, 5));
        let item = fixture.items[key].clone();
        let found = fixture
            .engine()
            .find_toward(Subject::new(Some(key), &item), Direction::Left);
        assert_eq!(found, Some(Position::new(2, 5)));

        let edge = Item::new(1, 1).at(0, 5);
        assert_eq!(
            fixture
                .engine()
                .find_toward(Subject::new(None, &edge), Direction::Left),
            None
        );
    }

    #[test]
    fn vertical_searches_stay_in_column() {
        let mut fixture = Fixture::unbounded();
        fixture.place(Item::new(1, 1).at(1, 0));
        fixture.place(Item::new(1, 1).at(1, 1));
        let candidate = Item::new(1, 1).at(1, 1);
        let engine = fixture.engine();
        assert_eq!(
            engine.find_toward(Subject::new(None, &candidate), Direction::Up),
            None
        );
        assert_eq!(
            engine.find_toward(Subject::new(None, &candidate), Direction::Down),
            Some(Position::new(1, 2))
        );
    }

    #[test]
    fn directional_search_needs_coordinates() {
        let fixture = Fixture::unbounded();
        let candidate = Item::new(1, 1);
        assert_eq!(
            fixture
                .engine()
                .find_toward(Subject::new(None, &candidate), Direction::Down),
            None
        );
    }

    #[test]
    fn directional_search_handles_extreme_coordinates() {
        let fixture = Fixture::new(Bounds {
            max_rows: 2,
            max_cols: 2,
            ..Bounds::default()
        });
        let engine = fixture.engine();

        let far_right = Item::new(1, 1).at(u32::MAX, 0);
        let subject = Subject::new(None, &far_right);
        assert_eq!(
            engine.find_toward(subject, Direction::Left),
            Some(Position::new(1, 0))
        );
        assert_eq!(engine.find_toward(subject, Direction::Right), None);
        assert_eq!(engine.find_toward(subject, Direction::Up), None);
        assert_eq!(engine.find_toward(subject, Direction::Down), None);

        let far_down = Item::new(1, 1).at(0, u32::MAX);
        let subject = Subject::new(None, &far_down);
        assert_eq!(
            engine.find_toward(subject, Direction::Up),
            Some(Position::new(0, 1))
        );
        assert_eq!(engine.find_toward(subject, Direction::Down), None);
        assert_eq!(engine.find_toward(subject, Direction::Left), None);
    }

    #[test]
    fn anchors_past_u32_range_are_rejected() {
        let fixture = Fixture::unbounded();
        let item = Item::new(2, 1);
        assert_eq!(
            fixture
                .engine()
                .fits(Subject::new(None, &item), Position::new(u32::MAX, 0), true),
            Fit::Rejected
        );
    }

    #[test]
    fn skip_follows_cells_actually_held() {
        // The blocker's rectangle spans x 0..3 but it only holds (0,0) and
        // (2,0); the middle cell was released.
        let mut fixture = Fixture::unbounded();
        fixture.place(Item::new(3, 1).at(0, 0));
        let filler = fixture.place(Item::new(1, 1).at(1, 0));
        fixture.matrix.clear(filler, Rect::new(1, 0, 1, 1));
        fixture.items.remove(filler);
        let engine = fixture.engine();

        let forward = Item::new(1, 1).at(0, 0);
        assert_eq!(
            engine.find_toward(Subject::new(None, &forward), Direction::Right),
            Some(Position::new(1, 0))
        );

        let backward = Item::new(1, 1).at(3, 0);
        assert_eq!(
            engine.find_toward(Subject::new(None, &backward), Direction::Left),
            Some(Position::new(1, 0))
        );
    }

    #[test]
    fn direction_tokens_match_first_letter() {
        assert_eq!(Direction::from_token("Left"), Some(Direction::Left));
        assert_eq!(Direction::from_token("r"), Some(Direction::Right));
        assert_eq!(Direction::from_token("UP"), Some(Direction::Up));
        assert_eq!(Direction::from_token("down"), Some(Direction::Down));
        assert_eq!(Direction::from_token("sideways"), None);
        assert_eq!(Direction::from_token(""), None);
    }
}
