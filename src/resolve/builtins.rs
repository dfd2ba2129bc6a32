use crate::geometry::ItemKey;
use crate::grid::{AddOptions, Grid};
use crate::placement::SearchOptions;

use super::core::{ConflictResolver, Conflicts};

/// Move the incoming item to the first empty position, scanning from where
/// it asked to be. Relative order of items is not preserved.
#[derive(Debug, Clone, Copy, Default)]
pub struct FindEmpty;

impl ConflictResolver for FindEmpty {
    fn resolve(
        &self,
        grid: &mut Grid,
        key: ItemKey,
        _conflicts: &Conflicts,
        options: &AddOptions,
    ) -> bool {
        grid.find_empty_position(key, &options.search)
    }
}

/// Keep the incoming item where it was asked to go and push each
/// conflicting item aside.
///
/// Every conflict tries the grid's resolution order (left, right, up, down
/// by default), staying in its own row or column. When no direction has room
/// and `options.fallback` is set, the conflict goes to the first empty
/// position of the whole grid instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveConflicting;

impl ConflictResolver for MoveConflicting {
    fn resolve(
        &self,
        grid: &mut Grid,
        key: ItemKey,
        conflicts: &Conflicts,
        options: &AddOptions,
    ) -> bool {
        let Conflicts::With(conflicts) = conflicts else {
            return grid.find_empty_position(key, &options.search);
        };

        let order = grid.resolution_order().to_vec();
        for &conflict in conflicts {
            let nearby = order
                .iter()
                .find_map(|&direction| grid.locate_empty_toward(conflict, direction));
            let target = match nearby {
                Some(target) => target,
                None if options.fallback => {
                    match grid.locate_empty_position(conflict, &SearchOptions::from_origin()) {
                        Some(target) => target,
                        // Nothing reachable anywhere: the grid is full.
                        None => return false,
                    }
                }
                None => return false,
            };
            if grid
                .move_item(conflict, Some(target), &AddOptions::default())
                .is_err()
            {
                return false;
            }
        }
        true
    }

    fn add_first(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Item, Position};
    use crate::settings::GridSettings;

    fn displacing(settings: GridSettings) -> Grid {
        Grid::new(settings.with_strategy("move_conflicting")).unwrap()
    }

    #[test]
    fn find_empty_moves_incoming_item() {
        let mut grid = Grid::new(GridSettings::default().with_rows(2, 0).with_cols(2, 0)).unwrap();
        let a = grid.add_item(Item::new(1, 1).at(0, 0), &AddOptions::default());
        let b = grid.add_item(Item::new(1, 1).at(0, 0), &AddOptions::default());
        assert_eq!(grid.item(a).and_then(Item::position), Some(Position::new(0, 0)));
        assert_eq!(grid.item(b).and_then(Item::position), Some(Position::new(1, 0)));
        assert!(grid.is_placed(a) && grid.is_placed(b));
    }

    #[test]
    fn move_conflicting_pushes_neighbour_right() {
        let mut grid = displacing(GridSettings::default().with_rows(1, 0).with_cols(2, 0));
        let a = grid.add_item(Item::new(1, 1).at(0, 0), &AddOptions::default());
        let d = grid.add_item(Item::new(1, 1).at(0, 0), &AddOptions::default());
        assert_eq!(grid.occupant(0, 0), Some(d));
        assert_eq!(grid.item(a).and_then(Item::position), Some(Position::new(1, 0)));
        assert_eq!(grid.occupant(1, 0), Some(a));
    }

    #[test]
    fn move_conflicting_follows_configured_order() {
        let mut grid = displacing(
            GridSettings::default()
                .with_rows(3, 0)
                .with_cols(3, 0)
                .with_resolution_order(["down", "right"]),
        );
        let a = grid.add_item(Item::new(1, 1).at(1, 1), &AddOptions::default());
        grid.add_item(Item::new(1, 1).at(1, 1), &AddOptions::default());
        assert_eq!(grid.item(a).and_then(Item::position), Some(Position::new(1, 2)));
    }

    #[test]
    fn move_conflicting_falls_back_to_any_free_cell() {
        // Only `left` is tried and it has no room; the fallback scan does.
        let mut grid = displacing(
            GridSettings::default()
                .with_rows(2, 2)
                .with_cols(2, 2)
                .with_resolution_order(["left"]),
        );
        let a = grid.add_item(Item::new(1, 1).at(0, 0), &AddOptions::default());
        grid.add_item(Item::new(1, 1).at(0, 0), &AddOptions::default());
        assert_eq!(grid.item(a).and_then(Item::position), Some(Position::new(1, 0)));
    }

    #[test]
    fn move_conflicting_without_fallback_gives_up() {
        let mut grid = displacing(
            GridSettings::default()
                .with_rows(1, 1)
                .with_cols(2, 2)
                .with_resolution_order(["up"]),
        );
        let a = grid.add_item(Item::new(1, 1).at(0, 0), &AddOptions::default());
        let d = grid.add_item(
            Item::new(1, 1).at(0, 0),
            &AddOptions::default().without_fallback(),
        );
        // The incoming item is written first; the neighbour could not move.
        assert_eq!(grid.occupant(0, 0), Some(d));
        assert_eq!(grid.item(a).and_then(Item::position), Some(Position::new(0, 0)));
        assert!(!grid.is_placed(a));
    }

    #[test]
    fn out_of_bounds_anchor_is_searched_from_given_window() {
        let mut grid = displacing(GridSettings::default().with_rows(1, 2).with_cols(1, 2));
        // The default window starts at the item's own anchor, below the cap.
        let stuck = grid.add_item(Item::new(1, 1).at(1, 5), &AddOptions::default());
        assert!(!grid.is_placed(stuck));

        let options = AddOptions::default().with_search(SearchOptions::from_origin());
        let placed = grid.add_item(Item::new(1, 1).at(1, 5), &options);
        assert!(grid.is_placed(placed));
        assert_eq!(grid.item(placed).and_then(Item::position), Some(Position::new(0, 0)));
    }
}
