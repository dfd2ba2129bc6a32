use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use slotmap::SlotMap;

use crate::error::{GridError, PlacementError, Result};
use crate::events::{
    GridEvent, GridEventRecord, GridEventRecordBuilder, GridObserver, NullObserver,
};
use crate::geometry::{Item, ItemKey, Position, Size};
use crate::logging::{LogLevel, Logger, event_with_fields, json_kv};
use crate::matrix::{CountMode, GridMatrix};
use crate::metrics::{GridMetrics, MetricSnapshot};
use crate::placement::{Direction, Fit, PlacementEngine, SearchOptions, Subject};
use crate::resolve::{ConflictResolver, Conflicts, ResolutionOrder, ResolverRegistry};
use crate::settings::GridSettings;

const TARGET: &str = "gridfit::grid";
const RESOLVE_TARGET: &str = "gridfit::grid.resolve";

/// A grid shared across threads: one coarse lock per grid.
pub type SharedGrid = Arc<Mutex<Grid>>;

/// Knobs for adding, moving, resizing and rebuilding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOptions {
    /// Rebuild the whole matrix from the item list instead of placing one item.
    pub rebuild: bool,
    /// Place the item right away. When unset the item is only stored.
    pub place: bool,
    /// Let displacement strategies fall back to a whole-grid scan.
    pub fallback: bool,
    /// Scan window used when the item needs an empty position.
    pub search: SearchOptions,
}

impl Default for AddOptions {
    fn default() -> Self {
        Self {
            rebuild: false,
            place: true,
            fallback: true,
            search: SearchOptions::default(),
        }
    }
}

impl AddOptions {
    pub fn rebuild(mut self) -> Self {
        self.rebuild = true;
        self
    }

    pub fn deferred(mut self) -> Self {
        self.place = false;
        self
    }

    pub fn without_fallback(mut self) -> Self {
        self.fallback = false;
        self
    }

    pub fn with_search(mut self, search: SearchOptions) -> Self {
        self.search = search;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    /// Rebuild the whole matrix after removing the item.
    pub rebuild: bool,
}

/// Configures and constructs a [`Grid`].
pub struct GridBuilder {
    settings: GridSettings,
    items: Vec<Item>,
    observer: Option<Arc<dyn GridObserver>>,
    logger: Option<Logger>,
    resolvers: Option<ResolverRegistry>,
}

impl GridBuilder {
    fn new(settings: GridSettings) -> Self {
        Self {
            settings,
            items: Vec::new(),
            observer: None,
            logger: None,
            resolvers: None,
        }
    }

    pub fn item(mut self, item: Item) -> Self {
        self.items.push(item);
        self
    }

    pub fn items(mut self, items: impl IntoIterator<Item = Item>) -> Self {
        self.items.extend(items);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn GridObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Use this registry instead of the built-in strategies.
    pub fn resolvers(mut self, resolvers: ResolverRegistry) -> Self {
        self.resolvers = Some(resolvers);
        self
    }

    /// Validate the settings, load the initial items and build the matrix.
    pub fn build(self) -> Result<Grid> {
        self.settings.validate()?;
        let resolvers = self.resolvers.unwrap_or_else(ResolverRegistry::with_builtins);
        if let Some(name) = &self.settings.conflict_resolution {
            if !resolvers.contains(name) {
                return Err(GridError::UnknownStrategy(name.clone()));
            }
        }
        let order = ResolutionOrder::parse(self.settings.resolution_order.as_deref());

        let mut grid = Grid {
            matrix: GridMatrix::new(self.settings.bounds()),
            settings: self.settings,
            order: order.directions.clone(),
            items: SlotMap::with_key(),
            sequence: Vec::new(),
            resolvers,
            observer: self.observer.unwrap_or_else(|| Arc::new(NullObserver)),
            logger: self.logger,
            metrics: GridMetrics::new(),
        };
        grid.warn_on_order(&order);

        grid.emit(
            GridEventRecordBuilder::new(GridEvent::PreInitialize)
                .detail("items", self.items.len())
                .finish(),
        );
        let deferred = AddOptions::default().deferred();
        for item in self.items {
            grid.add_item(item, &deferred);
        }
        if grid.is_empty() {
            grid.reset_grid();
        } else {
            grid.build_grid(&AddOptions::default());
        }
        grid.emit(
            GridEventRecordBuilder::new(GridEvent::PostInitialize)
                .detail("items", grid.len())
                .finish(),
        );
        Ok(grid)
    }
}

/// Owns the items and their occupancy matrix.
///
/// Items live in an arena keyed by [`ItemKey`]; the matrix stores keys only.
/// Every mutation runs to completion before returning, so there is no
/// pending state between calls.
pub struct Grid {
    settings: GridSettings,
    order: Vec<Direction>,
    items: SlotMap<ItemKey, Item>,
    sequence: Vec<ItemKey>,
    matrix: GridMatrix,
    resolvers: ResolverRegistry,
    observer: Arc<dyn GridObserver>,
    logger: Option<Logger>,
    metrics: GridMetrics,
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grid")
            .field("settings", &self.settings)
            .field("items", &self.sequence.len())
            .field("rows", &self.matrix.row_count(CountMode::Current))
            .field("cols", &self.matrix.col_count(CountMode::Current))
            .field("resolvers", &self.resolvers)
            .finish()
    }
}

impl Grid {
    pub fn builder(settings: GridSettings) -> GridBuilder {
        GridBuilder::new(settings)
    }

    pub fn new(settings: GridSettings) -> Result<Self> {
        Self::builder(settings).build()
    }

    /// Build a grid from a JSON array of items.
    pub fn from_json_items(settings: GridSettings, items: &str) -> Result<Self> {
        let items: Vec<Item> = serde_json::from_str(items)?;
        Self::builder(settings).items(items).build()
    }

    /// A new grid with the same settings, strategies, observer and logger,
    /// holding copies of the items in the same order.
    pub fn duplicate(&self) -> Result<Self> {
        self.emit(
            GridEventRecordBuilder::new(GridEvent::PreClone)
                .detail("items", self.len())
                .finish(),
        );
        let mut builder = Self::builder(self.settings.clone())
            .items(self.items().map(|(_, item)| item.clone()))
            .observer(Arc::clone(&self.observer))
            .resolvers(self.resolvers.clone());
        if let Some(logger) = &self.logger {
            builder = builder.logger(logger.clone());
        }
        let copy = builder.build()?;
        self.emit(
            GridEventRecordBuilder::new(GridEvent::PostClone)
                .detail("items", copy.len())
                .finish(),
        );
        Ok(copy)
    }

    pub fn into_shared(self) -> SharedGrid {
        Arc::new(Mutex::new(self))
    }

    pub fn settings(&self) -> &GridSettings {
        &self.settings
    }

    pub fn resolution_order(&self) -> &[Direction] {
        &self.order
    }

    pub fn resolvers(&self) -> &ResolverRegistry {
        &self.resolvers
    }

    pub fn matrix(&self) -> &GridMatrix {
        &self.matrix
    }

    pub fn item(&self, key: ItemKey) -> Option<&Item> {
        self.items.get(key)
    }

    /// Items in list order.
    pub fn items(&self) -> impl Iterator<Item = (ItemKey, &Item)> {
        self.sequence
            .iter()
            .filter_map(|&key| self.items.get(key).map(|item| (key, item)))
    }

    pub fn keys(&self) -> &[ItemKey] {
        &self.sequence
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn occupant(&self, x: u32, y: u32) -> Option<ItemKey> {
        self.matrix.get(x, y)
    }

    /// True when every cell of the item's rectangle holds the item.
    pub fn is_placed(&self, key: ItemKey) -> bool {
        self.items
            .get(key)
            .and_then(Item::rect)
            .is_some_and(|rect| rect.cells().all(|(x, y)| self.matrix.get(x, y) == Some(key)))
    }

    pub fn row_count(&self, mode: CountMode) -> u32 {
        self.matrix.row_count(mode)
    }

    pub fn col_count(&self, mode: CountMode) -> u32 {
        self.matrix.col_count(mode)
    }

    /// Layout hash keyed by list position, comparable across grids.
    pub fn fingerprint(&self) -> blake3::Hash {
        let index: HashMap<ItemKey, u64> = self
            .sequence
            .iter()
            .enumerate()
            .map(|(i, &key)| (key, i as u64))
            .collect();
        self.matrix
            .fingerprint(|key| index.get(&key).copied().unwrap_or(u64::MAX - 1))
    }

    pub fn metrics(&self) -> MetricSnapshot {
        self.metrics.snapshot()
    }

    /// Write the current counters to the logger, if one is attached.
    pub fn log_metrics(&self) {
        if let Some(logger) = &self.logger {
            let _ = logger.log_event(self.metrics.snapshot().to_log_event(TARGET));
        }
    }

    pub fn engine(&self) -> PlacementEngine<'_> {
        PlacementEngine::new(&self.matrix, &self.items)
    }

    /// Test a stored item at `at`, reporting conflicts.
    pub fn fits(&self, key: ItemKey, at: Position) -> Fit {
        match self.items.get(key) {
            Some(item) => self.engine().fits(Subject::new(Some(key), item), at, true),
            None => Fit::Rejected,
        }
    }

    /// Test an item that is not part of the grid.
    pub fn fits_item(&self, item: &Item, at: Position) -> Fit {
        self.engine().fits(Subject::new(None, item), at, true)
    }

    /// Position where the item would fit, without moving it.
    pub fn locate_empty_position(&self, key: ItemKey, options: &SearchOptions) -> Option<Position> {
        let item = self.items.get(key)?;
        self.engine().find_empty(Subject::new(Some(key), item), options)
    }

    pub fn locate_empty_toward(&self, key: ItemKey, direction: Direction) -> Option<Position> {
        let item = self.items.get(key)?;
        self.engine().find_toward(Subject::new(Some(key), item), direction)
    }

    /// Move the item to the first empty position in the scan window.
    pub fn find_empty_position(&mut self, key: ItemKey, options: &SearchOptions) -> bool {
        match self.locate_empty_position(key, options) {
            Some(target) => self.relocate(key, target),
            None => false,
        }
    }

    pub fn find_empty_to_left(&mut self, key: ItemKey) -> bool {
        self.find_empty_toward(key, Direction::Left)
    }

    pub fn find_empty_to_right(&mut self, key: ItemKey) -> bool {
        self.find_empty_toward(key, Direction::Right)
    }

    pub fn find_empty_above(&mut self, key: ItemKey) -> bool {
        self.find_empty_toward(key, Direction::Up)
    }

    pub fn find_empty_below(&mut self, key: ItemKey) -> bool {
        self.find_empty_toward(key, Direction::Down)
    }

    fn find_empty_toward(&mut self, key: ItemKey, direction: Direction) -> bool {
        match self.locate_empty_toward(key, direction) {
            Some(target) => self.relocate(key, target),
            None => false,
        }
    }

    // Placed items move through the matrix; unplaced ones only take the
    // coordinates, after dropping cells left over from a failed displacement.
    fn relocate(&mut self, key: ItemKey, target: Position) -> bool {
        if self.is_placed(key) {
            return self
                .move_item(key, Some(target), &AddOptions::default())
                .is_ok();
        }
        if self.lift(key).is_err() {
            return false;
        }
        match self.items.get_mut(key) {
            Some(item) => {
                item.set_position(target);
                true
            }
            None => false,
        }
    }

    /// Append an item and, unless deferred, place it.
    ///
    /// The item is kept even when placement fails; use
    /// [`try_add_item`](Self::try_add_item) to get the outcome.
    pub fn add_item(&mut self, item: Item, options: &AddOptions) -> ItemKey {
        self.try_add_item(item, options).0
    }

    /// Like [`add_item`](Self::add_item), also returning how placement went.
    /// A deferred item reports `Ok`.
    pub fn try_add_item(
        &mut self,
        item: Item,
        options: &AddOptions,
    ) -> (ItemKey, std::result::Result<(), PlacementError>) {
        self.emit(
            GridEventRecordBuilder::new(GridEvent::PreAddItem)
                .item_details(&item)
                .detail("rebuild", options.rebuild)
                .finish(),
        );
        let key = self.items.insert(item);
        self.sequence.push(key);
        let placed = if options.rebuild {
            self.place_all(options)
                .into_iter()
                .find(|(failed, _)| *failed == key)
                .map_or(Ok(()), |(_, err)| Err(err))
        } else if options.place {
            self.add_to_grid(key, options)
        } else {
            Ok(())
        };
        self.emit_item(GridEvent::PostAddItem, key);
        self.emit(GridEventRecordBuilder::new(GridEvent::Changed).item(key).finish());
        (key, placed)
    }

    /// Place a stored item into the matrix, resolving conflicts with the
    /// configured strategy.
    pub fn add_to_grid(
        &mut self,
        key: ItemKey,
        options: &AddOptions,
    ) -> std::result::Result<(), PlacementError> {
        let Some(item) = self.items.get(key) else {
            return Err(PlacementError::UnknownItem);
        };
        if item.size().is_empty() {
            return self.fail(key, PlacementError::EmptyExtent);
        }

        let add_first = self.active_resolver().is_some_and(|r| r.add_first());
        let mut deferred = None;
        match item.position() {
            Some(at) => match self.fits(key, at) {
                Fit::Fits => {}
                Fit::Rejected => {
                    if !self.resolve_conflicts(key, &Conflicts::Unspecified, options) {
                        return self.fail(key, PlacementError::Unresolved);
                    }
                }
                Fit::Conflicts(conflicts) if add_first => deferred = Some(conflicts),
                Fit::Conflicts(conflicts) => {
                    if !self.resolve_conflicts(key, &Conflicts::With(conflicts), options) {
                        return self.fail(key, PlacementError::Unresolved);
                    }
                }
            },
            None => {
                if !self.find_empty_position(key, &options.search) {
                    return self.fail(key, PlacementError::NoSpace);
                }
            }
        }

        self.write(key)?;

        if let Some(conflicts) = deferred {
            let count = conflicts.len();
            if !self.resolve_conflicts(key, &Conflicts::With(conflicts), options) {
                self.log(
                    LogLevel::Error,
                    RESOLVE_TARGET,
                    "post-placement conflict resolution failed",
                    [json_kv("conflicts", count)],
                );
            }
        }
        Ok(())
    }

    fn write(&mut self, key: ItemKey) -> std::result::Result<(), PlacementError> {
        let Some(rect) = self.items.get(key).and_then(Item::rect) else {
            return self.fail(key, PlacementError::NoSpace);
        };
        if let Err(err) = self.matrix.write(key, rect) {
            self.log(
                LogLevel::Error,
                TARGET,
                "matrix write failed",
                [
                    json_kv("error", err.to_string()),
                    json_kv("x", rect.x),
                    json_kv("y", rect.y),
                    json_kv("w", rect.w),
                    json_kv("h", rect.h),
                ],
            );
            self.metrics.record_placement_failure();
            return Err(err);
        }
        self.metrics.record_placement();
        self.log(
            LogLevel::Debug,
            TARGET,
            "item placed",
            [json_kv("x", rect.x), json_kv("y", rect.y)],
        );
        Ok(())
    }

    fn fail(&mut self, key: ItemKey, err: PlacementError) -> std::result::Result<(), PlacementError> {
        self.metrics.record_placement_failure();
        let id = self.items.get(key).and_then(|item| item.id.clone());
        self.log(
            LogLevel::Debug,
            TARGET,
            "item not placed",
            [json_kv("error", err.to_string()), json_kv("id", id)],
        );
        Err(err)
    }

    fn active_resolver(&self) -> Option<Arc<dyn ConflictResolver>> {
        self.settings
            .conflict_resolution
            .as_deref()
            .and_then(|name| self.resolvers.get(name))
    }

    /// Run the configured strategy. Without one, conflicts stay unresolved.
    pub fn resolve_conflicts(
        &mut self,
        key: ItemKey,
        conflicts: &Conflicts,
        options: &AddOptions,
    ) -> bool {
        let Some(resolver) = self.active_resolver() else {
            return false;
        };
        let resolved = resolver.resolve(self, key, conflicts, options);
        self.metrics.record_resolution(resolved);
        resolved
    }

    /// Remove an item, returning it.
    pub fn remove_item(&mut self, key: ItemKey, options: &RemoveOptions) -> Option<Item> {
        let item = self.items.get(key)?;
        self.emit(
            GridEventRecordBuilder::new(GridEvent::PreRemoveItem)
                .item(key)
                .item_details(item)
                .detail("rebuild", options.rebuild)
                .finish(),
        );
        if let Some(rect) = item.rect() {
            self.matrix.clear(key, rect);
        }
        self.sequence.retain(|&k| k != key);
        let removed = self.items.remove(key);
        if options.rebuild {
            self.build_grid(&AddOptions::default());
        }
        if let Some(item) = &removed {
            self.emit(
                GridEventRecordBuilder::new(GridEvent::PostRemoveItem)
                    .item(key)
                    .item_details(item)
                    .finish(),
            );
        }
        self.emit(GridEventRecordBuilder::new(GridEvent::Changed).item(key).finish());
        removed
    }

    /// Take the item out of the matrix, move it to `to` (if given) and place
    /// it again.
    pub fn move_item(
        &mut self,
        key: ItemKey,
        to: Option<Position>,
        options: &AddOptions,
    ) -> std::result::Result<(), PlacementError> {
        self.lift(key)?;
        if let (Some(to), Some(item)) = (to, self.items.get_mut(key)) {
            item.set_position(to);
        }
        self.metrics.record_relocation();
        let result = self.add_to_grid(key, options);
        self.emit(GridEventRecordBuilder::new(GridEvent::Changed).item(key).finish());
        result
    }

    /// Take the item out of the matrix, apply a non-empty `size` (if given)
    /// and place it again.
    pub fn resize_item(
        &mut self,
        key: ItemKey,
        size: Option<Size>,
        options: &AddOptions,
    ) -> std::result::Result<(), PlacementError> {
        self.lift(key)?;
        if let (Some(size), Some(item)) = (size.filter(|s| !s.is_empty()), self.items.get_mut(key)) {
            item.w = size.w;
            item.h = size.h;
        }
        let result = self.add_to_grid(key, options);
        self.emit(GridEventRecordBuilder::new(GridEvent::Changed).item(key).finish());
        result
    }

    fn lift(&mut self, key: ItemKey) -> std::result::Result<(), PlacementError> {
        let item = self.items.get(key).ok_or(PlacementError::UnknownItem)?;
        if let Some(rect) = item.rect() {
            self.matrix.clear(key, rect);
        }
        Ok(())
    }

    /// Reset the matrix and place every item again in list order.
    pub fn build_grid(&mut self, options: &AddOptions) {
        self.place_all(options);
    }

    // Items that could not be placed, with the reason.
    fn place_all(&mut self, options: &AddOptions) -> Vec<(ItemKey, PlacementError)> {
        self.emit(
            GridEventRecordBuilder::new(GridEvent::PreBuildGrid)
                .detail("rows", self.row_count(CountMode::Current))
                .detail("cols", self.col_count(CountMode::Current))
                .finish(),
        );
        self.reset_grid();
        let mut failures = Vec::new();
        for key in self.sequence.clone() {
            if let Err(err) = self.add_to_grid(key, options) {
                failures.push((key, err));
            }
        }
        let unplaced = failures.len();
        self.metrics.record_rebuild();
        self.log(
            LogLevel::Debug,
            TARGET,
            "grid rebuilt",
            [json_kv("items", self.len()), json_kv("unplaced", unplaced)],
        );
        self.emit(
            GridEventRecordBuilder::new(GridEvent::PostBuildGrid)
                .detail("rows", self.row_count(CountMode::Current))
                .detail("cols", self.col_count(CountMode::Current))
                .detail("unplaced", unplaced)
                .detail("fingerprint", self.fingerprint().to_hex().to_string())
                .finish(),
        );
        failures
    }

    pub fn reset_grid(&mut self) {
        self.matrix.reset();
    }

    /// Stable sort of the item list by `(y, x)`; unplaced items sort first.
    pub fn sort_items(&mut self) {
        let items = &self.items;
        self.sequence
            .sort_by_key(|&key| items.get(key).map(|item| (item.y, item.x)));
    }

    fn emit(&self, record: GridEventRecord) {
        self.observer.notify(&record);
    }

    fn emit_item(&self, event: GridEvent, key: ItemKey) {
        let mut builder = GridEventRecordBuilder::new(event).item(key);
        if let Some(item) = self.items.get(key) {
            builder = builder.item_details(item);
        }
        self.emit(builder.finish());
    }

    fn log(
        &self,
        level: LogLevel,
        target: &str,
        message: &str,
        fields: impl IntoIterator<Item = (String, Value)>,
    ) {
        if let Some(logger) = &self.logger {
            let _ = logger.log_event(event_with_fields(level, target, message, fields));
        }
    }

    fn warn_on_order(&self, order: &ResolutionOrder) {
        for token in &order.rejected {
            self.log(
                LogLevel::Warn,
                RESOLVE_TARGET,
                "ignoring invalid resolution order token",
                [json_kv("token", token.as_str())],
            );
        }
        if order.defaulted {
            self.log(
                LogLevel::Warn,
                RESOLVE_TARGET,
                "no valid resolution order given, using default",
                [json_kv("order", format!("{:?}", self.order))],
            );
        }
    }
}
