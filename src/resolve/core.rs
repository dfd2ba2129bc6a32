use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{GridError, Result};
use crate::geometry::ItemKey;
use crate::grid::{AddOptions, Grid};
use crate::placement::Direction;

use super::builtins::{FindEmpty, MoveConflicting};

/// What a strategy is asked to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflicts {
    /// No specific occupants: the item cannot go where it is, find it a spot.
    Unspecified,
    /// Occupants overlapping the item's requested rectangle.
    With(Vec<ItemKey>),
}

/// A conflict resolution strategy.
///
/// Returns `true` when the grid is ready for (or already holds) the item
/// without overlaps.
pub trait ConflictResolver: Send + Sync {
    fn resolve(
        &self,
        grid: &mut Grid,
        key: ItemKey,
        conflicts: &Conflicts,
        options: &AddOptions,
    ) -> bool;

    /// Whether the incoming item is written before conflicts are resolved.
    fn add_first(&self) -> bool {
        false
    }
}

impl<F> ConflictResolver for F
where
    F: Fn(&mut Grid, ItemKey, &Conflicts, &AddOptions) -> bool + Send + Sync,
{
    fn resolve(
        &self,
        grid: &mut Grid,
        key: ItemKey,
        conflicts: &Conflicts,
        options: &AddOptions,
    ) -> bool {
        self(grid, key, conflicts, options)
    }
}

/// Built-in strategies known by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    FindEmpty,
    MoveConflicting,
}

impl Strategy {
    pub const ALL: [Strategy; 2] = [Strategy::FindEmpty, Strategy::MoveConflicting];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::FindEmpty => "find_empty",
            Strategy::MoveConflicting => "move_conflicting",
        }
    }

    pub fn resolver(self) -> Arc<dyn ConflictResolver> {
        match self {
            Strategy::FindEmpty => Arc::new(FindEmpty),
            Strategy::MoveConflicting => Arc::new(MoveConflicting),
        }
    }
}

impl FromStr for Strategy {
    type Err = GridError;

    fn from_str(name: &str) -> Result<Self> {
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.name() == name)
            .ok_or_else(|| GridError::UnknownStrategy(name.to_string()))
    }
}

/// Name → strategy table scoped to one grid.
#[derive(Clone, Default)]
pub struct ResolverRegistry {
    entries: HashMap<String, Arc<dyn ConflictResolver>>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in strategy.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_all();
        registry
    }

    /// Register a built-in strategy by name. Unknown names are an error.
    pub fn register(&mut self, name: &str) -> Result<&mut Self> {
        let strategy: Strategy = name.parse()?;
        self.entries
            .insert(strategy.name().to_string(), strategy.resolver());
        Ok(self)
    }

    pub fn register_all(&mut self) -> &mut Self {
        for strategy in Strategy::ALL {
            self.entries
                .insert(strategy.name().to_string(), strategy.resolver());
        }
        self
    }

    /// Add a custom strategy, replacing any existing entry with that name.
    pub fn insert<R>(&mut self, name: impl Into<String>, resolver: R) -> &mut Self
    where
        R: ConflictResolver + 'static,
    {
        self.entries.insert(name.into(), Arc::new(resolver));
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ConflictResolver>> {
        self.entries.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverRegistry")
            .field("strategies", &self.names())
            .finish()
    }
}

/// Direction order used by displacement strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionOrder {
    pub directions: Vec<Direction>,
    /// Tokens that did not name a direction.
    pub rejected: Vec<String>,
    /// True when nothing usable was configured and the default was used.
    pub defaulted: bool,
}

impl Default for ResolutionOrder {
    fn default() -> Self {
        Self {
            directions: Direction::ALL.to_vec(),
            rejected: Vec::new(),
            defaulted: false,
        }
    }
}

impl ResolutionOrder {
    /// Parse configured tokens, dropping invalid and repeated ones. An empty
    /// result falls back to left, right, up, down.
    pub fn parse(tokens: Option<&[String]>) -> Self {
        let Some(tokens) = tokens else {
            return Self::default();
        };
        let mut directions = Vec::new();
        let mut rejected = Vec::new();
        for token in tokens {
            match Direction::from_token(token) {
                Some(direction) if !directions.contains(&direction) => directions.push(direction),
                Some(_) => {}
                None => rejected.push(token.clone()),
            }
        }
        if directions.is_empty() {
            return Self {
                rejected,
                defaulted: true,
                ..Self::default()
            };
        }
        Self {
            directions,
            rejected,
            defaulted: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn builtins_are_registered_by_name() {
        let registry = ResolverRegistry::with_builtins();
        assert_eq!(registry.names(), vec!["find_empty", "move_conflicting"]);
        assert!(registry.get("move_conflicting").unwrap().add_first());
        assert!(!registry.get("find_empty").unwrap().add_first());
    }

    #[test]
    fn registering_unknown_builtin_fails() {
        let mut registry = ResolverRegistry::new();
        let err = registry.register("shuffle").err().unwrap();
        assert!(matches!(err, GridError::UnknownStrategy(ref name) if name == "shuffle"));
        assert!(registry.names().is_empty());
    }

    #[test]
    fn register_is_chainable() {
        let mut registry = ResolverRegistry::new();
        registry
            .register("find_empty")
            .unwrap()
            .insert("never", |_: &mut Grid, _: ItemKey, _: &Conflicts, _: &AddOptions| false);
        assert!(registry.contains("find_empty"));
        assert!(registry.contains("never"));
        assert!(!registry.contains("move_conflicting"));
    }

    #[test]
    fn strategy_names_round_trip() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.name().parse::<Strategy>().unwrap(), strategy);
        }
    }

    #[test]
    fn order_defaults_when_unset() {
        let order = ResolutionOrder::parse(None);
        assert_eq!(order.directions, Direction::ALL.to_vec());
        assert!(!order.defaulted);
    }

    #[test]
    fn order_drops_invalid_and_repeated_tokens() {
        let raw = tokens(&["Down", "sideways", "d", "up"]);
        let order = ResolutionOrder::parse(Some(&raw));
        assert_eq!(order.directions, vec![Direction::Down, Direction::Up]);
        assert_eq!(order.rejected, vec!["sideways".to_string()]);
        assert!(!order.defaulted);
    }

    #[test]
    fn order_falls_back_when_nothing_valid() {
        let raw = tokens(&["north", ""]);
        let order = ResolutionOrder::parse(Some(&raw));
        assert_eq!(order.directions, Direction::ALL.to_vec());
        assert_eq!(order.rejected.len(), 2);
        assert!(order.defaulted);
    }
}
