//! Grid lifecycle notifications.
//!
//! The grid publishes a record at each lifecycle checkpoint to an injected
//! [`GridObserver`]. Records carry the checkpoint, the item involved (if
//! any) and structured details so observers can log, buffer, or forward
//! them. Observers only see immutable records and cannot re-enter the grid.

use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use serde_json::Value;

use crate::geometry::{Item, ItemKey};
use crate::logging::{LogLevel, Logger, event_with_fields};

/// Lifecycle checkpoints published by [`Grid`](crate::Grid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridEvent {
    /// Settings validated, initial items not yet loaded.
    PreInitialize,
    /// Initial items loaded and the matrix built.
    PostInitialize,
    PreClone,
    PostClone,
    PreBuildGrid,
    PostBuildGrid,
    PreAddItem,
    PostAddItem,
    PreRemoveItem,
    PostRemoveItem,
    /// Any add, remove, move or resize completed.
    Changed,
}

impl GridEvent {
    pub fn name(self) -> &'static str {
        match self {
            GridEvent::PreInitialize => "pre_initialize",
            GridEvent::PostInitialize => "post_initialize",
            GridEvent::PreClone => "pre_clone",
            GridEvent::PostClone => "post_clone",
            GridEvent::PreBuildGrid => "pre_build_grid",
            GridEvent::PostBuildGrid => "post_build_grid",
            GridEvent::PreAddItem => "pre_add_item",
            GridEvent::PostAddItem => "post_add_item",
            GridEvent::PreRemoveItem => "pre_remove_item",
            GridEvent::PostRemoveItem => "post_remove_item",
            GridEvent::Changed => "changed",
        }
    }
}

/// Structured notification entry.
#[derive(Debug, Clone)]
pub struct GridEventRecord {
    pub timestamp: SystemTime,
    pub event: GridEvent,
    pub item: Option<ItemKey>,
    pub details: Vec<(String, Value)>,
}

impl GridEventRecord {
    fn new(event: GridEvent) -> Self {
        Self {
            timestamp: SystemTime::now(),
            event,
            item: None,
            details: Vec::new(),
        }
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details
            .iter()
            .find_map(|(name, value)| (name == key).then_some(value))
    }
}

/// Builder helper to append fields ergonomically.
pub struct GridEventRecordBuilder {
    record: GridEventRecord,
}

impl GridEventRecordBuilder {
    pub fn new(event: GridEvent) -> Self {
        Self {
            record: GridEventRecord::new(event),
        }
    }

    pub fn item(mut self, key: ItemKey) -> Self {
        self.record.item = Some(key);
        self
    }

    pub fn detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.record.details.push((key.into(), value.into()));
        self
    }

    /// Append the item's geometry and id.
    pub fn item_details(mut self, item: &Item) -> Self {
        self.record.details.extend([
            ("x".to_string(), Value::from(item.x)),
            ("y".to_string(), Value::from(item.y)),
            ("w".to_string(), Value::from(item.w)),
            ("h".to_string(), Value::from(item.h)),
            ("id".to_string(), Value::from(item.id.clone())),
        ]);
        self
    }

    pub fn finish(self) -> GridEventRecord {
        self.record
    }
}

/// Trait implemented by anything that wants grid notifications.
pub trait GridObserver: Send + Sync {
    fn notify(&self, record: &GridEventRecord);
}

/// Default no-op observer.
#[derive(Debug, Default)]
pub struct NullObserver;

impl GridObserver for NullObserver {
    fn notify(&self, _record: &GridEventRecord) {}
}

/// Buffers every record; handy for tests and replay.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    records: Mutex<Vec<GridEventRecord>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn records(&self) -> Vec<GridEventRecord> {
        self.records
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn events(&self) -> Vec<GridEvent> {
        self.records().into_iter().map(|r| r.event).collect()
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.records.lock() {
            guard.clear();
        }
    }
}

impl GridObserver for RecordingObserver {
    fn notify(&self, record: &GridEventRecord) {
        if let Ok(mut guard) = self.records.lock() {
            guard.push(record.clone());
        }
    }
}

/// Forwards lifecycle records to a structured [`Logger`].
pub struct LoggingObserver {
    logger: Logger,
    level: LogLevel,
    log_changes: bool,
}

impl LoggingObserver {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            level: LogLevel::Debug,
            log_changes: false,
        }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn log_changes(mut self, enabled: bool) -> Self {
        self.log_changes = enabled;
        self
    }
}

impl GridObserver for LoggingObserver {
    fn notify(&self, record: &GridEventRecord) {
        if record.event == GridEvent::Changed && !self.log_changes {
            return;
        }
        let event = event_with_fields(
            self.level,
            "gridfit::grid.lifecycle",
            record.event.name(),
            record.details.iter().cloned(),
        );
        let _ = self.logger.log_event(event);
    }
}
