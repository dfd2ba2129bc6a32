use crate::logging::{LogEvent, LogFields, LogLevel};
use serde_json::json;

/// Running counters for a single grid.
#[derive(Debug, Default, Clone)]
pub struct GridMetrics {
    placements: u64,
    placement_failures: u64,
    resolutions: u64,
    resolution_failures: u64,
    relocations: u64,
    rebuilds: u64,
}

impl GridMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_placement(&mut self) {
        self.placements = self.placements.saturating_add(1);
    }

    pub fn record_placement_failure(&mut self) {
        self.placement_failures = self.placement_failures.saturating_add(1);
    }

    pub fn record_resolution(&mut self, resolved: bool) {
        if resolved {
            self.resolutions = self.resolutions.saturating_add(1);
        } else {
            self.resolution_failures = self.resolution_failures.saturating_add(1);
        }
    }

    pub fn record_relocation(&mut self) {
        self.relocations = self.relocations.saturating_add(1);
    }

    pub fn record_rebuild(&mut self) {
        self.rebuilds = self.rebuilds.saturating_add(1);
    }

    pub fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot {
            placements: self.placements,
            placement_failures: self.placement_failures,
            resolutions: self.resolutions,
            resolution_failures: self.resolution_failures,
            relocations: self.relocations,
            rebuilds: self.rebuilds,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricSnapshot {
    pub placements: u64,
    pub placement_failures: u64,
    pub resolutions: u64,
    pub resolution_failures: u64,
    pub relocations: u64,
    pub rebuilds: u64,
}

impl MetricSnapshot {
    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(LogLevel::Info, target, "grid_metrics", self.as_fields())
    }

    pub fn as_fields(&self) -> LogFields {
        let mut map = LogFields::new();
        map.insert("placements".to_string(), json!(self.placements));
        map.insert(
            "placement_failures".to_string(),
            json!(self.placement_failures),
        );
        map.insert("resolutions".to_string(), json!(self.resolutions));
        map.insert(
            "resolution_failures".to_string(),
            json!(self.resolution_failures),
        );
        map.insert("relocations".to_string(), json!(self.relocations));
        map.insert("rebuilds".to_string(), json!(self.rebuilds));
        map
    }
}
