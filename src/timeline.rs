// src/timeline.rs
//! Shared trace timeline
//!
//! The performance-measurement facility the capture engine marks into.
//! A timeline is an append-only log of named entries, each stamped with
//! a millisecond offset from the timeline's origin instant. Downstream
//! export tooling derives call durations from paired `start:<id>` /
//! `end:<id>` marks.
//!
//! Entries are removable by predicate so a vetoed call can be purged
//! without leaving a partial trace behind. Removal is always by exact
//! name match on the engine side.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// A single named, timestamped mark
#[derive(Debug, Clone, Serialize)]
pub struct TimelineEntry {
    /// Mark name, e.g. `start:01HV...`
    pub name: String,

    /// Offset from the timeline origin, in milliseconds
    pub timestamp_ms: f64,
}

/// Ordered log of named marks
pub struct Timeline {
    origin: Instant,
    started_at: DateTime<Utc>,
    entries: Vec<TimelineEntry>,
}

/// Shared handle to a timeline, as handed to `CaptureController::install`
pub type SharedTimeline = Arc<Mutex<Timeline>>;

impl Timeline {
    /// Create a new, empty timeline anchored at the current instant
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            started_at: Utc::now(),
            entries: Vec::new(),
        }
    }

    /// Create a shared timeline handle
    pub fn shared() -> SharedTimeline {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Append a mark stamped with the current offset
    pub fn mark(&mut self, name: impl Into<String>) {
        let timestamp_ms = self.origin.elapsed().as_secs_f64() * 1_000.0;
        self.entries.push(TimelineEntry {
            name: name.into(),
            timestamp_ms,
        });
    }

    /// All marks, in append order
    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    /// Keep only the marks matching the predicate
    pub fn retain<F>(&mut self, f: F)
    where
        F: FnMut(&TimelineEntry) -> bool,
    {
        self.entries.retain(f);
    }

    /// Wall-clock time the timeline was created
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Milliseconds between two named marks, if both exist
    pub fn duration_between(&self, start: &str, end: &str) -> Option<f64> {
        let start_ms = self.entries.iter().find(|e| e.name == start)?.timestamp_ms;
        let end_ms = self.entries.iter().find(|e| e.name == end)?.timestamp_ms;
        Some(end_ms - start_ms)
    }

    /// Number of marks
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the timeline holds no marks
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all marks
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marks_append_in_order() {
        let mut timeline = Timeline::new();
        timeline.mark("start:a");
        timeline.mark("end:a");

        let entries = timeline.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "start:a");
        assert_eq!(entries[1].name, "end:a");
        assert!(entries[0].timestamp_ms <= entries[1].timestamp_ms);
    }

    #[test]
    fn test_retain_removes_by_exact_name() {
        let mut timeline = Timeline::new();
        timeline.mark("start:abc");
        timeline.mark("end:abc");
        timeline.mark("start:abcdef");

        timeline.retain(|e| e.name != "start:abc" && e.name != "end:abc");

        // the longer, overlapping name survives exact-match removal
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline.entries()[0].name, "start:abcdef");
    }

    #[test]
    fn test_duration_between() {
        let mut timeline = Timeline::new();
        timeline.mark("start:x");
        timeline.mark("end:x");

        let duration = timeline.duration_between("start:x", "end:x");
        assert!(duration.is_some());
        assert!(duration.unwrap() >= 0.0);

        assert!(timeline.duration_between("start:x", "end:missing").is_none());
    }

    #[test]
    fn test_clear() {
        let mut timeline = Timeline::new();
        timeline.mark("start:x");
        timeline.clear();
        assert!(timeline.is_empty());
    }
}
