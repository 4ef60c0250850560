// src/utils/config.rs
//! Capture configuration
//!
//! One `CaptureConfig` is supplied at install time and shared, read-only,
//! by every installed wrapper. There is no file or environment loading
//! here: the embedding process decides how the config is produced.

use crate::capture::filter::{FilterFn, FilterOutcome};
use crate::capture::flatten::FlatRecord;
use std::fmt;
use std::sync::Arc;

/// Configuration consumed by the field filter
#[derive(Clone, Default)]
pub struct CaptureConfig {
    /// Optional replacement for the default allow-list filter.
    ///
    /// The function receives the merged, flattened record and decides
    /// its fate: `Keep` (possibly rewritten) or `Discard`, which purges
    /// the call's record and timeline marks entirely.
    pub filter: Option<FilterFn>,
}

impl CaptureConfig {
    /// Create a config that uses the default allow-list filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config with a custom filter function
    pub fn with_filter<F>(filter: F) -> Self
    where
        F: Fn(FlatRecord) -> FilterOutcome + Send + Sync + 'static,
    {
        Self {
            filter: Some(Arc::new(filter)),
        }
    }
}

impl fmt::Debug for CaptureConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureConfig")
            .field(
                "filter",
                &if self.filter.is_some() { "custom" } else { "default" },
            )
            .finish()
    }
}
