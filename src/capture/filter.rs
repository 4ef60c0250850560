// src/capture/filter.rs
//! Field filtering
//!
//! Decides which fields of a merged, flattened record survive into the
//! stored trace entry. With no custom filter configured, a fixed
//! allow-list applies. A custom filter sees the whole flat record and
//! may rewrite it or veto it entirely; a veto purges the call's record
//! and timeline marks upstream.

use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::sync::Arc;

use crate::capture::flatten::FlatRecord;
use crate::utils::config::CaptureConfig;

/// Outcome of filtering one record
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOutcome {
    /// Store this (possibly rewritten) record
    Keep(FlatRecord),

    /// Drop the record and every timeline mark for its call
    Discard,
}

/// User-supplied replacement for the default allow-list
pub type FilterFn = Arc<dyn Fn(FlatRecord) -> FilterOutcome + Send + Sync>;

/// Flat-record keys kept by the default filter
pub const DEFAULT_RECORDED_KEYS: &[&str] = &[
    "req.headers.user-agent",
    "req.headers.accept-encoding",
    "req.method",
    "req.path",
    "req.protocol",
    "req.port",
    "req.hostname",
    "req.hash",
    "req.pathname",
    "req.url",
    "req.query",
    "req.user-agent",
    "req.accept-encoding",
    "res.headers.cache-control",
    "res.headers.content-type",
    "res.headers.date",
    "res.headers.etag",
    "res.headers.strict-transport-security",
    "res.headers.content-encoding",
    "res.headers.content-length",
    "res.headers.age",
    "res.headers.connection",
    "res.headers.server",
    "res.headers.vary",
    "res.statusCode",
    "res.statusMessage",
];

static DEFAULT_KEYS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| DEFAULT_RECORDED_KEYS.iter().copied().collect());

/// Run a flat record through the configured filter.
///
/// Pure: the only observable effect is the returned outcome.
pub fn apply_filter(config: &CaptureConfig, record: FlatRecord) -> FilterOutcome {
    if let Some(filter) = &config.filter {
        return filter(record);
    }

    let mut record = record;
    record.retain(|key, _| DEFAULT_KEYS.contains(key.as_str()));
    FilterOutcome::Keep(record)
}
