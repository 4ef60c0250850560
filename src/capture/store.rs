// src/capture/store.rs
//! Pending-call metadata store
//!
//! One record per outbound call attempt, keyed by `CallId`. A record is
//! opened as `InFlight` when the call starts, finalized as `Complete`
//! once the response has been flattened and filtered, and removed
//! entirely when the filter vetoes the call. Calls that never complete
//! (crash, external abort) leave their `InFlight` entry behind; the
//! downstream exporter tolerates the missing response half.

use parking_lot::Mutex;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use ulid::Ulid;

use crate::capture::flatten::FlatRecord;

/// Unique identity correlating one outbound call's timeline marks and
/// stored metadata record. Never reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallId(Ulid);

impl CallId {
    /// Generate a fresh identity
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Timeline mark name opening this call's span
    pub fn start_mark(&self) -> String {
        format!("start:{}", self.0)
    }

    /// Timeline mark name closing this call's span
    pub fn end_mark(&self) -> String {
        format!("end:{}", self.0)
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallId({})", self.0)
    }
}

impl Serialize for CallId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

/// Lifecycle states of one call's metadata
#[derive(Debug, Clone)]
pub enum CallRecord {
    /// Start recorded, response not yet seen
    InFlight {
        /// Normalized request metadata
        req: Value,
    },

    /// Response seen; record flattened and filtered
    Complete(FlatRecord),
}

/// Process-wide store of call metadata records
pub struct CallStore {
    calls: Mutex<HashMap<CallId, CallRecord>>,
}

/// Shared handle to a call store, as handed to `CaptureController::install`
pub type SharedStore = Arc<CallStore>;

impl CallStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Create a shared store handle
    pub fn shared() -> SharedStore {
        Arc::new(Self::new())
    }

    /// Open an in-flight record for a freshly started call
    pub fn open(&self, id: CallId, req: Value) {
        self.calls.lock().insert(id, CallRecord::InFlight { req });
    }

    /// Remove and return the in-flight request metadata for `id`.
    ///
    /// Returns `None` when the id is unknown or already finalized.
    pub fn take_in_flight(&self, id: &CallId) -> Option<Value> {
        let mut calls = self.calls.lock();
        match calls.remove(id) {
            Some(CallRecord::InFlight { req }) => Some(req),
            Some(finalized) => {
                calls.insert(*id, finalized);
                None
            }
            None => None,
        }
    }

    /// Finalize a call with its filtered flat record
    pub fn insert_complete(&self, id: CallId, data: FlatRecord) {
        self.calls.lock().insert(id, CallRecord::Complete(data));
    }

    /// Remove a record in any state
    pub fn remove(&self, id: &CallId) -> Option<CallRecord> {
        self.calls.lock().remove(id)
    }

    /// Clone out the record for `id`, if present
    pub fn get(&self, id: &CallId) -> Option<CallRecord> {
        self.calls.lock().get(id).cloned()
    }

    /// Snapshot of all finalized records
    pub fn completed(&self) -> Vec<(CallId, FlatRecord)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|(id, record)| match record {
                CallRecord::Complete(data) => Some((*id, data.clone())),
                CallRecord::InFlight { .. } => None,
            })
            .collect()
    }

    /// Remove and return all finalized records, leaving in-flight ones.
    ///
    /// This is the consumption surface for export tooling.
    pub fn drain_completed(&self) -> Vec<(CallId, FlatRecord)> {
        let mut calls = self.calls.lock();
        let ids: Vec<CallId> = calls
            .iter()
            .filter(|(_, record)| matches!(record, CallRecord::Complete(_)))
            .map(|(id, _)| *id)
            .collect();

        ids.into_iter()
            .filter_map(|id| match calls.remove(&id) {
                Some(CallRecord::Complete(data)) => Some((id, data)),
                _ => None,
            })
            .collect()
    }

    /// Ids of all records in any state
    pub fn ids(&self) -> Vec<CallId> {
        self.calls.lock().keys().copied().collect()
    }

    /// Number of records in any state
    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    /// Whether the store holds no records
    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }
}

impl Default for CallStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn test_ids_are_unique() {
        let a = CallId::new();
        let b = CallId::new();
        assert_ne!(a, b);
        assert_eq!(a.start_mark(), format!("start:{}", a));
        assert_eq!(a.end_mark(), format!("end:{}", a));
    }

    #[test]
    fn test_open_take_complete_lifecycle() {
        let store = CallStore::new();
        let id = CallId::new();

        store.open(id, json!({"url": "http://example.com/"}));
        assert_eq!(store.len(), 1);

        let req = store.take_in_flight(&id);
        assert!(req.is_some());
        assert!(store.is_empty());

        // double take is a no-op
        assert!(store.take_in_flight(&id).is_none());

        let mut flat = BTreeMap::new();
        flat.insert("req.url".to_string(), json!("http://example.com/"));
        store.insert_complete(id, flat);

        match store.get(&id) {
            Some(CallRecord::Complete(data)) => {
                assert_eq!(data.get("req.url"), Some(&json!("http://example.com/")));
            }
            other => panic!("unexpected record: {:?}", other),
        }
    }

    #[test]
    fn test_take_in_flight_skips_complete() {
        let store = CallStore::new();
        let id = CallId::new();
        store.insert_complete(id, BTreeMap::new());
        assert!(store.take_in_flight(&id).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_drain_completed_leaves_in_flight() {
        let store = CallStore::new();
        let pending = CallId::new();
        let done = CallId::new();

        store.open(pending, json!({}));
        store.insert_complete(done, BTreeMap::new());

        let drained = store.drain_completed();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].0, done);

        assert_eq!(store.len(), 1);
        assert!(matches!(
            store.get(&pending),
            Some(CallRecord::InFlight { .. })
        ));
    }
}
