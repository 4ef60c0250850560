// src/interception/engine.rs
//! Instrumented dispatch
//!
//! `CaptureDispatch` is the wrapper the controller installs over each
//! protocol variant's transport. It is itself a `Transport`, so from
//! the call site's perspective nothing changes: same arguments, same
//! returned handle, same error propagation. Around the real dispatch it
//! assigns the call identity, opens and closes the timeline span, and
//! runs the capture pipeline; a request already carrying a trace
//! context passes through untouched so nested delegation between
//! variants is recorded exactly once.

use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::capture::filter::{apply_filter, FilterOutcome};
use crate::capture::flatten::flatten;
use crate::capture::normalize::{normalize_request, normalize_response};
use crate::capture::store::{CallId, SharedStore};
use crate::interception::handle::{ClientResponse, RequestHandle, ResponseCallback};
use crate::interception::installer::CaptureController;
use crate::interception::request::{PreparedRequest, Protocol, RequestSpec};
use crate::interception::transport::Transport;
use crate::timeline::SharedTimeline;
use crate::utils::config::CaptureConfig;
use crate::utils::errors::Result;

/// Capture wrapper around one protocol variant's transport
pub struct CaptureDispatch {
    inner: Arc<dyn Transport>,
    timeline: SharedTimeline,
    store: SharedStore,
    config: Arc<CaptureConfig>,
}

impl CaptureDispatch {
    pub fn new(
        inner: Arc<dyn Transport>,
        timeline: SharedTimeline,
        store: SharedStore,
        config: Arc<CaptureConfig>,
    ) -> Self {
        Self {
            inner,
            timeline,
            store,
            config,
        }
    }

    /// Build the completion handler that closes the capture for `id`
    /// and then runs the caller's own handler.
    fn finish_call(&self, id: CallId, caller: Option<ResponseCallback>) -> ResponseCallback {
        let timeline = Arc::clone(&self.timeline);
        let store = Arc::clone(&self.store);
        let config = Arc::clone(&self.config);

        Box::new(move |response: &ClientResponse| {
            timeline.lock().mark(id.end_mark());

            if let Some(req) = store.take_in_flight(&id) {
                let merged = json!({
                    "req": req,
                    "res": normalize_response(response),
                });
                match apply_filter(&config, flatten(&merged)) {
                    FilterOutcome::Keep(record) => {
                        store.insert_complete(id, record);
                    }
                    FilterOutcome::Discard => {
                        // no partial trace survives a veto
                        let start = id.start_mark();
                        let end = id.end_mark();
                        timeline
                            .lock()
                            .retain(|entry| entry.name != start && entry.name != end);
                        debug!(%id, "filter vetoed capture; record and marks purged");
                    }
                }
            }

            if let Some(caller) = caller {
                caller(response);
            }
        })
    }
}

impl Transport for CaptureDispatch {
    fn dispatch(
        &self,
        mut request: PreparedRequest,
        callback: Option<ResponseCallback>,
    ) -> Result<RequestHandle> {
        // an outer variant already owns this logical call; stay out of
        // the way entirely
        if request.trace.is_some() {
            return self.inner.dispatch(request, callback);
        }

        let id = CallId::new();
        self.timeline.lock().mark(id.start_mark());
        self.store.open(id, normalize_request(&request.options));
        request.trace = Some(id);

        let had_callback = callback.is_some();
        let instrumented = self.finish_call(id, callback);

        if had_callback {
            // substitute our handler; it invokes the caller's once the
            // capture bookkeeping is done
            self.inner.dispatch(request, Some(instrumented))
        } else {
            let handle = self.inner.dispatch(request, None)?;
            handle.on_response(instrumented);
            Ok(handle)
        }
    }
}

/// Application-facing client surface for one protocol variant.
///
/// Obtained from `CaptureController::client`; the process's single
/// client construction point is what makes interception transparent to
/// every call site built from it.
#[derive(Clone)]
pub struct ProtocolClient {
    controller: Arc<CaptureController>,
    protocol: Protocol,
}

impl ProtocolClient {
    pub(crate) fn new(controller: Arc<CaptureController>, protocol: Protocol) -> Self {
        Self {
            controller,
            protocol,
        }
    }

    /// General request-builder form. The returned handle dispatches on
    /// `end()`.
    pub fn request(
        &self,
        spec: impl Into<RequestSpec>,
        callback: Option<ResponseCallback>,
    ) -> Result<RequestHandle> {
        let prepared = PreparedRequest::new(spec.into(), self.protocol);
        self.controller
            .dispatch_via(self.protocol, prepared, callback)
    }

    /// Convenience one-shot form: build the request, then immediately
    /// finalize it.
    pub fn get(
        &self,
        spec: impl Into<RequestSpec>,
        callback: Option<ResponseCallback>,
    ) -> Result<RequestHandle> {
        let handle = self.request(spec, callback)?;
        handle.end();
        Ok(handle)
    }
}
