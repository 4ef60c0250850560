// src/interception/handle.rs
//! Request handles
//!
//! A `RequestHandle` is what callers get back from `request()`: inert
//! until `end()` fires the dispatch, with a `response` event completion
//! contract alongside the callback form. Transport implementations mint
//! handles via `inert()`/`set_starter()` and complete them with
//! `deliver()` or `fail()`. That is the whole implementor surface; the
//! engine never constructs handles itself and returns the transport's
//! handle to the caller unchanged.

use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::utils::errors::CaptureError;

/// Response surface delivered to completion handlers.
///
/// The body rides along opaquely for the caller; the capture engine
/// reads only the head fields.
#[derive(Debug, Clone)]
pub struct ClientResponse {
    pub status: u16,

    pub status_message: String,

    pub headers: BTreeMap<String, String>,

    /// Collected body bytes; never captured into trace records
    pub body: Bytes,
}

/// Completion handler invoked with the response
pub type ResponseCallback = Box<dyn FnOnce(&ClientResponse) + Send>;

/// Handler invoked when the dispatch fails after `end()`
pub type ErrorCallback = Box<dyn FnOnce(&CaptureError) + Send>;

type Starter = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct HandleState {
    starter: Mutex<Option<Starter>>,
    listeners: Mutex<Vec<ResponseCallback>>,
    error_listeners: Mutex<Vec<ErrorCallback>>,
    response: Mutex<Option<ClientResponse>>,
    error: Mutex<Option<CaptureError>>,
}

/// Handle to one outbound call
#[derive(Clone, Default)]
pub struct RequestHandle {
    state: Arc<HandleState>,
}

impl RequestHandle {
    /// Create a handle with no dispatch action attached
    pub fn inert() -> Self {
        Self::default()
    }

    /// Attach the deferred dispatch action consumed by `end()`
    pub fn set_starter(&self, starter: impl FnOnce() + Send + 'static) {
        *self.state.starter.lock() = Some(Box::new(starter));
    }

    /// Finalize the request, firing the dispatch. Subsequent calls are
    /// no-ops.
    pub fn end(&self) {
        let starter = self.state.starter.lock().take();
        if let Some(starter) = starter {
            starter();
        }
    }

    /// Subscribe to the response event.
    ///
    /// A subscriber registered after delivery fires immediately with
    /// the stored response.
    pub fn on_response(&self, callback: ResponseCallback) {
        let response = self.state.response.lock();
        if let Some(delivered) = &*response {
            let delivered = delivered.clone();
            drop(response);
            callback(&delivered);
        } else {
            self.state.listeners.lock().push(callback);
            drop(response);
        }
    }

    /// Subscribe to dispatch failure
    pub fn on_error(&self, callback: ErrorCallback) {
        let mut error = self.state.error.lock();
        if let Some(failed) = error.take() {
            drop(error);
            callback(&failed);
            *self.state.error.lock() = Some(failed);
        } else {
            self.state.error_listeners.lock().push(callback);
        }
    }

    /// The delivered response, if the call has completed
    pub fn response(&self) -> Option<ClientResponse> {
        self.state.response.lock().clone()
    }

    /// Deliver the response, draining subscribers in registration order.
    ///
    /// Transport-implementor surface; delivering twice is a no-op.
    pub fn deliver(&self, response: ClientResponse) {
        {
            let mut stored = self.state.response.lock();
            if stored.is_some() {
                return;
            }
            *stored = Some(response);
        }
        let listeners = std::mem::take(&mut *self.state.listeners.lock());
        if listeners.is_empty() {
            return;
        }
        let delivered = self.state.response.lock().clone();
        if let Some(delivered) = delivered {
            for listener in listeners {
                listener(&delivered);
            }
        }
    }

    /// Record a dispatch failure, draining error subscribers.
    ///
    /// Transport-implementor surface. The completion handlers never
    /// fire for a failed call; its capture stays incomplete.
    pub fn fail(&self, error: CaptureError) {
        {
            let mut stored = self.state.error.lock();
            if stored.is_some() {
                return;
            }
            *stored = Some(error);
        }
        let listeners = std::mem::take(&mut *self.state.error_listeners.lock());
        if listeners.is_empty() {
            return;
        }
        let taken = self.state.error.lock().take();
        if let Some(error) = taken {
            for listener in listeners {
                listener(&error);
            }
            *self.state.error.lock() = Some(error);
        }
    }

    /// The stored failure, if the dispatch failed
    pub fn take_error(&self) -> Option<CaptureError> {
        self.state.error.lock().take()
    }
}
