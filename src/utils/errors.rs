// src/utils/errors.rs
//! Error types for the capture engine
//!
//! The interception core itself introduces no failure modes of its own:
//! wrapped dispatch errors are forwarded unchanged. The variants here
//! cover transport construction and request building, where the hyper
//! stack's errors surface through this crate's API.

use thiserror::Error;

/// Errors surfaced by the capture engine and its transports
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The request spec could not be turned into a dispatchable request
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Request construction failed in the http layer
    #[error("request build error: {0}")]
    Http(#[from] hyper::http::Error),

    /// The underlying hyper client reported a dispatch failure
    #[error("client error: {0}")]
    Client(#[from] hyper_util::client::legacy::Error),

    /// Response body streaming failed after the head was received
    #[error("body read error: {0}")]
    Body(String),

    /// No tokio runtime was available to drive a transport
    #[error("runtime unavailable: {0}")]
    Runtime(String),

    /// Tracing subscriber initialization failed
    #[error("observability init failed: {0}")]
    Observability(String),
}

/// Convenience result alias used throughout the crate
pub type Result<T> = std::result::Result<T, CaptureError>;
