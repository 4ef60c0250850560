// src/interception/mod.rs
//! Outbound-call interception layer
//!
//! Transparent observation of every outbound HTTP/HTTPS call:
//!
//! - **request**: request specs, options, and the per-call trace context
//! - **handle**: the request handle returned to callers
//! - **transport**: the opaque networking primitive seam + hyper impls
//! - **engine**: the instrumented dispatch wrapper and client surface
//! - **installer**: idempotent install/uninstall of the wrappers
//!
//! # Architecture
//!
//! ```text
//! Application code (unchanged call sites)
//!     │
//!     └─ ProtocolClient.get()/.request()
//!            │
//!            └─ active dispatch slot ── CaptureDispatch ── real Transport
//!                                           │
//!                                           ├─ start/end timeline marks
//!                                           └─ normalize → flatten → filter → CallStore
//! ```

pub mod engine;
pub mod handle;
pub mod installer;
pub mod request;
pub mod transport;

// Re-export commonly used types
pub use engine::{CaptureDispatch, ProtocolClient};
pub use handle::{ClientResponse, ErrorCallback, RequestHandle, ResponseCallback};
pub use installer::CaptureController;
pub use request::{HeaderValue, PreparedRequest, Protocol, RequestOptions, RequestSpec};
pub use transport::{HyperTransport, Transport};
