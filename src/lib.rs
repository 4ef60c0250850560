// src/lib.rs
//! Egress Trace Capture Engine
//!
//! This library observes every outbound HTTP/HTTPS call an application
//! makes, records timing marks and request/response metadata for each
//! call, and leaves the captured records in a shared store for an
//! observability agent to export.
//!
//! # Architecture
//!
//! The engine is structured into several key modules:
//!
//! - **interception**: dispatch wrappers, install/uninstall controller,
//!   the production hyper transports
//! - **capture**: metadata normalization, flattening, field filtering,
//!   and the pending-call metadata store
//! - **timeline**: the consumed performance-measurement facility
//! - **observability**: tracing subscriber setup for embedding processes
//! - **utils**: configuration and error types
//!
//! Installation happens once, at the process's single client
//! construction point:
//!
//! ```rust,ignore
//! let controller = CaptureController::hyper()?;
//! let timeline = Timeline::shared();
//! let store = CallStore::shared();
//! controller.install(timeline, store.clone(), CaptureConfig::default());
//!
//! let client = controller.client(Protocol::Https);
//! client.get("https://api.example.com/v1/items", None)?;
//! ```

// Public module exports
pub mod capture;
pub mod interception;
pub mod observability;
pub mod timeline;
pub mod utils;

// Re-export commonly used types
pub use capture::filter::{FilterFn, FilterOutcome};
pub use capture::flatten::FlatRecord;
pub use capture::store::{CallId, CallRecord, CallStore, SharedStore};
pub use interception::engine::ProtocolClient;
pub use interception::handle::{ClientResponse, RequestHandle, ResponseCallback};
pub use interception::installer::CaptureController;
pub use interception::request::{HeaderValue, Protocol, RequestOptions, RequestSpec};
pub use interception::transport::Transport;
pub use timeline::{SharedTimeline, Timeline, TimelineEntry};
pub use utils::config::CaptureConfig;
pub use utils::errors::{CaptureError, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
