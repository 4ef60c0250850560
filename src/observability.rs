// src/observability.rs
//! Tracing setup for embedding processes
//!
//! The engine only emits `tracing` diagnostics; whether and how they
//! are rendered is the host's choice. `init_tracing` offers the usual
//! env-filtered fmt subscriber for hosts that have not set one up.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::utils::errors::{CaptureError, Result};

/// Initialize an env-filtered fmt subscriber.
///
/// Filter via `RUST_LOG`; defaults to `info`. Fails if a global
/// subscriber is already set.
pub fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .map_err(|e| CaptureError::Observability(e.to_string()))
}
