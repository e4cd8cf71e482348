//! The crate's own diagnostic channel.
//!
//! Problems inside the logging pipeline (dropped records, sink failures,
//! fatal startup errors) are reported as ordinary `tracing` events under
//! [`DIAGNOSTIC_TARGET`]. They never enter the record stream; an
//! application decides where they go by installing a subscriber, typically
//! with [`init_diagnostics`].

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// `tracing` target used for every diagnostic event.
pub const DIAGNOSTIC_TARGET: &str = "strucdbg::diagnostics";

#[derive(Debug, Error)]
pub enum DiagnosticsError {
    #[error("invalid diagnostic filter: {0}")]
    InvalidFilter(String),
    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,
}

/// Install a process-wide subscriber that prints diagnostics to stderr.
///
/// The filter comes from `RUST_LOG` when set, otherwise `default_filter`
/// (e.g. `"warn"`).
pub fn init_diagnostics(default_filter: &str) -> Result<(), DiagnosticsError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter).map_err(|e| DiagnosticsError::InvalidFilter(e.to_string()))?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .try_init()
        .map_err(|_| DiagnosticsError::AlreadyInitialized)
}
