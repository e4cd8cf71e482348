//! Environment variable names read by [`DemoConfig::from_env`](crate::config::DemoConfig::from_env).
//!
//! Every variable is optional; unset variables fall back to the defaults
//! of [`DemoConfig`](crate::config::DemoConfig).

/// `stdout`, `stderr` or a file path.
pub const STRUCDBG_OUTPUT_ENV: &str = "STRUCDBG_OUTPUT";

/// Minimum severity written.
pub const STRUCDBG_LEVEL_ENV: &str = "STRUCDBG_LEVEL";

/// `rfc3339` or `epoch`.
pub const STRUCDBG_TIME_FORMAT_ENV: &str = "STRUCDBG_TIME_FORMAT";

/// Number of periodic loop iterations.
pub const STRUCDBG_ITERATIONS_ENV: &str = "STRUCDBG_ITERATIONS";

/// Periodic loop interval in milliseconds.
pub const STRUCDBG_INTERVAL_MS_ENV: &str = "STRUCDBG_INTERVAL_MS";

/// Levels of the nested error.
pub const STRUCDBG_ERROR_DEPTH_ENV: &str = "STRUCDBG_ERROR_DEPTH";

/// Depth at which the deep error is handled.
pub const STRUCDBG_DEEP_DEPTH_ENV: &str = "STRUCDBG_DEEP_DEPTH";

/// Reuse one innermost error instance when `true`.
pub const STRUCDBG_SHARED_ERROR_ENV: &str = "STRUCDBG_SHARED_ERROR";

/// Attach captured stacks to error records.
pub const STRUCDBG_STACK_ENV: &str = "STRUCDBG_STACK";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
