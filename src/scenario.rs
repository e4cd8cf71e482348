//! The demonstration script run by `strucdbg-demo`.
//!
//! Each step mirrors a section of the reference logging programs: plain
//! levels, structured fields, an operation-scoped logger, a nested error,
//! an error logged with the stack at the logging site, an error handled
//! deep down, and finally the periodic loop.

use crate::chain::{layered_failure, ErrorIdentity, ErrorReport, RootError};
use crate::config::DemoConfig;
use crate::fields;
use crate::logger::Logger;
use crate::reporter::run_periodic;

/// Run every step in order. Returns the number of loop iterations.
pub async fn run(logger: &Logger, config: &DemoConfig) -> u64 {
    log_levels(logger);
    log_user_login(logger);
    log_operation(logger);
    log_nested_error(logger, config.error_depth, config.error_identity, config.include_stack);
    log_stacktrace_example(logger, config.include_stack);
    log_deep_error(logger, config.deep_depth, config.error_identity);
    run_periodic(logger, &config.reporter()).await
}

pub fn log_levels(logger: &Logger) {
    logger.debug("Debugging strucdbg!", fields! { "ev" => "app_start" });
    logger.info("Hello, strucdbg!", fields! { "ev" => "app_start" });
    logger.warn("Warning from strucdbg!", fields! { "ev" => "app_start" });
    logger.error("Error in strucdbg!", fields! { "ev" => "app_start" });
}

pub fn log_user_login(logger: &Logger) {
    logger.info(
        "User logged in",
        fields! {
            "user_id" => 12345,
            "username" => "john_doe",
            "ip_address" => "192.168.1.1",
        },
    );
}

/// Five records from one operation, all carrying its `operation_id`.
pub fn log_operation(logger: &Logger) {
    let op = logger.with(fields! { "operation_id" => "abcde" });
    op.debug("Starting operation", fields! { "step" => 1 });
    op.info("Processing data", fields! { "step" => 2, "records" => 100 });
    op.info("Operation halfway", fields! { "step" => 3, "progress" => 50 });
    op.warn("Slow performance detected", fields! { "step" => 4, "latency_ms" => 250 });
    op.info("Operation complete", fields! { "step" => 5, "duration_ms" => 1200 });
}

pub fn log_nested_error(logger: &Logger, depth: usize, identity: ErrorIdentity, include_stack: bool) {
    let err = layered_failure(depth, identity);
    let report = ErrorReport::new(&*err);
    logger.error(
        "Operation failed",
        report.fields(include_stack).with("ev", "operation_error"),
    );
}

/// An error without a captured stack, logged with the stack of the
/// logging site instead.
pub fn log_stacktrace_example(logger: &Logger, include_stack: bool) {
    let err = RootError::new("sample error for stacktrace");
    let report = ErrorReport::new(&err).or_capture_here();
    logger.error(
        "An error occurred with stacktrace",
        report.fields(include_stack).with("ev", "stacktrace_example"),
    );
}

/// Descend `depth` levels, naming the logger after each one, and log the
/// innermost error where it is handled. The record's logger name carries
/// the path taken, e.g. `level1.level2.level3`.
pub fn log_deep_error(logger: &Logger, depth: usize, identity: ErrorIdentity) {
    let mut handler = logger.clone();
    let mut reached = 0;
    for level in 1..=depth {
        handler = handler.named(&format!("level{level}"));
        reached = level;
    }

    let err = identity.innermost();
    handler.error(
        "Deep error occurred",
        fields! {
            "error" => err.to_string(),
            "ev" => "deep_error",
            "depth" => reached,
        },
    );
}
