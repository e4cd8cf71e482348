use crate::diagnostics::DIAGNOSTIC_TARGET;
use crate::fields::Fields;
use crate::pipeline::PipelineStats;
use crate::record::LogRecord;
use crate::severity::Severity;
use chrono::Utc;
use std::panic::Location;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Structured emitter handle.
///
/// A `Logger` is an explicit value: build one with
/// [`Pipeline::start`](crate::pipeline::Pipeline::start) and pass it (or a
/// reference) to whatever needs to log. Contextual loggers derived with
/// [`Logger::with`], [`Logger::named`] and [`Logger::without`] share the
/// same pipeline but carry their own bound fields; a derived logger never
/// changes after creation and never affects its parent.
///
/// Emitting never waits on the sink. When the pipeline cannot take a
/// record it is dropped and reported on the diagnostic channel.
#[derive(Clone)]
pub struct Logger {
    sender: mpsc::Sender<LogRecord>,
    stats: Arc<PipelineStats>,
    min_level: Severity,
    capture_caller: bool,
    name: Option<Arc<str>>,
    bound: Arc<Fields>,
}

impl Logger {
    pub(crate) fn new(
        sender: mpsc::Sender<LogRecord>,
        stats: Arc<PipelineStats>,
        min_level: Severity,
        capture_caller: bool,
    ) -> Self {
        Logger {
            sender,
            stats,
            min_level,
            capture_caller,
            name: None,
            bound: Arc::new(Fields::new()),
        }
    }

    /// Child logger that prepends `fields` to every record it emits.
    ///
    /// Call-site fields override bound ones with the same key, and the
    /// child's fields override the parent's.
    pub fn with(&self, fields: impl Into<Fields>) -> Logger {
        let mut child = self.clone();
        child.bound = Arc::new(self.bound.merged(&fields.into()));
        child
    }

    /// Child logger whose name is `name` appended to the parent's with a dot.
    pub fn named(&self, name: &str) -> Logger {
        let mut child = self.clone();
        child.name = Some(match &self.name {
            Some(parent) => format!("{parent}.{name}").into(),
            None => name.into(),
        });
        child
    }

    /// Child logger with the given bound keys removed.
    pub fn without(&self, keys: &[&str]) -> Logger {
        let mut bound = (*self.bound).clone();
        for key in keys {
            bound.remove(key);
        }
        let mut child = self.clone();
        child.bound = Arc::new(bound);
        child
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn bound_fields(&self) -> &Fields {
        &self.bound
    }

    pub fn min_level(&self) -> Severity {
        self.min_level
    }

    pub fn enabled(&self, severity: Severity) -> bool {
        severity >= self.min_level
    }

    /// Emit one record.
    #[track_caller]
    pub fn emit(&self, severity: Severity, message: impl Into<String>, fields: impl Into<Fields>) {
        let caller = if self.capture_caller {
            let loc = Location::caller();
            Some(format!("{}:{}", loc.file(), loc.line()))
        } else {
            None
        };
        self.emit_at(severity, message.into(), fields.into(), caller);
    }

    #[track_caller]
    pub fn debug(&self, message: impl Into<String>, fields: impl Into<Fields>) {
        self.emit(Severity::Debug, message, fields);
    }

    #[track_caller]
    pub fn info(&self, message: impl Into<String>, fields: impl Into<Fields>) {
        self.emit(Severity::Info, message, fields);
    }

    #[track_caller]
    pub fn warn(&self, message: impl Into<String>, fields: impl Into<Fields>) {
        self.emit(Severity::Warn, message, fields);
    }

    #[track_caller]
    pub fn error(&self, message: impl Into<String>, fields: impl Into<Fields>) {
        self.emit(Severity::Error, message, fields);
    }

    /// Emit with an explicit caller location, for bridges that already
    /// know where the event came from.
    pub(crate) fn emit_at(&self, severity: Severity, message: String, fields: Fields, caller: Option<String>) {
        self.stats.total.fetch_add(1, Ordering::Relaxed);
        if !self.enabled(severity) {
            return;
        }

        let record = LogRecord {
            timestamp: Utc::now(),
            level: severity,
            message,
            logger: self.name.as_deref().map(str::to_string),
            caller: if self.capture_caller { caller } else { None },
            fields: self.bound.merged(&fields),
        };
        self.dispatch(record);
    }

    fn dispatch(&self, record: LogRecord) {
        match self.sender.try_send(record) {
            Ok(()) => {
                self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Full(record)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    target: DIAGNOSTIC_TARGET,
                    level = %record.level,
                    "log channel full, dropping log record"
                );
            }
            Err(TrySendError::Closed(record)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    target: DIAGNOSTIC_TARGET,
                    level = %record.level,
                    "log pipeline closed, dropping log record"
                );
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::fields;
    use serde_json::json;

    /// Logger wired straight to a channel, no worker.
    pub(crate) fn channel_logger(min_level: Severity) -> (Logger, mpsc::Receiver<LogRecord>) {
        let (tx, rx) = mpsc::channel(64);
        (Logger::new(tx, Arc::default(), min_level, true), rx)
    }

    #[test]
    fn bound_fields_come_first_and_call_site_wins() {
        let (logger, mut rx) = channel_logger(Severity::Debug);
        let op = logger.with(fields! { "operation_id" => "abcde", "step" => 0 });

        op.warn("Slow performance detected", fields! { "step" => 4, "latency_ms" => 250 });

        let record = rx.try_recv().unwrap();
        assert_eq!(record.level, Severity::Warn);
        assert_eq!(
            record.fields,
            fields! { "operation_id" => "abcde", "step" => 4, "latency_ms" => 250 }
        );
        assert_eq!(
            record.fields.keys().collect::<Vec<_>>(),
            vec!["operation_id", "step", "latency_ms"]
        );
    }

    #[test]
    fn binding_does_not_touch_the_parent() {
        let (logger, mut rx) = channel_logger(Severity::Debug);
        let _child = logger.with(fields! { "operation_id" => "abcde" });

        logger.info("Hello!", fields! { "ev" => "app_start" });
        let record = rx.try_recv().unwrap();
        assert!(!record.fields.contains_key("operation_id"));
    }

    #[test]
    fn binding_twice_yields_identical_independent_loggers() {
        let (logger, mut rx) = channel_logger(Severity::Debug);
        let a = logger.with(fields! { "operation_id" => "abcde" });
        let b = logger.with(fields! { "operation_id" => "abcde" });

        a.info("Processing data", fields! { "step" => 2, "records" => 100 });
        b.info("Processing data", fields! { "step" => 2, "records" => 100 });

        let ra = rx.try_recv().unwrap();
        let rb = rx.try_recv().unwrap();
        assert_eq!(ra.fields, rb.fields);
        assert_eq!(ra.message, rb.message);
        assert_eq!(ra.level, rb.level);
        assert!(!Arc::ptr_eq(&a.bound, &b.bound));
    }

    #[test]
    fn nested_children_override_parents() {
        let (logger, mut rx) = channel_logger(Severity::Debug);
        let child = logger
            .with(fields! { "operation_id" => "abcde", "tenant" => "a" })
            .with(fields! { "tenant" => "b" });

        child.debug("Starting operation", fields! { "step" => 1 });
        let record = rx.try_recv().unwrap();
        assert_eq!(record.fields.get("tenant"), Some(&json!("b")));
        assert_eq!(record.fields.get("operation_id"), Some(&json!("abcde")));
    }

    #[test]
    fn without_removes_bound_keys() {
        let (logger, mut rx) = channel_logger(Severity::Debug);
        let bound = logger.with(fields! { "operation_id" => "abcde", "tenant" => "a" });
        let unbound = bound.without(&["operation_id"]);

        unbound.info("after unbind", ());
        bound.info("still bound", ());

        assert_eq!(rx.try_recv().unwrap().fields, fields! { "tenant" => "a" });
        assert!(rx.try_recv().unwrap().fields.contains_key("operation_id"));
    }

    #[test]
    fn names_nest_with_dots() {
        let (logger, mut rx) = channel_logger(Severity::Debug);
        let worker = logger.named("worker").named("io");
        assert_eq!(worker.name(), Some("worker.io"));

        worker.info("named", ());
        assert_eq!(rx.try_recv().unwrap().logger.as_deref(), Some("worker.io"));
    }

    #[test]
    fn records_below_min_level_are_not_built() {
        let (logger, mut rx) = channel_logger(Severity::Warn);
        logger.debug("quiet", ());
        logger.info("quiet", ());
        logger.error("loud", ());

        let record = rx.try_recv().unwrap();
        assert_eq!(record.message, "loud");
        assert!(rx.try_recv().is_err());
        assert_eq!(logger.stats.snapshot().total, 3);
        assert_eq!(logger.stats.snapshot().enqueued, 1);
    }

    #[test]
    fn caller_points_at_the_call_site() {
        let (logger, mut rx) = channel_logger(Severity::Debug);
        logger.info("where", ());
        let caller = rx.try_recv().unwrap().caller.unwrap();
        assert!(caller.starts_with(file!()), "unexpected caller {caller}");
    }
}
