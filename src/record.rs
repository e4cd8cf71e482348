use crate::fields::Fields;
use crate::severity::Severity;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One structured log record as produced by a [`Logger`](crate::logger::Logger).
///
/// Bound fields of the emitting logger have already been merged into
/// `fields`, ahead of the call-site fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: Severity,
    pub message: String,
    pub logger: Option<String>,
    pub caller: Option<String>,
    pub fields: Fields,
}

impl LogRecord {
    pub fn new(level: Severity, message: impl Into<String>, fields: Fields) -> Self {
        LogRecord {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            logger: None,
            caller: None,
            fields,
        }
    }

    /// Value of the `ev` field, the event tag every record in the demo carries.
    pub fn event(&self) -> Option<&str> {
        self.fields.get("ev").and_then(|v| v.as_str())
    }
}
