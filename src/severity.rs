use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Urgency of a [`LogRecord`](crate::record::LogRecord).
///
/// Ordered from least to most urgent, so `severity >= min_level` is the
/// filtering test used by [`Logger`](crate::logger::Logger).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

impl Severity {
    pub const ALL: [Severity; 4] = [Severity::Debug, Severity::Info, Severity::Warn, Severity::Error];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        }
    }

    /// Map a level found in foreign output onto a [`Severity`].
    ///
    /// Accepts the names and abbreviations used by common structured
    /// loggers (`warning`, `err`, `crit`, ...) and the numeric levels of
    /// Python's `logging` module. `critical`/`fatal` fold into
    /// [`Severity::Error`]. Anything unrecognised, including a missing
    /// value, is treated as [`Severity::Info`].
    pub fn normalize(raw: Option<&Value>) -> Severity {
        match raw {
            None | Some(Value::Null) => Severity::Info,
            Some(Value::Number(n)) => n.as_f64().map(Self::from_number).unwrap_or(Severity::Info),
            Some(Value::String(s)) => s
                .parse::<Severity>()
                .ok()
                .or_else(|| s.trim().parse::<f64>().ok().map(Self::from_number))
                .unwrap_or(Severity::Info),
            Some(_) => Severity::Info,
        }
    }

    fn from_number(n: f64) -> Severity {
        if n >= 40.0 {
            Severity::Error
        } else if n >= 30.0 {
            Severity::Warn
        } else if n >= 20.0 {
            Severity::Info
        } else {
            Severity::Debug
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown severity: {0}")]
pub struct ParseSeverityError(pub String);

impl FromStr for Severity {
    type Err = ParseSeverityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" | "dbg" | "d" | "trace" => Ok(Severity::Debug),
            "info" | "information" | "i" => Ok(Severity::Info),
            "warn" | "warning" | "w" => Ok(Severity::Warn),
            "error" | "err" | "e" | "critical" | "crit" | "fatal" | "f" => Ok(Severity::Error),
            _ => Err(ParseSeverityError(s.to_string())),
        }
    }
}

impl From<tracing::Level> for Severity {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE | tracing::Level::DEBUG => Severity::Debug,
            tracing::Level::INFO => Severity::Info,
            tracing::Level::WARN => Severity::Warn,
            tracing::Level::ERROR => Severity::Error,
        }
    }
}

impl From<Severity> for tracing::Level {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Debug => tracing::Level::DEBUG,
            Severity::Info => tracing::Level::INFO,
            Severity::Warn => tracing::Level::WARN,
            Severity::Error => tracing::Level::ERROR,
        }
    }
}
