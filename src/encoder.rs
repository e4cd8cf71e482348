use crate::record::LogRecord;
use chrono::SecondsFormat;
use serde_json::{Map, Value};
use std::str::FromStr;

/// How the record timestamp is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeFormat {
    /// `2024-05-01T12:00:00.123456Z`
    #[default]
    Rfc3339,
    /// Floating-point seconds since the Unix epoch.
    EpochSeconds,
}

impl FromStr for TimeFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rfc3339" | "iso8601" => Ok(TimeFormat::Rfc3339),
            "epoch" | "unix" => Ok(TimeFormat::EpochSeconds),
            other => Err(format!("unknown time format: {other}")),
        }
    }
}

/// Key names and value encodings of the JSON line written per record.
///
/// Defaults mirror a typical production encoder: `timestamp`, `level`,
/// `msg`, `logger` and `caller`. Setting `caller_key` to `None` leaves the
/// caller out of the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderConfig {
    pub time_key: String,
    pub level_key: String,
    pub message_key: String,
    pub name_key: String,
    pub caller_key: Option<String>,
    pub time_format: TimeFormat,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            time_key: "timestamp".to_string(),
            level_key: "level".to_string(),
            message_key: "msg".to_string(),
            name_key: "logger".to_string(),
            caller_key: Some("caller".to_string()),
            time_format: TimeFormat::Rfc3339,
        }
    }
}

/// Prefix for fields whose key collides with a reserved key.
///
/// Keys that already start with the prefix get it once more, so every
/// field keeps its own key in the output.
pub const SHADOWED_PREFIX: &str = "fields.";

impl EncoderConfig {
    fn is_reserved(&self, key: &str) -> bool {
        key == self.time_key
            || key == self.level_key
            || key == self.message_key
            || key == self.name_key
            || self.caller_key.as_deref() == Some(key)
    }

    /// Flatten a record into a single JSON object.
    ///
    /// Reserved keys come first and always hold record metadata; fields
    /// follow in order, with colliding or prefixed keys moved under
    /// [`SHADOWED_PREFIX`].
    pub fn encode(&self, record: &LogRecord) -> Map<String, Value> {
        let mut out = Map::new();

        let ts = match self.time_format {
            TimeFormat::Rfc3339 => Value::String(record.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)),
            TimeFormat::EpochSeconds => {
                let secs = record.timestamp.timestamp() as f64
                    + f64::from(record.timestamp.timestamp_subsec_micros()) / 1_000_000.0;
                Value::from(secs)
            }
        };
        out.insert(self.time_key.clone(), ts);
        out.insert(self.level_key.clone(), Value::String(record.level.as_str().to_string()));
        if let Some(name) = &record.logger {
            out.insert(self.name_key.clone(), Value::String(name.clone()));
        }
        if let (Some(key), Some(caller)) = (&self.caller_key, &record.caller) {
            out.insert(key.clone(), Value::String(caller.clone()));
        }
        out.insert(self.message_key.clone(), Value::String(record.message.clone()));

        for (key, value) in record.fields.iter() {
            if self.is_reserved(key) || key.starts_with(SHADOWED_PREFIX) {
                out.insert(format!("{SHADOWED_PREFIX}{key}"), value.clone());
            } else {
                out.insert(key.to_string(), value.clone());
            }
        }
        out
    }

    /// Encode a record as one newline-terminated JSON line.
    pub fn encode_line(&self, record: &LogRecord) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(&self.encode(record))?;
        line.push('\n');
        Ok(line)
    }
}
