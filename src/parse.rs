//! Reading structured log output back.
//!
//! Accepts what this crate writes as well as the JSON lines of other
//! structured loggers: key names are looked up through common aliases and
//! levels go through [`Severity::normalize`]. Several objects printed on one
//! line (`{..}{..}`) are split apart; anything that is not a JSON object is
//! kept as a raw line. Stack text is split into frames by [`parse_stack`].

use crate::encoder::SHADOWED_PREFIX;
use crate::fields::Fields;
use crate::severity::Severity;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Deserializer, Map, Value};
use std::collections::HashSet;

const SEVERITY_KEYS: &[&str] = &["severity", "level", "lvl", "levelname"];
const MESSAGE_KEYS: &[&str] = &["message", "msg", "event", "text"];
const TIMESTAMP_KEYS: &[&str] = &["timestamp", "time", "ts"];
const STACK_KEYS: &[&str] = &["stack", "stacktrace", "exception"];

/// One structured record recovered from output.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecord {
    pub severity: Severity,
    pub message: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub operation_id: Option<String>,
    pub stack: Option<String>,
    /// `stack` split into frames, innermost first as printed.
    pub frames: Vec<StackFrame>,
    /// Every key not consumed above, in output order.
    pub fields: Fields,
}

/// One frame of a printed stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    /// Frame number when the stack prints one.
    pub index: Option<usize>,
    pub name: String,
    pub filename: Option<String>,
    pub lineno: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    Structured(ParsedRecord),
    Raw(String),
}

/// Split `text` into lines and parse each one.
pub fn parse_lines(text: &str) -> Vec<ParsedLine> {
    let mut out = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match split_objects(trimmed) {
            Some(objects) => out.extend(objects.into_iter().map(|o| ParsedLine::Structured(parse_record(o)))),
            None => out.push(ParsedLine::Raw(trimmed.to_string())),
        }
    }
    out
}

/// All JSON objects on one line, or `None` if the line holds anything else.
fn split_objects(line: &str) -> Option<Vec<Map<String, Value>>> {
    let mut objects = Vec::new();
    for value in Deserializer::from_str(line).into_iter::<Value>() {
        match value {
            Ok(Value::Object(map)) => objects.push(map),
            _ => return None,
        }
    }
    Some(objects)
}

fn take_first(map: &mut Map<String, Value>, keys: &[&str]) -> Option<Value> {
    keys.iter().find_map(|key| map.shift_remove(*key))
}

/// Interpret one decoded JSON object as a record.
pub fn parse_record(mut map: Map<String, Value>) -> ParsedRecord {
    let severity = Severity::normalize(take_first(&mut map, SEVERITY_KEYS).as_ref());
    let message = match take_first(&mut map, MESSAGE_KEYS) {
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
        None => String::new(),
    };
    let timestamp = take_first(&mut map, TIMESTAMP_KEYS).and_then(|v| parse_timestamp(&v));
    let stack = take_first(&mut map, STACK_KEYS).map(|v| match v {
        Value::String(s) => s,
        other => other.to_string(),
    });
    let frames = stack.as_deref().map(parse_stack).unwrap_or_default();
    let operation_id = map.get("operation_id").and_then(|v| v.as_str()).map(str::to_string);

    let present: HashSet<String> = map.keys().cloned().collect();
    let fields = map
        .into_iter()
        .map(|(key, value)| match key.strip_prefix(SHADOWED_PREFIX) {
            Some(original) if !keeps_prefix(&key, &present) => (original.to_string(), value),
            _ => (key, value),
        })
        .collect();

    ParsedRecord {
        severity,
        message,
        timestamp,
        operation_id,
        stack,
        frames,
        fields,
    }
}

/// Whether `key` stays as written instead of losing one [`SHADOWED_PREFIX`].
///
/// Unprefixed keys always stay. A prefixed key stays only if its unprefixed
/// form is present and stays too, so restored keys never collide.
fn keeps_prefix(key: &str, present: &HashSet<String>) -> bool {
    match key.strip_prefix(SHADOWED_PREFIX) {
        None => true,
        Some(original) => present.contains(original) && keeps_prefix(original, present),
    }
}

/// Split printed stack text into frames.
///
/// Understands the Rust backtrace layout (`  3: name` followed by
/// `at file:line:col`) and Python tracebacks (`File "f.py", line 3, in name`).
/// Lines that fit neither, such as headers or exception messages, are skipped.
pub fn parse_stack(text: &str) -> Vec<StackFrame> {
    let mut frames: Vec<StackFrame> = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(location) = line.strip_prefix("at ") {
            if let Some(frame) = frames.last_mut() {
                let (filename, lineno) = split_location(location);
                frame.filename = Some(filename);
                frame.lineno = lineno;
            }
        } else if let Some(frame) = python_frame(line) {
            frames.push(frame);
        } else if let Some((index, name)) = line.split_once(": ") {
            if let Ok(index) = index.parse::<usize>() {
                frames.push(StackFrame {
                    index: Some(index),
                    name: name.to_string(),
                    filename: None,
                    lineno: None,
                });
            }
        }
    }
    frames
}

/// `file:line:col` or `file:line`; the file part may itself contain colons.
fn split_location(location: &str) -> (String, Option<u32>) {
    let mut parts = location.rsplitn(3, ':');
    let last = parts.next().and_then(|p| p.parse::<u32>().ok());
    let middle = parts.next();
    let rest = parts.next();
    match (last, middle, rest) {
        (Some(_), Some(line), Some(file)) if line.parse::<u32>().is_ok() => (file.to_string(), line.parse().ok()),
        (Some(line), Some(_), _) => match location.rsplit_once(':') {
            Some((file, _)) => (file.to_string(), Some(line)),
            None => (location.to_string(), None),
        },
        _ => (location.to_string(), None),
    }
}

fn python_frame(line: &str) -> Option<StackFrame> {
    let rest = line.strip_prefix("File \"")?;
    let (filename, rest) = rest.split_once("\", line ")?;
    let (lineno, name) = match rest.split_once(", in ") {
        Some((lineno, name)) => (lineno, name),
        None => (rest, "<module>"),
    };
    Some(StackFrame {
        index: None,
        name: name.to_string(),
        filename: Some(filename.to_string()),
        lineno: lineno.trim().parse().ok(),
    })
}

/// RFC 3339 strings, or numbers as Unix seconds (milliseconds when the
/// value is too large to be seconds).
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => {
            let raw = n.as_f64()?;
            let millis = if raw.abs() < 1e11 { raw * 1000.0 } else { raw };
            Utc.timestamp_millis_opt(millis.round() as i64).single()
        }
        _ => None,
    }
}
