use crate::chain::ErrorIdentity;
use crate::encoder::{EncoderConfig, TimeFormat};
use crate::env::*;
use crate::output::{parse_output, OutputTarget};
use crate::pipeline::PipelineConfig;
use crate::reporter::LoopConfig;
use crate::severity::Severity;
use std::str::FromStr;
use tokio::time::Duration;

/// Settings of the demonstration binary.
///
/// The defaults reproduce the reference programs exactly: everything on
/// stdout from `debug` up, a three-level nested error, a deep error handled
/// five calls down, and twenty loop iterations two seconds apart.
#[derive(Clone, Debug, PartialEq)]
pub struct DemoConfig {
    pub output: OutputTarget,
    pub min_level: Severity,
    pub time_format: TimeFormat,
    pub iterations: u64,
    pub interval: Duration,
    pub error_depth: usize,
    pub deep_depth: usize,
    pub error_identity: ErrorIdentity,
    pub include_stack: bool,
}

impl Default for DemoConfig {
    fn default() -> Self {
        let lp = LoopConfig::default();
        Self {
            output: OutputTarget::Stdout,
            min_level: Severity::Debug,
            time_format: TimeFormat::Rfc3339,
            iterations: lp.iterations,
            interval: lp.interval,
            error_depth: 3,
            deep_depth: 5,
            error_identity: ErrorIdentity::Fresh,
            include_stack: true,
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl DemoConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(env_or)
    }

    /// Build configuration from a lookup of `(key, default) -> value`.
    pub fn from_vars<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str, &str) -> String,
    {
        let d = DemoConfig::default();

        let output = {
            let raw = get(STRUCDBG_OUTPUT_ENV, "stdout");
            parse_output(&raw).map_err(|e| invalid(STRUCDBG_OUTPUT_ENV, &raw, e))?
        };
        let min_level: Severity = parse(&get, STRUCDBG_LEVEL_ENV, d.min_level.as_str())?;
        let time_format: TimeFormat = parse(&get, STRUCDBG_TIME_FORMAT_ENV, "rfc3339")?;
        let iterations: u64 = parse(&get, STRUCDBG_ITERATIONS_ENV, &d.iterations.to_string())?;

        let interval_ms: u64 = parse(&get, STRUCDBG_INTERVAL_MS_ENV, &d.interval.as_millis().to_string())?;
        if interval_ms == 0 {
            return Err(invalid(STRUCDBG_INTERVAL_MS_ENV, "0", "must be greater than zero"));
        }

        let error_depth: usize = parse(&get, STRUCDBG_ERROR_DEPTH_ENV, &d.error_depth.to_string())?;
        if error_depth == 0 {
            return Err(invalid(STRUCDBG_ERROR_DEPTH_ENV, "0", "must be at least 1"));
        }
        let deep_depth: usize = parse(&get, STRUCDBG_DEEP_DEPTH_ENV, &d.deep_depth.to_string())?;

        let shared: bool = parse_flag(&get, STRUCDBG_SHARED_ERROR_ENV, false)?;
        let include_stack = parse_flag(&get, STRUCDBG_STACK_ENV, d.include_stack)?;

        Ok(DemoConfig {
            output,
            min_level,
            time_format,
            iterations,
            interval: Duration::from_millis(interval_ms),
            error_depth,
            deep_depth,
            error_identity: if shared { ErrorIdentity::Shared } else { ErrorIdentity::Fresh },
            include_stack,
        })
    }

    pub fn encoder(&self) -> EncoderConfig {
        EncoderConfig {
            time_format: self.time_format,
            ..EncoderConfig::default()
        }
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            min_level: self.min_level,
            ..PipelineConfig::default()
        }
    }

    pub fn reporter(&self) -> LoopConfig {
        LoopConfig {
            interval: self.interval,
            iterations: self.iterations,
        }
    }
}

fn invalid(key: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse<F, T>(get: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str, &str) -> String,
    T: FromStr,
    T::Err: ToString,
{
    let raw = get(key, default);
    raw.trim().parse::<T>().map_err(|e| invalid(key, &raw, e))
}

fn parse_flag<F>(get: &F, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str, &str) -> String,
{
    let raw = get(key, if default { "true" } else { "false" });
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, &raw, "expected true or false")),
    }
}
