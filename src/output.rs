use crate::encoder::EncoderConfig;
use crate::sink::LogSink;
use crate::writer_sink::WriterSink;
use std::path::PathBuf;
use std::sync::Arc;

/// Where records are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    Stderr,
    /// Append to a file, creating it if needed.
    File(PathBuf),
}

/// Parse an output specification.
///
/// Examples:
/// - "stdout" or "-"
/// - "stderr"
/// - "file:///var/log/app.jsonl" or a plain path like "logs/app.jsonl"
pub fn parse_output(spec: &str) -> Result<OutputTarget, OutputError> {
    let trimmed = spec.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "" => Err(OutputError::Empty),
        "stdout" | "-" => Ok(OutputTarget::Stdout),
        "stderr" => Ok(OutputTarget::Stderr),
        _ => {
            let path = trimmed.strip_prefix("file://").unwrap_or(trimmed);
            if path.is_empty() {
                Err(OutputError::Empty)
            } else {
                Ok(OutputTarget::File(PathBuf::from(path)))
            }
        }
    }
}

/// Error type returned when parsing an output specification.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum OutputError {
    #[error("output specification is empty")]
    Empty,
}

/// Error type returned when the sink for an output cannot be created.
#[derive(thiserror::Error, Debug)]
pub enum SinkBuildError {
    #[error("failed to open log file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Create the [`LogSink`] for `target`, encoding records with `encoder`.
pub async fn make_sink(target: &OutputTarget, encoder: EncoderConfig) -> Result<Arc<dyn LogSink>, SinkBuildError> {
    match target {
        OutputTarget::Stdout => Ok(Arc::new(WriterSink::new(tokio::io::stdout(), encoder)) as Arc<dyn LogSink>),
        OutputTarget::Stderr => Ok(Arc::new(WriterSink::new(tokio::io::stderr(), encoder)) as Arc<dyn LogSink>),
        OutputTarget::File(path) => {
            let file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await
                .map_err(|source| SinkBuildError::Open { path: path.clone(), source })?;
            Ok(Arc::new(WriterSink::new(file, encoder)) as Arc<dyn LogSink>)
        }
    }
}
