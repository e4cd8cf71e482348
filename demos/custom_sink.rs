use std::sync::Arc;

use async_trait::async_trait;
use strucdbg::chain::{layered_failure, ErrorIdentity, ErrorReport};
use strucdbg::fields;
use strucdbg::pipeline::{Pipeline, PipelineConfig};
use strucdbg::record::LogRecord;
use strucdbg::sink::LogSink;

/// Example of plugging in a completely custom destination by implementing
/// the `LogSink` trait directly. This one prints a compact one-line
/// summary instead of JSON.
struct SummarySink;

#[async_trait]
impl LogSink for SummarySink {
    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        println!(
            "[{:>5}] {} {}",
            record.level.as_str(),
            record.message,
            serde_json::to_string(&record.fields)?
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let (logger, guard) = Pipeline::start(Arc::new(SummarySink), PipelineConfig::default());

    let op = logger.with(fields! { "operation_id" => "abcde" });
    op.info("custom sink example started", ());

    let err = layered_failure(3, ErrorIdentity::Fresh);
    op.error(
        "Operation failed",
        ErrorReport::new(&*err).fields(false).with("ev", "operation_error"),
    );

    drop(op);
    drop(logger);
    guard.shutdown().await;
}
