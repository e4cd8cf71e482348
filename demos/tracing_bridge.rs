use std::sync::Arc;

use strucdbg::encoder::EncoderConfig;
use strucdbg::layer::RecordLayer;
use strucdbg::pipeline::{Pipeline, PipelineConfig};
use strucdbg::writer_sink::WriterSink;
use tracing::{error, info, info_span};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Route plain `tracing` macros through the JSON record pipeline. Span
/// fields show up in every record emitted inside the span.
#[tokio::main]
async fn main() {
    let sink = Arc::new(WriterSink::new(tokio::io::stdout(), EncoderConfig::default()));
    let (logger, guard) = Pipeline::start(sink, PipelineConfig::default());

    let subscriber = Registry::default().with(RecordLayer::new(logger));
    tracing::subscriber::with_default(subscriber, || {
        info!(ev = "app_start", "Hello, tracing!");

        let span = info_span!("operation", operation_id = "abcde");
        let _entered = span.enter();
        info!(step = 2, records = 100, "Processing data");
        error!(ev = "operation_error", error = "level1 failed: innermost error occurred", "Operation failed");
    });

    guard.shutdown().await;
}
