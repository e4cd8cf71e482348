use std::process::ExitCode;

use strucdbg::config::DemoConfig;
use strucdbg::diagnostics::{init_diagnostics, DIAGNOSTIC_TARGET};
use strucdbg::output::make_sink;
use strucdbg::pipeline::Pipeline;
use strucdbg::scenario;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    if let Err(e) = init_diagnostics("warn") {
        eprintln!("strucdbg: diagnostics unavailable: {e}");
    }

    let config = match DemoConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(target: DIAGNOSTIC_TARGET, error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let sink = match make_sink(&config.output, config.encoder()).await {
        Ok(sink) => sink,
        Err(e) => {
            tracing::error!(target: DIAGNOSTIC_TARGET, error = %e, "failed to build log sink");
            return ExitCode::FAILURE;
        }
    };

    let (logger, guard) = Pipeline::start(sink, config.pipeline());
    let iterations = scenario::run(&logger, &config).await;
    drop(logger);

    let stats = guard.shutdown().await;
    tracing::debug!(
        target: DIAGNOSTIC_TARGET,
        iterations,
        written = stats.written,
        dropped = stats.dropped,
        failed = stats.failed,
        "scenario finished"
    );
    ExitCode::SUCCESS
}
