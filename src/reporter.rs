use crate::fields;
use crate::logger::Logger;
use chrono::Utc;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

/// Bounds of the periodic reporter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoopConfig {
    pub interval: Duration,
    pub iterations: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            iterations: 20,
        }
    }
}

/// Emit one `main_loop` record per tick until `iterations` is reached,
/// then one `app_shutdown` record. Returns the number of iterations run.
///
/// The first tick fires one interval after the call. Late ticks are
/// delayed rather than bunched up.
pub async fn run_periodic(logger: &Logger, config: &LoopConfig) -> u64 {
    let period = config.interval.max(Duration::from_millis(1));
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut counter: u64 = 0;
    while counter < config.iterations {
        ticker.tick().await;
        counter += 1;
        logger.info(
            "Main loop iteration",
            fields!("ev" => "main_loop", "iteration" => counter).with_timestamp("timestamp", Utc::now()),
        );
    }

    logger.info(
        format!("Stopping after {counter} iterations"),
        fields! { "ev" => "app_shutdown", "iterations" => counter },
    );
    counter
}
