use crate::diagnostics::DIAGNOSTIC_TARGET;
use crate::logger::Logger;
use crate::record::LogRecord;
use crate::severity::Severity;
use crate::sink::LogSink;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};

/// Configuration of the record pipeline.
///
/// **Fields**
/// - `channel_buffer`: maximum number of [`LogRecord`]s queued before new
///   records are dropped.
/// - `batch_size`: number of records written before the sink is flushed.
/// - `flush_interval`: longest time a partial batch waits before it is
///   written and flushed.
/// - `min_level`: records below this severity are never built.
/// - `capture_caller`: attach the emitting source location to records.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub channel_buffer: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub min_level: Severity,
    pub capture_caller: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel_buffer: 1024,
            batch_size: 128,
            flush_interval: Duration::from_secs(1),
            min_level: Severity::Debug,
            capture_caller: true,
        }
    }
}

/// Counters shared between every [`Logger`] of a pipeline and its worker.
#[derive(Debug, Default)]
pub struct PipelineStats {
    /// Emit calls seen, before level filtering.
    pub total: AtomicU64,
    /// Records accepted into the channel.
    pub enqueued: AtomicU64,
    /// Records dropped because the channel was full or closed.
    pub dropped: AtomicU64,
    /// Records the sink accepted.
    pub written: AtomicU64,
    /// Records the sink rejected.
    pub failed: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub total: u64,
    pub enqueued: u64,
    pub dropped: u64,
    pub written: u64,
    pub failed: u64,
}

impl PipelineStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total: self.total.load(Ordering::Relaxed),
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Entry point for wiring a sink to a [`Logger`].
pub struct Pipeline;

impl Pipeline {
    /// Spawn the background worker and return the root logger plus the
    /// guard that owns the worker.
    ///
    /// Must be called from within a Tokio runtime. Minimal thresholds are
    /// enforced for `channel_buffer`, `batch_size` and `flush_interval`.
    pub fn start(sink: Arc<dyn LogSink>, config: PipelineConfig) -> (Logger, LogGuard) {
        let buffer = config.channel_buffer.max(1);
        let batch_size = config.batch_size.max(1);
        let flush_interval = config.flush_interval.max(Duration::from_millis(10));

        let (tx, rx) = mpsc::channel::<LogRecord>(buffer);
        let (stop_tx, stop_rx) = oneshot::channel();
        let stats = Arc::new(PipelineStats::default());

        let worker = Worker {
            sink,
            rx,
            stats: Arc::clone(&stats),
            batch: Vec::with_capacity(batch_size),
            batch_size,
        };
        let handle = tokio::spawn(worker.run(flush_interval, stop_rx));

        let logger = Logger::new(tx, Arc::clone(&stats), config.min_level, config.capture_caller);
        let guard = LogGuard {
            stop: Some(stop_tx),
            handle: Some(handle),
            stats,
        };
        (logger, guard)
    }
}

/// Owns the pipeline worker.
///
/// [`LogGuard::shutdown`] stops intake, writes every queued record and
/// flushes the sink. Dropping the guard without calling it still signals
/// the worker to drain and flush in the background.
pub struct LogGuard {
    stop: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
    stats: Arc<PipelineStats>,
}

impl LogGuard {
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Drain, flush and wait for the worker to finish.
    pub async fn shutdown(mut self) -> StatsSnapshot {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::error!(target: DIAGNOSTIC_TARGET, error = %e, "log pipeline worker failed");
            }
        }
        self.stats.snapshot()
    }
}

impl Drop for LogGuard {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

struct Worker {
    sink: Arc<dyn LogSink>,
    rx: mpsc::Receiver<LogRecord>,
    stats: Arc<PipelineStats>,
    batch: Vec<LogRecord>,
    batch_size: usize,
}

impl Worker {
    async fn run(mut self, flush_interval: Duration, mut stop: oneshot::Receiver<()>) {
        let mut ticker = time::interval(flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut stopping = false;

        loop {
            tokio::select! {
                biased;
                _ = &mut stop, if !stopping => {
                    // Refuse new records; whatever is queued is still drained below.
                    stopping = true;
                    self.rx.close();
                }
                maybe = self.rx.recv() => match maybe {
                    Some(record) => {
                        self.batch.push(record);
                        if self.batch.len() >= self.batch_size {
                            self.write_batch().await;
                        }
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    if !self.batch.is_empty() {
                        self.write_batch().await;
                    }
                }
            }
        }

        self.write_batch().await;
    }

    async fn write_batch(&mut self) {
        for record in self.batch.drain(..) {
            match self.sink.send(&record).await {
                Ok(()) => {
                    self.stats.written.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    self.stats.failed.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        target: DIAGNOSTIC_TARGET,
                        error = %e,
                        level = %record.level,
                        "log sink send failed, dropping record"
                    );
                }
            }
        }
        if let Err(e) = self.sink.flush().await {
            tracing::warn!(target: DIAGNOSTIC_TARGET, error = %e, "log sink flush failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields;
    use crate::memory_sink::MemorySink;
    use async_trait::async_trait;
    use std::error::Error;

    struct FailingSink;

    #[async_trait]
    impl LogSink for FailingSink {
        async fn send(&self, _record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
            Err("disk on fire".into())
        }
    }

    #[tokio::test]
    async fn shutdown_writes_everything_in_order() {
        let sink = MemorySink::new();
        let (logger, guard) = Pipeline::start(Arc::new(sink.clone()), PipelineConfig::default());

        for i in 0..10 {
            logger.info("tick", fields! { "i" => i });
        }
        let stats = guard.shutdown().await;

        let order: Vec<i64> = sink
            .records()
            .iter()
            .map(|r| r.fields.get("i").and_then(|v| v.as_i64()).unwrap())
            .collect();
        assert_eq!(order, (0..10).collect::<Vec<_>>());
        assert_eq!(stats.written, 10);
        assert_eq!(stats.dropped, 0);
    }

    #[tokio::test]
    async fn full_channel_drops_without_blocking() {
        let sink = MemorySink::new();
        let config = PipelineConfig {
            channel_buffer: 2,
            ..PipelineConfig::default()
        };
        let (logger, guard) = Pipeline::start(Arc::new(sink.clone()), config);

        // The worker cannot run until this task yields, so only two fit.
        for i in 0..5 {
            logger.warn("burst", fields! { "i" => i });
        }
        let stats = guard.shutdown().await;

        assert_eq!(stats.total, 5);
        assert_eq!(stats.enqueued, 2);
        assert_eq!(stats.dropped, 3);
        assert_eq!(sink.len(), 2);
    }

    #[tokio::test]
    async fn failing_sink_is_counted_not_propagated() {
        let (logger, guard) = Pipeline::start(Arc::new(FailingSink), PipelineConfig::default());
        logger.error("Operation failed", fields! { "ev" => "operation_error" });
        logger.info("still fine", ());
        let stats = guard.shutdown().await;

        assert_eq!(stats.failed, 2);
        assert_eq!(stats.written, 0);
    }

    #[tokio::test]
    async fn emits_after_shutdown_are_dropped() {
        let sink = MemorySink::new();
        let (logger, guard) = Pipeline::start(Arc::new(sink.clone()), PipelineConfig::default());
        guard.shutdown().await;

        logger.info("too late", ());
        assert!(sink.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn partial_batch_is_written_on_flush_interval() {
        let sink = MemorySink::new();
        let config = PipelineConfig {
            batch_size: 100,
            flush_interval: Duration::from_millis(50),
            ..PipelineConfig::default()
        };
        let (logger, _guard) = Pipeline::start(Arc::new(sink.clone()), config);

        logger.info("one", ());
        time::sleep(Duration::from_millis(120)).await;
        assert_eq!(sink.len(), 1);
    }
}
