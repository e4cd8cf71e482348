use crate::record::LogRecord;
use async_trait::async_trait;
use std::error::Error;

/// Asynchronous destination for [`LogRecord`]s produced by a
/// [`Logger`](crate::logger::Logger).
///
/// The pipeline worker is the only caller: emitters never await a sink,
/// so a slow or failing sink cannot stall application code.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Write a single record.
    ///
    /// **Returns**
    /// - `Ok(())` if the record was accepted.
    /// - `Err(..)` on I/O or serialization failure. The worker counts the
    ///   failure, reports it on the diagnostic channel and moves on to the
    ///   next record; it does not retry.
    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Flush buffered output. Called after every batch and on shutdown.
    ///
    /// Default implementation is a no-op.
    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
