use crate::encoder::EncoderConfig;
use crate::record::LogRecord;
use crate::sink::LogSink;
use async_trait::async_trait;
use std::error::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;

/// Sink that writes each record as one JSON line to an [`AsyncWrite`].
///
/// Output is buffered; [`LogSink::flush`] pushes it to the underlying
/// writer. Used for stdout, stderr and file outputs alike.
pub struct WriterSink<W> {
    writer: Mutex<BufWriter<W>>,
    encoder: EncoderConfig,
}

impl<W> WriterSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W, encoder: EncoderConfig) -> Self {
        WriterSink {
            writer: Mutex::new(BufWriter::new(writer)),
            encoder,
        }
    }

    pub fn encoder(&self) -> &EncoderConfig {
        &self.encoder
    }

    /// Flush and hand back the underlying writer.
    pub async fn into_inner(self) -> std::io::Result<W> {
        let mut writer = self.writer.into_inner();
        writer.flush().await?;
        Ok(writer.into_inner())
    }
}

#[async_trait]
impl<W> LogSink for WriterSink<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        let line = self.encoder.encode_line(record)?;
        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        Ok(())
    }

    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.writer.lock().await.flush().await?;
        Ok(())
    }
}
