// Output sinks for the IPDraft PDF engine
// A polymorphic destination for generated bytes: file on disk, in-memory
// buffer, or a caller-provided async stream.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::utils::file_utils::{ensure_parent_dir, remove_file_best_effort};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    File,
    Buffer,
    Stream,
}

impl SinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SinkKind::File => "file",
            SinkKind::Buffer => "buffer",
            SinkKind::Stream => "stream",
        }
    }
}

/// Destination for the generated PDF byte stream. The sink owns its
/// destination for the duration of a single export.
#[async_trait]
pub trait OutputSink: Send {
    async fn write(&mut self, chunk: &[u8]) -> Result<()>;

    /// Flush and release the destination. The buffer variant returns the
    /// accumulated bytes; the others return None. The file variant
    /// guarantees the handle is closed on all paths.
    async fn end(&mut self) -> Result<Option<Vec<u8>>>;

    /// Release the destination after a failed export. File sinks remove
    /// the partial artifact rather than leave a truncated PDF behind.
    async fn abort(&mut self);

    fn kind(&self) -> SinkKind;
}

/// Writes the PDF to a file path, creating parent directories as needed.
pub struct FileSink {
    path: PathBuf,
    file: Option<File>,
}

impl FileSink {
    pub async fn create(path: &Path) -> Result<Self> {
        ensure_parent_dir(path).await?;
        let file = File::create(path)
            .await
            .with_context(|| format!("Failed to create output file: {:?}", path))?;
        debug!("Opened file sink: {:?}", path);
        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl OutputSink for FileSink {
    async fn write(&mut self, chunk: &[u8]) -> Result<()> {
        let file = self.file.as_mut().context("file sink already closed")?;
        if let Err(err) = file.write_all(chunk).await {
            // Do not leave a truncated PDF behind.
            self.file = None;
            remove_file_best_effort(&self.path).await;
            return Err(err).with_context(|| format!("Failed to write to {:?}", self.path));
        }
        Ok(())
    }

    async fn end(&mut self) -> Result<Option<Vec<u8>>> {
        if let Some(mut file) = self.file.take() {
            file.flush().await.with_context(|| format!("Failed to flush {:?}", self.path))?;
            file.sync_all().await.with_context(|| format!("Failed to sync {:?}", self.path))?;
        }
        Ok(None)
    }

    async fn abort(&mut self) {
        self.file = None;
        warn!("Aborting file sink, removing partial output: {:?}", self.path);
        remove_file_best_effort(&self.path).await;
    }

    fn kind(&self) -> SinkKind {
        SinkKind::File
    }
}

/// Accumulates the PDF in memory and hands the bytes back from `end()`.
#[derive(Debug, Default)]
pub struct BufferSink {
    buffer: Vec<u8>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OutputSink for BufferSink {
    async fn write(&mut self, chunk: &[u8]) -> Result<()> {
        self.buffer.extend_from_slice(chunk);
        Ok(())
    }

    async fn end(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(Some(std::mem::take(&mut self.buffer)))
    }

    async fn abort(&mut self) {
        self.buffer.clear();
    }

    fn kind(&self) -> SinkKind {
        SinkKind::Buffer
    }
}

/// Forwards bytes to a caller-provided async writer. The caller keeps
/// ownership of whatever sits behind the writer.
pub struct StreamSink<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin + Send> StreamSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> OutputSink for StreamSink<W> {
    async fn write(&mut self, chunk: &[u8]) -> Result<()> {
        self.writer
            .write_all(chunk)
            .await
            .context("Failed to write to output stream")?;
        Ok(())
    }

    async fn end(&mut self) -> Result<Option<Vec<u8>>> {
        self.writer.flush().await.context("Failed to flush output stream")?;
        Ok(None)
    }

    async fn abort(&mut self) {
        let _ = self.writer.flush().await;
    }

    fn kind(&self) -> SinkKind {
        SinkKind::Stream
    }
}
