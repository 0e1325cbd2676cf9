//! Contracts for the collaborators around the dump stream
//!
//! The engine only produces and consumes raw SQL bytes. Moving dump files to
//! a backend and layering compression or encryption over the stream happen
//! through the traits below, so the engine stays agnostic of both.

use crate::{MydumpError, Result};
use async_trait::async_trait;
use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};

/// Copies named dump files between local disk and a backend.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Upload `local_path` under `name`, returning bytes written
    async fn push(&self, name: &str, local_path: &Path) -> Result<u64>;

    /// Download `name` into `local_path`, returning bytes read
    async fn pull(&self, name: &str, local_path: &Path) -> Result<u64>;
}

/// A writer that must be explicitly finished to flush trailing state
/// (compression footers, authentication tags).
pub trait FinishWrite: Write + Send {
    fn finish(self: Box<Self>) -> io::Result<()>;
}

/// A composable byte-stream transform such as compression or encryption.
pub trait StreamTransform: Send + Sync {
    /// File name suffix the transform conventionally adds, e.g. `.gz`
    fn extension(&self) -> &str;

    /// Wrap a sink so bytes written to the result are transformed
    fn wrap(&self, writer: Box<dyn Write + Send>) -> io::Result<Box<dyn FinishWrite>>;

    /// Wrap a source so bytes read from the result are un-transformed
    fn unwrap(&self, reader: Box<dyn Read + Send>) -> io::Result<Box<dyn Read + Send>>;
}

/// Storage backed by a local directory
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let is_plain = !name.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !is_plain {
            return Err(MydumpError::Storage(format!(
                "invalid object name: {:?}",
                name
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn push(&self, name: &str, local_path: &Path) -> Result<u64> {
        let target = self.resolve(name)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = tokio::fs::copy(local_path, &target).await.map_err(|e| {
            MydumpError::Storage(format!("failed to push {}: {}", name, e))
        })?;
        tracing::debug!(name = %name, bytes, "pushed dump file to local storage");
        Ok(bytes)
    }

    async fn pull(&self, name: &str, local_path: &Path) -> Result<u64> {
        let source = self.resolve(name)?;
        let bytes = tokio::fs::copy(&source, local_path).await.map_err(|e| {
            MydumpError::Storage(format!("failed to pull {}: {}", name, e))
        })?;
        tracing::debug!(name = %name, bytes, "pulled dump file from local storage");
        Ok(bytes)
    }
}

/// Passes bytes through unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform;

struct PassthroughWriter(Box<dyn Write + Send>);

impl Write for PassthroughWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl FinishWrite for PassthroughWriter {
    fn finish(mut self: Box<Self>) -> io::Result<()> {
        self.0.flush()
    }
}

impl StreamTransform for IdentityTransform {
    fn extension(&self) -> &str {
        ""
    }

    fn wrap(&self, writer: Box<dyn Write + Send>) -> io::Result<Box<dyn FinishWrite>> {
        Ok(Box::new(PassthroughWriter(writer)))
    }

    fn unwrap(&self, reader: Box<dyn Read + Send>) -> io::Result<Box<dyn Read + Send>> {
        Ok(reader)
    }
}

/// Gzip compression
#[derive(Debug, Clone, Copy)]
pub struct GzipTransform {
    level: Compression,
}

impl GzipTransform {
    pub fn new(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }
}

impl Default for GzipTransform {
    fn default() -> Self {
        Self {
            level: Compression::default(),
        }
    }
}

struct GzipWriter(GzEncoder<Box<dyn Write + Send>>);

impl Write for GzipWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl FinishWrite for GzipWriter {
    fn finish(self: Box<Self>) -> io::Result<()> {
        let mut inner = self.0.finish()?;
        inner.flush()
    }
}

impl StreamTransform for GzipTransform {
    fn extension(&self) -> &str {
        ".gz"
    }

    fn wrap(&self, writer: Box<dyn Write + Send>) -> io::Result<Box<dyn FinishWrite>> {
        Ok(Box::new(GzipWriter(GzEncoder::new(writer, self.level))))
    }

    fn unwrap(&self, reader: Box<dyn Read + Send>) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(MultiGzDecoder::new(reader)))
    }
}
