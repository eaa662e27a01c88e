//! Output files: the enriched CSV and the rendered report.
//!
//! Both sinks create missing parent directories and replace any existing
//! file. Content goes to a temporary file in the target directory which is
//! then renamed over the destination, so a destination is either left as it
//! was or holds the complete new content.

use crate::prelude::*;
use arrow::csv::WriterBuilder;
use arrow::record_batch::RecordBatch;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{info, instrument};

/// Writes record batches as CSV with a header row.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
    delimiter: u8,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Encodes `batches` and writes them to the sink's path.
    ///
    /// The header is taken from the first batch's schema; nulls are written
    /// as empty fields.
    #[instrument(skip(self, batches), fields(sink.path = %self.path.display()))]
    pub async fn write(&self, batches: &[RecordBatch]) -> Result<usize> {
        let mut buffer = Vec::new();
        {
            let mut writer = WriterBuilder::new()
                .with_header(true)
                .with_delimiter(self.delimiter)
                .build(&mut buffer);
            for batch in batches {
                writer.write(batch)?;
            }
        }
        let rows = batches.iter().map(RecordBatch::num_rows).sum();

        write_file(&self.path, &buffer).await?;
        info!(sink.path = %self.path.display(), rows, bytes = buffer.len(), "Wrote CSV output");
        Ok(rows)
    }
}

/// Writes a rendered report.
#[instrument(skip(content), fields(sink.path = %path.display()))]
pub async fn write_report(path: &Path, content: &str) -> Result<()> {
    write_file(path, content.as_bytes()).await?;
    info!(sink.path = %path.display(), bytes = content.len(), "Wrote report");
    Ok(())
}

async fn write_file(path: &Path, content: &[u8]) -> Result<()> {
    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating directory '{}'", parent.display()))?;
            parent.to_path_buf()
        }
        None => PathBuf::from("."),
    };

    let target = path.to_path_buf();
    let content = content.to_vec();
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let mut staged = NamedTempFile::new_in(&parent)?;
        staged.write_all(&content)?;
        staged.as_file().sync_all()?;
        staged.persist(&target).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| GuardError::Internal(format!("write task failed: {e}")))?
    .with_context(|| format!("writing '{}'", path.display()))
}
