//! Local filesystem sink for rendered visualisations.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::info;

use crate::partition::MonthKey;

/// Errors that can occur during sink operations.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The destination could not be created or written.
    #[error("failed to write visualisation to {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Stored artifacts are write-only; there is no structured read path.
    #[error("loading stored visualisations is not supported")]
    LoadUnsupported,
}

/// Filesystem store for rendered HTML documents, one artifact per partition.
///
/// Artifacts land under a single directory, named from the partition key.
/// Re-running a partition overwrites its artifact; keys for distinct months
/// never collide. Serving a stored file is somebody else's job; the sink
/// only writes.
pub struct HtmlSink {
    directory: PathBuf,
}

impl HtmlSink {
    /// Create a sink writing under `directory`. The directory is created on
    /// first store.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Directory the sink writes into.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Deterministic artifact path for a partition: `viz-{month}.html`, or
    /// `viz.html` for unpartitioned output.
    pub fn artifact_path(&self, partition: Option<&MonthKey>) -> PathBuf {
        let file_name = match partition {
            Some(month) => format!("viz-{month}.html"),
            None => "viz.html".to_string(),
        };
        self.directory.join(file_name)
    }

    /// Store `html` for `partition`, overwriting any previous artifact at the
    /// same key. Returns the path written.
    pub async fn store(
        &self,
        partition: Option<&MonthKey>,
        html: &str,
    ) -> Result<PathBuf, SinkError> {
        fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| SinkError::Write {
                path: self.directory.clone(),
                source: e,
            })?;

        let path = self.artifact_path(partition);
        fs::write(&path, html).await.map_err(|e| SinkError::Write {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "HTML file stored");
        Ok(path)
    }

    /// Unsupported: artifacts are write-only.
    pub async fn load(&self, _partition: Option<&MonthKey>) -> Result<String, SinkError> {
        Err(SinkError::LoadUnsupported)
    }
}
