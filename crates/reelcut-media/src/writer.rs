//! Artifact output paths and the write-then-commit lifecycle.
//!
//! Encoders never write to an artifact's final name. [`ArtifactWriter::prepare`]
//! hands out a [`PartialArtifact`] whose `.partial` path the encoder fills;
//! only [`PartialArtifact::commit`] moves the file to its final name. What
//! happens to the partial file otherwise depends on how the operation ended:
//!
//! - encode or decode failure: [`PartialArtifact::keep`] leaves it on disk
//!   for inspection (caller-level cleanup)
//! - cancellation, or the owning future being dropped: the guard's `Drop`
//!   deletes it

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use reelcut_models::{ArtifactCategory, EncodingConfig};

use crate::error::ProcessingError;

/// Suffix marking an incomplete artifact.
pub const PARTIAL_SUFFIX: &str = "partial";

/// Generates collision-free artifact paths under a root directory.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    root: PathBuf,
    container: String,
}

impl ArtifactWriter {
    pub fn new(root: impl Into<PathBuf>, encoding: &EncodingConfig) -> Self {
        Self {
            root: root.into(),
            container: encoding.container.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final path for a new artifact:
    /// `{root}/{category}/{category}_{uuid}_{stem}.{container}`.
    pub fn output_path(&self, category: ArtifactCategory, basename: &str) -> PathBuf {
        let name = format!(
            "{}_{}_{}.{}",
            category.as_str(),
            Uuid::new_v4().simple(),
            sanitize_stem(basename),
            self.container
        );
        self.root.join(category.as_str()).join(name)
    }

    /// Provision the category directory and reserve a new artifact path.
    pub async fn prepare(
        &self,
        category: ArtifactCategory,
        basename: &str,
    ) -> Result<PartialArtifact, ProcessingError> {
        let final_path = self.output_path(category, basename);
        if let Some(dir) = final_path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                ProcessingError::encode_failed(format!(
                    "failed to create output directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        Ok(PartialArtifact::new(final_path))
    }
}

/// Stem of the original file name, made safe for use inside a file name.
fn sanitize_stem(basename: &str) -> String {
    let stem = Path::new(basename)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "media".to_string()
    } else {
        cleaned
    }
}

/// An artifact being written. See the module docs for its lifecycle.
#[derive(Debug)]
pub struct PartialArtifact {
    final_path: PathBuf,
    partial_path: PathBuf,
    /// Delete the partial file on drop
    armed: bool,
}

impl PartialArtifact {
    fn new(final_path: PathBuf) -> Self {
        let mut partial = final_path.clone().into_os_string();
        partial.push(".");
        partial.push(PARTIAL_SUFFIX);
        Self {
            final_path,
            partial_path: PathBuf::from(partial),
            armed: true,
        }
    }

    /// Where the encoder writes.
    pub fn partial_path(&self) -> &Path {
        &self.partial_path
    }

    /// Where the artifact lands on commit.
    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    /// Flush the encoded file and move it to its final name.
    pub async fn commit(mut self) -> Result<PathBuf, ProcessingError> {
        match self.flush_and_rename().await {
            Ok(()) => {
                self.armed = false;
                debug!(path = %self.final_path.display(), "Committed artifact");
                Ok(self.final_path.clone())
            }
            Err(e) => {
                self.keep();
                Err(ProcessingError::encode_failed(format!(
                    "failed to finalize {}: {}",
                    self.final_path.display(),
                    e
                )))
            }
        }
    }

    async fn flush_and_rename(&self) -> std::io::Result<()> {
        {
            // Scoped so the handle is closed before the rename
            let file = tokio::fs::File::open(&self.partial_path).await?;
            file.sync_all().await?;
        }
        tokio::fs::rename(&self.partial_path, &self.final_path).await
    }

    /// Leave the partial file on disk after a failed encode.
    pub fn keep(&mut self) {
        self.armed = false;
        if self.partial_path.exists() {
            warn!(
                path = %self.partial_path.display(),
                "Encode failed; partial file left for inspection"
            );
        }
    }
}

impl Drop for PartialArtifact {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.partial_path) {
            Ok(()) => debug!(path = %self.partial_path.display(), "Removed partial file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.partial_path.display(),
                error = %e,
                "Failed to remove partial file"
            ),
        }
    }
}
