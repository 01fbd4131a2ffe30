//! Source media handles and produced artifacts.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Read-only handle to an existing media file plus its probed metadata.
///
/// Only the probe constructs these from files on disk; once probed,
/// `duration > 0`, `width > 0` and `height > 0` hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SourceMedia {
    /// Local readable path
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Duration in seconds
    pub duration: f64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frame rate (fps)
    pub fps: f64,
    /// Whether the container carries an audio stream
    #[serde(default)]
    pub has_audio: bool,
}

impl SourceMedia {
    /// File name of the source, used when naming derived artifacts.
    pub fn basename(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "media".to_string())
    }

    /// Size in megabytes (1 MB = 1024 * 1024 bytes).
    pub fn size_mb(&self) -> f64 {
        self.size as f64 / (1024.0 * 1024.0)
    }

    /// Duration of a single frame in seconds (30 fps when unknown).
    pub fn frame_duration(&self) -> f64 {
        if self.fps > 0.0 {
            1.0 / self.fps
        } else {
            1.0 / 30.0
        }
    }
}

/// Kind of transform that produced an artifact.
///
/// The category prefixes the artifact file name and names its directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactCategory {
    /// Output of a trim
    Trimmed,
    /// Output of a merge
    Merged,
}

impl ArtifactCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactCategory::Trimmed => "trimmed",
            ArtifactCategory::Merged => "merged",
        }
    }
}

impl fmt::Display for ArtifactCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A newly produced media file with its measured metadata.
///
/// Owned by the pipeline until handed to the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Artifact {
    /// Output file path (unique per invocation)
    pub path: PathBuf,
    /// Transform that produced the file
    pub category: ArtifactCategory,
    /// File size in bytes
    pub size: u64,
    /// Measured duration in seconds
    pub duration: f64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frame rate (fps)
    pub fps: f64,
    /// Whether the output carries an audio stream
    #[serde(default)]
    pub has_audio: bool,
}

impl Artifact {
    /// Build an artifact descriptor from the probe of the written file.
    pub fn from_probe(category: ArtifactCategory, media: SourceMedia) -> Self {
        Self {
            path: media.path,
            category,
            size: media.size,
            duration: media.duration,
            width: media.width,
            height: media.height,
            fps: media.fps,
            has_audio: media.has_audio,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size in megabytes (1 MB = 1024 * 1024 bytes).
    pub fn size_mb(&self) -> f64 {
        self.size as f64 / (1024.0 * 1024.0)
    }
}

/// An artifact is a valid source for any later operation.
impl From<Artifact> for SourceMedia {
    fn from(artifact: Artifact) -> Self {
        Self {
            path: artifact.path,
            size: artifact.size,
            duration: artifact.duration,
            width: artifact.width,
            height: artifact.height,
            fps: artifact.fps,
            has_audio: artifact.has_audio,
        }
    }
}
