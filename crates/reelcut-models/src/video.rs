//! Stored video records.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::media::{Artifact, ArtifactCategory, SourceMedia};

/// Unique identifier for a stored video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Generate a new random video ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Metadata for a video about to be stored. The record store assigns the id
/// and upload timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NewVideo {
    /// Display title
    pub title: String,
    /// Storage key of the file
    pub file: String,
    /// Size in MB
    pub size_mb: f64,
    /// Duration in seconds
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    /// Transform that produced the file; `None` for uploads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ArtifactCategory>,
    /// Videos this one was derived from, in operation order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub derived_from: Vec<VideoId>,
}

impl NewVideo {
    /// Describe an accepted upload.
    pub fn upload(title: impl Into<String>, file: impl Into<String>, media: &SourceMedia) -> Self {
        Self {
            title: title.into(),
            file: file.into(),
            size_mb: media.size_mb(),
            duration: media.duration,
            width: media.width,
            height: media.height,
            category: None,
            derived_from: Vec::new(),
        }
    }

    /// Describe an artifact derived from stored videos.
    pub fn artifact(
        title: impl Into<String>,
        file: impl Into<String>,
        artifact: &Artifact,
        derived_from: Vec<VideoId>,
    ) -> Self {
        Self {
            title: title.into(),
            file: file.into(),
            size_mb: artifact.size_mb(),
            duration: artifact.duration,
            width: artifact.width,
            height: artifact.height,
            category: Some(artifact.category),
            derived_from,
        }
    }
}

/// Video metadata held by the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoRecord {
    /// Unique video ID
    pub id: VideoId,
    /// Display title
    pub title: String,
    /// Storage key of the file
    pub file: String,
    /// Size in MB
    pub size_mb: f64,
    /// Duration in seconds
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ArtifactCategory>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub derived_from: Vec<VideoId>,
    /// Upload timestamp
    pub uploaded_at: DateTime<Utc>,
}

impl VideoRecord {
    /// Materialize a record from new-video metadata.
    pub fn from_new(id: VideoId, video: NewVideo, uploaded_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: video.title,
            file: video.file,
            size_mb: video.size_mb,
            duration: video.duration,
            width: video.width,
            height: video.height,
            category: video.category,
            derived_from: video.derived_from,
            uploaded_at,
        }
    }
}
