//! Shared data models for the reelcut media pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Probed source media and produced artifacts
//! - Trim and merge requests
//! - Acceptance policy bounds and validation outcomes
//! - The canonical encoding configuration
//! - Stored video records and job identifiers

pub mod encoding;
pub mod job;
pub mod media;
pub mod policy;
pub mod request;
pub mod video;

// Re-export common types
pub use encoding::EncodingConfig;
pub use job::JobId;
pub use media::{Artifact, ArtifactCategory, SourceMedia};
pub use policy::{PolicyConfig, PolicyViolation, ValidationOutcome, ViolationKind};
pub use request::{MergeRequest, TimeRange, TrimRequest};
pub use video::{NewVideo, VideoId, VideoRecord};
