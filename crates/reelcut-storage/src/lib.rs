//! Storage collaborators for the reelcut pipeline.
//!
//! This crate provides:
//! - The `FileStorage` trait and a local-directory implementation
//! - The `RecordStore` trait with JSON-file and in-memory implementations
//! - Cross-device file moves

pub mod error;
pub mod files;
pub mod fs_utils;
pub mod records;

pub use error::{StorageError, StorageResult};
pub use files::{FileStorage, LocalFileStorage, UPLOADS_PREFIX};
pub use fs_utils::move_file;
pub use records::{JsonRecordStore, MemoryRecordStore, RecordStore};
