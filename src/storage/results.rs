//! Storage result types
//!
//! Defines result structures returned by storage operations.

use serde::Serialize;
use tokio::fs::File;

/// One listed child of a directory.
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub is_dir: bool,
    /// Size in bytes; files only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Full virtual path of the entry.
    pub path: String,
}

/// Result of a directory listing operation.
#[derive(Debug, Clone, Serialize)]
pub struct ListResult {
    pub entries: Vec<DirectoryEntry>,
    /// Whether a new folder may still be created at this path.
    pub can_create_folder: bool,
}

/// One upload that could not be saved.
#[derive(Debug, Clone, Serialize)]
pub struct FailedUpload {
    pub name: String,
    pub error: String,
}

/// Outcome of a multi-file upload; partial success is explicit.
#[derive(Debug, Clone, Serialize, Default)]
pub struct UploadSummary {
    pub saved: usize,
    pub failed: Vec<FailedUpload>,
}

/// Result of a download operation: an open file ready for streaming.
#[derive(Debug)]
pub struct Download {
    pub filename: String,
    pub size: u64,
    pub file: File,
}
