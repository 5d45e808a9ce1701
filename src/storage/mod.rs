//! File system storage management
//!
//! Path resolution, the folder depth policy, and the sandboxed operations
//! layer the dispatcher drives.

pub mod depth;
pub mod operations;
pub mod resolver;
pub mod results;

pub use depth::FolderDepthPolicy;
pub use operations::FileStore;
pub use resolver::PathResolver;
pub use results::{DirectoryEntry, Download, FailedUpload, ListResult, UploadSummary};
