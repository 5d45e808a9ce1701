//! Folder depth policy
//!
//! Caps how deep new folders may be nested. Listing and file operations are
//! never gated by depth; only folder creation is.

use crate::storage::resolver::normalized;

/// Decides whether a new folder may be created at a given parent path.
#[derive(Debug, Clone, Copy)]
pub struct FolderDepthPolicy {
    max_depth: usize,
}

impl FolderDepthPolicy {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// True while a folder created directly under `parent` stays within the
    /// configured maximum.
    pub fn can_create_in(&self, parent: &str) -> bool {
        depth(parent) + 1 <= self.max_depth
    }
}

/// Nesting depth of a virtual path: the number of its segments.
pub fn depth(relative: &str) -> usize {
    let relative = normalized(relative);
    if relative.is_empty() {
        0
    } else {
        relative.split('/').count()
    }
}
