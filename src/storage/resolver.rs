//! Path resolution and validation
//!
//! Maps client-supplied virtual paths onto the storage root and rejects
//! anything that could escape it: `.`/`..` segments, doubled separators,
//! alternate separator encodings, and symlinks pointing outside the root.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::StoreError;

/// Resolves virtual paths against the storage root.
///
/// Resolution is purely lexical plus a canonical prefix check, so it also
/// works for targets that do not exist yet (upload destinations, new
/// folders). Only already-existing path components take part in the
/// symlink-escape check.
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Creates the storage root if absent and canonicalizes it.
    pub fn new(root: &Path) -> io::Result<Self> {
        fs::create_dir_all(root)?;
        let root = root.canonicalize()?;
        Ok(Self { root })
    }

    /// The canonical storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a virtual path to a real path under the storage root.
    ///
    /// The empty path denotes the root itself. One leading or trailing
    /// slash is tolerated as normalization; everything else suspicious is
    /// rejected with `InvalidPath`.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, StoreError> {
        let relative = normalized(relative);
        if relative.is_empty() {
            return Ok(self.root.clone());
        }

        let mut resolved = self.root.clone();
        for segment in relative.split('/') {
            validate_segment(segment, relative)?;
            resolved.push(segment);
        }

        // Walk up to the deepest existing ancestor and verify its canonical
        // form still lives under the root. Catches symlinks inside storage
        // that point outside it.
        let mut probe = resolved.as_path();
        while !probe.exists() {
            probe = probe.parent().unwrap_or(&self.root);
        }
        let canonical = probe.canonicalize()?;
        if !canonical.starts_with(&self.root) {
            return Err(StoreError::InvalidPath(relative.to_string()));
        }

        Ok(resolved)
    }
}

fn validate_segment(segment: &str, full_path: &str) -> Result<(), StoreError> {
    if segment.is_empty() || segment == "." || segment == ".." {
        return Err(StoreError::InvalidPath(full_path.to_string()));
    }
    // Alternate separator encodings are the primary injection vector.
    if segment.contains('\\') || segment.contains('\0') {
        return Err(StoreError::InvalidPath(full_path.to_string()));
    }
    Ok(())
}

/// Validates a single entry name for create/rename.
///
/// A name must be non-empty, contain no separator in any encoding, and not
/// be one of the dot entries.
pub fn validate_entry_name(name: &str) -> Result<(), StoreError> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(StoreError::InvalidPath(name.to_string()));
    }
    if name.contains('/') || name.contains('\\') || name.contains('\0') {
        return Err(StoreError::InvalidPath(name.to_string()));
    }
    Ok(())
}

/// Strips the leading/trailing separators a client may send along.
pub fn normalized(relative: &str) -> &str {
    relative.trim_matches('/')
}

/// Virtual parent of a virtual path; the root's parent is the root.
pub fn parent_of(relative: &str) -> &str {
    let relative = normalized(relative);
    match relative.rfind('/') {
        Some(idx) => &relative[..idx],
        None => "",
    }
}

/// Joins an entry name onto a virtual directory path.
pub fn join_virtual(base: &str, name: &str) -> String {
    let base = normalized(base);
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", base, name)
    }
}
