// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! File system capability used by the resolver's probes

use crate::error::{BundlerError, Result};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};

/// Filesystem probes consumed by the module graph.
///
/// All path probing during URL resolution goes through this trait so the
/// resolver can be exercised against an in-memory tree in tests.
pub trait FileSystem {
    /// Whether `path` names an existing regular file
    fn exists_file(&self, path: &Path) -> bool;

    /// Whether `path` names an existing directory
    fn exists_dir(&self, path: &Path) -> bool;

    /// Read the raw bytes of a file
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Read a file as UTF-8 text
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes)
            .map_err(|e| BundlerError::Generic(format!("{}: {}", path.display(), e)))
    }
}

/// The real filesystem
#[derive(Debug, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn exists_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn exists_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).map_err(|_| BundlerError::FileNotFound(path.to_path_buf()))
    }
}

/// In-memory filesystem, used as a test double throughout the crate
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: FxHashMap<PathBuf, Vec<u8>>,
}

impl MemoryFileSystem {
    /// Create an empty in-memory tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text file
    pub fn add(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> &mut Self {
        self.files.insert(path.into(), content.into().into_bytes());
        self
    }

    /// Add a binary file
    pub fn add_bytes(&mut self, path: impl Into<PathBuf>, content: Vec<u8>) -> &mut Self {
        self.files.insert(path.into(), content);
        self
    }
}

impl FileSystem for MemoryFileSystem {
    fn exists_file(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn exists_dir(&self, path: &Path) -> bool {
        self.files
            .keys()
            .any(|p| p.starts_with(path) && p.as_path() != path)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| BundlerError::FileNotFound(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_fs() {
        let mut fs = MemoryFileSystem::new();
        fs.add("/src/a.js", "var a;");
        assert!(fs.exists_file(Path::new("/src/a.js")));
        assert!(!fs.exists_file(Path::new("/src/b.js")));
        assert!(fs.exists_dir(Path::new("/src")));
        assert!(!fs.exists_dir(Path::new("/lib")));
        assert_eq!(fs.read_to_string(Path::new("/src/a.js")).unwrap(), "var a;");
    }
}
