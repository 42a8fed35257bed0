//! [`TestRepo`]: a temporary repository directory for engine and CLI tests.

use std::fs;
use std::path::Path;

use cfgsync_fs::{NormalizedPath, list_files};
use tempfile::TempDir;

/// Temporary repository root. Paths passed to the helpers are relative to
/// it and use forward slashes, like the paths the engine produces.
pub struct TestRepo {
    dir: TempDir,
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRepo {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn normalized_root(&self) -> NormalizedPath {
        NormalizedPath::new(self.root())
    }

    /// Write an object file, creating its type and scope directories.
    pub fn write(&self, path: &str, content: &str) {
        let full = self.root().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&full, content).unwrap_or_else(|e| panic!("write {path}: {e}"));
    }

    pub fn read(&self, path: &str) -> String {
        fs::read_to_string(self.root().join(path)).unwrap_or_else(|e| panic!("read {path}: {e}"))
    }

    /// Every file in the repository, sorted.
    pub fn files(&self) -> Vec<String> {
        list_files(&self.normalized_root())
            .unwrap()
            .files
            .into_iter()
            .collect()
    }

    pub fn assert_file_exists(&self, path: &str) {
        assert!(
            self.root().join(path).exists(),
            "{path} missing; repository holds {:?}",
            self.files()
        );
    }

    pub fn assert_file_not_exists(&self, path: &str) {
        assert!(!self.root().join(path).exists(), "{path} should not exist");
    }

    pub fn assert_file_contains(&self, path: &str, content: &str) {
        let actual = self.read(path);
        assert!(
            actual.contains(content),
            "{path} lacks {content:?}:\n{actual}"
        );
    }
}
