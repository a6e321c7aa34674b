use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::warn;

/// Removes the wrapped file when dropped.
///
/// Holds artifact and diagnostic-log paths for the lifetime of one execution,
/// so every return path (errors and unwinding panics included) ends with the
/// file gone. A file that is already missing is not an error.
#[derive(Debug)]
pub struct ScopedFile {
    path: PathBuf,
}

impl ScopedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScopedFile {
    fn drop(&mut self) {
        remove_if_exists(&self.path);
    }
}

/// Delete `path`, ignoring a missing file and logging anything else
pub fn remove_if_exists(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {:?}: {}", path, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_file_removes_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact.py");
        std::fs::write(&path, "print(1)").unwrap();

        {
            let guard = ScopedFile::new(&path);
            assert!(guard.path().exists());
        }

        assert!(!path.exists());
    }

    #[test]
    fn test_scoped_file_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let guard = ScopedFile::new(dir.path().join("never-created.log"));
        drop(guard);
    }
}
