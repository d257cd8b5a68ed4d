// On-disk source trees for engine tests

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary directory of source files, deleted on drop.
///
/// Relative paths may contain subdirectories; parents are created as
/// needed.
pub struct SourceTree {
    dir: TempDir,
}

impl SourceTree {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    /// The root directory to mount the engine on
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write a source file, returning its absolute path
    pub fn write(&self, relative: &str, contents: impl AsRef<[u8]>) -> io::Result<PathBuf> {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, contents)?;
        Ok(path)
    }

    /// Remove a source file
    pub fn remove(&self, relative: &str) -> io::Result<()> {
        std::fs::remove_file(self.dir.path().join(relative))
    }
}
