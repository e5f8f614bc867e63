//! I/O boundary traits
//!
//! Services read payloads and write config through [`FileSystem`], so tests
//! can swap the disk for [`MemoryFileSystem`].

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// The file operations posegraph needs.
pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;

    /// Create parent directories of `path` if missing.
    fn ensure_parent(&self, path: &Path) -> io::Result<()>;
}

/// Disk-backed filesystem.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        std::fs::write(path, content)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
            _ => Ok(()),
        }
    }
}

/// Flat path-to-content map. Directories are implicit.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: Mutex<HashMap<PathBuf, String>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        if let Ok(mut files) = self.files.lock() {
            files.insert(path.into(), content.into());
        }
        self
    }

    fn files(&self) -> io::Result<std::sync::MutexGuard<'_, HashMap<PathBuf, String>>> {
        self.files
            .lock()
            .map_err(|_| io::Error::other("memory filesystem poisoned"))
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files()?.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display()))
        })
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        self.files()?.insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files().map(|f| f.contains_key(path)).unwrap_or(false)
    }

    fn ensure_parent(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_memory_fs_when_writing_then_readable() {
        let fs = MemoryFileSystem::new();
        let path = Path::new("/cfg/posegraph.toml");

        fs.ensure_parent(path).unwrap();
        fs.write(path, "[frame]").unwrap();

        assert!(fs.exists(path));
        assert_eq!(fs.read_to_string(path).unwrap(), "[frame]");
        assert_eq!(
            fs.read_to_string(Path::new("/other")).unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }
}
