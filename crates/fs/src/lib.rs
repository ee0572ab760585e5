//! unitstore filesystem capability
//!
//! This crate provides the storage medium used by unitstore. Everything above it talks to a
//! [`FileSystem`] trait object and never to a concrete backend, so choosing between a real
//! directory tree and an in-memory emulation is a construction-time decision only.
//!
//! ## Backends
//!
//! - [`OsFs`]: delegates to `std::fs` on the host filesystem
//! - [`MemFs`]: a process-local tree held in memory; clones share the same tree
//!
//! Both backends report the same error variants for the same situations (missing entries,
//! files where directories are expected and the reverse), which lets callers run one test
//! suite against either.
//!
//! ## Example Usage
//!
//! ```
//! use unitstore_fs::{FileSystem, MemFs, DEFAULT_DIR_MODE, DEFAULT_FILE_MODE};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), unitstore_fs::FsError> {
//! let fs = MemFs::new();
//! fs.mkdir_all(Path::new("/data/a"), DEFAULT_DIR_MODE)?;
//! fs.write_file(Path::new("/data/a/unit.json"), b"{}", DEFAULT_FILE_MODE)?;
//! assert_eq!(fs.read_file(Path::new("/data/a/unit.json"))?, b"{}");
//! # Ok(())
//! # }
//! ```

mod memory;
mod os;

pub use memory::MemFs;
pub use os::OsFs;

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Permission bits applied to directories created by the storage layer.
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// Permission bits applied to files written by the storage layer.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Errors that can occur during filesystem operations
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// No entry exists at the path
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// A path component that must be a directory is a file
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// A file operation was attempted on a directory
    #[error("Is a directory: {0}")]
    IsADirectory(PathBuf),

    /// The destination of a move already exists
    #[error("Entry already exists: {0}")]
    AlreadyExists(PathBuf),

    /// I/O error reported by the host filesystem
    #[error("I/O error at {path}: {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FsError {
    /// Maps a host I/O error to the shared taxonomy, keeping the failing path.
    pub fn from_io(path: &Path, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => FsError::NotFound(path.to_path_buf()),
            std::io::ErrorKind::AlreadyExists => FsError::AlreadyExists(path.to_path_buf()),
            std::io::ErrorKind::NotADirectory => FsError::NotADirectory(path.to_path_buf()),
            std::io::ErrorKind::IsADirectory => FsError::IsADirectory(path.to_path_buf()),
            _ => FsError::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }

    /// Returns true when the error means the entry does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound(_))
    }
}

pub type FsResult<T> = Result<T, FsError>;

/// Which medium a [`FileSystem`] writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    OnDisk,
    InMemory,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::OnDisk => "on-disk",
            BackendKind::InMemory => "in-memory",
        }
    }

    pub fn is_in_memory(&self) -> bool {
        matches!(self, BackendKind::InMemory)
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`FileSystem::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfo {
    pub is_dir: bool,
    /// Size in bytes; zero for directories.
    pub len: u64,
    /// Permission bits. Zero where the platform has none to report.
    pub mode: u32,
}

/// The capability surface every storage backend exposes.
///
/// Implementations must be usable from any thread, but provide no ordering guarantees between
/// concurrent callers.
pub trait FileSystem: std::fmt::Debug + Send + Sync {
    /// The medium this filesystem writes to.
    fn kind(&self) -> BackendKind;

    /// Creates `path` and any missing parents. Succeeds if the directory already exists.
    fn mkdir_all(&self, path: &Path, mode: u32) -> FsResult<()>;

    /// Removes `path` and everything beneath it. Succeeds if nothing exists at `path`.
    fn remove_all(&self, path: &Path) -> FsResult<()>;

    /// Creates or truncates the file at `path`. The parent directory must exist.
    fn write_file(&self, path: &Path, data: &[u8], mode: u32) -> FsResult<()>;

    fn read_file(&self, path: &Path) -> FsResult<Vec<u8>>;

    fn stat(&self, path: &Path) -> FsResult<FileInfo>;

    /// Moves `from` to `to`, replacing `to` if it is a file.
    fn rename(&self, from: &Path, to: &Path) -> FsResult<()>;

    /// Names of the entries directly inside the directory at `path`, sorted.
    fn read_dir(&self, path: &Path) -> FsResult<Vec<String>>;

    fn exists(&self, path: &Path) -> bool {
        self.stat(path).is_ok()
    }
}

/// Builds a fresh filesystem of the given kind.
///
/// An in-memory filesystem built here is always empty; contents are never carried over from
/// another instance.
pub fn filesystem_for(kind: BackendKind) -> Arc<dyn FileSystem> {
    match kind {
        BackendKind::OnDisk => Arc::new(OsFs::new()),
        BackendKind::InMemory => Arc::new(MemFs::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Runs the same sequence against a backend and returns a trace of outcomes.
    fn exercise(fs: &dyn FileSystem, root: &Path) -> Vec<String> {
        let mut trace = Vec::new();
        let mut record = |label: &str, outcome: Result<String, FsError>| {
            let text = match outcome {
                Ok(v) => format!("{label}: ok {v}"),
                Err(FsError::NotFound(_)) => format!("{label}: not-found"),
                Err(FsError::NotADirectory(_)) => format!("{label}: not-a-directory"),
                Err(FsError::IsADirectory(_)) => format!("{label}: is-a-directory"),
                Err(FsError::AlreadyExists(_)) => format!("{label}: already-exists"),
                Err(FsError::Io { .. }) => format!("{label}: io"),
            };
            trace.push(text);
        };

        let dir = root.join("a").join("b");
        let file = dir.join("f.txt");

        record("read missing", fs.read_file(&file).map(|_| String::new()));
        record("write without parent", fs.write_file(&file, b"x", DEFAULT_FILE_MODE).map(|_| String::new()));
        record("mkdir", fs.mkdir_all(&dir, DEFAULT_DIR_MODE).map(|_| String::new()));
        record("mkdir again", fs.mkdir_all(&dir, DEFAULT_DIR_MODE).map(|_| String::new()));
        record("write", fs.write_file(&file, b"hello", DEFAULT_FILE_MODE).map(|_| String::new()));
        record(
            "read",
            fs.read_file(&file).map(|b| String::from_utf8_lossy(&b).into_owned()),
        );
        record("stat", fs.stat(&file).map(|i| format!("{} {}", i.is_dir, i.len)));
        record("mkdir over file", fs.mkdir_all(&file.join("x"), DEFAULT_DIR_MODE).map(|_| String::new()));
        record("read dir as file", fs.read_file(&dir).map(|_| String::new()));
        record("list", fs.read_dir(&dir).map(|n| n.join(",")));
        record("rename", fs.rename(&file, &dir.join("g.txt")).map(|_| String::new()));
        record("list after rename", fs.read_dir(&dir).map(|n| n.join(",")));
        record("remove tree", fs.remove_all(&root.join("a")).map(|_| String::new()));
        record("remove tree again", fs.remove_all(&root.join("a")).map(|_| String::new()));
        record("stat removed", fs.stat(&dir).map(|i| format!("{}", i.is_dir)));
        trace
    }

    #[test]
    fn test_backends_behave_identically() {
        let temp = TempDir::new().unwrap();
        let disk = OsFs::new();
        let disk_trace = exercise(&disk, temp.path());

        let mem = MemFs::new();
        let mem_trace = exercise(&mem, Path::new("/root"));

        assert_eq!(disk_trace, mem_trace);
        assert_eq!(disk_trace[5], "read: ok hello");
        assert_eq!(disk_trace[11], "list after rename: ok g.txt");
    }

    #[test]
    fn test_filesystem_for_reports_kind() {
        assert_eq!(filesystem_for(BackendKind::OnDisk).kind(), BackendKind::OnDisk);
        assert_eq!(
            filesystem_for(BackendKind::InMemory).kind(),
            BackendKind::InMemory
        );
    }

    #[test]
    fn test_fresh_in_memory_filesystems_are_empty() {
        let first = filesystem_for(BackendKind::InMemory);
        first.mkdir_all(Path::new("/store"), DEFAULT_DIR_MODE).unwrap();

        let second = filesystem_for(BackendKind::InMemory);
        assert!(first.exists(Path::new("/store")));
        assert!(!second.exists(Path::new("/store")));
    }

    #[test]
    fn test_from_io_maps_not_found() {
        let err = FsError::from_io(
            Path::new("/x"),
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.is_not_found());

        let err = FsError::from_io(
            Path::new("/x"),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no"),
        );
        assert!(matches!(err, FsError::Io { .. }));
    }
}
