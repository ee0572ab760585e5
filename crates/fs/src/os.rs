//! Host filesystem backend.

use crate::{BackendKind, FileInfo, FileSystem, FsError, FsResult};
use std::fs;
use std::io::Write;
use std::path::Path;

/// A [`FileSystem`] backed by the real filesystem through `std::fs`.
///
/// Permission modes are applied on unix and ignored elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl OsFs {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for OsFs {
    fn kind(&self) -> BackendKind {
        BackendKind::OnDisk
    }

    fn mkdir_all(&self, path: &Path, mode: u32) -> FsResult<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;

        builder.create(path).map_err(|e| FsError::from_io(path, e))
    }

    fn remove_all(&self, path: &Path) -> FsResult<()> {
        let metadata = match fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(FsError::from_io(path, e)),
        };

        let result = if metadata.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };

        match result {
            Ok(()) => Ok(()),
            // Removed by someone else in between; the end state is the same.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FsError::from_io(path, e)),
        }
    }

    fn write_file(&self, path: &Path, data: &[u8], mode: u32) -> FsResult<()> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;

        let mut file = options.open(path).map_err(|e| FsError::from_io(path, e))?;
        file.write_all(data).map_err(|e| FsError::from_io(path, e))?;
        file.sync_all().map_err(|e| FsError::from_io(path, e))
    }

    fn read_file(&self, path: &Path) -> FsResult<Vec<u8>> {
        fs::read(path).map_err(|e| FsError::from_io(path, e))
    }

    fn stat(&self, path: &Path) -> FsResult<FileInfo> {
        let metadata = fs::metadata(path).map_err(|e| FsError::from_io(path, e))?;

        #[cfg(unix)]
        let mode = {
            use std::os::unix::fs::PermissionsExt;
            metadata.permissions().mode() & 0o7777
        };
        #[cfg(not(unix))]
        let mode = 0;

        Ok(FileInfo {
            is_dir: metadata.is_dir(),
            len: if metadata.is_dir() { 0 } else { metadata.len() },
            mode,
        })
    }

    fn rename(&self, from: &Path, to: &Path) -> FsResult<()> {
        fs::rename(from, to).map_err(|e| FsError::from_io(to, e))
    }

    fn read_dir(&self, path: &Path) -> FsResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(path).map_err(|e| FsError::from_io(path, e))? {
            let entry = entry.map_err(|e| FsError::from_io(path, e))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}
