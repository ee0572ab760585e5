//! Test doubles for the storage layer.

use crate::unit::{Unit, UnitCodecError, UnitType};
use std::any::Any;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use unitstore_fs::{BackendKind, FileInfo, FileSystem, FsError, FsResult, MemFs};
use unitstore_types::UnitId;

/// Which filesystem operation a [`FailingFs`] rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailOn {
    Mkdir,
    Write,
    Rename,
    Read,
    Remove,
}

/// An in-memory filesystem that fails one kind of operation and counts calls.
#[derive(Debug)]
pub(crate) struct FailingFs {
    pub inner: MemFs,
    fail_on: Option<FailOn>,
    pub calls: AtomicUsize,
}

impl FailingFs {
    pub fn new(fail_on: Option<FailOn>) -> Self {
        Self {
            inner: MemFs::new(),
            fail_on,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self, op: FailOn, path: &Path) -> FsResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on == Some(op) {
            return Err(FsError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::other(format!("injected {op:?} failure")),
            });
        }
        Ok(())
    }
}

impl FileSystem for FailingFs {
    fn kind(&self) -> BackendKind {
        BackendKind::InMemory
    }

    fn mkdir_all(&self, path: &Path, mode: u32) -> FsResult<()> {
        self.check(FailOn::Mkdir, path)?;
        self.inner.mkdir_all(path, mode)
    }

    fn remove_all(&self, path: &Path) -> FsResult<()> {
        self.check(FailOn::Remove, path)?;
        self.inner.remove_all(path)
    }

    fn write_file(&self, path: &Path, data: &[u8], mode: u32) -> FsResult<()> {
        self.check(FailOn::Write, path)?;
        self.inner.write_file(path, data, mode)
    }

    fn read_file(&self, path: &Path) -> FsResult<Vec<u8>> {
        self.check(FailOn::Read, path)?;
        self.inner.read_file(path)
    }

    fn stat(&self, path: &Path) -> FsResult<FileInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.stat(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> FsResult<()> {
        self.check(FailOn::Rename, to)?;
        self.inner.rename(from, to)
    }

    fn read_dir(&self, path: &Path) -> FsResult<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.read_dir(path)
    }
}

/// A unit whose encoding always fails.
#[derive(Debug)]
pub(crate) struct BrokenUnit {
    id: UnitId,
}

impl BrokenUnit {
    pub fn new(id: &str) -> Self {
        Self {
            id: UnitId::new(id).expect("test id is valid"),
        }
    }
}

impl Unit for BrokenUnit {
    fn id(&self) -> &UnitId {
        &self.id
    }

    fn unit_type(&self) -> &str {
        Self::TYPE
    }

    fn encode(&self) -> Result<Vec<u8>, UnitCodecError> {
        Err(UnitCodecError::Custom("encode failure".into()))
    }

    fn decode(&mut self, _bytes: &[u8]) -> Result<(), UnitCodecError> {
        Err(UnitCodecError::Custom("decode failure".into()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl UnitType for BrokenUnit {
    const TYPE: &'static str = "broken";

    fn blank(id: UnitId) -> Self {
        Self { id }
    }
}

pub(crate) fn id(s: &str) -> UnitId {
    UnitId::new(s).expect("test id is valid")
}
