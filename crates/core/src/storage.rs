//! Directory-backed storage.
//!
//! [`DirectoryStorage`] maps every unit to its own directory under one root and delegates the
//! per-unit work to a fresh [`PersistentUnit`]. It holds the filesystem only as a
//! [`FileSystem`] trait object, so choosing between disk and memory is decided once at
//! construction and never branched on afterwards.

use crate::config::StorageConfig;
use crate::constants::{DEFAULT_IN_MEMORY_ROOT, UNIT_FILE_NAME};
use crate::error::{StorageError, StorageResult};
use crate::paths::{unescape_id_component, Location};
use crate::persistent::{ensure_representable, PersistentUnit};
use crate::registry::UnitRegistry;
use crate::unit::Unit;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use unitstore_fs::{filesystem_for, BackendKind, FileSystem, MemFs, OsFs, DEFAULT_DIR_MODE};
use unitstore_types::UnitId;

/// The caller-facing storage contract.
///
/// Every unit operation first checks [`Storage::is_created`] and fails with
/// [`StorageError::NotCreated`] before looking at its arguments.
pub trait Storage {
    /// Create the root directory. Succeeds if it already exists.
    fn create(&self) -> StorageResult<()>;

    /// Remove the root directory and everything under it. Succeeds if it is already gone.
    fn remove(&self) -> StorageResult<()>;

    fn is_created(&self) -> bool;

    fn root_dir(&self) -> &Path;

    fn backend_kind(&self) -> BackendKind;

    /// Save a unit and, recursively, its children.
    fn save_unit(&self, unit: &dyn Unit) -> StorageResult<()>;

    /// Load the unit stored under `id` with all of its children attached.
    fn load_unit(&self, id: &str) -> StorageResult<Box<dyn Unit>>;

    /// Remove the unit's own directory. Its children are separate units and stay stored.
    fn remove_unit(&self, unit: &dyn Unit) -> StorageResult<()>;

    /// Remove the directory of the unit stored under `id`. Children are left in place.
    fn remove_unit_by_id(&self, id: &str) -> StorageResult<()>;

    fn contains_unit(&self, id: &str) -> StorageResult<bool>;

    /// Ids of all units stored directly under the root, sorted.
    fn list_unit_ids(&self) -> StorageResult<Vec<UnitId>>;

    /// Serialize the configuration needed to rebuild this storage. Unit contents are not
    /// included.
    fn serialize(&self) -> StorageResult<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct DirectoryStorage {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
    registry: Arc<UnitRegistry>,
}

impl DirectoryStorage {
    /// Storage on the real filesystem at `root`.
    pub fn on_disk(root: impl Into<PathBuf>) -> Self {
        Self::with_filesystem(root, Arc::new(OsFs))
    }

    /// Storage on a fresh, empty in-memory filesystem at [`DEFAULT_IN_MEMORY_ROOT`].
    pub fn in_memory() -> Self {
        Self::in_memory_at(DEFAULT_IN_MEMORY_ROOT)
    }

    /// Storage on a fresh, empty in-memory filesystem at `root`.
    pub fn in_memory_at(root: impl Into<PathBuf>) -> Self {
        Self::with_filesystem(root, Arc::new(MemFs::new()))
    }

    /// Storage over a caller-supplied filesystem, which may be shared with other storages.
    pub fn with_filesystem(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            fs,
            registry: Arc::new(UnitRegistry::with_builtin_units()),
        }
    }

    /// Replace the unit registry used to decode loaded units.
    pub fn with_registry(mut self, registry: Arc<UnitRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Rebuild a storage handle from its configuration record.
    ///
    /// An in-memory configuration always gets a fresh, empty filesystem.
    pub fn from_config(config: &StorageConfig) -> Self {
        Self::with_filesystem(config.root(), filesystem_for(config.backend()))
    }

    pub fn config(&self) -> StorageConfig {
        StorageConfig::new(self.root.clone(), self.fs.kind())
    }

    /// Inverse of [`Storage::serialize`].
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ConfigParse`] if `bytes` is not a valid configuration record.
    pub fn deserialize(bytes: &[u8], registry: Arc<UnitRegistry>) -> StorageResult<Self> {
        let config = StorageConfig::from_json(bytes)?;
        Ok(Self::from_config(&config).with_registry(registry))
    }

    pub fn registry(&self) -> &UnitRegistry {
        &self.registry
    }

    fn ensure_created(&self) -> StorageResult<()> {
        if self.is_created() {
            Ok(())
        } else {
            Err(StorageError::NotCreated(self.root.clone()))
        }
    }

    fn parse_id(id: &str) -> StorageResult<UnitId> {
        let id = UnitId::new(id)
            .map_err(|err| StorageError::InvalidArgument(format!("invalid unit id {id:?}: {err}")))?;
        ensure_representable(&id)?;
        Ok(id)
    }

    /// Ids declared as children by any unit still stored under the root.
    fn referenced_ids(&self) -> StorageResult<HashSet<UnitId>> {
        let mut referenced = HashSet::new();
        for id in self.list_unit_ids()? {
            let children = self
                .persistent(None, self.location(id))
                .stored_child_ids()?;
            referenced.extend(children);
        }
        Ok(referenced)
    }

    /// Remove a unit together with the children it holds that no other stored unit lists.
    ///
    /// The unit's own directory is removed first. Each child (and, through it, each grandchild)
    /// is then removed only while no remaining unit declares it, so units shared with other
    /// parents survive.
    pub fn remove_unit_tree(&self, unit: &dyn Unit) -> StorageResult<()> {
        self.remove_unit(unit)?;

        let mut pending = unit.children();
        while let Some(child) = pending.pop() {
            if self.referenced_ids()?.contains(child.id()) {
                tracing::debug!(id = %child.id(), "kept child still listed by another unit");
                continue;
            }
            self.persistent(Some(child), self.location(child.id().clone()))
                .remove()?;
            pending.extend(child.children());
        }
        Ok(())
    }

    fn location(&self, id: UnitId) -> Location {
        Location::resolve(self.root.clone(), id)
    }

    fn persistent<'a>(&'a self, unit: Option<&'a dyn Unit>, location: Location) -> PersistentUnit<'a> {
        PersistentUnit::new(unit, location, self.fs.as_ref(), &self.registry)
    }
}

impl Storage for DirectoryStorage {
    fn create(&self) -> StorageResult<()> {
        self.fs
            .mkdir_all(&self.root, DEFAULT_DIR_MODE)
            .map_err(|source| StorageError::Mkdir {
                path: self.root.clone(),
                source,
            })?;
        tracing::info!(root = %self.root.display(), backend = %self.fs.kind(), "created storage");
        Ok(())
    }

    fn remove(&self) -> StorageResult<()> {
        self.fs
            .remove_all(&self.root)
            .map_err(|source| StorageError::Remove {
                path: self.root.clone(),
                source,
            })?;
        tracing::info!(root = %self.root.display(), backend = %self.fs.kind(), "removed storage");
        Ok(())
    }

    fn is_created(&self) -> bool {
        self.fs
            .stat(&self.root)
            .map(|info| info.is_dir)
            .unwrap_or(false)
    }

    fn root_dir(&self) -> &Path {
        &self.root
    }

    fn backend_kind(&self) -> BackendKind {
        self.fs.kind()
    }

    fn save_unit(&self, unit: &dyn Unit) -> StorageResult<()> {
        self.ensure_created()?;
        let location = self.location(unit.id().clone());
        self.persistent(Some(unit), location).save()
    }

    fn load_unit(&self, id: &str) -> StorageResult<Box<dyn Unit>> {
        self.ensure_created()?;
        let location = self.location(Self::parse_id(id)?);
        self.persistent(None, location).load()
    }

    fn remove_unit(&self, unit: &dyn Unit) -> StorageResult<()> {
        self.ensure_created()?;
        let location = self.location(unit.id().clone());
        self.persistent(Some(unit), location).remove()
    }

    fn remove_unit_by_id(&self, id: &str) -> StorageResult<()> {
        self.ensure_created()?;
        let location = self.location(Self::parse_id(id)?);
        self.persistent(None, location).remove()
    }

    fn contains_unit(&self, id: &str) -> StorageResult<bool> {
        self.ensure_created()?;
        let file = self.location(Self::parse_id(id)?).file();
        match self.fs.stat(&file) {
            Ok(info) => Ok(!info.is_dir),
            Err(err) if err.is_not_found() => Ok(false),
            Err(source) => Err(StorageError::Read { path: file, source }),
        }
    }

    fn list_unit_ids(&self) -> StorageResult<Vec<UnitId>> {
        self.ensure_created()?;
        let names = self
            .fs
            .read_dir(&self.root)
            .map_err(|source| StorageError::Read {
                path: self.root.clone(),
                source,
            })?;

        let mut ids = Vec::new();
        for name in names {
            // Entries not produced by id escaping are not units.
            let Some(id) = unescape_id_component(&name).and_then(|raw| UnitId::new(raw).ok())
            else {
                continue;
            };
            if self.fs.exists(&self.root.join(&name).join(UNIT_FILE_NAME)) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn serialize(&self) -> StorageResult<Vec<u8>> {
        self.config().to_json()
    }
}
