//! Per-operation coordinator that saves, loads and removes one unit tree.
//!
//! A [`PersistentUnit`] binds a unit (or just an id, for loads) to its [`Location`], the
//! filesystem capability and the type registry. It is built fresh for every operation and
//! dropped afterwards.
//!
//! # Save
//!
//! The whole tree is checked first: two different units may not share an id, and every id must
//! fit in a directory name. Children are then saved, each at its own location under the same
//! root, before their parent. Each unit is encoded before the filesystem is touched, then written to a staging file and renamed over
//! `unit.json`, so neither a failed encode nor an interrupted write leaves a partial
//! `unit.json` behind.
//!
//! # Load
//!
//! Only the `type` field is decoded first. The registry builds a blank unit of that type,
//! which then decodes the full encoding itself. Declared children are loaded the same way and
//! attached in order. A unit that is its own ancestor is rejected.
//!
//! # Remove
//!
//! Only the unit's own directory is removed. Children are units in their own right and may be
//! listed by other parents.

use crate::constants::MAX_COMPONENT_LEN;
use crate::error::{StorageError, StorageResult};
use crate::paths::{escaped_len, Location};
use crate::registry::UnitRegistry;
use crate::unit::{probe_type, units_equal, Unit, UnitCodecError};
use std::collections::{HashMap, HashSet};
use unitstore_fs::{FileSystem, DEFAULT_DIR_MODE, DEFAULT_FILE_MODE};
use unitstore_types::UnitId;

/// Rejects ids whose directory name would exceed [`MAX_COMPONENT_LEN`] once escaped.
pub(crate) fn ensure_representable(id: &UnitId) -> StorageResult<()> {
    let len = escaped_len(id.as_str());
    if len > MAX_COMPONENT_LEN {
        return Err(StorageError::InvalidArgument(format!(
            "unit id '{id}' needs a {len}-byte directory name, maximum is {MAX_COMPONENT_LEN}"
        )));
    }
    Ok(())
}

/// Validates a whole tree before anything is written.
///
/// Every id must be representable, and an id may repeat only for a unit equal to its first
/// occurrence, so that every saved location holds exactly one encoding.
fn check_tree<'u>(
    unit: &'u dyn Unit,
    seen: &mut HashMap<UnitId, &'u dyn Unit>,
) -> StorageResult<()> {
    let id = unit.id();
    if let Some(first) = seen.get(id) {
        if units_equal(*first, unit) {
            return Ok(());
        }
        return Err(StorageError::InvalidArgument(format!(
            "unit id '{id}' is used by more than one unit in the same tree"
        )));
    }
    ensure_representable(id)?;
    seen.insert(id.clone(), unit);

    for child in unit.children() {
        check_tree(child, seen)?;
    }
    Ok(())
}

pub struct PersistentUnit<'a> {
    unit: Option<&'a dyn Unit>,
    location: Location,
    fs: &'a dyn FileSystem,
    registry: &'a UnitRegistry,
}

impl<'a> PersistentUnit<'a> {
    pub fn new(
        unit: Option<&'a dyn Unit>,
        location: Location,
        fs: &'a dyn FileSystem,
        registry: &'a UnitRegistry,
    ) -> Self {
        Self {
            unit,
            location,
            fs,
            registry,
        }
    }

    /// A coordinator for loading or removing by id only.
    pub fn for_id(location: Location, fs: &'a dyn FileSystem, registry: &'a UnitRegistry) -> Self {
        Self::new(None, location, fs, registry)
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    fn for_child(&self, child: &'a dyn Unit) -> Self {
        Self::new(
            Some(child),
            self.location.sibling(child.id().clone()),
            self.fs,
            self.registry,
        )
    }

    fn for_child_id(&self, id: UnitId) -> Self {
        Self::for_id(self.location.sibling(id), self.fs, self.registry)
    }

    /// Saves the unit and all of its children.
    ///
    /// # Errors
    ///
    /// - [`StorageError::NilUnit`] if this coordinator holds no unit
    /// - [`StorageError::InvalidArgument`] if two different units in the tree share an id, or
    ///   an id is too long to name a directory; nothing is written
    /// - [`StorageError::Encode`] if the unit cannot encode itself; nothing is written for it
    /// - [`StorageError::Mkdir`] / [`StorageError::Write`] on filesystem failures
    pub fn save(&self) -> StorageResult<()> {
        let unit = self.unit.ok_or(StorageError::NilUnit)?;
        check_tree(unit, &mut HashMap::new())?;
        self.save_tree(unit, &mut HashSet::new())
    }

    fn save_tree(&self, unit: &'a dyn Unit, written: &mut HashSet<UnitId>) -> StorageResult<()> {
        if !written.insert(unit.id().clone()) {
            return Ok(());
        }
        for child in unit.children() {
            self.for_child(child).save_tree(child, written)?;
        }
        self.write_unit(unit)
    }

    fn write_unit(&self, unit: &dyn Unit) -> StorageResult<()> {
        let bytes = unit.encode().map_err(|source| StorageError::Encode {
            id: unit.id().clone(),
            source,
        })?;

        let dir = self.location.dir();
        self.fs
            .mkdir_all(&dir, DEFAULT_DIR_MODE)
            .map_err(|source| StorageError::Mkdir {
                path: dir.clone(),
                source,
            })?;

        let staging = self.location.staging_file();
        self.fs
            .write_file(&staging, &bytes, DEFAULT_FILE_MODE)
            .map_err(|source| StorageError::Write {
                path: staging.clone(),
                source,
            })?;

        let file = self.location.file();
        if let Err(source) = self.fs.rename(&staging, &file) {
            if let Err(cleanup) = self.fs.remove_all(&staging) {
                tracing::warn!(
                    path = %staging.display(),
                    error = %cleanup,
                    "failed to remove staging file after aborted save"
                );
            }
            return Err(StorageError::Write { path: file, source });
        }

        tracing::debug!(
            id = %unit.id(),
            unit_type = unit.unit_type(),
            path = %file.display(),
            "saved unit"
        );
        Ok(())
    }

    /// Loads the unit at this location together with all of its children.
    ///
    /// # Errors
    ///
    /// - [`StorageError::Read`] if `unit.json` is missing or unreadable
    /// - [`StorageError::UnknownType`] if the registry has no constructor for the type tag
    /// - [`StorageError::Decode`] if the encoding is malformed or belongs to another unit
    /// - [`StorageError::CyclicReference`] if the unit contains itself
    pub fn load(&self) -> StorageResult<Box<dyn Unit>> {
        let mut ancestors = Vec::new();
        self.load_tree(&mut ancestors)
    }

    fn load_tree(&self, ancestors: &mut Vec<UnitId>) -> StorageResult<Box<dyn Unit>> {
        let id = self.location.id();
        if ancestors.contains(id) {
            return Err(StorageError::CyclicReference(id.clone()));
        }
        ensure_representable(id)?;

        let mut unit = self.read_unit()?;

        ancestors.push(id.clone());
        for child_id in unit.child_ids() {
            let child = self.for_child_id(child_id).load_tree(ancestors)?;
            unit.attach_child(child)
                .map_err(|source| StorageError::Decode {
                    path: self.location.file(),
                    source,
                })?;
        }
        ancestors.pop();

        Ok(unit)
    }

    fn read_unit(&self) -> StorageResult<Box<dyn Unit>> {
        let path = self.location.file();
        let bytes = self
            .fs
            .read_file(&path)
            .map_err(|source| StorageError::Read {
                path: path.clone(),
                source,
            })?;

        let tag = probe_type(&bytes).map_err(|source| StorageError::Decode {
            path: path.clone(),
            source,
        })?;

        let mut unit = self
            .registry
            .construct(&tag, self.location.id().clone())
            .ok_or_else(|| StorageError::UnknownType(tag.clone()))?;

        unit.decode(&bytes)
            .map_err(|source| StorageError::Decode {
                path: path.clone(),
                source,
            })?;

        if unit.id() != self.location.id() {
            return Err(StorageError::Decode {
                path,
                source: UnitCodecError::IdMismatch {
                    expected: self.location.id().clone(),
                    found: unit.id().clone(),
                },
            });
        }

        tracing::debug!(id = %unit.id(), unit_type = %tag, "loaded unit");
        Ok(unit)
    }

    /// Ids of the children declared by the stored encoding, without loading the children.
    pub fn stored_child_ids(&self) -> StorageResult<Vec<UnitId>> {
        ensure_representable(self.location.id())?;
        Ok(self.read_unit()?.child_ids())
    }

    /// Removes the unit's own directory. Children live in sibling directories and are left in
    /// place. Removing something that does not exist succeeds.
    pub fn remove(&self) -> StorageResult<()> {
        ensure_representable(self.location.id())?;
        let dir = self.location.dir();
        self.fs
            .remove_all(&dir)
            .map_err(|source| StorageError::Remove {
                path: dir.clone(),
                source,
            })?;

        tracing::debug!(id = %self.location.id(), path = %dir.display(), "removed unit");
        Ok(())
    }
}
