//! # unitstore core
//!
//! Persistence layer for hierarchical, polymorphic units.
//!
//! This crate maps units to storage locations and moves them across the save/load boundary:
//! - [`Location`] turns a unit id into a directory under a storage root (no I/O)
//! - [`Unit`] is the capability every persistable type implements; [`UnitRegistry`] maps the
//!   `type` tag of an encoding back to a concrete type
//! - [`PersistentUnit`] saves, loads and removes one unit tree
//! - [`DirectoryStorage`] is the caller-facing [`Storage`] implementation
//! - [`StorageConfig`] is the serializable record a storage is rebuilt from
//!
//! The storage medium is a [`FileSystem`] trait object from `unitstore-fs`; whether it is the
//! real disk or an in-memory tree is chosen once when the storage is built.
//!
//! ```
//! use unitstore_core::{DirectoryStorage, Note, Storage, UnitId};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = DirectoryStorage::in_memory();
//! storage.create()?;
//!
//! let note = Note::new(UnitId::new("shopping")?, "Shopping", "eggs");
//! storage.save_unit(&note)?;
//!
//! let loaded = storage.load_unit("shopping")?;
//! assert_eq!(loaded.unit_type(), "note");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod paths;
pub mod persistent;
pub mod registry;
pub mod storage;
pub mod unit;
pub mod units;

#[cfg(test)]
pub(crate) mod testing;

pub use config::StorageConfig;
pub use error::{StorageError, StorageResult};
pub use paths::Location;
pub use persistent::PersistentUnit;
pub use registry::{UnitConstructor, UnitRegistry};
pub use storage::{DirectoryStorage, Storage};
pub use unit::{units_equal, Unit, UnitCodecError, UnitType};
pub use units::{List, Note, Todo, TodoItem};

pub use unitstore_fs::{BackendKind, FileSystem, FsError, MemFs, OsFs};
pub use unitstore_types::{TextError, UnitId};
