//! Constants used throughout the unitstore core crate.
//!
//! This module contains all path and filename constants to ensure
//! consistency across the codebase and make maintenance easier.

/// Filename of the encoded unit inside its directory.
pub const UNIT_FILE_NAME: &str = "unit.json";

/// Filename a unit is staged under before being renamed over [`UNIT_FILE_NAME`].
pub const UNIT_STAGING_FILE_NAME: &str = "unit.json.tmp";

/// Longest unit directory name, in bytes. Matches the common on-disk filename limit so both
/// backends accept the same ids.
pub const MAX_COMPONENT_LEN: usize = 255;

/// Root used by in-memory storages when none is given.
pub const DEFAULT_IN_MEMORY_ROOT: &str = "/unitstore";

/// Default directory for on-disk storage when no explicit root is configured.
pub const DEFAULT_STORAGE_DIR: &str = "unitstore_data";

/// Legacy configuration type tag for on-disk storage.
pub const LEGACY_TYPE_DIRECTORY: &str = "directory";

/// Legacy configuration type tag for in-memory storage.
pub const LEGACY_TYPE_DIRECTORY_IN_MEMORY: &str = "directory_in_memory";
