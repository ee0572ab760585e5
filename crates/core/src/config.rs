//! Storage configuration record.
//!
//! A [`StorageConfig`] is everything needed to rebuild a storage handle: its root directory and
//! which filesystem backend it runs on. It is resolved once at process startup, either from a
//! serialized record or from environment values, and then passed to
//! [`DirectoryStorage::from_config`](crate::DirectoryStorage::from_config).
//!
//! The canonical JSON form is:
//!
//! ```json
//! { "root": "/var/lib/unitstore", "in_memory": false }
//! ```
//!
//! Older records named the backend with a `type` string (`"directory"` or
//! `"directory_in_memory"`). Those are still read, flagged through
//! [`StorageConfig::is_legacy`], and can be rewritten with [`StorageConfig::migrate_json`].
//! Only the canonical form is ever written.

use crate::constants::{
    DEFAULT_IN_MEMORY_ROOT, DEFAULT_STORAGE_DIR, LEGACY_TYPE_DIRECTORY,
    LEGACY_TYPE_DIRECTORY_IN_MEMORY,
};
use crate::error::{StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use unitstore_fs::BackendKind;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageConfig {
    root: PathBuf,
    backend: BackendKind,
    legacy: bool,
}

#[derive(Serialize)]
struct ConfigRecord<'a> {
    root: &'a Path,
    in_memory: bool,
}

#[derive(Deserialize)]
struct RawConfigRecord {
    root: Option<PathBuf>,
    in_memory: Option<bool>,
    #[serde(rename = "type")]
    legacy_type: Option<String>,
}

impl StorageConfig {
    pub fn new(root: impl Into<PathBuf>, backend: BackendKind) -> Self {
        Self {
            root: root.into(),
            backend,
            legacy: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    /// True when the record was read from the legacy `type` string form.
    pub fn is_legacy(&self) -> bool {
        self.legacy
    }

    /// Parse a configuration record in either the canonical or the legacy form.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ConfigParse`] if the bytes are not a JSON object, the root is
    /// missing or empty, no backend is named, the legacy type is unknown, or both forms are
    /// present and disagree.
    pub fn from_json(bytes: &[u8]) -> StorageResult<Self> {
        let raw: RawConfigRecord =
            serde_json::from_slice(bytes).map_err(|source| StorageError::ConfigParse {
                reason: "record is not valid JSON".into(),
                source: Some(source),
            })?;

        let root = raw
            .root
            .filter(|root| !root.as_os_str().is_empty())
            .ok_or_else(|| StorageError::config("record has no root"))?;

        let legacy_backend = raw
            .legacy_type
            .as_deref()
            .map(backend_from_legacy_type)
            .transpose()?;

        let (backend, legacy) = match (raw.in_memory, legacy_backend) {
            (Some(in_memory), None) => (backend_from_flag(in_memory), false),
            (None, Some(backend)) => {
                tracing::warn!(
                    root = %root.display(),
                    legacy_type = raw.legacy_type.as_deref().unwrap_or_default(),
                    "read legacy storage configuration record; rewrite it with `migrate_json`"
                );
                (backend, true)
            }
            (Some(in_memory), Some(backend)) => {
                if backend_from_flag(in_memory) != backend {
                    return Err(StorageError::config(format!(
                        "in_memory={in_memory} contradicts type '{}'",
                        raw.legacy_type.unwrap_or_default()
                    )));
                }
                (backend, false)
            }
            (None, None) => {
                return Err(StorageError::config(
                    "record names no backend (expected `in_memory`)",
                ))
            }
        };

        Ok(Self {
            root,
            backend,
            legacy,
        })
    }

    /// Serialize to the canonical record.
    pub fn to_json(&self) -> StorageResult<Vec<u8>> {
        let record = ConfigRecord {
            root: &self.root,
            in_memory: self.backend.is_in_memory(),
        };
        serde_json::to_vec_pretty(&record).map_err(StorageError::ConfigEncode)
    }

    /// Read a record in either form and return it in canonical form.
    pub fn migrate_json(bytes: &[u8]) -> StorageResult<Vec<u8>> {
        Self::from_json(bytes)?.to_json()
    }

    /// Build a configuration from optional environment values.
    ///
    /// Blank values count as unset. The backend defaults to on-disk; the root defaults to
    /// [`DEFAULT_STORAGE_DIR`] on disk and [`DEFAULT_IN_MEMORY_ROOT`] in memory.
    pub fn from_env_values(root: Option<String>, backend: Option<String>) -> StorageResult<Self> {
        fn non_blank(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        let backend = non_blank(backend)
            .map(|v| parse_backend(&v))
            .transpose()?
            .unwrap_or(BackendKind::OnDisk);

        let root = non_blank(root).map(PathBuf::from).unwrap_or_else(|| {
            if backend.is_in_memory() {
                PathBuf::from(DEFAULT_IN_MEMORY_ROOT)
            } else {
                PathBuf::from(DEFAULT_STORAGE_DIR)
            }
        });

        Ok(Self::new(root, backend))
    }
}

fn backend_from_flag(in_memory: bool) -> BackendKind {
    if in_memory {
        BackendKind::InMemory
    } else {
        BackendKind::OnDisk
    }
}

fn backend_from_legacy_type(value: &str) -> StorageResult<BackendKind> {
    match value {
        LEGACY_TYPE_DIRECTORY => Ok(BackendKind::OnDisk),
        LEGACY_TYPE_DIRECTORY_IN_MEMORY => Ok(BackendKind::InMemory),
        other => Err(StorageError::config(format!(
            "unknown storage type '{other}'"
        ))),
    }
}

fn parse_backend(value: &str) -> StorageResult<BackendKind> {
    match value.to_ascii_lowercase().as_str() {
        "disk" | "os" | "on-disk" | LEGACY_TYPE_DIRECTORY => Ok(BackendKind::OnDisk),
        "memory" | "in_memory" | "in-memory" | LEGACY_TYPE_DIRECTORY_IN_MEMORY => {
            Ok(BackendKind::InMemory)
        }
        other => Err(StorageError::config(format!(
            "unknown storage backend '{other}' (expected 'disk' or 'memory')"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_round_trip() {
        let config = StorageConfig::new("/var/lib/unitstore", BackendKind::OnDisk);
        let bytes = config.to_json().unwrap();

        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"root": "/var/lib/unitstore", "in_memory": false})
        );

        let parsed = StorageConfig::from_json(&bytes).unwrap();
        assert_eq!(parsed, config);
        assert!(!parsed.is_legacy());
    }

    #[test]
    fn test_legacy_records_are_read_and_flagged() {
        let parsed =
            StorageConfig::from_json(br#"{"root":"/u","type":"directory_in_memory"}"#).unwrap();
        assert_eq!(parsed.root(), Path::new("/u"));
        assert_eq!(parsed.backend(), BackendKind::InMemory);
        assert!(parsed.is_legacy());

        let parsed = StorageConfig::from_json(br#"{"root":"/u","type":"directory"}"#).unwrap();
        assert_eq!(parsed.backend(), BackendKind::OnDisk);
    }

    #[test]
    fn test_migrate_json_writes_canonical_form() {
        let migrated =
            StorageConfig::migrate_json(br#"{"root":"/u","type":"directory_in_memory"}"#).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&migrated).unwrap();
        assert_eq!(value, serde_json::json!({"root": "/u", "in_memory": true}));
        assert!(!StorageConfig::from_json(&migrated).unwrap().is_legacy());
    }

    #[test]
    fn test_agreeing_forms_are_accepted() {
        let parsed =
            StorageConfig::from_json(br#"{"root":"/u","in_memory":false,"type":"directory"}"#)
                .unwrap();
        assert_eq!(parsed.backend(), BackendKind::OnDisk);
    }

    #[test]
    fn test_invalid_records_fail_with_config_parse() {
        let cases: [&[u8]; 6] = [
            b"not json",
            br#"{"in_memory":true}"#,
            br#"{"root":"","in_memory":true}"#,
            br#"{"root":"/u"}"#,
            br#"{"root":"/u","type":"sqlite"}"#,
            br#"{"root":"/u","in_memory":true,"type":"directory"}"#,
        ];
        for case in cases {
            let err = StorageConfig::from_json(case).unwrap_err();
            assert!(
                matches!(err, StorageError::ConfigParse { .. }),
                "{}: {err}",
                String::from_utf8_lossy(case)
            );
        }
    }

    #[test]
    fn test_env_values_default_per_backend() {
        let config = StorageConfig::from_env_values(None, None).unwrap();
        assert_eq!(config.backend(), BackendKind::OnDisk);
        assert_eq!(config.root(), Path::new(DEFAULT_STORAGE_DIR));

        let config = StorageConfig::from_env_values(Some("  ".into()), Some("memory".into())).unwrap();
        assert_eq!(config.backend(), BackendKind::InMemory);
        assert_eq!(config.root(), Path::new(DEFAULT_IN_MEMORY_ROOT));

        let config =
            StorageConfig::from_env_values(Some("/data".into()), Some("Disk".into())).unwrap();
        assert_eq!(config.root(), Path::new("/data"));
        assert_eq!(config.backend(), BackendKind::OnDisk);
    }

    #[test]
    fn test_env_values_reject_unknown_backend() {
        assert!(StorageConfig::from_env_values(None, Some("s3".into())).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_root_fails_to_encode() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let config = StorageConfig::new(OsStr::from_bytes(b"/data/\xff"), BackendKind::OnDisk);
        let err = config.to_json().unwrap_err();
        assert!(matches!(err, StorageError::ConfigEncode(_)), "{err}");
    }
}
