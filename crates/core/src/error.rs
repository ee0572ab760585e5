use crate::unit::UnitCodecError;
use std::path::PathBuf;
use unitstore_fs::FsError;
use unitstore_types::UnitId;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error(
        "storage is not created yet and cannot be used (root: {root})",
        root = .0.display()
    )]
    NotCreated(PathBuf),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("cannot operate on nil unit")]
    NilUnit,

    #[error("failed to encode unit {id}: {source}")]
    Encode {
        id: UnitId,
        #[source]
        source: UnitCodecError,
    },
    #[error("failed to decode unit file {path}: {source}", path = path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: UnitCodecError,
    },
    #[error("no unit type registered for tag '{0}'")]
    UnknownType(String),
    #[error("unit {0} contains itself through its children")]
    CyclicReference(UnitId),

    #[error("failed to write unit file {path}: {source}", path = path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: FsError,
    },
    #[error("failed to read unit file {path}: {source}", path = path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: FsError,
    },
    #[error("failed to create directory {path}: {source}", path = path.display())]
    Mkdir {
        path: PathBuf,
        #[source]
        source: FsError,
    },
    #[error("failed to remove {path}: {source}", path = path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: FsError,
    },

    #[error("failed to parse storage configuration: {reason}")]
    ConfigParse {
        reason: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("failed to serialize storage configuration")]
    ConfigEncode(#[source] serde_json::Error),
}

impl StorageError {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        StorageError::ConfigParse {
            reason: reason.into(),
            source: None,
        }
    }

    /// True when the error reports a unit or root that does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::Read { source, .. } => source.is_not_found(),
            StorageError::NotCreated(_) => true,
            _ => false,
        }
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;
