//! File-backed model storage.
//!
//! # Responsibility
//! - Keep the in-process registry of saved model instances.
//! - Persist the whole registry as one JSON document and load it back.
//! - Resolve stored class tags to concrete model classes.
//!
//! # Invariants
//! - The backing file is replaced atomically; readers never see a partial
//!   document.
//! - A corrupt document aborts loading; a single bad entry does not.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};

pub mod class_registry;
pub mod file_storage;

pub use class_registry::{ClassRegistry, ClassRegistryError, ModelFactory};
pub use file_storage::{FileStorage, ReloadReport, SkipReason, SkippedEntry};

pub type StorageResult<T> = Result<T, StorageError>;

/// Storage-level error for flush and reload.
#[derive(Debug)]
pub enum StorageError {
    /// Reading, writing or renaming the backing file failed.
    Io { path: PathBuf, source: io::Error },
    /// Backing file exists but is not a JSON object.
    CorruptStoreFormat { path: PathBuf, message: String },
    /// Registry contents could not be rendered as JSON.
    Serialize(serde_json::Error),
}

impl StorageError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "store I/O failed at `{}`: {source}", path.display()),
            Self::CorruptStoreFormat { path, message } => {
                write!(f, "corrupt store file `{}`: {message}", path.display())
            }
            Self::Serialize(err) => write!(f, "failed to serialize store: {err}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::CorruptStoreFormat { .. } => None,
            Self::Serialize(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}
