//! Storage configuration.
//!
//! The backing file path is resolved once by the embedding process and handed
//! to `FileStorage`; storage code never reads the environment itself.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Backing file used when nothing else is configured.
pub const DEFAULT_STORE_FILE: &str = "file.json";
/// Environment variable overriding the backing file path.
pub const STORE_PATH_ENV: &str = "HBNB_STORE_PATH";

/// Location of the JSON backing file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub path: PathBuf,
}

impl StorageConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Resolves the path from `HBNB_STORE_PATH`, falling back to
    /// `DEFAULT_STORE_FILE` in the working directory.
    pub fn from_env() -> Self {
        Self::resolve(std::env::var(STORE_PATH_ENV).ok())
    }

    fn resolve(raw: Option<String>) -> Self {
        match raw {
            Some(value) if !value.trim().is_empty() => Self::new(value.trim()),
            _ => Self::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(DEFAULT_STORE_FILE)
    }
}
