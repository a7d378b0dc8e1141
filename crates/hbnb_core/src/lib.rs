//! Core object persistence for hbnb models.
//! Models carry identity and timestamps and persist into one JSON file.

pub mod codec;
pub mod config;
pub mod logging;
#[macro_use]
pub mod model;
pub mod storage;

pub use codec::{decode_timestamp, encode_timestamp, CodecError, CodecResult};
pub use config::{StorageConfig, DEFAULT_STORE_FILE, STORE_PATH_ENV};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::city::City;
pub use model::state::State;
pub use model::{
    storage_key, BaseModel, Model, ModelArgs, ModelClass, ModelError, ModelResult, ModelState,
    CLASS_KEY,
};
pub use storage::{
    ClassRegistry, ClassRegistryError, FileStorage, ReloadReport, SkipReason, SkippedEntry,
    StorageError, StorageResult,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
