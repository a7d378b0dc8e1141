//! JSON file storage engine.
//!
//! # Responsibility
//! - Own the registry of saved models keyed by `"<ClassName>.<id>"`.
//! - Write the whole registry to one JSON document and load it back.
//!
//! # Invariants
//! - Flush writes a temp file next to the target and renames it into place.
//! - Reload skips unknown classes and damaged entries, and fails on a
//!   document that is not a JSON object.
//! - Registry entries are snapshots taken at `register`/`save` time.

use super::{ClassRegistry, StorageError, StorageResult};
use crate::config::StorageConfig;
use crate::model::{storage_key, Model, ModelArgs, ModelClass, ModelError, ModelResult, CLASS_KEY};
use log::{debug, error, info, warn};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;

/// Why one stored entry was not loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    UnresolvedClassTag,
    MalformedTimestamp,
    MalformedRecord,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnresolvedClassTag => "unresolved_class_tag",
            Self::MalformedTimestamp => "malformed_timestamp",
            Self::MalformedRecord => "malformed_record",
        }
    }
}

impl From<&ModelError> for SkipReason {
    fn from(value: &ModelError) -> Self {
        match value {
            ModelError::UnresolvedClassTag(_) => Self::UnresolvedClassTag,
            ModelError::Codec(_) => Self::MalformedTimestamp,
            ModelError::MalformedRecord(_) | ModelError::ReservedAttribute(_) => {
                Self::MalformedRecord
            }
        }
    }
}

/// One entry left out of a reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub key: String,
    pub reason: SkipReason,
    pub message: String,
}

/// Outcome of one reload pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReloadReport {
    pub loaded: usize,
    pub skipped: Vec<SkippedEntry>,
}

/// Registry of saved models persisted to one JSON file.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    classes: ClassRegistry,
    objects: BTreeMap<String, Box<dyn Model>>,
}

impl FileStorage {
    /// Creates an empty storage without touching the backing file.
    pub fn new(config: StorageConfig, classes: ClassRegistry) -> Self {
        Self {
            path: config.path,
            classes,
            objects: BTreeMap::new(),
        }
    }

    /// Creates storage and loads the backing file when present.
    ///
    /// # Errors
    /// - `StorageError::CorruptStoreFormat` when the file is not a JSON object.
    /// - `StorageError::Io` when the file exists but cannot be read.
    pub fn open(config: StorageConfig, classes: ClassRegistry) -> StorageResult<Self> {
        let started_at = Instant::now();
        let mut storage = Self::new(config, classes);
        info!(
            "event=store_open module=storage status=start path={}",
            storage.path.display()
        );

        match storage.reload() {
            Ok(report) => {
                info!(
                    "event=store_open module=storage status=ok loaded={} skipped={} duration_ms={}",
                    report.loaded,
                    report.skipped.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(storage)
            }
            Err(err) => {
                error!(
                    "event=store_open module=storage status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    /// Inserts or replaces the snapshot stored under the model's key.
    pub fn register(&mut self, model: &dyn Model) {
        self.objects.insert(model.storage_key(), model.clone_model());
    }

    /// Refreshes `updated_at`, registers the model and flushes.
    pub fn save(&mut self, model: &mut dyn Model) -> StorageResult<()> {
        model.state_mut().touch();
        self.register(model);
        debug!(
            "event=model_save module=model status=start key={}",
            model.storage_key()
        );
        self.flush()
    }

    /// Writes every registered model to the backing file.
    ///
    /// # Errors
    /// - `StorageError::Io` when the temp file cannot be written or renamed.
    /// - `StorageError::Serialize` when rendering JSON fails.
    pub fn flush(&self) -> StorageResult<()> {
        let started_at = Instant::now();
        let document: Map<String, Value> = self
            .objects
            .iter()
            .map(|(key, model)| (key.clone(), Value::Object(model.to_dict())))
            .collect();
        let bytes = serde_json::to_vec_pretty(&Value::Object(document))?;

        match write_atomically(&self.path, &bytes) {
            Ok(()) => {
                info!(
                    "event=store_flush module=storage status=ok objects={} bytes={} duration_ms={}",
                    self.objects.len(),
                    bytes.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=store_flush module=storage status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Loads every resolvable entry of the backing file into the registry.
    ///
    /// Absent or blank files load nothing. Entries with unknown class tags,
    /// malformed timestamps or a wrong shape are skipped and reported.
    ///
    /// # Errors
    /// - `StorageError::CorruptStoreFormat` when the document is not valid
    ///   UTF-8 JSON or its top-level value is not an object.
    /// - `StorageError::Io` for read failures other than not-found.
    pub fn reload(&mut self) -> StorageResult<ReloadReport> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(
                    "event=store_reload module=storage status=ok state=absent path={}",
                    self.path.display()
                );
                return Ok(ReloadReport::default());
            }
            Err(err) => return Err(StorageError::io(&self.path, err)),
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(ReloadReport::default());
        }

        let document: Value =
            serde_json::from_slice(&raw).map_err(|err| self.corrupt(err.to_string()))?;
        let entries = match document {
            Value::Object(entries) => entries,
            other => {
                return Err(self.corrupt(format!(
                    "top-level value must be an object, got {}",
                    json_type_name(&other)
                )));
            }
        };

        let mut report = ReloadReport::default();
        for (key, entry) in entries {
            match self.reconstruct_entry(&key, entry) {
                Ok(model) => {
                    self.objects.insert(key, model);
                    report.loaded += 1;
                }
                Err(err) => {
                    let reason = SkipReason::from(&err);
                    warn!(
                        "event=store_reload_entry module=storage status=skip key={} reason={} error={}",
                        key,
                        reason.as_str(),
                        err
                    );
                    report.skipped.push(SkippedEntry {
                        key,
                        reason,
                        message: err.to_string(),
                    });
                }
            }
        }

        debug!(
            "event=store_reload module=storage status=ok loaded={} skipped={}",
            report.loaded,
            report.skipped.len()
        );
        Ok(report)
    }

    /// Iterates registered models in key order.
    pub fn all(&self) -> impl Iterator<Item = (&str, &dyn Model)> + '_ {
        self.objects
            .iter()
            .map(|(key, model)| (key.as_str(), &**model))
    }

    pub fn keys(&self) -> Vec<&str> {
        self.objects.keys().map(String::as_str).collect()
    }

    /// Looks up one model by composite key.
    pub fn get(&self, key: &str) -> Option<&dyn Model> {
        self.objects.get(key).map(|model| &**model)
    }

    /// Looks up one model of class `M` by id.
    pub fn get_as<M: ModelClass>(&self, id: &str) -> Option<&M> {
        self.get(&storage_key(M::CLASS_NAME, id))?
            .as_any()
            .downcast_ref::<M>()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Flushes once more and releases the storage.
    pub fn close(self) -> StorageResult<()> {
        self.flush()
    }

    fn reconstruct_entry(&self, key: &str, entry: Value) -> ModelResult<Box<dyn Model>> {
        let record = match entry {
            Value::Object(record) => record,
            other => {
                return Err(ModelError::MalformedRecord(format!(
                    "entry must be an object, got {}",
                    json_type_name(&other)
                )));
            }
        };

        let class_name = match record.get(CLASS_KEY) {
            Some(Value::String(tag)) => tag.clone(),
            Some(other) => {
                return Err(ModelError::MalformedRecord(format!(
                    "`{CLASS_KEY}` must be a string, got {other}"
                )));
            }
            // Older writers may omit the tag; the key prefix carries it.
            None => match key.split_once('.') {
                Some((prefix, _)) => prefix.to_string(),
                None => return Err(ModelError::UnresolvedClassTag(key.to_string())),
            },
        };

        self.classes
            .reconstruct(&class_name, &ModelArgs::from_keywords(record))
    }

    fn corrupt(&self, message: String) -> StorageError {
        StorageError::CorruptStoreFormat {
            path: self.path.clone(),
            message,
        }
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|err| StorageError::io(&parent, err))?;

    let mut temp = NamedTempFile::new_in(&parent).map_err(|err| StorageError::io(&parent, err))?;
    temp.write_all(bytes)
        .map_err(|err| StorageError::io(temp.path(), err))?;
    // The rename would otherwise leave the target with the temp file's 0600 mode.
    match fs::metadata(path) {
        Ok(existing) => temp
            .as_file()
            .set_permissions(existing.permissions())
            .map_err(|err| StorageError::io(temp.path(), err))?,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(StorageError::io(path, err)),
    }
    temp.as_file()
        .sync_all()
        .map_err(|err| StorageError::io(temp.path(), err))?;
    temp.persist(path)
        .map_err(|err| StorageError::io(path, err.error))?;
    Ok(())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::{json_type_name, write_atomically, SkipReason};
    use crate::codec::CodecError;
    use crate::model::ModelError;
    use serde_json::json;

    #[test]
    fn skip_reason_maps_model_errors() {
        let codec = ModelError::Codec(CodecError::MalformedTimestamp {
            value: "x".to_string(),
        });
        assert_eq!(SkipReason::from(&codec), SkipReason::MalformedTimestamp);
        assert_eq!(
            SkipReason::from(&ModelError::UnresolvedClassTag("X".to_string())),
            SkipReason::UnresolvedClassTag
        );
        assert_eq!(
            serde_json::to_value(SkipReason::MalformedRecord).unwrap(),
            json!("malformed_record")
        );
    }

    #[test]
    fn write_atomically_creates_parent_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("store.json");

        write_atomically(&target, b"{}").unwrap();
        write_atomically(&target, b"{\"a\": 1}").unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "{\"a\": 1}");
        let entries = std::fs::read_dir(target.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[cfg(unix)]
    #[test]
    fn write_atomically_keeps_existing_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("store.json");
        std::fs::write(&target, "{}").unwrap();
        std::fs::set_permissions(&target, std::fs::Permissions::from_mode(0o644)).unwrap();

        write_atomically(&target, b"{\"a\": 1}").unwrap();

        let mode = std::fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[test]
    fn json_type_names_are_stable() {
        assert_eq!(json_type_name(&json!([])), "array");
        assert_eq!(json_type_name(&json!(null)), "null");
    }
}
