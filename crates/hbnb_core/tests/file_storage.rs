use hbnb_core::{
    BaseModel, City, ClassRegistry, FileStorage, Model, ModelArgs, ModelClass, SkipReason, State,
    StorageConfig, StorageError,
};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn store_path(dir: &TempDir) -> PathBuf {
    dir.path().join("file.json")
}

fn open(path: &Path) -> FileStorage {
    FileStorage::open(StorageConfig::new(path), ClassRegistry::builtin()).unwrap()
}

fn state_with_id(id: &str) -> State {
    State::construct(&ModelArgs::new().kwarg("id", id)).unwrap()
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn open_without_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let storage = open(&store_path(&dir));

    assert!(storage.is_empty());
    assert!(!store_path(&dir).exists());
}

#[test]
fn open_keeps_configured_path_and_classes() {
    let dir = tempfile::tempdir().unwrap();
    let storage = open(&store_path(&dir));

    assert_eq!(storage.path(), store_path(&dir).as_path());
    assert!(storage.classes().contains("City"));
    assert!(!storage.classes().contains("Spaceship"));
}

#[test]
fn open_with_blank_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(store_path(&dir), "  \n").unwrap();

    assert!(open(&store_path(&dir)).is_empty());
}

#[test]
fn save_then_reopen_restores_concrete_types() {
    let dir = tempfile::tempdir().unwrap();
    let path = store_path(&dir);

    let mut storage = open(&path);
    let mut state = State::named("Kenya");
    state.save(&mut storage).unwrap();
    let mut city = City::new();
    city.set_state_id(state.id());
    city.set_name("Nairobi");
    city.set_attr("no", 24).unwrap();
    city.save(&mut storage).unwrap();
    let mut base = BaseModel::new();
    base.save(&mut storage).unwrap();

    let reopened = open(&path);
    assert_eq!(reopened.len(), 3);

    let loaded_city = reopened.get_as::<City>(city.id()).expect("city reloaded");
    assert_eq!(loaded_city, &city);
    assert_eq!(loaded_city.state_id(), state.id());
    assert_eq!(loaded_city.attr("no"), Some(&json!(24)));

    let loaded_state = reopened.get_as::<State>(state.id()).expect("state reloaded");
    assert_eq!(loaded_state.name(), "Kenya");
    assert!(reopened.get_as::<City>(state.id()).is_none());

    let loaded_base = reopened
        .get(&format!("BaseModel.{}", base.id()))
        .expect("base model reloaded");
    assert_eq!(loaded_base.class_name(), "BaseModel");
    assert_eq!(loaded_base.to_dict(), base.to_dict());
}

#[test]
fn file_contains_composite_keys_and_tagged_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = store_path(&dir);
    let mut storage = open(&path);

    let mut city = City::new();
    city.save(&mut storage).unwrap();

    let document = read_json(&path);
    let key = format!("City.{}", city.id());
    assert_eq!(document.as_object().unwrap().len(), 1);
    assert_eq!(document[&key]["__class__"], "City");
    assert_eq!(document[&key]["id"], city.id());
}

#[test]
fn save_overwrites_existing_entry() {
    let dir = tempfile::tempdir().unwrap();
    let path = store_path(&dir);
    let mut storage = open(&path);

    let mut city = City::new();
    city.save(&mut storage).unwrap();
    city.set_name("Eldoret");
    city.save(&mut storage).unwrap();

    assert_eq!(storage.len(), 1);
    let document = read_json(&path);
    assert_eq!(document[city.storage_key()]["name"], "Eldoret");
}

#[test]
fn registry_holds_snapshot_taken_at_save() {
    let dir = tempfile::tempdir().unwrap();
    let mut storage = open(&store_path(&dir));

    let mut city = City::new();
    city.save(&mut storage).unwrap();
    city.set_name("unsaved");

    let stored = storage.get(&city.storage_key()).unwrap();
    assert!(stored.attr("name").is_none());
    assert_eq!(storage.keys(), vec![city.storage_key().as_str()]);
}

#[test]
fn reload_skips_unknown_classes() {
    let dir = tempfile::tempdir().unwrap();
    let path = store_path(&dir);
    fs::write(
        &path,
        json!({
            "Spaceship.1": {
                "id": "1",
                "created_at": "2020-01-01T00:00:00.000000",
                "updated_at": "2020-01-01T00:00:00.000000",
                "__class__": "Spaceship"
            }
        })
        .to_string(),
    )
    .unwrap();

    let mut storage = FileStorage::new(StorageConfig::new(&path), ClassRegistry::builtin());
    let report = storage.reload().unwrap();

    assert_eq!(report.loaded, 0);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].key, "Spaceship.1");
    assert_eq!(report.skipped[0].reason, SkipReason::UnresolvedClassTag);
    assert!(storage.is_empty());
}

#[test]
fn reload_keeps_valid_entries_next_to_damaged_ones() {
    let dir = tempfile::tempdir().unwrap();
    let path = store_path(&dir);
    fs::write(
        &path,
        json!({
            "City.good": {
                "id": "good",
                "created_at": "2020-01-01T00:00:00.000000",
                "updated_at": "2020-01-02T00:00:00.000000",
                "__class__": "City",
                "name": "Nakuru"
            },
            "City.bad-time": {
                "id": "bad-time",
                "created_at": "yesterday",
                "updated_at": "2020-01-02T00:00:00.000000",
                "__class__": "City"
            },
            "City.not-object": [1, 2, 3],
            "State.untagged": {
                "id": "untagged",
                "created_at": "2020-01-01T00:00:00.000000",
                "updated_at": "2020-01-01T00:00:00.000000",
                "name": "Rift Valley"
            }
        })
        .to_string(),
    )
    .unwrap();

    let mut storage = FileStorage::new(StorageConfig::new(&path), ClassRegistry::builtin());
    let report = storage.reload().unwrap();

    assert_eq!(report.loaded, 2);
    let mut reasons: Vec<(String, SkipReason)> = report
        .skipped
        .iter()
        .map(|entry| (entry.key.clone(), entry.reason))
        .collect();
    reasons.sort_by(|left, right| left.0.cmp(&right.0));
    assert_eq!(
        reasons,
        vec![
            ("City.bad-time".to_string(), SkipReason::MalformedTimestamp),
            ("City.not-object".to_string(), SkipReason::MalformedRecord),
        ]
    );
    assert_eq!(storage.get_as::<City>("good").unwrap().name(), "Nakuru");
    assert_eq!(
        storage.get_as::<State>("untagged").unwrap().name(),
        "Rift Valley"
    );
}

#[test]
fn open_rejects_invalid_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = store_path(&dir);
    fs::write(&path, "{\"City.1\": ").unwrap();

    let err = FileStorage::open(StorageConfig::new(&path), ClassRegistry::builtin()).unwrap_err();
    assert!(matches!(err, StorageError::CorruptStoreFormat { .. }));
}

#[test]
fn open_rejects_non_utf8_bytes_as_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let path = store_path(&dir);
    fs::write(&path, [0xff, 0xfe, b'{', b'}']).unwrap();

    let err = FileStorage::open(StorageConfig::new(&path), ClassRegistry::builtin()).unwrap_err();
    match err {
        StorageError::CorruptStoreFormat { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn open_rejects_non_object_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = store_path(&dir);
    fs::write(&path, "[]").unwrap();

    let err = FileStorage::open(StorageConfig::new(&path), ClassRegistry::builtin()).unwrap_err();
    match err {
        StorageError::CorruptStoreFormat { message, .. } => assert!(message.contains("array")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn flush_failure_propagates_to_save() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, "file").unwrap();
    let path = blocker.join("file.json");
    let mut storage = FileStorage::new(StorageConfig::new(&path), ClassRegistry::builtin());

    let mut city = City::new();
    let err = city.save(&mut storage).unwrap_err();
    assert!(matches!(err, StorageError::Io { .. }));
}

#[test]
fn close_flushes_registered_models() {
    let dir = tempfile::tempdir().unwrap();
    let path = store_path(&dir);
    let mut storage = open(&path);

    let state = State::named("Mombasa");
    storage.register(&state);
    assert!(!path.exists());
    storage.close().unwrap();

    let document = read_json(&path);
    assert_eq!(document[state.storage_key()]["name"], "Mombasa");
}

#[test]
fn all_iterates_in_key_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut storage = open(&store_path(&dir));
    let first = state_with_id("a");
    let second = state_with_id("b");
    storage.register(&second);
    storage.register(&first);

    let keys: Vec<&str> = storage.all().map(|(key, _)| key).collect();
    assert_eq!(keys, vec!["State.a", "State.b"]);
}
