use facerec_core::{load_cache, delete_identity, Encoding, EncodingStore, FaceRecError, Identity, StorageError};
use facerec_store::{read_encoding_file, SqliteStore, StoreError};
use tempfile::TempDir;

fn store() -> (TempDir, SqliteStore) {
    let dir = TempDir::new().unwrap();
    let store = SqliteStore::new(dir.path().join("face_recognition.db"));
    store.initialize().unwrap();
    (dir, store)
}

fn identity(name: &str) -> Identity {
    Identity { name: name.into(), age: 42, email: format!("{name}@example.com") }
}

fn encoding(seed: f32) -> Encoding {
    Encoding::new((0..128).map(|i| seed + i as f32 * 1e-3).collect())
}

#[test]
fn test_initialize_is_idempotent() {
    let (_dir, store) = store();
    store.initialize().unwrap();
    store.initialize().unwrap();
    assert!(store.load_all().unwrap().is_empty());
}

#[test]
fn test_empty_store_loads_empty_cache() {
    let (_dir, store) = store();
    let cache = load_cache(&store).unwrap();
    assert!(cache.is_empty());
}

#[test]
fn test_save_then_load_roundtrip() {
    let (_dir, store) = store();
    let original = Encoding::new(vec![0.1, -0.25, 1.0e-9, 123.456]);
    store.save(&identity("alice"), &original).unwrap();

    let rows = store.load_all().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0, "alice");
    assert_eq!(rows[0].1, original);
}

#[test]
fn test_records_include_metadata() {
    let (_dir, store) = store();
    store.save(&identity("alice"), &encoding(0.0)).unwrap();
    store.save(&identity("bob"), &encoding(1.0)).unwrap();

    let records = store.records().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].record.identity, identity("alice"));
    assert_eq!(records[1].record.identity.email, "bob@example.com");
    assert!(records[0].rowid < records[1].rowid);
}

#[test]
fn test_duplicate_names_are_kept_and_latest_wins_in_cache() {
    let (_dir, store) = store();
    store.save(&identity("alice"), &encoding(0.0)).unwrap();
    store.save(&identity("alice"), &encoding(5.0)).unwrap();

    assert_eq!(store.load_all().unwrap().len(), 2);
    let cache = load_cache(&store).unwrap();
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get("alice"), Some(&encoding(5.0)));
}

#[test]
fn test_delete_removes_all_matching_rows() {
    let (_dir, store) = store();
    store.save(&identity("alice"), &encoding(0.0)).unwrap();
    store.save(&identity("bob"), &encoding(1.0)).unwrap();
    store.save(&identity("alice"), &encoding(2.0)).unwrap();

    assert_eq!(store.delete("alice").unwrap(), 2);
    let names: Vec<_> = store.load_all().unwrap().into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, vec!["bob"]);
}

#[test]
fn test_delete_missing_name_is_noop() {
    let (_dir, store) = store();
    assert_eq!(store.delete("nobody").unwrap(), 0);
}

#[test]
fn test_delete_identity_flow() {
    let (_dir, store) = store();
    store.save(&identity("alice"), &encoding(0.0)).unwrap();
    let mut cache = load_cache(&store).unwrap();

    delete_identity(&store, &mut cache, "alice").unwrap();
    assert!(cache.is_empty());
    assert!(store.load_all().unwrap().is_empty());

    let err = delete_identity(&store, &mut cache, "alice").unwrap_err();
    assert!(matches!(err, FaceRecError::UserNotFound(_)));
}

#[test]
fn test_corrupt_blob_fails_load() {
    let (_dir, store) = store();
    let conn = rusqlite::Connection::open(store.path()).unwrap();
    conn.execute(
        "INSERT INTO users (name, age, email, face_encoding) VALUES ('eve', 1, 'e@x', x'DEADBEEF')",
        [],
    )
    .unwrap();
    drop(conn);

    let err = store.load_all().unwrap_err();
    assert!(matches!(err, StorageError::Corrupt { ref name, .. } if name == "eve"));
}

#[test]
fn test_unreadable_store_is_storage_error() {
    let dir = TempDir::new().unwrap();
    // A directory cannot be opened as a database file.
    let store = SqliteStore::new(dir.path());
    assert!(matches!(store.load_all(), Err(StorageError::Backend(_))));
}

#[test]
fn test_export_and_read_encoding_file() {
    let (dir, store) = store();
    let original = encoding(0.5);
    let rowid = store.insert(&identity("alice"), &original).unwrap();

    let path = store.export_encoding(rowid, dir.path()).unwrap();
    assert_eq!(
        path.file_name().unwrap().to_str().unwrap(),
        format!("face_recognition.db-x-users-{rowid}-face_encoding.bin")
    );
    assert_eq!(read_encoding_file(&path).unwrap(), original);
}

#[test]
fn test_export_missing_row() {
    let (dir, store) = store();
    let err = store.export_encoding(99, dir.path()).unwrap_err();
    assert!(matches!(err, StoreError::RowNotFound(99)));
}
