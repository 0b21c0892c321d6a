use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use refdb_sync::error::SyncError;
use refdb_sync::store::{self, Store};

fn store_in(temp: &tempfile::TempDir) -> Store {
    let root = Utf8PathBuf::from_path_buf(temp.path().join("store")).unwrap();
    let store = Store::new_with_root(root);
    store.ensure_root().unwrap();
    store
}

fn stage_version(store: &Store, version: &str, files: &[&str]) {
    let dir = store.version_dir(version);
    std::fs::create_dir_all(dir.as_std_path()).unwrap();
    for name in files {
        std::fs::write(dir.join(name).as_std_path(), b"data").unwrap();
    }
}

#[test]
fn is_complete_requires_every_file() {
    let temp = tempfile::tempdir().unwrap();
    let store = store_in(&temp);
    let required = vec!["A.tab".to_string(), "B.lib".to_string()];

    stage_version(&store, "v1", &["A.tab"]);
    let dir = store.version_dir("v1");
    assert!(!store::is_complete(&dir, &required));
    assert_eq!(store::missing_files(&dir, &required), vec!["B.lib".to_string()]);

    std::fs::write(dir.join("B.lib").as_std_path(), b"data").unwrap();
    assert!(store::is_complete(&dir, &required));
}

#[test]
fn publish_rejects_incomplete_staging_and_leaves_pointer_unset() {
    let temp = tempfile::tempdir().unwrap();
    let store = store_in(&temp);
    let required = vec!["A.tab".to_string(), "B.lib".to_string()];

    stage_version(&store, "v1", &["A.tab"]);
    let err = store.publish("v1", &required).unwrap_err();

    assert_matches!(err, SyncError::IncompleteStagingDirectory { ref missing, .. }
        if missing == &["B.lib".to_string()]);
    assert_eq!(store.read_current().unwrap(), None);
}

#[test]
fn publish_swaps_pointer_and_retains_previous_version() {
    let temp = tempfile::tempdir().unwrap();
    let store = store_in(&temp);
    let required = vec!["A.tab".to_string()];

    stage_version(&store, "v1", &["A.tab"]);
    store.publish("v1", &required).unwrap();
    assert_eq!(store.read_current().unwrap().as_deref(), Some("v1"));

    stage_version(&store, "v2", &["A.tab"]);
    store.publish("v2", &required).unwrap();
    assert_eq!(store.read_current().unwrap().as_deref(), Some("v2"));

    // superseded version stays on disk; retention is a caller policy
    assert!(store.version_dir("v1").as_std_path().is_dir());
}

#[test]
fn publish_is_idempotent() {
    let temp = tempfile::tempdir().unwrap();
    let store = store_in(&temp);
    let required = vec!["A.tab".to_string()];

    stage_version(&store, "v1", &["A.tab"]);
    store.publish("v1", &required).unwrap();
    store.publish("v1", &required).unwrap();
    assert_eq!(store.read_current().unwrap().as_deref(), Some("v1"));
}

#[test]
fn failed_republish_keeps_existing_pointer() {
    let temp = tempfile::tempdir().unwrap();
    let store = store_in(&temp);
    let required = vec!["A.tab".to_string()];

    stage_version(&store, "v1", &["A.tab"]);
    store.publish("v1", &required).unwrap();

    stage_version(&store, "v2", &[]);
    let err = store.publish("v2", &required).unwrap_err();
    assert_matches!(err, SyncError::IncompleteStagingDirectory { .. });
    assert_eq!(store.read_current().unwrap().as_deref(), Some("v1"));
}

#[test]
fn lock_is_exclusive_per_root() {
    let temp = tempfile::tempdir().unwrap();
    let store = store_in(&temp);

    let guard = store.lock().unwrap();
    let err = store.lock().unwrap_err();
    assert_matches!(err, SyncError::LockContention(_));

    drop(guard);
    store.lock().unwrap();
}
