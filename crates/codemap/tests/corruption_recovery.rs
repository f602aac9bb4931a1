//! Recovery from corrupted or inconsistent index state.

use codemap::{LoadWarning, MapStore, Symbol, SymbolType};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn saved_store(files: &[&str]) -> TempDir {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let mut store = MapStore::new(dir.path()).unwrap();
    for (i, path) in files.iter().enumerate() {
        store
            .update_file(
                path,
                format!("h{i}"),
                "python",
                10,
                vec![Symbol::new("f", SymbolType::FUNCTION, 1, 2)],
            )
            .unwrap();
    }
    store.update_stats();
    store.save().unwrap();
    dir
}

fn corrupt(path: &Path) {
    fs::write(path, "{ invalid json").expect("failed to corrupt file");
}

#[test]
fn corrupted_manifest_loads_empty_with_warning() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join(".codemap")).unwrap();
    corrupt(&dir.path().join(".codemap/.codemap.json"));

    let store = MapStore::new(dir.path()).expect("corruption is not an error");
    assert!(store.directories().is_empty());
    assert_eq!(store.get_all_files().count(), 0);
    assert!(matches!(
        store.load_warnings(),
        [LoadWarning::CorruptedManifest(_)]
    ));

    let loaded = MapStore::load(dir.path()).expect("corruption is not an error");
    assert!(loaded.directories().is_empty());
}

#[test]
fn corrupted_manifest_heals_on_save_and_sweeps_orphans() {
    let dir = saved_store(&["a.py", "src/b.py", "lib/c.py"]);
    corrupt(&dir.path().join(".codemap/.codemap.json"));

    let mut store = MapStore::load(dir.path()).unwrap();
    store.update_file("src/b.py", "h1", "python", 10, vec![]).unwrap();
    store.save().unwrap();

    let healed = MapStore::load(dir.path()).unwrap();
    assert!(healed.load_warnings().is_empty());
    let paths: Vec<String> = healed.get_all_files().map(|(path, _)| path).collect();
    assert_eq!(paths, ["src/b.py"]);
    assert!(!dir.path().join(".codemap/lib/.codemap.json").exists());
}

#[test]
fn corrupted_directory_map_drops_only_that_directory() {
    let dir = saved_store(&["a.py", "src/b.py", "lib/c.py"]);
    corrupt(&dir.path().join(".codemap/lib/.codemap.json"));

    let store = MapStore::load(dir.path()).unwrap();

    assert!(matches!(
        store.load_warnings(),
        [LoadWarning::CorruptedDirectoryMap { directory, .. }] if directory == "lib"
    ));
    assert!(store.get_file("a.py").is_some());
    assert!(store.get_file("src/b.py").is_some());
    assert!(store.get_file("lib/c.py").is_none());
    assert!(!store.directories().contains("lib"));
}

#[test]
fn corrupted_directory_map_is_deleted_on_save() {
    let dir = saved_store(&["src/b.py", "lib/c.py"]);
    corrupt(&dir.path().join(".codemap/lib/.codemap.json"));

    let mut store = MapStore::load(dir.path()).unwrap();
    store.save().unwrap();

    assert!(!dir.path().join(".codemap/lib/.codemap.json").exists());
    assert!(MapStore::load(dir.path()).unwrap().load_warnings().is_empty());
}

#[test]
fn invalid_line_range_counts_as_corruption() {
    let dir = saved_store(&["src/b.py"]);
    let map_path = dir.path().join(".codemap/src/.codemap.json");
    let mut value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&map_path).unwrap()).unwrap();
    value["files"]["b.py"]["symbols"][0]["lines"] = serde_json::json!([9, 2]);
    fs::write(&map_path, value.to_string()).unwrap();

    let store = MapStore::load(dir.path()).unwrap();
    assert!(matches!(
        store.load_warnings(),
        [LoadWarning::CorruptedDirectoryMap { .. }]
    ));
    assert!(store.get_file("src/b.py").is_none());
}

#[test]
fn root_mismatch_is_reported() {
    let dir = saved_store(&["a.py"]);
    let manifest_path = dir.path().join(".codemap/.codemap.json");
    let mut manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&manifest_path).unwrap()).unwrap();
    manifest["root"] = serde_json::json!("/somewhere/else");
    fs::write(&manifest_path, manifest.to_string()).unwrap();

    let store = MapStore::load(dir.path()).unwrap();
    assert!(matches!(
        store.load_warnings(),
        [LoadWarning::RootMismatch { found, .. }] if found == "/somewhere/else"
    ));
    assert!(store.get_file("a.py").is_some());
}

#[test]
fn reconcile_adopts_untracked_maps() {
    let dir = saved_store(&["src/b.py", "lib/deep/c.py"]);
    let manifest_path = dir.path().join(".codemap/.codemap.json");
    let mut manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&manifest_path).unwrap()).unwrap();
    manifest["directories"] = serde_json::json!(["src"]);
    fs::write(&manifest_path, manifest.to_string()).unwrap();

    let mut store = MapStore::load(dir.path()).unwrap();
    assert!(store.get_file("lib/deep/c.py").is_none());

    let changes = store.reconcile_directories().unwrap();

    assert_eq!(changes, 2);
    assert!(store.directories().contains("lib"));
    assert!(store.directories().contains("lib/deep"));
    assert!(store.get_file("lib/deep/c.py").is_some());
}

#[test]
fn reconcile_drops_directories_without_maps() {
    let dir = saved_store(&["src/b.py"]);
    let manifest_path = dir.path().join(".codemap/.codemap.json");
    let mut manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&manifest_path).unwrap()).unwrap();
    manifest["directories"] = serde_json::json!(["ghost", "src"]);
    fs::write(&manifest_path, manifest.to_string()).unwrap();

    let mut store = MapStore::load(dir.path()).unwrap();
    // Dropped while loading: nothing backs it.
    assert!(!store.directories().contains("ghost"));
    assert_eq!(store.reconcile_directories().unwrap(), 0);
    assert!(store.directories().contains("src"));
}

#[test]
fn consistent_index_needs_no_reconciliation() {
    let dir = saved_store(&["a.py", "src/b.py", "src/x/y/z.py"]);
    let mut store = MapStore::load(dir.path()).unwrap();
    assert_eq!(store.reconcile_directories().unwrap(), 0);
    assert_eq!(store.get_all_files().count(), 3);
}
