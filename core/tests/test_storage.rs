use std::fs;
use std::path::PathBuf;

use serde_json::json;
use trainlog_core::{
    DatasetRepo, DocumentStore, Entry, EntryDraft, FileKvStore, Identity, KeyValueStore,
    MemoryDocumentStore, MemoryKvStore, SyncConfig,
};

fn tmp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("trainlog_{}_{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    dir
}

fn sample_dataset() -> trainlog_core::Dataset {
    let mut ds = trainlog_core::Dataset {
        name: "Kari".to_string(),
        ..Default::default()
    };
    let run = EntryDraft::new("2024-05-02")
        .with("dist", "8")
        .with("avgPace", "5:05")
        .with("avgHR", "151")
        .into_entry()
        .expect("valid draft");
    trainlog_core::insert_sorted(&mut ds.entries_by_sport.run, run);
    trainlog_core::insert_sorted(&mut ds.entries_by_sport.run, Entry::new("2024-05-01"));
    ds.entries_by_sport.bike.push(Entry {
        avg_power: Some(210.0),
        ..Entry::new("2024-05-03")
    });
    ds
}

#[test]
fn test_save_and_load_guest_dataset_on_disk() {
    let dir = tmp_dir("guest");
    let local = FileKvStore::new(&dir);
    let remote = MemoryDocumentStore::new();
    let repo = DatasetRepo::new(&local, &remote);

    // ingen fil ennå → tomt datasett
    assert_eq!(repo.load_entries(None).unwrap(), trainlog_core::Dataset::default());

    let ds = sample_dataset();
    repo.save_entries(None, &ds).expect("save guest");
    assert!(dir.join("rd_guest.json").exists());

    let loaded = repo.load_entries(None).expect("load guest");
    assert_eq!(loaded, ds);
    assert_eq!(loaded.entries_by_sport.run[0].date, "2024-05-01");
    assert_eq!(loaded.entries_by_sport.run[1].avg_pace, Some(305.0));

    // legacy-speilet skrives også
    let raw: serde_json::Value =
        serde_json::from_str(&local.get("rd_guest").unwrap().unwrap()).unwrap();
    assert_eq!(raw["entries"].as_array().unwrap().len(), 2);
    assert_eq!(remote.write_count(), 0);

    local.remove("rd_guest").unwrap();
    local.remove("rd_guest").unwrap();
    assert!(local.get("rd_guest").unwrap().is_none());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_account_save_writes_owner_fields() {
    let local = MemoryKvStore::new();
    let remote = MemoryDocumentStore::new();
    let repo = DatasetRepo::new(&local, &remote);

    let id = Identity {
        uid: "u42".into(),
        email: Some("ola@example.com".into()),
        display_name: None,
    };
    let mut ds = sample_dataset();
    ds.name = String::new();

    repo.save_entries(Some(&id), &ds).expect("save account");

    let stored = remote.get("users/u42/datasets/default").unwrap().unwrap();
    assert_eq!(stored["name"], json!("ola"));
    assert_eq!(stored["ownerUid"], json!("u42"));
    assert_eq!(stored["email"], json!("ola@example.com"));
    assert_eq!(stored["displayName"], json!(""));
    assert!(stored["updatedAt"].is_string());

    let loaded = repo.load_entries(Some(&id)).unwrap();
    assert_eq!(loaded.name, "ola");
    assert_eq!(loaded.entries_by_sport, ds.entries_by_sport);
    assert!(local.get("rd_guest").unwrap().is_none());
}

#[test]
fn test_missing_account_document_is_empty() {
    let local = MemoryKvStore::new();
    let remote = MemoryDocumentStore::new();
    let repo = DatasetRepo::new(&local, &remote);
    let ds = repo.load_entries(Some(&Identity::new("nobody"))).unwrap();
    assert_eq!(ds.total_entries(), 0);

    remote.set_offline(true);
    assert!(repo.load_entries(Some(&Identity::new("nobody"))).is_err());
}

#[test]
fn test_guest_name_key() {
    let local = MemoryKvStore::new();
    let remote = MemoryDocumentStore::new();
    let cfg = SyncConfig {
        guest_name_key: Some("rd_guest_name".into()),
        ..SyncConfig::default()
    };
    let repo = DatasetRepo::with_config(&local, &remote, cfg);

    local
        .set("rd_guest", &json!({ "entries": [{ "date": "2024-01-01" }] }).to_string())
        .unwrap();
    local.set("rd_guest_name", " Per ").unwrap();
    assert_eq!(repo.load_entries(None).unwrap().name, "Per");

    let report = repo.merge_guest_to_user(Some(&Identity::new("u1"))).unwrap();
    assert_eq!(report.merged_count, 2);
    assert!(local.get("rd_guest_name").unwrap().is_none());

    let stored = remote.get("users/u1/datasets/default").unwrap().unwrap();
    assert_eq!(stored["name"], json!("Per"));
}

#[test]
fn test_file_store_keeps_similar_keys_apart() {
    let dir = tmp_dir("keys");
    let local = FileKvStore::new(&dir);

    local.set("a.b", "dot").unwrap();
    local.set("a_b", "underscore").unwrap();
    local.set("a%2Eb", "percent").unwrap();

    assert_eq!(local.get("a.b").unwrap().as_deref(), Some("dot"));
    assert_eq!(local.get("a_b").unwrap().as_deref(), Some("underscore"));
    assert_eq!(local.get("a%2Eb").unwrap().as_deref(), Some("percent"));
    assert!(dir.join("a%2Eb.json").exists());
    assert!(dir.join("a%252Eb.json").exists());

    let _ = fs::remove_dir_all(&dir);
}
