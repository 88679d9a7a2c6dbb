use serde_json::json;
use trainlog_core::metrics::Metrics;
use trainlog_core::{DatasetRepo, Dataset, Identity, KeyValueStore, MemoryDocumentStore, MemoryKvStore};

#[test]
fn smoke_merge_and_save_counters() {
    let metrics = Metrics::new().unwrap();
    let local = MemoryKvStore::new();
    let remote = MemoryDocumentStore::new();
    let repo = DatasetRepo::new(&local, &remote).with_metrics(&metrics);
    let id = Identity::new("u1");

    // ingenting å flette
    repo.merge_guest_to_user(Some(&id)).unwrap();

    local
        .set(
            "rd_guest",
            &json!({
                "entries": [{ "date": "2024-01-01", "avgPace": 300 }],
                "entriesBySport": { "run": [{ "date": "2024-01-01", "avgPace": 300 }] }
            })
            .to_string(),
        )
        .unwrap();
    let report = repo.merge_guest_to_user(Some(&id)).unwrap();
    assert_eq!(report.merged_count, 2);

    repo.save_entries(None, &Dataset::default()).unwrap();

    remote.set_offline(true);
    repo.save_entries(None, &Dataset::default()).unwrap();
    local
        .set("rd_guest", &json!({ "entries": [{ "date": "2024-01-02" }] }).to_string())
        .unwrap();
    assert!(repo.merge_guest_to_user(Some(&id)).is_err());

    let text = metrics.gather_text();
    assert!(text.contains("trainlog_merge_total 1"), "{text}");
    assert!(text.contains("trainlog_merge_noop_total 1"), "{text}");
    assert!(text.contains("trainlog_merge_failed_total 1"), "{text}");
    assert!(text.contains("trainlog_merged_entries_total 2"), "{text}");
    assert!(text.contains(r#"trainlog_saves_total{scope="guest"} 2"#), "{text}");
}
