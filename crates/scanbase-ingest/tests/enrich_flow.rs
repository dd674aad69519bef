//! End-to-end tests for the enrichment flow
//!
//! These tests run the full pipeline against the in-memory store:
//! - asset-number keyed lookup with the lowest-id tie-break
//! - user/model/asset_type updates, no other field touched
//! - not-found keys counted as skips
//! - dry run vs apply
//! - the concurrent buffered writer path

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use scanbase_common::types::RecordDraft;
use scanbase_ingest::enrich::{run_enrich, EnrichOptions};
use scanbase_ingest::store::{MemoryStore, RecordStore};
use scanbase_ingest::ImportError;

fn csv_file(dir: &tempfile::TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("assets.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

async fn seed(store: &MemoryStore, barcode: &str, location: Option<&str>) -> i64 {
    store
        .create(RecordDraft {
            barcode: barcode.to_string(),
            location: location.map(|l| l.to_string()),
            ..Default::default()
        })
        .await
        .unwrap()
}

fn apply() -> EnrichOptions {
    EnrichOptions {
        apply: true,
        ..Default::default()
    }
}

// ============================================================================
// Resolution
// ============================================================================

#[tokio::test]
async fn test_enrichment_updates_only_its_fields() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    let id = seed(&store, "A1", Some("3F")).await;

    let path = csv_file(&dir, "资产编号,当前使用人,设备型号\nA1,alice,X200\n");
    let report = run_enrich(store.clone(), &path, &apply()).await.unwrap();

    assert_eq!(report.counters.success, 1);
    let record = store.get(id).await.unwrap().unwrap();
    assert_eq!(record.user.as_deref(), Some("alice"));
    assert_eq!(record.model.as_deref(), Some("X200"));
    // untouched fields survive
    assert_eq!(record.location.as_deref(), Some("3F"));
    assert_eq!(record.barcode.as_deref(), Some("A1"));
}

#[tokio::test]
async fn test_unmatched_keys_are_skips_not_errors() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    seed(&store, "A1", None).await;

    let path = csv_file(&dir, "资产编号,当前使用人\nA1,alice\nGHOST,bob\nPHANTOM,eve\n");
    let report = run_enrich(store.clone(), &path, &apply()).await.unwrap();

    assert_eq!(report.counters.input_rows, 3);
    assert_eq!(report.counters.success, 1);
    assert_eq!(report.counters.skipped_not_found, 2);
    assert_eq!(report.counters.errors, 0);
    assert!(report.counters.balanced());
}

#[tokio::test]
async fn test_duplicate_stored_keys_resolve_to_the_lowest_id() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    let first = seed(&store, "A1", None).await;
    let second = seed(&store, "A1", None).await;

    let path = csv_file(&dir, "资产编号,当前使用人\nA1,alice\n");
    run_enrich(store.clone(), &path, &apply()).await.unwrap();

    assert_eq!(
        store.get(first).await.unwrap().unwrap().user.as_deref(),
        Some("alice")
    );
    assert_eq!(store.get(second).await.unwrap().unwrap().user, None);
}

#[tokio::test]
async fn test_asset_type_label_is_stamped_on_every_match() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    let a = seed(&store, "A1", None).await;
    let b = seed(&store, "B2", None).await;

    let path = csv_file(&dir, "资产编号,当前使用人\nA1,alice\nB2,bob\n");
    let options = EnrichOptions {
        apply: true,
        asset_type: Some("monitor".to_string()),
        ..Default::default()
    };
    run_enrich(store.clone(), &path, &options).await.unwrap();

    for id in [a, b] {
        let record = store.get(id).await.unwrap().unwrap();
        assert_eq!(record.asset_type.as_deref(), Some("monitor"));
    }
}

#[tokio::test]
async fn test_a_second_run_over_unchanged_input_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    seed(&store, "A1", Some("3F")).await;
    seed(&store, "B2", None).await;

    let path = csv_file(&dir, "资产编号,当前使用人,设备型号\nA1,alice,X200\nB2,bob,Y100\nGHOST,eve,Z1\n");
    let options = EnrichOptions {
        apply: true,
        asset_type: Some("laptop".to_string()),
        ..Default::default()
    };

    let first = run_enrich(store.clone(), &path, &options).await.unwrap();
    let after_first = store.fetch_all().await.unwrap();

    let second = run_enrich(store.clone(), &path, &options).await.unwrap();
    let after_second = store.fetch_all().await.unwrap();

    // the second run lands on the same rows with the same values
    assert_eq!(second.counters.success, first.counters.success);
    assert_eq!(
        second.counters.skipped_not_found,
        first.counters.skipped_not_found
    );
    assert!(second.counters.balanced());

    assert_eq!(after_first.len(), after_second.len());
    for (a, b) in after_first.iter().zip(&after_second) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.barcode, b.barcode);
        assert_eq!(a.user, b.user);
        assert_eq!(a.model, b.model);
        assert_eq!(a.asset_type, b.asset_type);
        assert_eq!(a.location, b.location);
    }
}

#[tokio::test]
async fn test_missing_user_column_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());

    let path = csv_file(&dir, "资产编号,设备型号\nA1,X200\n");
    let err = run_enrich(store.clone(), &path, &apply()).await.unwrap_err();
    assert!(matches!(err, ImportError::MissingColumns(_)));
}

// ============================================================================
// Modes and concurrency
// ============================================================================

#[tokio::test]
async fn test_dry_run_resolves_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    let id = seed(&store, "A1", None).await;

    let path = csv_file(&dir, "资产编号,当前使用人\nA1,alice\nGHOST,bob\n");
    let report = run_enrich(store.clone(), &path, &EnrichOptions::default())
        .await
        .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.counters.success, 1);
    assert_eq!(report.counters.skipped_not_found, 1);
    assert_eq!(store.get(id).await.unwrap().unwrap().user, None);
}

#[tokio::test]
async fn test_concurrent_enrichment_updates_every_match_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());

    let mut content = String::from("资产编号,当前使用人\n");
    let mut ids = Vec::new();
    for i in 0..150 {
        ids.push(seed(&store, &format!("K{i:03}"), None).await);
        content.push_str(&format!("K{i:03},user{i}\n"));
    }
    // a few misses mixed in
    content.push_str("GHOST1,x\nGHOST2,y\n");
    let path = csv_file(&dir, &content);

    let options = EnrichOptions {
        apply: true,
        workers: Some(4),
        batch_size: 16,
        ..Default::default()
    };
    let report = run_enrich(store.clone(), &path, &options).await.unwrap();

    assert_eq!(report.counters.success, 150);
    assert_eq!(report.counters.skipped_not_found, 2);
    assert_eq!(report.counters.errors, 0);
    assert!(report.counters.balanced());

    for (i, id) in ids.iter().enumerate() {
        let record = store.get(*id).await.unwrap().unwrap();
        assert_eq!(record.user.as_deref(), Some(format!("user{i}").as_str()));
    }
}
