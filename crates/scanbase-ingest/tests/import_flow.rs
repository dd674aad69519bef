//! End-to-end tests for the import flow
//!
//! These tests run the full pipeline against the in-memory store:
//! - localized-header spreadsheets and CSVs
//! - duplicate skipping (stored keys and batch-internal keys)
//! - empty-key skipping
//! - batch failure isolation with correct row numbers
//! - dry run vs apply vs replace
//! - counter reconciliation on every path

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use scanbase_common::types::RecordDraft;
use scanbase_ingest::import::{run_import, ImportOptions};
use scanbase_ingest::store::{limits, MemoryStore, RecordStore};
use scanbase_ingest::tabular::{write_xlsx, Table};
use scanbase_ingest::ImportError;

fn csv_file(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

fn xlsx_file(dir: &tempfile::TempDir, name: &str, headers: &[&str], rows: &[&[&str]]) -> PathBuf {
    let mut table = Table::new(headers.iter().map(|h| h.to_string()).collect());
    for row in rows {
        table.push_row(row.iter().map(|c| c.to_string()).collect());
    }
    let bytes = write_xlsx(&table).unwrap();
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

fn apply() -> ImportOptions {
    ImportOptions {
        apply: true,
        ..Default::default()
    }
}

// ============================================================================
// Classification
// ============================================================================

#[tokio::test]
async fn test_duplicate_and_empty_key_rows_become_skips() {
    // A1 stored, then input [A1, "", A1]: one success is impossible since A1
    // exists, so 0 written, 1 empty-key skip, 2 duplicate skips.
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    store
        .create(RecordDraft {
            barcode: "A1".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    let path = csv_file(&dir, "in.csv", "条码,型号\nA1,X\n,Y\nA1,Z\n");
    let report = run_import(Arc::clone(&store), &path, &apply())
        .await
        .unwrap();

    assert_eq!(report.counters.input_rows, 3);
    assert_eq!(report.counters.success, 0);
    assert_eq!(report.counters.skipped_empty_key, 1);
    assert_eq!(report.counters.skipped_duplicate, 2);
    assert_eq!(report.counters.errors, 0);
    assert!(report.counters.balanced());
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_fresh_batch_with_internal_duplicate() {
    // empty store, input [A1, "", A1]: the first A1 wins, the second is a
    // duplicate skip, the empty key is an empty-key skip.
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());

    let path = csv_file(&dir, "in.csv", "条码,型号\nA1,X\n,Y\nA1,Z\n");
    let report = run_import(Arc::clone(&store), &path, &apply())
        .await
        .unwrap();

    assert_eq!(report.counters.success, 1);
    assert_eq!(report.counters.skipped_empty_key, 1);
    assert_eq!(report.counters.skipped_duplicate, 1);
    assert!(report.counters.balanced());
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_localized_xlsx_headers_are_normalized() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());

    let path = xlsx_file(
        &dir,
        "scans.xlsx",
        &["条形码", "产品型号", "存放位置", "扫描人员", "扫描时间", "备注"],
        &[&["B001", "X200", "3F-货架2", "张三", "2024-05-01 09:30:00", ""]],
    );

    let report = run_import(Arc::clone(&store), &path, &apply())
        .await
        .unwrap();
    assert_eq!(report.counters.success, 1);

    let (records, total) = store.list(&Default::default()).await.unwrap();
    assert_eq!(total, 1);
    let record = &records[0];
    assert_eq!(record.barcode.as_deref(), Some("B001"));
    assert_eq!(record.model.as_deref(), Some("X200"));
    assert_eq!(record.location.as_deref(), Some("3F-货架2"));
    assert_eq!(record.scanner.as_deref(), Some("张三"));
    // scan time is opaque text, stored exactly as displayed
    assert_eq!(record.scan_time.as_deref(), Some("2024-05-01 09:30:00"));
}

#[tokio::test]
async fn test_missing_required_column_aborts_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());

    let path = csv_file(&dir, "in.csv", "位置,备注\nshelf,note\n");
    let err = run_import(Arc::clone(&store), &path, &apply())
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::MissingColumns(_)));
    assert_eq!(store.count().await.unwrap(), 0);
}

// ============================================================================
// Batch failure isolation
// ============================================================================

#[tokio::test]
async fn test_one_violating_row_in_a_large_batch_is_isolated() {
    // 1000 rows, the 500th data row violates a width limit: 999 succeed,
    // 1 error referencing spreadsheet row 501 (1-indexed plus header).
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());

    let mut content = String::from("条码,型号\n");
    for i in 0..1000 {
        if i == 499 {
            content.push_str(&format!("{},X\n", "B".repeat(limits::BARCODE + 1)));
        } else {
            content.push_str(&format!("K{i:04},X\n"));
        }
    }
    let path = csv_file(&dir, "big.csv", &content);

    let report = run_import(Arc::clone(&store), &path, &apply())
        .await
        .unwrap();

    assert_eq!(report.counters.input_rows, 1000);
    assert_eq!(report.counters.success, 999);
    assert_eq!(report.counters.errors, 1);
    assert_eq!(report.counters.error_samples.len(), 1);
    assert_eq!(report.counters.error_samples[0].row_no, 501);
    assert!(report.counters.balanced());
    assert_eq!(store.count().await.unwrap(), 999);
}

#[tokio::test]
async fn test_error_samples_are_capped_at_ten() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());

    let mut content = String::from("条码,型号\n");
    for i in 0..25 {
        content.push_str(&format!("{}{i:02},X\n", "B".repeat(limits::BARCODE)));
    }
    let path = csv_file(&dir, "bad.csv", &content);

    let report = run_import(Arc::clone(&store), &path, &apply())
        .await
        .unwrap();
    assert_eq!(report.counters.errors, 25);
    assert_eq!(report.counters.error_samples.len(), 10);
    assert!(report.counters.balanced());
}

// ============================================================================
// Modes
// ============================================================================

#[tokio::test]
async fn test_dry_run_is_the_default_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());

    let path = csv_file(&dir, "in.csv", "条码,型号\nA1,X\nB2,Y\n");
    let report = run_import(Arc::clone(&store), &path, &ImportOptions::default())
        .await
        .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.counters.success, 2);
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_replace_performs_a_full_reload() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    store
        .create(RecordDraft {
            barcode: "OLD".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    let path = csv_file(&dir, "in.csv", "条码,型号\nA1,X\n");
    let options = ImportOptions {
        apply: true,
        replace: true,
        ..Default::default()
    };
    let report = run_import(Arc::clone(&store), &path, &options)
        .await
        .unwrap();

    assert_eq!(report.counters.success, 1);
    assert_eq!(store.count().await.unwrap(), 1);
    let (records, _) = store.list(&Default::default()).await.unwrap();
    assert_eq!(records[0].barcode.as_deref(), Some("A1"));
}

#[tokio::test]
async fn test_parallel_import_matches_serial_results() {
    let dir = tempfile::tempdir().unwrap();

    let mut content = String::from("条码,型号\n");
    for i in 0..200 {
        content.push_str(&format!("K{i:03},X\n"));
    }
    // 10 duplicate rows at the end
    for i in 0..10 {
        content.push_str(&format!("K{i:03},X\n"));
    }
    let path = csv_file(&dir, "in.csv", &content);

    let serial_store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    let serial = run_import(
        Arc::clone(&serial_store),
        &path,
        &ImportOptions {
            apply: true,
            workers: Some(1),
            batch_size: 50,
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let parallel_store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    let parallel = run_import(
        Arc::clone(&parallel_store),
        &path,
        &ImportOptions {
            apply: true,
            workers: Some(4),
            batch_size: 50,
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(serial.counters.success, 200);
    assert_eq!(parallel.counters.success, 200);
    assert_eq!(serial.counters.skipped_duplicate, 10);
    assert_eq!(parallel.counters.skipped_duplicate, 10);
    assert_eq!(
        serial_store.count().await.unwrap(),
        parallel_store.count().await.unwrap()
    );
}

#[tokio::test]
async fn test_empty_input_produces_a_zeroed_report() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());

    let path = csv_file(&dir, "empty.csv", "条码,型号\n");
    let report = run_import(Arc::clone(&store), &path, &apply())
        .await
        .unwrap();

    assert_eq!(report.counters.input_rows, 0);
    assert_eq!(report.counters.success, 0);
    assert_eq!(report.throughput(), 0.0);
    assert!(report.counters.balanced());
}
