//! Import flow
//!
//! reading -> normalizing -> validating -> reconciling -> writing ->
//! reporting. Anything that fails during reading or validation aborts before
//! a single store mutation; once writing starts, row failures are report
//! data, not errors.
//!
//! The default is a dry run: rows are classified and the report produced,
//! but nothing is written. `apply` turns the writes on.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument};

use crate::error::ImportError;
use crate::parallel::{effective_workers, import_chunks};
use crate::reconcile::{existing_keys, partition_import};
use crate::report::{RunCounters, RunReport};
use crate::schema::normalize_table;
use crate::store::RecordStore;
use crate::tabular::read_table;
use crate::validate::prepare_import;
use crate::writer::DEFAULT_BATCH_SIZE;

#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Write to the store. Off by default: a dry run classifies and reports.
    pub apply: bool,
    /// Empty the store first (full reload). Classification then treats every
    /// key as new, in dry runs too.
    pub replace: bool,
    /// Worker count; defaults to host parallelism, capped.
    pub workers: Option<usize>,
    /// Rows per grouped store write.
    pub batch_size: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            apply: false,
            replace: false,
            workers: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Run one import over a spreadsheet or CSV file.
#[instrument(skip(store, options), fields(path = %path.display()))]
pub async fn run_import(
    store: Arc<dyn RecordStore>,
    path: &Path,
    options: &ImportOptions,
) -> Result<RunReport, ImportError> {
    let started = Instant::now();

    let mut table =
        read_table(path).map_err(|err| ImportError::SourceUnavailable(err.to_string()))?;
    normalize_table(&mut table);

    let validated = prepare_import(&table)?;
    info!(
        input_rows = validated.input_rows,
        skipped_empty_key = validated.skipped_empty_key,
        "input validated"
    );

    let existing = if options.replace {
        // the store is (or will be) empty, so no key can collide
        Default::default()
    } else {
        let keys: Vec<String> = validated
            .rows
            .iter()
            .map(|row| row.draft.barcode.clone())
            .collect();
        existing_keys(store.as_ref(), &keys).await?
    };

    let mut counters = RunCounters {
        input_rows: validated.input_rows,
        skipped_empty_key: validated.skipped_empty_key,
        ..Default::default()
    };

    let partitioned = partition_import(validated.rows, &existing);
    counters.skipped_duplicate = partitioned.skipped_duplicate;

    if options.apply {
        if options.replace {
            let removed = store.truncate().await?;
            info!(removed, "store truncated for full reload");
        }
        let workers = effective_workers(options.workers, partitioned.fresh.len());
        let written = import_chunks(
            Arc::clone(&store),
            partitioned.fresh,
            workers,
            options.batch_size,
        )
        .await;
        counters.merge(written);
    } else {
        // dry run: everything that would be written counts as success
        counters.success = partitioned.fresh.len() as u64;
        info!(
            would_insert = counters.success,
            "dry run, nothing written"
        );
    }

    let report = RunReport::new(counters, started.elapsed(), !options.apply);
    report.log_summary("import");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, RecordStore};
    use std::io::Write;

    fn csv_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[tokio::test]
    async fn dry_run_reports_but_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = csv_file(&dir, "in.csv", "条码,型号\nA1,X\nA1,X\n,Y\n");
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());

        let report = run_import(Arc::clone(&store), &path, &ImportOptions::default())
            .await
            .unwrap();

        assert!(report.dry_run);
        assert_eq!(report.counters.input_rows, 3);
        assert_eq!(report.counters.success, 1);
        assert_eq!(report.counters.skipped_duplicate, 1);
        assert_eq!(report.counters.skipped_empty_key, 1);
        assert!(report.counters.balanced());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn apply_writes_and_skips_stored_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let path = csv_file(&dir, "in.csv", "条码,型号\nA1,X\nB2,Y\n");
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());

        let options = ImportOptions {
            apply: true,
            ..Default::default()
        };
        let report = run_import(Arc::clone(&store), &path, &options).await.unwrap();
        assert_eq!(report.counters.success, 2);
        assert_eq!(store.count().await.unwrap(), 2);

        // second run over the same file: everything already exists
        let report = run_import(Arc::clone(&store), &path, &options).await.unwrap();
        assert_eq!(report.counters.success, 0);
        assert_eq!(report.counters.skipped_duplicate, 2);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn replace_truncates_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = csv_file(&dir, "in.csv", "条码,型号\nA1,X\n");
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());

        let options = ImportOptions {
            apply: true,
            ..Default::default()
        };
        run_import(Arc::clone(&store), &path, &options).await.unwrap();

        let options = ImportOptions {
            apply: true,
            replace: true,
            ..Default::default()
        };
        let report = run_import(Arc::clone(&store), &path, &options).await.unwrap();
        assert_eq!(report.counters.success, 1);
        assert_eq!(report.counters.skipped_duplicate, 0);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn missing_file_aborts_without_a_report() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        let err = run_import(
            store,
            Path::new("/nonexistent/input.xlsx"),
            &ImportOptions::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ImportError::SourceUnavailable(_)));
    }
}
