//! Enrichment flow
//!
//! Update counterpart of the import flow: rows arrive keyed on the asset
//! number (the same physical identifier as the scanned barcode) and fill
//! `user`, `model` and optionally `asset_type` on records that already
//! exist. Keys with no stored record are skips, not errors; when a key
//! matches several stored records the lowest id wins, so repeated runs land
//! on the same row.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument};

use crate::error::ImportError;
use crate::parallel::{effective_workers, enrich_stream, ENRICH_FLUSH_THRESHOLD};
use crate::reconcile::key_index;
use crate::report::{RunCounters, RunReport};
use crate::schema::normalize_table;
use crate::store::RecordStore;
use crate::tabular::read_table;
use crate::validate::prepare_enrich;

#[derive(Debug, Clone)]
pub struct EnrichOptions {
    /// Write to the store. Off by default: a dry run resolves and reports.
    pub apply: bool,
    /// Worker count; defaults to host parallelism, capped.
    pub workers: Option<usize>,
    /// Buffered deltas per grouped store write.
    pub batch_size: usize,
    /// When set, stamp this asset type onto every enriched record.
    pub asset_type: Option<String>,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            apply: false,
            workers: None,
            batch_size: ENRICH_FLUSH_THRESHOLD,
            asset_type: None,
        }
    }
}

/// Run one enrichment over a spreadsheet or CSV file.
#[instrument(skip(store, options), fields(path = %path.display()))]
pub async fn run_enrich(
    store: Arc<dyn RecordStore>,
    path: &Path,
    options: &EnrichOptions,
) -> Result<RunReport, ImportError> {
    let started = Instant::now();

    let mut table =
        read_table(path).map_err(|err| ImportError::SourceUnavailable(err.to_string()))?;
    normalize_table(&mut table);

    let validated = prepare_enrich(&table)?;
    info!(
        input_rows = validated.input_rows,
        skipped_empty_key = validated.skipped_empty_key,
        "input validated"
    );

    let keys: Vec<String> = validated.rows.iter().map(|row| row.barcode.clone()).collect();
    let index = key_index(store.as_ref(), &keys).await?;
    info!(resolved_keys = index.len(), "key index prefetched");

    let mut counters = RunCounters {
        input_rows: validated.input_rows,
        skipped_empty_key: validated.skipped_empty_key,
        ..Default::default()
    };

    if options.apply {
        let workers = effective_workers(options.workers, validated.rows.len());
        let written = enrich_stream(
            Arc::clone(&store),
            validated.rows,
            index,
            options.asset_type.clone(),
            workers,
            options.batch_size,
        )
        .await;
        counters.merge(written);
    } else {
        for row in &validated.rows {
            if index.contains_key(&row.barcode) {
                counters.success += 1;
            } else {
                counters.skipped_not_found += 1;
            }
        }
        info!(
            would_update = counters.success,
            "dry run, nothing written"
        );
    }

    let report = RunReport::new(counters, started.elapsed(), !options.apply);
    report.log_summary("enrich");
    Ok(report)
}
