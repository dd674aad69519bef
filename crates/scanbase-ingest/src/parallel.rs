//! Parallel orchestrator
//!
//! Two regimes, matching the two flows:
//!
//! - Import splits the accepted rows into contiguous, non-overlapping chunks
//!   and gives each worker its own counters and its own writer over the
//!   shared store handle. Nothing is shared between workers while they run;
//!   results are merged by summation at join time. A worker that dies takes
//!   only its own chunk down, as an all-error outcome.
//! - Enrichment resolves rows purely against a prefetched key index and
//!   funnels the resulting deltas through one shared buffer. The worker that
//!   fills the buffer to the flush threshold swaps it out under the lock and
//!   writes the swapped batch *after* releasing the lock, so the store call
//!   never blocks the other workers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, error};

use scanbase_common::types::EnrichmentDelta;

use crate::report::{RowError, RunCounters, MAX_ERROR_SAMPLES};
use crate::store::RecordStore;
use crate::validate::{EnrichRow, ImportRow};
use crate::writer::{BatchWriter, EnrichWrite};

/// Hard ceiling on worker count, whatever the host offers.
pub const MAX_WORKERS: usize = 8;

/// Buffered enrichment deltas are flushed once this many have accumulated.
pub const ENRICH_FLUSH_THRESHOLD: usize = 100;

/// Resolve the worker count: the explicit request if given, otherwise the
/// host parallelism, capped at [`MAX_WORKERS`] and at the number of rows.
pub fn effective_workers(requested: Option<usize>, rows: usize) -> usize {
    let host = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    requested
        .unwrap_or(host)
        .min(MAX_WORKERS)
        .min(rows.max(1))
        .max(1)
}

/// Split rows into `workers` contiguous chunks of near-equal size.
fn chunk_rows<T>(mut rows: Vec<T>, workers: usize) -> Vec<Vec<T>> {
    let total = rows.len();
    if total == 0 {
        return Vec::new();
    }
    let per_chunk = total.div_ceil(workers);
    let mut chunks = Vec::with_capacity(workers);
    while !rows.is_empty() {
        let rest = rows.split_off(rows.len().min(per_chunk));
        chunks.push(rows);
        rows = rest;
    }
    chunks
}

/// Insert accepted import rows across a worker pool. Returns the merged
/// write counters (success and errors only; the caller owns the input and
/// skip accounting).
pub async fn import_chunks(
    store: Arc<dyn RecordStore>,
    rows: Vec<ImportRow>,
    workers: usize,
    batch_size: usize,
) -> RunCounters {
    let chunks = chunk_rows(rows, workers.max(1));
    debug!(workers = chunks.len(), batch_size, "starting import workers");

    let mut handles = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        // kept outside the task so a dead worker can still be accounted for
        let meta: Vec<(usize, String)> = chunk
            .iter()
            .map(|row| (row.row_no, row.draft.barcode.clone()))
            .collect();
        let store = Arc::clone(&store);
        let handle = tokio::spawn(async move {
            let writer = BatchWriter::new(store.as_ref(), batch_size);
            let mut counters = RunCounters::default();
            writer.write_imports(&chunk, &mut counters).await;
            counters
        });
        handles.push((handle, meta));
    }

    let mut merged = RunCounters::default();
    for (handle, meta) in handles {
        match handle.await {
            Ok(counters) => merged.merge(counters),
            Err(join_err) => {
                error!(%join_err, rows = meta.len(), "import worker died");
                for (row_no, barcode) in meta {
                    merged.note_error(row_no, &barcode, format!("worker failed: {join_err}"));
                }
            },
        }
    }
    merged
}

/// Shared state of the enrichment pool: the delta buffer plus the counters,
/// which are atomics because any worker may bump them at any time.
struct EnrichShared {
    store: Arc<dyn RecordStore>,
    buffer: Mutex<Vec<EnrichWrite>>,
    threshold: usize,
    success: AtomicU64,
    errors: AtomicU64,
    skipped_not_found: AtomicU64,
    samples: Mutex<Vec<RowError>>,
}

impl EnrichShared {
    fn new(store: Arc<dyn RecordStore>, threshold: usize) -> Self {
        Self {
            store,
            buffer: Mutex::new(Vec::with_capacity(threshold)),
            threshold: threshold.max(1),
            success: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            skipped_not_found: AtomicU64::new(0),
            samples: Mutex::new(Vec::new()),
        }
    }

    /// Push one delta. The pushing worker flushes if it crossed the
    /// threshold; the buffer is swapped out under the lock and written only
    /// after the lock is gone.
    async fn push(&self, write: EnrichWrite) {
        let full = {
            let mut buffer = match self.buffer.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            buffer.push(write);
            if buffer.len() >= self.threshold {
                Some(std::mem::take(&mut *buffer))
            } else {
                None
            }
        };
        if let Some(batch) = full {
            self.flush(batch).await;
        }
    }

    /// Drain whatever is left in the buffer. Called once after the pool has
    /// joined.
    async fn drain(&self) {
        let rest = {
            let mut buffer = match self.buffer.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            std::mem::take(&mut *buffer)
        };
        if !rest.is_empty() {
            self.flush(rest).await;
        }
    }

    /// Write one swapped-out batch, replaying row by row if the group fails.
    async fn flush(&self, batch: Vec<EnrichWrite>) {
        let deltas: Vec<EnrichmentDelta> = batch.iter().map(|w| w.delta.clone()).collect();
        match self.store.batch_enrich(&deltas).await {
            Ok(()) => {
                self.success.fetch_add(batch.len() as u64, Ordering::Relaxed);
            },
            Err(_) => {
                for write in batch {
                    match self.store.apply_enrichment(&write.delta).await {
                        Ok(()) => {
                            self.success.fetch_add(1, Ordering::Relaxed);
                        },
                        Err(err) => {
                            self.errors.fetch_add(1, Ordering::Relaxed);
                            if let Ok(mut samples) = self.samples.lock() {
                                if samples.len() < MAX_ERROR_SAMPLES {
                                    samples.push(RowError {
                                        row_no: write.row_no,
                                        barcode: write.barcode.clone(),
                                        message: err.to_string(),
                                    });
                                }
                            }
                        },
                    }
                }
            },
        }
    }

    fn into_counters(self) -> RunCounters {
        RunCounters {
            success: self.success.into_inner(),
            errors: self.errors.into_inner(),
            skipped_not_found: self.skipped_not_found.into_inner(),
            error_samples: self
                .samples
                .into_inner()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
            ..Default::default()
        }
    }
}

/// Resolve and apply enrichment rows across a worker pool. The key index
/// must already be prefetched; unresolvable keys count as not-found skips.
/// Returns the merged write counters (the caller owns the input and
/// empty-key accounting).
pub async fn enrich_stream(
    store: Arc<dyn RecordStore>,
    rows: Vec<EnrichRow>,
    index: HashMap<String, i64>,
    asset_type: Option<String>,
    workers: usize,
    flush_threshold: usize,
) -> RunCounters {
    let total_rows = rows.len() as u64;
    let shared = Arc::new(EnrichShared::new(store, flush_threshold));
    let index = Arc::new(index);
    let chunks = chunk_rows(rows, workers.max(1));
    debug!(
        workers = chunks.len(),
        flush_threshold, "starting enrichment workers"
    );

    let mut handles = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        // kept outside the task so a dead worker can still be accounted for
        let meta: Vec<(usize, String)> = chunk
            .iter()
            .map(|row| (row.row_no, row.barcode.clone()))
            .collect();
        let shared = Arc::clone(&shared);
        let index = Arc::clone(&index);
        let asset_type = asset_type.clone();
        let handle = tokio::spawn(async move {
            for row in chunk {
                match index.get(&row.barcode) {
                    Some(&id) => {
                        shared
                            .push(EnrichWrite {
                                row_no: row.row_no,
                                barcode: row.barcode,
                                delta: EnrichmentDelta {
                                    id,
                                    user: row.user,
                                    model: row.model,
                                    asset_type: asset_type.clone(),
                                },
                            })
                            .await;
                    },
                    None => {
                        shared.skipped_not_found.fetch_add(1, Ordering::Relaxed);
                    },
                }
            }
        });
        handles.push((handle, meta));
    }

    let mut dead_rows: Vec<(usize, String, String)> = Vec::new();
    for (handle, meta) in handles {
        if let Err(join_err) = handle.await {
            error!(%join_err, rows = meta.len(), "enrichment worker died");
            let message = format!("worker failed: {join_err}");
            dead_rows.extend(
                meta.into_iter()
                    .map(|(row_no, barcode)| (row_no, barcode, message.clone())),
            );
        }
    }

    // the final flush runs in its own task so a store panic surfaces as a
    // JoinError instead of tearing down the whole run
    let drain_shared = Arc::clone(&shared);
    if let Err(join_err) = tokio::spawn(async move { drain_shared.drain().await }).await {
        error!(%join_err, "final enrichment flush died");
    }

    let mut counters = match Arc::try_unwrap(shared) {
        Ok(shared) => shared.into_counters(),
        // unreachable once every worker has joined; return what we can read
        Err(shared) => RunCounters {
            success: shared.success.load(Ordering::Relaxed),
            errors: shared.errors.load(Ordering::Relaxed),
            skipped_not_found: shared.skipped_not_found.load(Ordering::Relaxed),
            error_samples: shared
                .samples
                .lock()
                .map(|s| s.clone())
                .unwrap_or_default(),
            ..Default::default()
        },
    };

    // A buffered row's outcome may be recorded by any worker, so a dead
    // chunk cannot be charged wholesale without double counting. Settle the
    // shortfall against the input count instead, sampling from the rows the
    // dead workers owned.
    let accounted = counters.success + counters.errors + counters.skipped_not_found;
    if accounted < total_rows {
        counters.errors += total_rows - accounted;
        for (row_no, barcode, message) in dead_rows {
            if counters.error_samples.len() >= MAX_ERROR_SAMPLES {
                break;
            }
            counters.error_samples.push(RowError {
                row_no,
                barcode,
                message,
            });
        }
    }
    counters
}
