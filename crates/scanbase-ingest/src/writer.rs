//! Batch writer
//!
//! Writes accepted rows through the store in fixed-size groups. A grouped
//! store operation is all-or-nothing, so one bad row sinks its whole group;
//! the writer then replays that group one row at a time, which isolates the
//! offenders and salvages every clean row. Row errors land in the run
//! counters with their spreadsheet row number, never as a run failure.

use tracing::{debug, warn};

use scanbase_common::types::EnrichmentDelta;

use crate::report::RunCounters;
use crate::store::RecordStore;
use crate::validate::ImportRow;

/// Group size used when the caller does not pick one.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// One enrichment write, tagged with its source row for error reporting.
#[derive(Debug, Clone)]
pub struct EnrichWrite {
    pub row_no: usize,
    pub barcode: String,
    pub delta: EnrichmentDelta,
}

pub struct BatchWriter<'a> {
    store: &'a dyn RecordStore,
    batch_size: usize,
}

impl<'a> BatchWriter<'a> {
    pub fn new(store: &'a dyn RecordStore, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
        }
    }

    /// Insert import rows group by group, falling back to row-at-a-time
    /// whenever a group fails.
    pub async fn write_imports(&self, rows: &[ImportRow], counters: &mut RunCounters) {
        for group in rows.chunks(self.batch_size) {
            let drafts: Vec<_> = group.iter().map(|row| row.draft.clone()).collect();
            match self.store.batch_create(&drafts).await {
                Ok(ids) => {
                    debug!(rows = ids.len(), "group inserted");
                    counters.success += ids.len() as u64;
                },
                Err(err) => {
                    warn!(rows = group.len(), %err, "group insert failed, replaying row by row");
                    for row in group {
                        match self.store.create(row.draft.clone()).await {
                            Ok(_) => counters.success += 1,
                            Err(err) => counters.note_error(
                                row.row_no,
                                &row.draft.barcode,
                                err.to_string(),
                            ),
                        }
                    }
                },
            }
        }
    }

    /// Apply enrichment deltas group by group with the same fallback.
    pub async fn write_enrichments(&self, writes: &[EnrichWrite], counters: &mut RunCounters) {
        for group in writes.chunks(self.batch_size) {
            let deltas: Vec<_> = group.iter().map(|w| w.delta.clone()).collect();
            match self.store.batch_enrich(&deltas).await {
                Ok(()) => {
                    debug!(rows = group.len(), "group enriched");
                    counters.success += group.len() as u64;
                },
                Err(err) => {
                    warn!(rows = group.len(), %err, "group enrich failed, replaying row by row");
                    for write in group {
                        match self.store.apply_enrichment(&write.delta).await {
                            Ok(()) => counters.success += 1,
                            Err(err) => counters.note_error(
                                write.row_no,
                                &write.barcode,
                                err.to_string(),
                            ),
                        }
                    }
                },
            }
        }
    }
}
