//! Run reporter
//!
//! Counters for a single import or enrichment run. The one invariant that
//! matters: every input row is accounted for exactly once, so
//! `success + skipped + errors == input_rows` always holds in a finished
//! report. Workers keep their own [`RunCounters`] and merge them at join
//! time, so no counter is shared across threads.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

/// At most this many row errors are kept verbatim; the rest only count.
pub const MAX_ERROR_SAMPLES: usize = 10;

/// One row that could not be written, identified by its spreadsheet row
/// number (header row is row 1).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RowError {
    pub row_no: usize,
    pub barcode: String,
    pub message: String,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {} ({}): {}", self.row_no, self.barcode, self.message)
    }
}

/// Additive per-run counters. Mergeable, so each worker owns one.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunCounters {
    pub input_rows: u64,
    pub success: u64,
    pub skipped_empty_key: u64,
    pub skipped_duplicate: u64,
    pub skipped_not_found: u64,
    pub errors: u64,
    /// First few row errors, capped at [`MAX_ERROR_SAMPLES`].
    pub error_samples: Vec<RowError>,
}

impl RunCounters {
    pub fn skipped(&self) -> u64 {
        self.skipped_empty_key + self.skipped_duplicate + self.skipped_not_found
    }

    /// Record a row error, keeping the sample only while the cap allows.
    pub fn note_error(&mut self, row_no: usize, barcode: &str, message: String) {
        self.errors += 1;
        if self.error_samples.len() < MAX_ERROR_SAMPLES {
            self.error_samples.push(RowError {
                row_no,
                barcode: barcode.to_string(),
                message,
            });
        }
    }

    /// Fold another worker's counters into this one. Samples keep arriving
    /// in merge order until the cap is hit.
    pub fn merge(&mut self, other: RunCounters) {
        self.input_rows += other.input_rows;
        self.success += other.success;
        self.skipped_empty_key += other.skipped_empty_key;
        self.skipped_duplicate += other.skipped_duplicate;
        self.skipped_not_found += other.skipped_not_found;
        self.errors += other.errors;
        for sample in other.error_samples {
            if self.error_samples.len() >= MAX_ERROR_SAMPLES {
                break;
            }
            self.error_samples.push(sample);
        }
    }

    /// Whether every input row has been accounted for.
    pub fn balanced(&self) -> bool {
        self.success + self.skipped() + self.errors == self.input_rows
    }
}

/// Final report of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub counters: RunCounters,
    pub elapsed: Duration,
    pub dry_run: bool,
}

impl RunReport {
    pub fn new(counters: RunCounters, elapsed: Duration, dry_run: bool) -> Self {
        Self {
            counters,
            elapsed,
            dry_run,
        }
    }

    /// Rows per second over the whole run. An empty or instant run reports 0
    /// rather than dividing by zero.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 || self.counters.input_rows == 0 {
            0.0
        } else {
            self.counters.input_rows as f64 / secs
        }
    }

    /// Emit the run summary through the log pipeline.
    pub fn log_summary(&self, flow: &str) {
        let c = &self.counters;
        info!(
            flow,
            dry_run = self.dry_run,
            input_rows = c.input_rows,
            success = c.success,
            skipped_empty_key = c.skipped_empty_key,
            skipped_duplicate = c.skipped_duplicate,
            skipped_not_found = c.skipped_not_found,
            errors = c.errors,
            elapsed_ms = self.elapsed.as_millis() as u64,
            throughput = format!("{:.1} rows/s", self.throughput()),
            "run finished"
        );
        for sample in &c.error_samples {
            warn!(flow, row = sample.row_no, barcode = %sample.barcode, "{}", sample.message);
        }
        if c.errors as usize > c.error_samples.len() {
            warn!(
                flow,
                omitted = c.errors as usize - c.error_samples.len(),
                "further row errors omitted"
            );
        }
        if !c.balanced() {
            warn!(
                flow,
                input_rows = c.input_rows,
                accounted = c.success + c.skipped() + c.errors,
                "counter mismatch, some rows are unaccounted for"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_balance_after_a_mixed_run() {
        let mut counters = RunCounters {
            input_rows: 5,
            success: 2,
            skipped_empty_key: 1,
            skipped_duplicate: 1,
            ..Default::default()
        };
        counters.note_error(4, "A1", "too wide".to_string());
        assert!(counters.balanced());
        assert_eq!(counters.skipped(), 2);
    }

    #[test]
    fn error_samples_are_capped_but_counts_are_not() {
        let mut counters = RunCounters::default();
        for i in 0..25 {
            counters.note_error(i + 2, "X", format!("boom {i}"));
        }
        assert_eq!(counters.errors, 25);
        assert_eq!(counters.error_samples.len(), MAX_ERROR_SAMPLES);
        assert_eq!(counters.error_samples[0].row_no, 2);
    }

    #[test]
    fn merge_adds_counts_and_respects_the_sample_cap() {
        let mut left = RunCounters {
            input_rows: 10,
            success: 8,
            ..Default::default()
        };
        for i in 0..2 {
            left.note_error(i + 2, "L", "left".to_string());
        }

        let mut right = RunCounters {
            input_rows: 20,
            success: 5,
            skipped_duplicate: 3,
            ..Default::default()
        };
        for i in 0..12 {
            right.note_error(i + 2, "R", "right".to_string());
        }

        left.merge(right);
        assert_eq!(left.input_rows, 30);
        assert_eq!(left.success, 13);
        assert_eq!(left.errors, 14);
        assert_eq!(left.error_samples.len(), MAX_ERROR_SAMPLES);
    }

    #[test]
    fn throughput_is_zero_for_empty_or_instant_runs() {
        let report = RunReport::new(RunCounters::default(), Duration::from_secs(1), true);
        assert_eq!(report.throughput(), 0.0);

        let counters = RunCounters {
            input_rows: 100,
            success: 100,
            ..Default::default()
        };
        let report = RunReport::new(counters.clone(), Duration::ZERO, false);
        assert_eq!(report.throughput(), 0.0);

        let report = RunReport::new(counters, Duration::from_secs(2), false);
        assert!((report.throughput() - 50.0).abs() < f64::EPSILON);
    }
}
