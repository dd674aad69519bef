//! Canonical scan-record domain types
//!
//! One record per barcode scan. The `barcode` column is the natural key used
//! to identify the same physical item across independent data loads, but the
//! store does NOT enforce it unique: historical loads produced duplicates and
//! every consumer has to tolerate them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single barcode scan row, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    /// Store-assigned internal id. Distinct from the natural key.
    pub id: i64,

    /// Natural key. May be duplicated across rows; may be absent on rows
    /// written by older paths (tolerated on read, never written by ingestion).
    pub barcode: Option<String>,

    pub model: Option<String>,
    pub location: Option<String>,
    pub scanner: Option<String>,

    /// Opaque pass-through string. Source spreadsheets disagree on its
    /// format, so it is never parsed or reformatted.
    pub scan_time: Option<String>,

    pub remarks: Option<String>,

    // Enrichment fields, filled by the update flow.
    pub user: Option<String>,
    pub asset_type: Option<String>,

    // Operator-edited processing state.
    /// `Some(true)` = completed, `Some(false)` = in progress. `None` only
    /// appears in legacy rows and is rendered as a third "unprocessed" label;
    /// no write path produces it.
    pub result: Option<bool>,
    pub expected_time: Option<DateTime<Utc>>,
    pub result_remarks: Option<String>,

    /// Set once at creation, immutable afterwards.
    pub created_at: DateTime<Utc>,
    /// Refreshed by the store on every mutation.
    pub updated_at: DateTime<Utc>,
}

impl ScanRecord {
    /// The trimmed natural key, if the row has a usable one.
    pub fn key(&self) -> Option<&str> {
        match self.barcode {
            Some(ref b) => {
                let trimmed = b.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed)
                }
            },
            None => None,
        }
    }
}

/// Insertable subset of [`ScanRecord`]: everything the ingestion path is
/// allowed to set on a new row. Ids and timestamps are store-assigned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordDraft {
    pub barcode: String,
    pub model: Option<String>,
    pub location: Option<String>,
    pub scanner: Option<String>,
    pub scan_time: Option<String>,
    pub remarks: Option<String>,
    pub user: Option<String>,
    pub asset_type: Option<String>,
}

/// Field-level update produced by the enrichment flow. Only these three
/// fields may be touched when reconciling against an asset spreadsheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentDelta {
    pub id: i64,
    pub user: Option<String>,
    pub model: Option<String>,
    pub asset_type: Option<String>,
}

/// Render the processing state the way operators see it in exports.
pub fn result_label(result: Option<bool>) -> &'static str {
    match result {
        Some(true) => "已完成",
        Some(false) => "处理中",
        None => "未处理",
    }
}

/// Fixed timestamp rendering for spreadsheet export.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn key_trims_and_rejects_empty() {
        let mut record = ScanRecord {
            id: 1,
            barcode: Some("  A100 ".to_string()),
            model: None,
            location: None,
            scanner: None,
            scan_time: None,
            remarks: None,
            user: None,
            asset_type: None,
            result: Some(false),
            expected_time: None,
            result_remarks: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(record.key(), Some("A100"));

        record.barcode = Some("   ".to_string());
        assert_eq!(record.key(), None);

        record.barcode = None;
        assert_eq!(record.key(), None);
    }

    #[test]
    fn result_labels_cover_all_three_states() {
        assert_eq!(result_label(Some(true)), "已完成");
        assert_eq!(result_label(Some(false)), "处理中");
        assert_eq!(result_label(None), "未处理");
    }

    #[test]
    fn timestamp_format_is_fixed() {
        let ts = Utc.with_ymd_and_hms(2025, 11, 11, 9, 30, 5).unwrap();
        assert_eq!(format_timestamp(ts), "2025-11-11 09:30:05");
    }
}
