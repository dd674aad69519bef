//! Reconciliation by natural key
//!
//! Decides, for each validated row, whether it is genuinely new or collides
//! with something already stored. The store is consulted exactly once per
//! run: one batched key fetch, never a per-row existence probe.
//!
//! Duplicates inside the input batch count too: once a key has been accepted
//! as new, later rows carrying the same key are skipped like store
//! duplicates.

use std::collections::{HashMap, HashSet};

use crate::store::{RecordStore, StoreError};
use crate::validate::ImportRow;

/// Import rows split into genuinely-new and duplicate-skipped.
#[derive(Debug)]
pub struct Partitioned {
    pub fresh: Vec<ImportRow>,
    pub skipped_duplicate: u64,
}

/// The set of barcodes already present in the store, restricted to the keys
/// the current batch cares about. One store round-trip.
pub async fn existing_keys(
    store: &dyn RecordStore,
    keys: &[String],
) -> Result<HashSet<String>, StoreError> {
    let mut wanted: Vec<String> = keys.to_vec();
    wanted.sort_unstable();
    wanted.dedup();

    let records = store.fetch_by_barcodes(&wanted).await?;
    Ok(records
        .iter()
        .filter_map(|r| r.key().map(str::to_string))
        .collect())
}

/// Barcode -> record id index for enrichment lookups, restricted to the keys
/// of the current batch. Keys mapping to several records resolve to the
/// lowest id, so repeated runs hit the same row.
pub async fn key_index(
    store: &dyn RecordStore,
    keys: &[String],
) -> Result<HashMap<String, i64>, StoreError> {
    let mut wanted: Vec<String> = keys.to_vec();
    wanted.sort_unstable();
    wanted.dedup();

    let records = store.fetch_by_barcodes(&wanted).await?;
    let mut index: HashMap<String, i64> = HashMap::new();
    for record in &records {
        if let Some(key) = record.key() {
            index
                .entry(key.to_string())
                .and_modify(|id| *id = (*id).min(record.id))
                .or_insert(record.id);
        }
    }
    Ok(index)
}

/// Partition validated import rows against the stored key set. Keys seen
/// earlier in the same batch count as duplicates just like stored ones.
pub fn partition_import(rows: Vec<ImportRow>, existing: &HashSet<String>) -> Partitioned {
    let mut seen: HashSet<String> = HashSet::new();
    let mut fresh = Vec::with_capacity(rows.len());
    let mut skipped_duplicate = 0u64;

    for row in rows {
        if existing.contains(&row.draft.barcode) || !seen.insert(row.draft.barcode.clone()) {
            skipped_duplicate += 1;
        } else {
            fresh.push(row);
        }
    }

    Partitioned {
        fresh,
        skipped_duplicate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, RecordStore};
    use scanbase_common::types::RecordDraft;

    fn row(row_no: usize, barcode: &str) -> ImportRow {
        ImportRow {
            row_no,
            draft: RecordDraft {
                barcode: barcode.to_string(),
                ..Default::default()
            },
        }
    }

    fn draft(barcode: &str) -> RecordDraft {
        RecordDraft {
            barcode: barcode.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn batch_internal_duplicates_are_skipped() {
        let rows = vec![row(2, "A1"), row(3, "A1"), row(4, "B2")];
        let partitioned = partition_import(rows, &HashSet::new());
        assert_eq!(partitioned.fresh.len(), 2);
        assert_eq!(partitioned.skipped_duplicate, 1);
        assert_eq!(partitioned.fresh[0].draft.barcode, "A1");
        assert_eq!(partitioned.fresh[1].draft.barcode, "B2");
    }

    #[test]
    fn stored_keys_are_skipped() {
        let existing: HashSet<String> = ["A1".to_string()].into();
        let rows = vec![row(2, "A1"), row(3, "B2")];
        let partitioned = partition_import(rows, &existing);
        assert_eq!(partitioned.fresh.len(), 1);
        assert_eq!(partitioned.fresh[0].draft.barcode, "B2");
        assert_eq!(partitioned.skipped_duplicate, 1);
    }

    #[tokio::test]
    async fn key_index_breaks_ties_toward_the_lowest_id() {
        let store = MemoryStore::new();
        let first = store.create(draft("A1")).await.unwrap();
        store.create(draft("A1")).await.unwrap();
        store.create(draft("B2")).await.unwrap();

        let index = key_index(&store, &["A1".to_string(), "A1".to_string()])
            .await
            .unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("A1"), Some(&first));
    }

    #[tokio::test]
    async fn existing_keys_only_reports_requested_keys() {
        let store = MemoryStore::new();
        store.create(draft("A1")).await.unwrap();
        store.create(draft("C3")).await.unwrap();

        let keys = existing_keys(&store, &["A1".to_string(), "B2".to_string()])
            .await
            .unwrap();
        assert!(keys.contains("A1"));
        assert!(!keys.contains("B2"));
        assert!(!keys.contains("C3"));
    }
}
