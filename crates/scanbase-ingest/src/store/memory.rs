//! In-memory record store
//!
//! Backs the test suite and `--dry-run` probes. Enforces the same
//! constraints as the Postgres store so batch-failure behavior can be
//! exercised without a database.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use scanbase_common::types::{EnrichmentDelta, RecordDraft, ScanRecord};

use super::{check_delta, check_draft, RecordQuery, RecordStore, RecordUpdate, StoreError};

#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<i64, ScanRecord>>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn insert_unchecked(
        &self,
        map: &mut BTreeMap<i64, ScanRecord>,
        draft: RecordDraft,
    ) -> i64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        map.insert(
            id,
            ScanRecord {
                id,
                barcode: Some(draft.barcode),
                model: draft.model,
                location: draft.location,
                scanner: draft.scanner,
                scan_time: draft.scan_time,
                remarks: draft.remarks,
                user: draft.user,
                asset_type: draft.asset_type,
                result: Some(false),
                expected_time: None,
                result_remarks: None,
                created_at: now,
                updated_at: now,
            },
        );
        id
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".into())
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    match haystack {
        Some(h) => h.to_lowercase().contains(&needle.to_lowercase()),
        None => false,
    }
}

fn matches(record: &ScanRecord, query: &RecordQuery) -> bool {
    if let Some(ref needle) = query.search {
        let hit = [
            record.barcode.as_deref(),
            record.model.as_deref(),
            record.location.as_deref(),
            record.scanner.as_deref(),
            record.scan_time.as_deref(),
            record.remarks.as_deref(),
            record.user.as_deref(),
            record.asset_type.as_deref(),
        ]
        .iter()
        .any(|field| contains_ci(*field, needle));
        if !hit {
            return false;
        }
    }

    let field_filters: [(&Option<String>, Option<&str>); 8] = [
        (&query.barcode, record.barcode.as_deref()),
        (&query.model, record.model.as_deref()),
        (&query.location, record.location.as_deref()),
        (&query.scanner, record.scanner.as_deref()),
        (&query.scan_time, record.scan_time.as_deref()),
        (&query.remarks, record.remarks.as_deref()),
        (&query.user, record.user.as_deref()),
        (&query.asset_type, record.asset_type.as_deref()),
    ];
    for (filter, value) in field_filters {
        if let Some(needle) = filter {
            if !contains_ci(value, needle) {
                return false;
            }
        }
    }

    if let Some(wanted) = query.result {
        if record.result != Some(wanted) {
            return false;
        }
    }
    true
}

fn sort_records(records: &mut [ScanRecord], field: &str, desc: bool) {
    records.sort_by(|a, b| {
        let ord = match field {
            "id" => a.id.cmp(&b.id),
            "barcode" => a.barcode.cmp(&b.barcode),
            "model" => a.model.cmp(&b.model),
            "location" => a.location.cmp(&b.location),
            "scanner" => a.scanner.cmp(&b.scanner),
            "scan_time" => a.scan_time.cmp(&b.scan_time),
            "user" => a.user.cmp(&b.user),
            "asset_type" => a.asset_type.cmp(&b.asset_type),
            "result" => a.result.cmp(&b.result),
            "updated_at" => a.updated_at.cmp(&b.updated_at),
            _ => a.created_at.cmp(&b.created_at),
        }
        // stable tie-break keeps pagination deterministic
        .then(a.id.cmp(&b.id));
        if desc {
            ord.reverse()
        } else {
            ord
        }
    });
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create(&self, draft: RecordDraft) -> Result<i64, StoreError> {
        check_draft(&draft)?;
        let mut map = self.records.write().map_err(poisoned)?;
        Ok(self.insert_unchecked(&mut map, draft))
    }

    async fn batch_create(&self, drafts: &[RecordDraft]) -> Result<Vec<i64>, StoreError> {
        // validate the whole group before touching the map: all-or-nothing
        for draft in drafts {
            check_draft(draft)?;
        }
        let mut map = self.records.write().map_err(poisoned)?;
        Ok(drafts
            .iter()
            .map(|draft| self.insert_unchecked(&mut map, draft.clone()))
            .collect())
    }

    async fn get(&self, id: i64) -> Result<Option<ScanRecord>, StoreError> {
        let map = self.records.read().map_err(poisoned)?;
        Ok(map.get(&id).cloned())
    }

    async fn update(&self, id: i64, update: RecordUpdate) -> Result<ScanRecord, StoreError> {
        let mut map = self.records.write().map_err(poisoned)?;
        let record = map.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        record.barcode = update.barcode;
        record.model = update.model;
        record.location = update.location;
        record.scanner = update.scanner;
        record.scan_time = update.scan_time;
        record.remarks = update.remarks;
        record.user = update.user;
        record.asset_type = update.asset_type;
        record.result = Some(update.result);
        record.expected_time = update.expected_time;
        record.result_remarks = update.result_remarks;
        record.updated_at = Utc::now().max(record.updated_at);
        Ok(record.clone())
    }

    async fn apply_enrichment(&self, delta: &EnrichmentDelta) -> Result<(), StoreError> {
        check_delta(delta)?;
        let mut map = self.records.write().map_err(poisoned)?;
        let record = map.get_mut(&delta.id).ok_or(StoreError::NotFound(delta.id))?;
        record.user = delta.user.clone();
        record.model = delta.model.clone();
        record.asset_type = delta.asset_type.clone();
        record.updated_at = Utc::now().max(record.updated_at);
        Ok(())
    }

    async fn batch_enrich(&self, deltas: &[EnrichmentDelta]) -> Result<(), StoreError> {
        for delta in deltas {
            check_delta(delta)?;
        }
        {
            let map = self.records.read().map_err(poisoned)?;
            if let Some(missing) = deltas.iter().find(|d| !map.contains_key(&d.id)) {
                return Err(StoreError::NotFound(missing.id));
            }
        }
        for delta in deltas {
            self.apply_enrichment(delta).await?;
        }
        Ok(())
    }

    async fn fetch_by_barcodes(&self, barcodes: &[String]) -> Result<Vec<ScanRecord>, StoreError> {
        let map = self.records.read().map_err(poisoned)?;
        let keys: std::collections::HashSet<&str> =
            barcodes.iter().map(|b| b.as_str()).collect();
        Ok(map
            .values()
            .filter(|r| r.key().is_some_and(|k| keys.contains(k)))
            .cloned()
            .collect())
    }

    async fn fetch_all(&self) -> Result<Vec<ScanRecord>, StoreError> {
        let map = self.records.read().map_err(poisoned)?;
        Ok(map.values().cloned().collect())
    }

    async fn list(&self, query: &RecordQuery) -> Result<(Vec<ScanRecord>, i64), StoreError> {
        let map = self.records.read().map_err(poisoned)?;
        let mut hits: Vec<ScanRecord> = map
            .values()
            .filter(|r| matches(r, query))
            .cloned()
            .collect();
        let total = hits.len() as i64;

        let (field, desc) = query.order();
        sort_records(&mut hits, field, desc);

        let offset = query.offset.unwrap_or(0).max(0) as usize;
        let mut sliced: Vec<ScanRecord> = hits.into_iter().skip(offset).collect();
        if let Some(limit) = query.limit {
            sliced.truncate(limit.max(0) as usize);
        }
        Ok((sliced, total))
    }

    async fn count(&self) -> Result<i64, StoreError> {
        let map = self.records.read().map_err(poisoned)?;
        Ok(map.len() as i64)
    }

    async fn delete_by_ids(&self, ids: &[i64]) -> Result<u64, StoreError> {
        let mut map = self.records.write().map_err(poisoned)?;
        let mut deleted = 0;
        for id in ids {
            if map.remove(id).is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn truncate(&self) -> Result<u64, StoreError> {
        let mut map = self.records.write().map_err(poisoned)?;
        let count = map.len() as u64;
        map.clear();
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(barcode: &str, model: &str) -> RecordDraft {
        RecordDraft {
            barcode: barcode.to_string(),
            model: Some(model.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_assigns_increasing_ids_and_defaults() {
        let store = MemoryStore::new();
        let a = store.create(draft("A1", "X")).await.unwrap();
        let b = store.create(draft("A2", "Y")).await.unwrap();
        assert!(b > a);

        let record = store.get(a).await.unwrap().unwrap();
        assert_eq!(record.barcode.as_deref(), Some("A1"));
        assert_eq!(record.result, Some(false));
        assert_eq!(record.created_at, record.updated_at);
    }

    #[tokio::test]
    async fn batch_create_is_all_or_nothing() {
        let store = MemoryStore::new();
        let bad = vec![draft("A1", "X"), draft(&"B".repeat(200), "Y")];
        assert!(store.batch_create(&bad).await.is_err());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_barcodes_are_tolerated() {
        let store = MemoryStore::new();
        store.create(draft("A1", "X")).await.unwrap();
        store.create(draft("A1", "Z")).await.unwrap();
        let hits = store.fetch_by_barcodes(&["A1".to_string()]).await.unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn fetch_by_barcodes_matches_on_the_trimmed_key() {
        let store = MemoryStore::new();
        store.create(draft(" A1 ", "X")).await.unwrap();
        let hits = store.fetch_by_barcodes(&["A1".to_string()]).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].barcode.as_deref(), Some(" A1 "));
    }

    #[tokio::test]
    async fn update_preserves_created_at_and_bumps_updated_at() {
        let store = MemoryStore::new();
        let id = store.create(draft("A1", "X")).await.unwrap();
        let before = store.get(id).await.unwrap().unwrap();

        let updated = store
            .update(
                id,
                RecordUpdate {
                    barcode: Some("A1".to_string()),
                    model: Some("X2".to_string()),
                    result: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.created_at, before.created_at);
        assert!(updated.updated_at >= before.updated_at);
        assert_eq!(updated.result, Some(true));
        assert_eq!(updated.model.as_deref(), Some("X2"));
    }

    #[tokio::test]
    async fn list_filters_sorts_and_paginates() {
        let store = MemoryStore::new();
        store.create(draft("A1", "laptop")).await.unwrap();
        store.create(draft("B2", "Laptop Pro")).await.unwrap();
        store.create(draft("C3", "monitor")).await.unwrap();

        let (hits, total) = store
            .list(&RecordQuery {
                model: Some("laptop".to_string()),
                ordering: Some("barcode".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(hits[0].barcode.as_deref(), Some("A1"));

        let (page, total) = store
            .list(&RecordQuery {
                ordering: Some("barcode".to_string()),
                limit: Some(1),
                offset: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].barcode.as_deref(), Some("B2"));
    }

    #[tokio::test]
    async fn delete_and_truncate_report_counts() {
        let store = MemoryStore::new();
        let a = store.create(draft("A1", "X")).await.unwrap();
        store.create(draft("B2", "Y")).await.unwrap();

        assert_eq!(store.delete_by_ids(&[a, 999]).await.unwrap(), 1);
        assert_eq!(store.truncate().await.unwrap(), 1);
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
