//! Postgres-backed record store (feature `database`)
//!
//! Runtime-checked sqlx queries against a single `scan_records` table. The
//! `barcode` column is indexed but NOT unique; see the module docs in
//! [`super`] for how duplicates are handled.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use scanbase_common::types::{EnrichmentDelta, RecordDraft, ScanRecord};

use super::{check_delta, check_draft, RecordQuery, RecordStore, RecordUpdate, StoreError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS scan_records (
    id             BIGSERIAL PRIMARY KEY,
    barcode        VARCHAR(100),
    model          VARCHAR(200),
    location       VARCHAR(500),
    scanner        VARCHAR(100),
    scan_time      VARCHAR(100),
    remarks        TEXT,
    "user"         VARCHAR(100),
    asset_type     VARCHAR(100),
    result         BOOLEAN DEFAULT FALSE,
    expected_time  TIMESTAMPTZ,
    result_remarks VARCHAR(100),
    created_at     TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at     TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE INDEX IF NOT EXISTS idx_scan_records_barcode ON scan_records (barcode);
"#;

const SELECT_COLUMNS: &str = r#"id, barcode, model, location, scanner, scan_time, remarks,
    "user", asset_type, result, expected_time, result_remarks, created_at, updated_at"#;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the table and index if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for statement in SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

fn row_to_record(row: &PgRow) -> Result<ScanRecord, sqlx::Error> {
    Ok(ScanRecord {
        id: row.try_get("id")?,
        barcode: row.try_get("barcode")?,
        model: row.try_get("model")?,
        location: row.try_get("location")?,
        scanner: row.try_get("scanner")?,
        scan_time: row.try_get("scan_time")?,
        remarks: row.try_get("remarks")?,
        user: row.try_get("user")?,
        asset_type: row.try_get("asset_type")?,
        result: row.try_get("result")?,
        expected_time: row.try_get("expected_time")?,
        result_remarks: row.try_get("result_remarks")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Escape LIKE metacharacters in a user-supplied needle.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Orderable column to SQL expression ("user" is a reserved word).
fn order_expr(field: &str) -> &'static str {
    match field {
        "id" => "id",
        "barcode" => "barcode",
        "model" => "model",
        "location" => "location",
        "scanner" => "scanner",
        "scan_time" => "scan_time",
        "user" => "\"user\"",
        "asset_type" => "asset_type",
        "result" => "result",
        "updated_at" => "updated_at",
        _ => "created_at",
    }
}

/// Append the WHERE clause for a [`RecordQuery`] to a builder that already
/// holds its SELECT.
fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &RecordQuery) {
    builder.push(" WHERE TRUE");

    if let Some(ref needle) = query.search {
        let pattern = like_pattern(needle);
        builder.push(" AND (");
        let mut first = true;
        for column in [
            "barcode",
            "model",
            "location",
            "scanner",
            "scan_time",
            "remarks",
            "\"user\"",
            "asset_type",
        ] {
            if !first {
                builder.push(" OR ");
            }
            first = false;
            builder.push(column);
            builder.push(" ILIKE ");
            builder.push_bind(pattern.clone());
        }
        builder.push(")");
    }

    let field_filters: [(&str, &Option<String>); 8] = [
        ("barcode", &query.barcode),
        ("model", &query.model),
        ("location", &query.location),
        ("scanner", &query.scanner),
        ("scan_time", &query.scan_time),
        ("remarks", &query.remarks),
        ("\"user\"", &query.user),
        ("asset_type", &query.asset_type),
    ];
    for (column, filter) in field_filters {
        if let Some(needle) = filter {
            builder.push(" AND ");
            builder.push(column);
            builder.push(" ILIKE ");
            builder.push_bind(like_pattern(needle));
        }
    }

    if let Some(result) = query.result {
        builder.push(" AND result = ");
        builder.push_bind(result);
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn create(&self, draft: RecordDraft) -> Result<i64, StoreError> {
        check_draft(&draft)?;
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO scan_records
                (barcode, model, location, scanner, scan_time, remarks, "user", asset_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&draft.barcode)
        .bind(&draft.model)
        .bind(&draft.location)
        .bind(&draft.scanner)
        .bind(&draft.scan_time)
        .bind(&draft.remarks)
        .bind(&draft.user)
        .bind(&draft.asset_type)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn batch_create(&self, drafts: &[RecordDraft]) -> Result<Vec<i64>, StoreError> {
        if drafts.is_empty() {
            return Ok(Vec::new());
        }
        for draft in drafts {
            check_draft(draft)?;
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"INSERT INTO scan_records
                (barcode, model, location, scanner, scan_time, remarks, "user", asset_type) "#,
        );
        builder.push_values(drafts, |mut row, draft| {
            row.push_bind(&draft.barcode)
                .push_bind(&draft.model)
                .push_bind(&draft.location)
                .push_bind(&draft.scanner)
                .push_bind(&draft.scan_time)
                .push_bind(&draft.remarks)
                .push_bind(&draft.user)
                .push_bind(&draft.asset_type);
        });
        builder.push(" RETURNING id");

        let rows = builder.build().fetch_all(&self.pool).await?;
        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            ids.push(row.try_get::<i64, _>("id").map_err(StoreError::from)?);
        }
        Ok(ids)
    }

    async fn get(&self, id: i64) -> Result<Option<ScanRecord>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM scan_records WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(Some(row_to_record(&row).map_err(StoreError::from)?)),
            None => Ok(None),
        }
    }

    async fn update(&self, id: i64, update: RecordUpdate) -> Result<ScanRecord, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE scan_records SET
                barcode = $1, model = $2, location = $3, scanner = $4,
                scan_time = $5, remarks = $6, "user" = $7, asset_type = $8,
                result = $9, expected_time = $10, result_remarks = $11,
                updated_at = GREATEST(now(), updated_at)
            WHERE id = $12
            RETURNING {SELECT_COLUMNS}
            "#
        ))
        .bind(&update.barcode)
        .bind(&update.model)
        .bind(&update.location)
        .bind(&update.scanner)
        .bind(&update.scan_time)
        .bind(&update.remarks)
        .bind(&update.user)
        .bind(&update.asset_type)
        .bind(update.result)
        .bind(update.expected_time)
        .bind(&update.result_remarks)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row_to_record(&row).map_err(StoreError::from),
            None => Err(StoreError::NotFound(id)),
        }
    }

    async fn apply_enrichment(&self, delta: &EnrichmentDelta) -> Result<(), StoreError> {
        check_delta(delta)?;
        let result = sqlx::query(
            r#"
            UPDATE scan_records SET
                "user" = $1, model = $2, asset_type = $3,
                updated_at = GREATEST(now(), updated_at)
            WHERE id = $4
            "#,
        )
        .bind(&delta.user)
        .bind(&delta.model)
        .bind(&delta.asset_type)
        .bind(delta.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(delta.id));
        }
        Ok(())
    }

    async fn batch_enrich(&self, deltas: &[EnrichmentDelta]) -> Result<(), StoreError> {
        for delta in deltas {
            check_delta(delta)?;
        }
        let mut tx = self.pool.begin().await?;
        for delta in deltas {
            let result = sqlx::query(
                r#"
                UPDATE scan_records SET
                    "user" = $1, model = $2, asset_type = $3,
                    updated_at = GREATEST(now(), updated_at)
                WHERE id = $4
                "#,
            )
            .bind(&delta.user)
            .bind(&delta.model)
            .bind(&delta.asset_type)
            .bind(delta.id)
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound(delta.id));
            }
        }
        tx.commit().await?;
        Ok(())
    }

    async fn fetch_by_barcodes(&self, barcodes: &[String]) -> Result<Vec<ScanRecord>, StoreError> {
        // btrim so legacy whitespace-padded barcodes match the same keys the
        // in-memory store resolves
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM scan_records WHERE btrim(barcode) = ANY($1)"
        ))
        .bind(barcodes)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| row_to_record(row).map_err(StoreError::from))
            .collect()
    }

    async fn fetch_all(&self) -> Result<Vec<ScanRecord>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM scan_records ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| row_to_record(row).map_err(StoreError::from))
            .collect()
    }

    async fn list(&self, query: &RecordQuery) -> Result<(Vec<ScanRecord>, i64), StoreError> {
        let mut count_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM scan_records");
        push_filters(&mut count_builder, query);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {SELECT_COLUMNS} FROM scan_records"));
        push_filters(&mut builder, query);

        let (field, desc) = query.order();
        builder.push(" ORDER BY ");
        builder.push(order_expr(field));
        builder.push(if desc { " DESC" } else { " ASC" });
        builder.push(", id ASC");

        if let Some(limit) = query.limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit);
        }
        if let Some(offset) = query.offset {
            builder.push(" OFFSET ");
            builder.push_bind(offset);
        }

        let rows = builder.build().fetch_all(&self.pool).await?;
        let records = rows
            .iter()
            .map(|row| row_to_record(row).map_err(StoreError::from))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((records, total))
    }

    async fn count(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scan_records")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn delete_by_ids(&self, ids: &[i64]) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM scan_records WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn truncate(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM scan_records")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
