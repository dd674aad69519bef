//! Record validator
//!
//! Turns a normalized table into typed candidate rows. Two kinds of problem
//! are distinguished sharply:
//!
//! - a required canonical *column* missing entirely is structural and fails
//!   the whole batch before anything is written;
//! - a *row* with an empty natural key is expected dirt, dropped and counted
//!   as a skip, never as an error.
//!
//! Every surviving cell is trimmed; a cell that is empty after trimming
//! becomes `None` (explicit absence). "0" and other falsy-looking text
//! survive untouched.

use crate::error::ImportError;
use crate::schema::{find_field, CanonicalField};
use crate::tabular::Table;

use scanbase_common::types::RecordDraft;

/// Spreadsheet row number of the first data row: 1-indexed plus the header.
const FIRST_DATA_ROW: usize = 2;

/// One import candidate, tagged with the spreadsheet row it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRow {
    /// 1-indexed spreadsheet row (header row is row 1).
    pub row_no: usize,
    pub draft: RecordDraft,
}

/// One enrichment candidate: the natural key plus the fields the update flow
/// is allowed to fill.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichRow {
    pub row_no: usize,
    pub barcode: String,
    pub user: Option<String>,
    pub model: Option<String>,
}

/// Validation output: the surviving rows plus the accounting the reporter
/// needs to reconcile every input row.
#[derive(Debug)]
pub struct Validated<T> {
    pub rows: Vec<T>,
    pub input_rows: u64,
    pub skipped_empty_key: u64,
}

/// Trim a cell; empty-after-trim becomes an explicit absence.
fn clean(cell: &str) -> Option<String> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn cell<'a>(row: &'a [String], column: Option<usize>) -> &'a str {
    column.and_then(|idx| row.get(idx)).map_or("", |c| c.as_str())
}

fn require_columns(
    table: &Table,
    required: &[CanonicalField],
) -> Result<(), ImportError> {
    let missing: Vec<String> = required
        .iter()
        .filter(|field| find_field(table, **field).is_none())
        .map(|field| field.name().to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ImportError::MissingColumns(missing))
    }
}

/// Validate a normalized table for the import flow (barcode and model are
/// both required columns).
pub fn prepare_import(table: &Table) -> Result<Validated<ImportRow>, ImportError> {
    require_columns(table, &[CanonicalField::Barcode, CanonicalField::Model])?;

    let barcode_col = find_field(table, CanonicalField::Barcode);
    let model_col = find_field(table, CanonicalField::Model);
    let location_col = find_field(table, CanonicalField::Location);
    let scanner_col = find_field(table, CanonicalField::Scanner);
    let scan_time_col = find_field(table, CanonicalField::ScanTime);
    let remarks_col = find_field(table, CanonicalField::Remarks);
    let user_col = find_field(table, CanonicalField::User);
    let asset_type_col = find_field(table, CanonicalField::AssetType);

    let mut rows = Vec::with_capacity(table.rows.len());
    let mut skipped_empty_key = 0u64;

    for (idx, raw) in table.rows.iter().enumerate() {
        let barcode = match clean(cell(raw, barcode_col)) {
            Some(b) => b,
            None => {
                skipped_empty_key += 1;
                continue;
            },
        };

        rows.push(ImportRow {
            row_no: idx + FIRST_DATA_ROW,
            draft: RecordDraft {
                barcode,
                model: clean(cell(raw, model_col)),
                location: clean(cell(raw, location_col)),
                scanner: clean(cell(raw, scanner_col)),
                scan_time: clean(cell(raw, scan_time_col)),
                remarks: clean(cell(raw, remarks_col)),
                user: clean(cell(raw, user_col)),
                asset_type: clean(cell(raw, asset_type_col)),
            },
        });
    }

    Ok(Validated {
        rows,
        input_rows: table.rows.len() as u64,
        skipped_empty_key,
    })
}

/// Validate a normalized table for the enrichment flow (barcode — usually
/// arriving as an asset-number column — and user are required; model is
/// optional extra data).
pub fn prepare_enrich(table: &Table) -> Result<Validated<EnrichRow>, ImportError> {
    require_columns(table, &[CanonicalField::Barcode, CanonicalField::User])?;

    let barcode_col = find_field(table, CanonicalField::Barcode);
    let user_col = find_field(table, CanonicalField::User);
    let model_col = find_field(table, CanonicalField::Model);

    let mut rows = Vec::with_capacity(table.rows.len());
    let mut skipped_empty_key = 0u64;

    for (idx, raw) in table.rows.iter().enumerate() {
        let barcode = match clean(cell(raw, barcode_col)) {
            Some(b) => b,
            None => {
                skipped_empty_key += 1;
                continue;
            },
        };
        rows.push(EnrichRow {
            row_no: idx + FIRST_DATA_ROW,
            barcode,
            user: clean(cell(raw, user_col)),
            model: clean(cell(raw, model_col)),
        });
    }

    Ok(Validated {
        rows,
        input_rows: table.rows.len() as u64,
        skipped_empty_key,
    })
}
