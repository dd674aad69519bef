//! Schema normalizer
//!
//! Source spreadsheets arrive with localized, abbreviated, or just creatively
//! cased column headers. This module maps every known variant onto the
//! canonical field set through a static alias table; unknown headers pass
//! through unchanged and are ignored downstream.
//!
//! The alias table is configuration data, not logic: extending coverage for
//! a new source means adding a row here.

use crate::tabular::Table;

/// Canonical columns of a scan record that can arrive in a spreadsheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    Barcode,
    Model,
    Location,
    Scanner,
    ScanTime,
    Remarks,
    User,
    AssetType,
}

impl CanonicalField {
    /// Canonical header name, as used internally and in templates.
    pub fn name(self) -> &'static str {
        match self {
            CanonicalField::Barcode => "barcode",
            CanonicalField::Model => "model",
            CanonicalField::Location => "location",
            CanonicalField::Scanner => "scanner",
            CanonicalField::ScanTime => "scan_time",
            CanonicalField::Remarks => "remarks",
            CanonicalField::User => "user",
            CanonicalField::AssetType => "asset_type",
        }
    }
}

/// Header alias table. Many-to-one: every known variant of a column name,
/// localized and otherwise, maps onto one canonical field. Lookup is
/// performed on the trimmed, ASCII-lowercased header, so plain casing
/// variants ("BARCODE", "Barcode") need no rows of their own.
const HEADER_ALIASES: &[(&str, CanonicalField)] = &[
    // barcode
    ("条码", CanonicalField::Barcode),
    ("条形码", CanonicalField::Barcode),
    ("barcode", CanonicalField::Barcode),
    // the enrichment spreadsheets key on the asset number, which is the
    // same physical identifier as the scanned barcode
    ("资产编号", CanonicalField::Barcode),
    // model
    ("型号", CanonicalField::Model),
    ("产品型号", CanonicalField::Model),
    ("设备型号", CanonicalField::Model),
    ("model", CanonicalField::Model),
    // location
    ("位置", CanonicalField::Location),
    ("存放位置", CanonicalField::Location),
    ("location", CanonicalField::Location),
    // scanner
    ("扫描人员", CanonicalField::Scanner),
    ("扫描人", CanonicalField::Scanner),
    ("操作员", CanonicalField::Scanner),
    ("scanner", CanonicalField::Scanner),
    // scan time
    ("时间", CanonicalField::ScanTime),
    ("扫描时间", CanonicalField::ScanTime),
    ("时间戳", CanonicalField::ScanTime),
    ("scan_time", CanonicalField::ScanTime),
    // remarks
    ("备注", CanonicalField::Remarks),
    ("说明", CanonicalField::Remarks),
    ("注释", CanonicalField::Remarks),
    ("remarks", CanonicalField::Remarks),
    // user
    ("使用人", CanonicalField::User),
    ("当前使用人", CanonicalField::User),
    ("user", CanonicalField::User),
    // asset type
    ("资产类型", CanonicalField::AssetType),
    ("asset_type", CanonicalField::AssetType),
];

/// Normalize one raw header to its canonical field, if it is a known alias.
pub fn normalize_header(raw: &str) -> Option<CanonicalField> {
    let cleaned = raw.trim().to_ascii_lowercase();
    HEADER_ALIASES
        .iter()
        .find(|(alias, _)| *alias == cleaned)
        .map(|(_, field)| *field)
}

/// Rewrite a table's headers in place: known aliases become canonical names,
/// everything else keeps its (trimmed) original spelling. The cell data is
/// untouched.
pub fn normalize_table(table: &mut Table) {
    for header in &mut table.headers {
        *header = match normalize_header(header) {
            Some(field) => field.name().to_string(),
            None => header.trim().to_string(),
        };
    }
}

/// Column index of a canonical field in a normalized table.
pub fn find_field(table: &Table, field: CanonicalField) -> Option<usize> {
    table.column(field.name())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_invariance_for_barcode() {
        for alias in ["条码", "条形码", "barcode", "BARCODE", " Barcode "] {
            assert_eq!(
                normalize_header(alias),
                Some(CanonicalField::Barcode),
                "alias {alias:?} should normalize to barcode"
            );
        }
    }

    #[test]
    fn asset_number_is_a_barcode_alias() {
        assert_eq!(normalize_header("资产编号"), Some(CanonicalField::Barcode));
        assert_eq!(normalize_header("当前使用人"), Some(CanonicalField::User));
        assert_eq!(normalize_header("设备型号"), Some(CanonicalField::Model));
    }

    #[test]
    fn unknown_headers_pass_through_trimmed() {
        assert_eq!(normalize_header("盘点批次"), None);

        let mut table = Table::new(vec![" 条码 ".into(), " 盘点批次 ".into()]);
        normalize_table(&mut table);
        assert_eq!(table.headers, vec!["barcode", "盘点批次"]);
    }

    #[test]
    fn normalized_table_exposes_canonical_columns() {
        let mut table = Table::new(vec![
            "条码".into(),
            "型号".into(),
            "位置".into(),
            "扫描人员".into(),
            "时间".into(),
            "备注".into(),
        ]);
        normalize_table(&mut table);
        assert_eq!(find_field(&table, CanonicalField::Barcode), Some(0));
        assert_eq!(find_field(&table, CanonicalField::ScanTime), Some(4));
        assert_eq!(find_field(&table, CanonicalField::User), None);
    }
}
