//! Static field metadata and the import template
//!
//! `field_options` describes the record fields for UI form building;
//! `import_template` produces an empty workbook carrying the canonical
//! import headers so operators fill in a file the normalizer accepts as-is.

use serde::Serialize;
use serde_json::json;

use scanbase_ingest::schema::CanonicalField;
use scanbase_ingest::tabular::{write_xlsx, Table};

use crate::api::response::AppError;

/// Canonical import columns, in template order.
const TEMPLATE_FIELDS: &[CanonicalField] = &[
    CanonicalField::Barcode,
    CanonicalField::Model,
    CanonicalField::Location,
    CanonicalField::Scanner,
    CanonicalField::ScanTime,
    CanonicalField::Remarks,
    CanonicalField::User,
    CanonicalField::AssetType,
];

#[derive(Debug, Serialize)]
pub struct FieldOption {
    pub name: &'static str,
    pub label: &'static str,
    pub filterable: bool,
    pub orderable: bool,
}

/// Static field metadata, including the three-valued processing labels.
pub fn field_options() -> serde_json::Value {
    let fields = vec![
        FieldOption { name: "barcode", label: "条码", filterable: true, orderable: true },
        FieldOption { name: "model", label: "型号", filterable: true, orderable: true },
        FieldOption { name: "location", label: "位置", filterable: true, orderable: true },
        FieldOption { name: "scanner", label: "扫描人员", filterable: true, orderable: true },
        FieldOption { name: "scan_time", label: "时间", filterable: true, orderable: true },
        FieldOption { name: "remarks", label: "备注", filterable: true, orderable: false },
        FieldOption { name: "user", label: "使用人", filterable: true, orderable: true },
        FieldOption { name: "asset_type", label: "资产类型", filterable: true, orderable: true },
        FieldOption { name: "result", label: "处理结果", filterable: true, orderable: true },
    ];

    json!({
        "fields": fields,
        "result_labels": ["已完成", "处理中", "未处理"],
    })
}

/// Empty workbook with the canonical import headers.
pub fn import_template() -> Result<Vec<u8>, AppError> {
    let headers = TEMPLATE_FIELDS
        .iter()
        .map(|field| field.name().to_string())
        .collect();
    write_xlsx(&Table::new(headers)).map_err(|err| AppError::InternalError(err.to_string()))
}
