//! Tabular file codec
//!
//! Reads spreadsheets (.xlsx/.xls/.xlsb/.ods via calamine, .csv via csv)
//! into a uniform [`Table`] of header strings and stringified cells, and
//! writes .xlsx for templates and exports. Every cell is carried as the text
//! an operator would see; no value is parsed into a richer type here, which
//! is what keeps the `scan_time` column a verbatim pass-through.

use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Xlsx};
use thiserror::Error;

/// A fully materialized table: one header row plus data rows.
///
/// Rows are padded/truncated to the header width so downstream code can
/// index columns without bounds anxiety.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    /// Column index of a header, if present.
    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }
}

#[derive(Error, Debug)]
pub enum TabularError {
    #[error("workbook error in {path}: {message}")]
    Workbook { path: String, message: String },

    #[error("CSV error in {path}: {message}")]
    Csv { path: String, message: String },

    #[error("{path} has no sheets with data")]
    EmptySheet { path: String },

    #[error("unsupported file extension: {path} (expected .csv, .xlsx, .xls, .xlsb or .ods)")]
    UnsupportedExtension { path: String },
}

/// Read a tabular file, dispatching on extension.
pub fn read_table(path: &Path) -> Result<Table, TabularError> {
    let display = path.display().to_string();
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("csv") => read_csv(path),
        Some("xlsx") | Some("xls") | Some("xlsb") | Some("ods") => read_workbook(path),
        _ => Err(TabularError::UnsupportedExtension { path: display }),
    }
}

/// Read an .xlsx workbook from an in-memory buffer (uploaded files).
pub fn read_xlsx_bytes(bytes: Vec<u8>) -> Result<Table, TabularError> {
    let path = "<upload>";
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes)).map_err(|e| TabularError::Workbook {
            path: path.to_string(),
            message: e.to_string(),
        })?;

    let sheet_names = workbook.sheet_names().to_vec();
    let first = sheet_names
        .first()
        .ok_or_else(|| TabularError::EmptySheet {
            path: path.to_string(),
        })?;
    let range = workbook
        .worksheet_range(first)
        .map_err(|e| TabularError::Workbook {
            path: path.to_string(),
            message: e.to_string(),
        })?;
    Ok(range_to_table(&range))
}

fn read_workbook(path: &Path) -> Result<Table, TabularError> {
    let display = path.display().to_string();
    let mut workbook = open_workbook_auto(path).map_err(|e| TabularError::Workbook {
        path: display.clone(),
        message: e.to_string(),
    })?;

    let sheet_names = workbook.sheet_names().to_vec();
    let first = sheet_names
        .first()
        .ok_or_else(|| TabularError::EmptySheet {
            path: display.clone(),
        })?;
    let range = workbook
        .worksheet_range(first)
        .map_err(|e| TabularError::Workbook {
            path: display.clone(),
            message: e.to_string(),
        })?;
    Ok(range_to_table(&range))
}

fn range_to_table(range: &calamine::Range<Data>) -> Table {
    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row.iter().map(cell_to_string).collect(),
        None => Vec::new(),
    };

    let mut table = Table::new(headers);
    for row in rows {
        table.push_row(row.iter().map(cell_to_string).collect());
    }
    table
}

/// Stringify a cell the way it reads in the sheet. Integral floats lose the
/// spurious ".0" Excel adds to numeric barcode columns.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        },
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(naive) => naive.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => dt.as_f64().to_string(),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{:?}", e),
    }
}

fn read_csv(path: &Path) -> Result<Table, TabularError> {
    let display = path.display().to_string();
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| TabularError::Csv {
            path: display.clone(),
            message: e.to_string(),
        })?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| TabularError::Csv {
            path: display.clone(),
            message: e.to_string(),
        })?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut table = Table::new(headers);
    for record in reader.records() {
        let record = record.map_err(|e| TabularError::Csv {
            path: display.clone(),
            message: e.to_string(),
        })?;
        table.push_row(record.iter().map(|c| c.to_string()).collect());
    }
    Ok(table)
}

/// Serialize a table to .xlsx bytes (import templates, filtered exports).
pub fn write_xlsx(table: &Table) -> Result<Vec<u8>, TabularError> {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, header) in table.headers.iter().enumerate() {
        worksheet
            .write_string(0, col as u16, header)
            .map_err(|e| TabularError::Workbook {
                path: "<export>".to_string(),
                message: e.to_string(),
            })?;
    }
    for (row_idx, row) in table.rows.iter().enumerate() {
        for (col, cell) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32 + 1, col as u16, cell)
                .map_err(|e| TabularError::Workbook {
                    path: "<export>".to_string(),
                    message: e.to_string(),
                })?;
        }
    }

    workbook.save_to_buffer().map_err(|e| TabularError::Workbook {
        path: "<export>".to_string(),
        message: e.to_string(),
    })
}
