//! Reading the uploaded sheet into rows of trimmed cell text.
//!
//! Workbooks go through calamine; anything calamine cannot open is retried as
//! delimited text, so a `.xlsx` that is really a CSV export still imports.

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use serde::Serialize;
use std::io::Cursor;
use strum::Display;
use utoipa::ToSchema;

use crate::error::{ProductError, ProductResult};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Sheet names preferred over the first sheet, matched as substrings.
const PREFERRED_SHEETS: &[&str] = &["product", "catalog", "catalogue", "item", "inventory"];

/// Lines inspected when sniffing the delimiter.
const SNIFF_LINES: usize = 20;

pub(crate) const ALLOWED_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "ods", "csv", "tsv", "txt"];

/// Detected container format of the uploaded sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SheetFormat {
    Xlsx,
    Xls,
    Ods,
    /// Delimited text
    Csv,
}

/// One non-empty row with its 1-based row number in the sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRow {
    pub number: usize,
    pub cells: Vec<String>,
}

impl SheetRow {
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.trim().is_empty())
    }

    pub fn cell(&self, index: usize) -> &str {
        self.cells.get(index).map(|c| c.trim()).unwrap_or("")
    }
}

#[derive(Debug, Clone)]
pub struct Sheet {
    pub format: SheetFormat,
    /// Worksheet name, `None` for delimited text
    pub name: Option<String>,
    pub rows: Vec<SheetRow>,
}

/// Guess the container format: magic bytes, then extension, then content.
pub fn detect_format(file_name: &str, bytes: &[u8]) -> SheetFormat {
    if bytes.starts_with(OLE_MAGIC) {
        return SheetFormat::Xls;
    }
    if bytes.starts_with(ZIP_MAGIC) {
        // ODS stores its mimetype uncompressed as the first entry
        let head = &bytes[..bytes.len().min(128)];
        if head
            .windows(b"opendocument.spreadsheet".len())
            .any(|w| w == b"opendocument.spreadsheet")
        {
            return SheetFormat::Ods;
        }
        return SheetFormat::Xlsx;
    }

    // No container signature: trust the extension, and let the reader fall
    // back to text when the content disagrees
    match extension(file_name).as_deref() {
        Some("xlsx" | "xlsm") => SheetFormat::Xlsx,
        Some("xls") => SheetFormat::Xls,
        Some("ods") => SheetFormat::Ods,
        _ => SheetFormat::Csv,
    }
}

pub(crate) fn extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    (!ext.is_empty()).then(|| ext.to_ascii_lowercase())
}

/// Read the sheet with the best strategy for its format.
pub fn read_sheet(file_name: &str, bytes: &[u8]) -> ProductResult<Sheet> {
    if bytes.is_empty() {
        return Err(ProductError::InvalidUpload("The spreadsheet is empty".to_string()));
    }

    let format = detect_format(file_name, bytes);
    if format != SheetFormat::Csv {
        match read_workbook(format, bytes) {
            Ok(sheet) => return Ok(sheet),
            Err(e) => {
                tracing::warn!(format = %format, error = %e, "Workbook unreadable, trying delimited text");
            }
        }
    }

    let text = decode_text(bytes);
    if text.contains('\0') {
        return Err(ProductError::InvalidUpload(
            "The file is neither a readable workbook nor delimited text".to_string(),
        ));
    }
    read_delimited(&text)
}

fn read_workbook(format: SheetFormat, bytes: &[u8]) -> Result<Sheet, String> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes.to_vec())).map_err(|e| e.to_string())?;

    let names = workbook.sheet_names();
    if names.is_empty() {
        return Err("workbook has no sheets".to_string());
    }

    let mut candidates: Vec<String> = names
        .iter()
        .filter(|n| {
            let lower = n.to_lowercase();
            PREFERRED_SHEETS.iter().any(|p| lower.contains(p))
        })
        .cloned()
        .collect();
    let rest: Vec<String> = names
        .iter()
        .filter(|n| !candidates.contains(n))
        .cloned()
        .collect();
    candidates.extend(rest);

    for name in candidates {
        let range = match workbook.worksheet_range(&name) {
            Ok(range) => range,
            Err(e) => {
                tracing::debug!(sheet = %name, error = %e, "Skipping unreadable worksheet");
                continue;
            }
        };

        let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
        let rows: Vec<SheetRow> = range
            .rows()
            .enumerate()
            .map(|(index, cells)| SheetRow {
                number: first_row + index + 1,
                cells: cells.iter().map(cell_text).collect(),
            })
            .filter(|row| !row.is_blank())
            .collect();

        if !rows.is_empty() {
            return Ok(Sheet {
                format,
                name: Some(name),
                rows,
            });
        }
    }

    Err("no worksheet contains data".to_string())
}

/// Text form of a cell. Whole floats lose their `.0` so numeric SKUs and
/// quantities read naturally.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::Error(_) => String::new(),
        other => other.to_string(),
    }
}

/// UTF-8 (BOM stripped) when valid, otherwise Latin-1.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Pick the delimiter that yields the most consistent multi-column layout
/// over the first lines.
pub fn sniff_delimiter(text: &str) -> u8 {
    let sample: String = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(SNIFF_LINES)
        .collect::<Vec<_>>()
        .join("\n");

    let mut best = (b',', 0usize, 0usize);
    for delimiter in [b',', b';', b'\t', b'|'] {
        let counts: Vec<usize> = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(sample.as_bytes())
            .records()
            .filter_map(Result::ok)
            .map(|r| r.len())
            .collect();

        let Some(modal) = mode(&counts) else { continue };
        if modal < 2 {
            continue;
        }
        let consistent = counts.iter().filter(|&&c| c == modal).count();
        if (consistent, modal) > (best.1, best.2) {
            best = (delimiter, consistent, modal);
        }
    }
    best.0
}

fn mode(values: &[usize]) -> Option<usize> {
    let mut counts = std::collections::BTreeMap::<usize, usize>::new();
    for v in values {
        *counts.entry(*v).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by_key(|&(value, count)| (count, value))
        .map(|(value, _)| value)
}

fn read_delimited(text: &str) -> ProductResult<Sheet> {
    let delimiter = sniff_delimiter(text);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ProductError::InvalidUpload(format!("Malformed CSV: {e}")))?;
        // Position lines are 1-based, matching spreadsheet row numbers
        let number = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(rows.len() + 1);
        let row = SheetRow {
            number,
            cells: record.iter().map(str::to_string).collect(),
        };
        if !row.is_blank() {
            rows.push(row);
        }
    }

    if rows.is_empty() {
        return Err(ProductError::InvalidUpload("The spreadsheet has no rows".to_string()));
    }

    tracing::debug!(delimiter = %(delimiter as char), rows = rows.len(), "Parsed delimited text");
    Ok(Sheet {
        format: SheetFormat::Csv,
        name: None,
        rows,
    })
}
