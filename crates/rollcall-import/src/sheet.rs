//! Reading the first worksheet of an uploaded workbook.

use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use serde::{Deserialize, Serialize};

use crate::error::ImportError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetRow {
    /// 1-based row number as shown by spreadsheet applications.
    pub row_number: usize,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<SheetRow>,
}

/// Parses `.xlsx`, `.xls`, `.xlsb` or `.ods` bytes and returns the first worksheet.
pub fn read_workbook(bytes: Vec<u8>) -> Result<Sheet, ImportError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| ImportError::Workbook(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ImportError::NoWorksheet)?
        .map_err(|e| ImportError::Workbook(e.to_string()))?;

    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    sheet_from_rows(first_row, range.rows())
}

/// Builds a [`Sheet`] from raw cell rows, where `first_row` is the 0-based
/// index of the first row yielded.
pub fn sheet_from_rows<'a, I>(first_row: usize, rows: I) -> Result<Sheet, ImportError>
where
    I: IntoIterator<Item = &'a [Data]>,
{
    let mut headers: Option<Vec<String>> = None;
    let mut out = Vec::new();

    for (offset, raw) in rows.into_iter().enumerate() {
        let cells: Vec<String> = raw.iter().map(cell_to_string).collect();
        if cells.iter().all(|c| c.is_empty()) {
            continue;
        }

        match headers {
            None => headers = Some(cells),
            Some(_) => out.push(SheetRow {
                row_number: first_row + offset + 1,
                cells,
            }),
        }
    }

    let headers = headers.ok_or(ImportError::MissingHeader)?;
    if out.is_empty() {
        return Err(ImportError::NoRows);
    }

    Ok(Sheet { headers, rows: out })
}

/// Renders a cell as trimmed text. Whole numbers lose their `.0` and dates
/// become `YYYY-MM-DD`.
pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => format_float(*f),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(dt) => dt.date().format("%Y-%m-%d").to_string(),
            None => format_float(dt.as_f64()),
        },
        Data::DateTimeIso(s) => s.get(..10).unwrap_or(s.as_str()).to_string(),
        Data::DurationIso(s) => s.trim().to_string(),
    }
}

fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}
