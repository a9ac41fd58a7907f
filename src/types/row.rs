//! Sheet, raw row, and projected row types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::field::CanonicalField;

/// A parsed spreadsheet: trimmed headers plus the non-blank data rows, cells
/// aligned positionally with the headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sheet {
    headers: Vec<String>,
    rows: Vec<ImportRow>,
}

/// One data row of the uploaded sheet, immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImportRow {
    cells: Vec<String>,
}

impl ImportRow {
    pub fn new(cells: Vec<String>) -> Self {
        Self { cells }
    }

    pub fn cell(&self, index: usize) -> &str {
        self.cells.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.trim().is_empty())
    }
}

impl Sheet {
    pub fn new(headers: Vec<String>, rows: Vec<ImportRow>) -> Self {
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[ImportRow] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn header_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// Cell value of one row under a raw header; absent columns and short
    /// rows read as empty string, never as an error.
    pub fn value<'a>(&self, row: &'a ImportRow, header: &str) -> &'a str {
        self.header_index(header)
            .map(|i| row.cell(i))
            .unwrap_or("")
    }
}

/// A row keyed by canonical field, ready for submission to the import
/// endpoint. Serializes as a flat JSON object with camelCase field keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectedRow {
    values: BTreeMap<CanonicalField, String>,
}

impl ProjectedRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: CanonicalField, value: String) {
        self.values.insert(field, value);
    }

    pub fn get(&self, field: CanonicalField) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
