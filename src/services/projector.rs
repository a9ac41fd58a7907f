//! Row projection
//!
//! Converts raw sheet rows into canonical-field rows using the frozen column
//! mapping. Projection is a straight copy except for the numeric-token
//! fields, whose values the server expects as compact symbol-free strings.

use crate::types::{ColumnMapping, ImportRow, ProjectedRow, Sheet};

/// Strip currency symbols and all whitespace, e.g. `" $ 1 M "` -> `"1M"`.
pub fn clean_numeric_token(value: &str) -> String {
    value
        .chars()
        .filter(|c| *c != '$' && !c.is_whitespace())
        .collect()
}

/// Project one raw row through the mapping. Skipped columns are dropped,
/// missing cells become empty strings.
pub fn project_row(sheet: &Sheet, row: &ImportRow, mapping: &ColumnMapping) -> ProjectedRow {
    let mut projected = ProjectedRow::new();
    for entry in mapping.iter() {
        let Some(field) = entry.target.field() else {
            continue;
        };
        let raw = sheet.value(row, &entry.header);
        let value = if field.wants_numeric_cleanup() {
            clean_numeric_token(raw)
        } else {
            raw.to_string()
        };
        projected.set(field, value);
    }
    projected
}

/// Project every row of the sheet, in original order.
pub fn project_all(sheet: &Sheet, mapping: &ColumnMapping) -> Vec<ProjectedRow> {
    sheet
        .rows()
        .iter()
        .map(|row| project_row(sheet, row, mapping))
        .collect()
}
