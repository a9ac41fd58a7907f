//! Spreadsheet decoding adaptor
//!
//! The pipeline consumes a finished 2-D string grid; this module provides
//! the CSV byte-stream adaptor in front of it and the grid-to-[`Sheet`]
//! hygiene step: row 0 becomes the trimmed header row, rows where every cell
//! is blank are discarded.

use thiserror::Error;

use crate::types::{ImportRow, Sheet};

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("uploaded file is empty")]
    Empty,

    #[error("header row is blank")]
    BlankHeaders,

    #[error("no data rows after the header")]
    NoRows,

    #[error("failed to decode spreadsheet: {0}")]
    Decode(#[from] csv::Error),
}

/// Decode CSV bytes into a raw grid of cell strings. Rows may have ragged
/// lengths; alignment with the header row happens at read time.
pub fn decode_csv(bytes: &[u8]) -> Result<Vec<Vec<String>>, SheetError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record?;
        grid.push(record.iter().map(|cell| cell.to_string()).collect());
    }
    Ok(grid)
}

/// Build a [`Sheet`] from a decoded grid.
pub fn sheet_from_grid(grid: Vec<Vec<String>>) -> Result<Sheet, SheetError> {
    let mut rows = grid.into_iter();
    let header_row = rows.next().ok_or(SheetError::Empty)?;

    let headers: Vec<String> = header_row.iter().map(|h| h.trim().to_string()).collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(SheetError::BlankHeaders);
    }

    let data: Vec<ImportRow> = rows
        .map(ImportRow::new)
        .filter(|row| !row.is_blank())
        .collect();
    if data.is_empty() {
        return Err(SheetError::NoRows);
    }

    Ok(Sheet::new(headers, data))
}

/// CSV bytes straight to a validated [`Sheet`].
pub fn decode_sheet(bytes: &[u8]) -> Result<Sheet, SheetError> {
    sheet_from_grid(decode_csv(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_sheet_trims_headers() {
        let sheet = decode_sheet(b" E-mail , Company \na@x.com,Acme\n").unwrap();
        assert_eq!(sheet.headers(), &["E-mail".to_string(), "Company".to_string()]);
        assert_eq!(sheet.row_count(), 1);
    }

    #[test]
    fn test_decode_sheet_drops_blank_rows() {
        let sheet = decode_sheet(b"E-mail,Company\na@x.com,Acme\n , \nb@x.com,Beta\n").unwrap();
        assert_eq!(sheet.row_count(), 2);
        assert_eq!(sheet.value(&sheet.rows()[1], "E-mail"), "b@x.com");
    }

    #[test]
    fn test_decode_sheet_handles_quoted_commas() {
        let sheet = decode_sheet(b"E-mail,Company\na@x.com,\"Acme, Inc.\"\n").unwrap();
        assert_eq!(sheet.value(&sheet.rows()[0], "Company"), "Acme, Inc.");
    }

    #[test]
    fn test_empty_file_is_rejected() {
        assert!(matches!(decode_sheet(b""), Err(SheetError::Empty)));
    }

    #[test]
    fn test_headers_only_is_rejected() {
        assert!(matches!(
            decode_sheet(b"E-mail,Company\n"),
            Err(SheetError::NoRows)
        ));
    }

    #[test]
    fn test_blank_header_row_is_rejected() {
        assert!(matches!(
            decode_sheet(b" , \na@x.com,Acme\n"),
            Err(SheetError::BlankHeaders)
        ));
    }

    #[test]
    fn test_ragged_rows_survive_decoding() {
        let sheet = decode_sheet(b"E-mail,Company\na@x.com\n").unwrap();
        assert_eq!(sheet.value(&sheet.rows()[0], "Company"), "");
    }
}
