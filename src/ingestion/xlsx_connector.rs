//! Spreadsheet Connector - Reads the first sheet of an uploaded workbook

use crate::error::{Result, WranglerError};
use crate::ingestion::connector::{HeaderMode, RawGrid, SourceConnector};
use crate::ingestion::split_header;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;
use tracing::debug;

/// Workbook connector (xlsx, xls, xlsb, ods). Two header rows by default.
pub struct XlsxConnector {
    source_id: String,
    bytes: Vec<u8>,
    header_mode: HeaderMode,
}

impl XlsxConnector {
    pub fn new(source_id: String, bytes: Vec<u8>) -> Self {
        Self::with_header_mode(source_id, bytes, HeaderMode::TwoRow)
    }

    pub fn with_header_mode(source_id: String, bytes: Vec<u8>, header_mode: HeaderMode) -> Self {
        Self {
            source_id,
            bytes,
            header_mode,
        }
    }

    fn cell_text(cell: &Data) -> Option<String> {
        match cell {
            Data::Empty | Data::Error(_) => None,
            Data::String(s) if s.trim().is_empty() => None,
            Data::String(s) => Some(s.clone()),
            Data::Int(n) => Some(n.to_string()),
            Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Some(format!("{}", *f as i64)),
            Data::Float(f) => Some(f.to_string()),
            Data::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
            other => Some(other.to_string()),
        }
    }
}

impl SourceConnector for XlsxConnector {
    fn read(&self) -> Result<RawGrid> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(self.bytes.as_slice()))?;

        let sheet_names = workbook.sheet_names().to_vec();
        let first = sheet_names
            .first()
            .cloned()
            .ok_or_else(|| WranglerError::EmptyInput(format!("{} contains no sheets", self.source_id)))?;
        debug!("Reading sheet '{}' of {}", first, self.source_id);

        let range = workbook.worksheet_range(&first)?;
        let records: Vec<Vec<Option<String>>> = range
            .rows()
            .map(|row| row.iter().map(Self::cell_text).collect())
            .collect();

        split_header(&self.source_id, records, self.header_mode)
    }

    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn source_type(&self) -> &str {
        "xlsx"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_text() {
        assert_eq!(XlsxConnector::cell_text(&Data::Empty), None);
        assert_eq!(XlsxConnector::cell_text(&Data::String("  ".to_string())), None);
        assert_eq!(XlsxConnector::cell_text(&Data::Float(12.0)), Some("12".to_string()));
        assert_eq!(XlsxConnector::cell_text(&Data::Float(2.5)), Some("2.5".to_string()));
        assert_eq!(XlsxConnector::cell_text(&Data::Int(7)), Some("7".to_string()));
        assert_eq!(XlsxConnector::cell_text(&Data::Bool(true)), Some("TRUE".to_string()));
    }

    #[test]
    fn test_rejects_garbage_bytes() {
        let connector = XlsxConnector::new("broken.xlsx".to_string(), b"not a workbook".to_vec());
        assert!(matches!(connector.read(), Err(WranglerError::Spreadsheet(_))));
    }
}
