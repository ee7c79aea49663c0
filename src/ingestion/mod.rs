//! Ingestion Module
//!
//! Turns an uploaded file into a string-typed data frame:
//! - CSV and workbook connectors
//! - Multi-row header flattening
//! - Dispatch on file extension

pub mod connector;
pub mod csv_connector;
pub mod headers;
pub mod xlsx_connector;

pub use connector::{HeaderMode, RawGrid, SourceConnector};
pub use csv_connector::CsvConnector;
pub use xlsx_connector::XlsxConnector;

use crate::dataset;
use crate::error::{Result, WranglerError};
use polars::prelude::DataFrame;
use std::path::Path;
use tracing::info;

const WORKBOOK_EXTENSIONS: [&str; 4] = ["xlsx", "xls", "xlsb", "ods"];

/// Split leading header rows off a record list and flatten them.
pub(crate) fn split_header(
    source_id: &str,
    mut records: Vec<Vec<Option<String>>>,
    mode: HeaderMode,
) -> Result<RawGrid> {
    let header_rows = mode.header_rows();
    if records.len() < header_rows {
        return Err(WranglerError::EmptyInput(format!(
            "{} has fewer than {} header row(s)",
            source_id, header_rows
        )));
    }

    let rows = records.split_off(header_rows);
    let width = records
        .iter()
        .chain(rows.iter())
        .map(|r| r.len())
        .max()
        .unwrap_or(0);
    if width == 0 {
        return Err(WranglerError::EmptyInput(format!("{} has no columns", source_id)));
    }

    let headers = headers::flatten_headers(&records, width);
    let rows = rows
        .into_iter()
        .filter(|r| r.iter().any(Option::is_some))
        .map(|mut r| {
            r.resize(width, None);
            r
        })
        .collect();

    Ok(RawGrid { headers, rows })
}

/// Pick a connector for an uploaded file by its extension.
pub fn connector_for(
    file_name: &str,
    bytes: Vec<u8>,
    header_mode: Option<HeaderMode>,
) -> Result<Box<dyn SourceConnector>> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let source_id = file_name.to_string();
    if extension == "csv" {
        let mode = header_mode.unwrap_or(HeaderMode::Single);
        Ok(Box::new(CsvConnector::with_header_mode(source_id, bytes, mode)))
    } else if WORKBOOK_EXTENSIONS.contains(&extension.as_str()) {
        let mode = header_mode.unwrap_or(HeaderMode::TwoRow);
        Ok(Box::new(XlsxConnector::with_header_mode(source_id, bytes, mode)))
    } else {
        Err(WranglerError::UnsupportedFormat(file_name.to_string()))
    }
}

/// Parse uploaded bytes into a data frame.
pub fn load_bytes(file_name: &str, bytes: Vec<u8>, header_mode: Option<HeaderMode>) -> Result<DataFrame> {
    let connector = connector_for(file_name, bytes, header_mode)?;
    let grid = connector.read()?;
    info!(
        "Ingested {} ({}): {} rows x {} columns",
        connector.source_id(),
        connector.source_type(),
        grid.height(),
        grid.width()
    );
    dataset::from_grid(grid)
}

pub fn load_path(path: impl AsRef<Path>, header_mode: Option<HeaderMode>) -> Result<DataFrame> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    load_bytes(&file_name, bytes, header_mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_extension() {
        let err = load_bytes("notes.txt", b"a,b".to_vec(), None).unwrap_err();
        assert!(matches!(err, WranglerError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_empty_csv_is_input_error() {
        let err = load_bytes("empty.csv", Vec::new(), None).unwrap_err();
        assert!(matches!(err, WranglerError::EmptyInput(_)));
        assert!(err.is_input_error());
    }

    #[test]
    fn test_blank_rows_dropped() {
        let records = vec![
            vec![Some("a".to_string()), Some("b".to_string())],
            vec![None, None],
            vec![Some("1".to_string())],
        ];
        let grid = split_header("t.csv", records, HeaderMode::Single).unwrap();
        assert_eq!(grid.rows, vec![vec![Some("1".to_string()), None]]);
    }

    #[test]
    fn test_load_csv_frame() {
        let df = load_bytes(
            "staff.csv",
            b"district_name,designation_title\nThatta,UCMO\n".to_vec(),
            None,
        )
        .unwrap();
        assert_eq!(df.height(), 1);
        assert_eq!(df.get_column_names(), vec!["district_name", "designation_title"]);
    }
}
