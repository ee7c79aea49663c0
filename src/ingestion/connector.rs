//! Source Connector Trait - Abstract interface for uploaded files

use crate::error::Result;

/// How many leading rows make up the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderMode {
    /// One header row.
    Single,
    /// Two header rows, flattened into one name per column.
    TwoRow,
}

impl HeaderMode {
    pub fn header_rows(&self) -> usize {
        match self {
            HeaderMode::Single => 1,
            HeaderMode::TwoRow => 2,
        }
    }
}

/// Untyped cell grid as read from a source, before it becomes a data frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawGrid {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawGrid {
    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }
}

/// Source Connector Trait
///
/// Implementations:
/// - CsvConnector: delimited text
/// - XlsxConnector: Excel / OpenDocument workbooks (first sheet)
pub trait SourceConnector {
    /// Read the whole source into a grid with flattened headers.
    fn read(&self) -> Result<RawGrid>;

    /// Get source ID (usually the uploaded file name)
    fn source_id(&self) -> &str;

    /// Get source type (e.g., "csv", "xlsx")
    fn source_type(&self) -> &str;
}
