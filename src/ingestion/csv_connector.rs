//! CSV Connector - Reads uploaded delimited text into a raw grid

use crate::error::Result;
use crate::ingestion::connector::{HeaderMode, RawGrid, SourceConnector};
use crate::ingestion::split_header;
use csv::ReaderBuilder;

/// CSV Connector - Wraps an uploaded CSV payload.
pub struct CsvConnector {
    source_id: String,
    bytes: Vec<u8>,
    header_mode: HeaderMode,
}

impl CsvConnector {
    pub fn new(source_id: String, bytes: Vec<u8>) -> Self {
        Self::with_header_mode(source_id, bytes, HeaderMode::Single)
    }

    pub fn with_header_mode(source_id: String, bytes: Vec<u8>, header_mode: HeaderMode) -> Self {
        Self {
            source_id,
            bytes,
            header_mode,
        }
    }

    fn coerce_cell(s: &str) -> Option<String> {
        if s.trim().is_empty() {
            None
        } else {
            Some(s.to_string())
        }
    }
}

impl SourceConnector for CsvConnector {
    fn read(&self) -> Result<RawGrid> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(self.bytes.as_slice());

        let mut records = Vec::new();
        for result in rdr.records() {
            let record = result?;
            records.push(record.iter().map(Self::coerce_cell).collect());
        }

        split_header(&self.source_id, records, self.header_mode)
    }

    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn source_type(&self) -> &str {
        "csv"
    }
}
