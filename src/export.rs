//! Serialization of processed datasets and mapping tables.
//!
//! Everything here returns an in-memory buffer; writing it somewhere is the
//! caller's job.

use crate::dataset;
use crate::error::{Result, WranglerError};
use crate::mapping::MappingTable;
use polars::prelude::DataFrame;
use rust_xlsxwriter::{Format, Workbook};
use tracing::info;

pub const DATASET_FILE_NAME: &str = "processed_data.xlsx";
pub const MAPPING_FILE_NAME: &str = "cadre_mappings.json";

const SHEET_NAME: &str = "Sheet1";

/// Single-sheet workbook: header row, then values. No index column.
///
/// Values that read as plain numbers are written as numeric cells; anything
/// else, including codes with leading zeros, stays text.
pub fn export_dataset_xlsx(df: &DataFrame) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    let bold = Format::new().set_bold();
    for (col, name) in dataset::column_names(df).iter().enumerate() {
        worksheet.write_string_with_format(0, to_col(col)?, name, &bold)?;
    }

    for (row_idx, row) in dataset::rows_as_strings(df)?.iter().enumerate() {
        let row_num = u32::try_from(row_idx + 1)
            .map_err(|_| WranglerError::Export(format!("too many rows: {}", df.height())))?;
        for (col, value) in row.iter().enumerate() {
            match numeric_cell(value) {
                Some(n) => worksheet.write_number(row_num, to_col(col)?, n)?,
                None => worksheet.write_string(row_num, to_col(col)?, value)?,
            };
        }
    }

    let bytes = workbook.save_to_buffer()?;
    info!("Exported {} rows to xlsx ({} bytes)", df.height(), bytes.len());
    Ok(bytes)
}

/// Comma-separated text with a header row.
pub fn export_dataset_csv(df: &DataFrame) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(dataset::column_names(df))?;
    for row in dataset::rows_as_strings(df)? {
        writer.write_record(&row)?;
    }
    writer
        .into_inner()
        .map_err(|e| WranglerError::Export(e.to_string()))
}

pub fn export_mapping(table: &MappingTable) -> Result<String> {
    table.export_json()
}

fn numeric_cell(value: &str) -> Option<f64> {
    if value.is_empty() || value != value.trim() || value.starts_with('+') {
        return None;
    }
    let digits = value.strip_prefix('-').unwrap_or(value);
    if digits.len() > 1 && digits.starts_with('0') && !digits.starts_with("0.") {
        return None;
    }
    if !digits.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    value.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn to_col(idx: usize) -> Result<u16> {
    u16::try_from(idx).map_err(|_| WranglerError::Export(format!("too many columns: {}", idx + 1)))
}
