//! Dataset cleaning applied to every upload before classification.

use crate::dataset;
use crate::error::Result;
use polars::prelude::*;
use std::collections::HashSet;
use tracing::info;

/// Placeholder written into empty cells.
pub const MISSING: &str = "N/A";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleaningReport {
    pub rows_in: usize,
    pub rows_out: usize,
    pub duplicates_removed: usize,
    pub nulls_filled: usize,
}

/// Fill missing values, trim whitespace and drop repeated rows.
///
/// Every column comes out as `String`. The first occurrence of a duplicated
/// row is kept, and row order is otherwise preserved.
pub fn clean(df: DataFrame) -> Result<(DataFrame, CleaningReport)> {
    let rows_in = df.height();
    let nulls_filled: usize = df.get_columns().iter().map(|s| s.null_count()).sum();

    let filled = df
        .lazy()
        .with_columns([col("*").cast(DataType::String).fill_null(lit(MISSING))])
        .collect()?;

    let trimmed = trim_all(&filled)?;
    let deduped = drop_duplicate_rows(&trimmed)?;

    let report = CleaningReport {
        rows_in,
        rows_out: deduped.height(),
        duplicates_removed: rows_in - deduped.height(),
        nulls_filled,
    };
    info!(
        "Cleaned dataset: {} -> {} rows ({} duplicates removed, {} empty cells filled)",
        report.rows_in, report.rows_out, report.duplicates_removed, report.nulls_filled
    );
    Ok((deduped, report))
}

fn trim_all(df: &DataFrame) -> Result<DataFrame> {
    let mut columns = Vec::with_capacity(df.width());
    for name in dataset::column_names(df) {
        let values: Vec<Option<String>> = dataset::column_strings(df, &name)?
            .into_iter()
            .map(|v| v.map(|s| s.trim().to_string()))
            .collect();
        columns.push(Series::new(name.as_str(), values));
    }
    Ok(DataFrame::new(columns)?)
}

fn drop_duplicate_rows(df: &DataFrame) -> Result<DataFrame> {
    let mut seen = HashSet::new();
    let keep: Vec<bool> = dataset::rows_as_strings(df)?
        .into_iter()
        .map(|row| seen.insert(row))
        .collect();
    let mask = BooleanChunked::from_slice("keep", &keep);
    Ok(df.filter(&mask)?)
}
