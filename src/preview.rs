//! Browsing helpers: search, column filters, projection and a text table.

use crate::dataset;
use crate::error::{Result, WranglerError};
use polars::prelude::*;

pub const DEFAULT_ROW_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnFilter {
    /// Keep rows whose value is one of `values`.
    Values { column: String, values: Vec<String> },
    /// Keep rows whose value parses as a number within `[min, max]`.
    Range { column: String, min: f64, max: f64 },
}

impl ColumnFilter {
    fn column(&self) -> &str {
        match self {
            ColumnFilter::Values { column, .. } | ColumnFilter::Range { column, .. } => column,
        }
    }

    fn keeps(&self, value: Option<&str>) -> bool {
        match (self, value) {
            (ColumnFilter::Values { values, .. }, Some(v)) => values.iter().any(|x| x == v),
            (ColumnFilter::Range { min, max, .. }, Some(v)) => v
                .trim()
                .parse::<f64>()
                .map(|n| n >= *min && n <= *max)
                .unwrap_or(false),
            (_, None) => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ViewOptions {
    /// Columns to show; all when empty.
    pub columns: Vec<String>,
    pub row_limit: usize,
    /// Case-insensitive substring searched in every column.
    pub search: Option<String>,
    pub filter: Option<ColumnFilter>,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            row_limit: DEFAULT_ROW_LIMIT,
            search: None,
            filter: None,
        }
    }
}

#[derive(Debug)]
pub struct Preview {
    pub frame: DataFrame,
    /// Rows that passed search and filter, before the row limit.
    pub matched_rows: usize,
    pub total_rows: usize,
}

impl Preview {
    pub fn caption(&self) -> String {
        format!(
            "Showing {} of {} rows ({} matched), {} columns",
            self.frame.height(),
            self.total_rows,
            self.matched_rows,
            self.frame.width()
        )
    }
}

/// Rows matching the search and filter, all columns kept.
pub fn filter_rows(df: &DataFrame, options: &ViewOptions) -> Result<DataFrame> {
    let mut keep = vec![true; df.height()];

    if let Some(needle) = options.search.as_deref().map(str::to_lowercase).filter(|s| !s.is_empty()) {
        let rows = dataset::rows_as_strings(df)?;
        for (flag, row) in keep.iter_mut().zip(rows) {
            *flag = row.iter().any(|cell| cell.to_lowercase().contains(&needle));
        }
    }

    if let Some(filter) = &options.filter {
        if !dataset::has_column(df, filter.column()) {
            return Err(WranglerError::MissingColumn(filter.column().to_string()));
        }
        let values = dataset::column_strings(df, filter.column())?;
        for (flag, value) in keep.iter_mut().zip(values) {
            *flag = *flag && filter.keeps(value.as_deref());
        }
    }

    let mask = BooleanChunked::from_slice("keep", &keep);
    Ok(df.filter(&mask)?)
}

pub fn apply(df: &DataFrame, options: &ViewOptions) -> Result<Preview> {
    let filtered = filter_rows(df, options)?;
    let matched_rows = filtered.height();

    let projected = if options.columns.is_empty() {
        filtered
    } else {
        if let Some(missing) = options.columns.iter().find(|c| !dataset::has_column(&filtered, c)) {
            return Err(WranglerError::MissingColumn(missing.clone()));
        }
        filtered.select(options.columns.iter().map(String::as_str))?
    };

    Ok(Preview {
        frame: projected.head(Some(options.row_limit)),
        matched_rows,
        total_rows: df.height(),
    })
}

/// Aligned plain-text table; cells wider than `max_width` are cut.
pub fn render_table(df: &DataFrame, max_width: usize) -> Result<String> {
    let clip = |s: &str| -> String {
        if s.chars().count() > max_width {
            let mut cut: String = s.chars().take(max_width.saturating_sub(1)).collect();
            cut.push('~');
            cut
        } else {
            s.to_string()
        }
    };

    let header: Vec<String> = dataset::column_names(df).iter().map(|h| clip(h)).collect();
    let rows: Vec<Vec<String>> = dataset::rows_as_strings(df)?
        .iter()
        .map(|row| row.iter().map(|c| clip(c)).collect())
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = *w))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![line(&header)];
    out.push(widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-"));
    out.extend(rows.iter().map(|r| line(r)));
    Ok(out.join("\n"))
}
