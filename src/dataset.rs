//! Helpers over the string-typed data frames used for uploaded datasets.

use crate::error::Result;
use crate::ingestion::RawGrid;
use polars::prelude::*;
use std::collections::HashMap;

/// Build a data frame from a raw grid; every column is `String`.
pub fn from_grid(grid: RawGrid) -> Result<DataFrame> {
    let columns: Vec<Series> = grid
        .headers
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let values: Vec<Option<String>> = grid
                .rows
                .iter()
                .map(|row| row.get(idx).cloned().flatten())
                .collect();
            Series::new(name.as_str(), values)
        })
        .collect();

    Ok(DataFrame::new(columns)?)
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| *c == name)
}

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

/// Values of one column as text, casting non-string columns.
pub fn column_strings(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = df.column(name)?;
    let series = if matches!(series.dtype(), DataType::String) {
        series.clone()
    } else {
        series.cast(&DataType::String)?
    };
    Ok(series
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// All cells, row-major, nulls rendered as empty strings.
pub fn rows_as_strings(df: &DataFrame) -> Result<Vec<Vec<String>>> {
    let mut rows = vec![Vec::with_capacity(df.width()); df.height()];
    for name in column_names(df) {
        for (row, value) in rows.iter_mut().zip(column_strings(df, &name)?) {
            row.push(value.unwrap_or_default());
        }
    }
    Ok(rows)
}

/// Occurrences of each non-null value, most frequent first.
///
/// Ties are ordered by value so the output is deterministic.
pub fn value_counts(df: &DataFrame, name: &str) -> Result<Vec<(String, usize)>> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in column_strings(df, name)?.into_iter().flatten() {
        *counts.entry(value).or_insert(0) += 1;
    }
    let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_counts_order() {
        let df = df![
            "district_name" => ["Badin", "Thatta", "Thatta", "Badin", "Sujawal", "Thatta"],
        ]
        .unwrap();
        assert_eq!(
            value_counts(&df, "district_name").unwrap(),
            vec![
                ("Thatta".to_string(), 3),
                ("Badin".to_string(), 2),
                ("Sujawal".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_from_grid() {
        let grid = RawGrid {
            headers: vec!["a".to_string(), "b".to_string()],
            rows: vec![
                vec![Some("1".to_string()), None],
                vec![Some("2".to_string()), Some("x".to_string())],
            ],
        };
        let df = from_grid(grid).unwrap();

        assert_eq!(df.shape(), (2, 2));
        assert_eq!(column_strings(&df, "b").unwrap(), vec![None, Some("x".to_string())]);
        assert!(has_column(&df, "a"));
        assert!(!has_column(&df, "c"));
    }

    #[test]
    fn test_numeric_columns_cast_to_text() {
        let df = df![
            "count" => [3i64, 4],
        ]
        .unwrap();
        assert_eq!(
            column_strings(&df, "count").unwrap(),
            vec![Some("3".to_string()), Some("4".to_string())]
        );
        assert_eq!(rows_as_strings(&df).unwrap(), vec![vec!["3".to_string()], vec!["4".to_string()]]);
    }
}
