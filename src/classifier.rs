//! Designation -> cadre classification over a whole dataset.

use crate::cadre::{CADRE_COLUMN, UNMAPPED};
use crate::cleaning::MISSING;
use crate::dataset;
use crate::error::{Result, WranglerError};
use crate::mapping::MappingTable;
use indexmap::IndexSet;
use polars::prelude::*;
use tracing::{error, info};

/// Outcome of one classification pass.
///
/// A missing designation column is not fatal: the dataset comes back
/// untouched and `error` carries the reason.
#[derive(Debug)]
pub struct Classification {
    pub dataset: DataFrame,
    pub error: Option<WranglerError>,
    pub mapped: usize,
    pub unmapped: usize,
}

impl Classification {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<DataFrame> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.dataset),
        }
    }
}

/// Share of rows per cadre value.
#[derive(Debug, Clone, PartialEq)]
pub struct CadreShare {
    pub cadre: String,
    pub count: usize,
    pub percent: f64,
}

/// Add or overwrite the `Cadre` column from the current mapping table.
pub fn classify(mut df: DataFrame, designation_column: &str, table: &MappingTable) -> Classification {
    if !dataset::has_column(&df, designation_column) {
        let err = WranglerError::MissingColumn(designation_column.to_string());
        error!("{}", err);
        return Classification {
            dataset: df,
            error: Some(err),
            mapped: 0,
            unmapped: 0,
        };
    }

    let designations = match dataset::column_strings(&df, designation_column) {
        Ok(values) => values,
        Err(err) => {
            return Classification {
                dataset: df,
                error: Some(err),
                mapped: 0,
                unmapped: 0,
            };
        }
    };

    // A null designation is looked up under the same key cleaning fills in.
    let labels: Vec<&str> = designations
        .iter()
        .map(|d| table.lookup(d.as_deref().unwrap_or(MISSING)).label())
        .collect();
    let unmapped = labels.iter().filter(|l| **l == UNMAPPED).count();
    let mapped = labels.len() - unmapped;

    let written = df.with_column(Series::new(CADRE_COLUMN, labels)).map(|_| ());
    if let Err(e) = written {
        return Classification {
            dataset: df,
            error: Some(e.into()),
            mapped: 0,
            unmapped: 0,
        };
    }

    info!("Classified {} rows: {} mapped, {} unmapped", mapped + unmapped, mapped, unmapped);
    Classification {
        dataset: df,
        error: None,
        mapped,
        unmapped,
    }
}

/// Distinct designations of rows still marked `Unmapped`, in first-seen order.
///
/// Null designations are reported as `N/A`, matching `classify`, so mapping
/// every returned key leaves no `Unmapped` rows behind.
pub fn unresolved(df: &DataFrame, designation_column: &str) -> Result<Vec<String>> {
    if !dataset::has_column(df, CADRE_COLUMN) {
        return Err(WranglerError::MissingColumn(CADRE_COLUMN.to_string()));
    }
    if !dataset::has_column(df, designation_column) {
        return Err(WranglerError::MissingColumn(designation_column.to_string()));
    }

    let cadres = dataset::column_strings(df, CADRE_COLUMN)?;
    let designations = dataset::column_strings(df, designation_column)?;

    let pending: IndexSet<String> = cadres
        .into_iter()
        .zip(designations)
        .filter(|(cadre, _)| cadre.as_deref() == Some(UNMAPPED))
        .map(|(_, designation)| designation.unwrap_or_else(|| MISSING.to_string()))
        .collect();
    Ok(pending.into_iter().collect())
}

/// Counts and percentages of each value in the `Cadre` column.
pub fn cadre_distribution(df: &DataFrame) -> Result<Vec<CadreShare>> {
    let counts = dataset::value_counts(df, CADRE_COLUMN)?;
    let total = df.height().max(1) as f64;
    Ok(counts
        .into_iter()
        .map(|(cadre, count)| CadreShare {
            cadre,
            count,
            percent: count as f64 * 100.0 / total,
        })
        .collect())
}
