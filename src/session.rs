//! One operator's working session.
//!
//! The session owns its mapping table and current dataset. Every operation
//! returns failures as values and leaves the session in its last good state,
//! so a bad upload or a failed question never ends the session.

use crate::classifier::{self, CadreShare};
use crate::cleaning::{self, CleaningReport};
use crate::config::AppConfig;
use crate::context::ColumnRoles;
use crate::data_assistant::{Answer, DataAssistant};
use crate::error::{Result, WranglerError};
use crate::export;
use crate::ingestion::{self, HeaderMode};
use crate::mapping::{MappingTable, SeedReport};
use crate::preview::{self, Preview, ViewOptions};
use crate::reconcile::{OperatorPrompt, Reconciler, RunOutcome};
use polars::prelude::DataFrame;
use std::path::Path;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct UploadSummary {
    pub rows: usize,
    pub columns: Vec<String>,
    pub cleaning: CleaningReport,
    pub mapped: usize,
    pub unmapped: usize,
    pub unresolved: Vec<String>,
}

pub struct Session {
    table: MappingTable,
    seed_report: SeedReport,
    dataset: Option<DataFrame>,
    roles: ColumnRoles,
    last_error: Option<String>,
}

impl Session {
    /// Session starting from the seed mappings.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let (table, seed_report) = MappingTable::seeded()?;
        let mut session = Self::with_table(table, config);
        session.seed_report = seed_report;
        Ok(session)
    }

    pub fn with_table(table: MappingTable, config: &AppConfig) -> Self {
        Self {
            table,
            seed_report: SeedReport::default(),
            dataset: None,
            roles: ColumnRoles {
                district: config.district_column.clone(),
                designation: config.designation_column.clone(),
                ..ColumnRoles::default()
            },
            last_error: None,
        }
    }

    pub fn table(&self) -> &MappingTable {
        &self.table
    }

    pub fn seed_report(&self) -> &SeedReport {
        &self.seed_report
    }

    pub fn dataset(&self) -> Option<&DataFrame> {
        self.dataset.as_ref()
    }

    pub fn roles(&self) -> &ColumnRoles {
        &self.roles
    }

    pub fn designation_column(&self) -> &str {
        &self.roles.designation
    }

    pub fn set_designation_column(&mut self, column: impl Into<String>) {
        self.roles.designation = column.into();
    }

    /// Switch the designation column and reclassify the current dataset.
    ///
    /// If the column is absent the previous one stays selected and the
    /// dataset is left as it was.
    pub fn change_designation_column(&mut self, column: impl Into<String>) -> Result<()> {
        let previous = std::mem::replace(&mut self.roles.designation, column.into());
        let result = self.classify();
        if result.is_err() {
            self.roles.designation = previous;
        }
        result
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.last_error = None,
            Err(e) => {
                if e.is_input_error() {
                    warn!("Rejected input: {}", e);
                } else {
                    error!("{}", e);
                }
                self.last_error = Some(e.to_string());
            }
        }
        result
    }

    fn current(&self) -> Result<&DataFrame> {
        self.dataset
            .as_ref()
            .ok_or_else(|| WranglerError::EmptyInput("no dataset uploaded".to_string()))
    }

    pub fn upload(&mut self, path: impl AsRef<Path>, header_mode: Option<HeaderMode>) -> Result<UploadSummary> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let bytes = std::fs::read(path).map_err(WranglerError::from);
        let result = bytes.and_then(|bytes| self.process_upload(&file_name, bytes, header_mode));
        self.record(result)
    }

    pub fn upload_bytes(
        &mut self,
        file_name: &str,
        bytes: Vec<u8>,
        header_mode: Option<HeaderMode>,
    ) -> Result<UploadSummary> {
        let result = self.process_upload(file_name, bytes, header_mode);
        self.record(result)
    }

    /// Load, clean and classify; the dataset is replaced only on success.
    fn process_upload(
        &mut self,
        file_name: &str,
        bytes: Vec<u8>,
        header_mode: Option<HeaderMode>,
    ) -> Result<UploadSummary> {
        let raw = ingestion::load_bytes(file_name, bytes, header_mode)?;
        let (cleaned, cleaning) = cleaning::clean(raw)?;

        let classification = classifier::classify(cleaned, &self.roles.designation, &self.table);
        let (mapped, unmapped) = (classification.mapped, classification.unmapped);
        let dataset = classification.into_result()?;
        let unresolved = classifier::unresolved(&dataset, &self.roles.designation)?;

        let summary = UploadSummary {
            rows: dataset.height(),
            columns: crate::dataset::column_names(&dataset),
            cleaning,
            mapped,
            unmapped,
            unresolved,
        };
        info!("Uploaded {}: {} rows, {} unmapped", file_name, summary.rows, summary.unmapped);
        self.dataset = Some(dataset);
        Ok(summary)
    }

    /// Reclassify the current dataset against the current table.
    pub fn classify(&mut self) -> Result<()> {
        let result = self.current().cloned().and_then(|df| {
            classifier::classify(df, &self.roles.designation, &self.table).into_result()
        });
        let result = result.map(|df| {
            self.dataset = Some(df);
        });
        self.record(result)
    }

    pub fn unresolved(&self) -> Result<Vec<String>> {
        classifier::unresolved(self.current()?, &self.roles.designation)
    }

    pub fn cadre_distribution(&self) -> Result<Vec<CadreShare>> {
        classifier::cadre_distribution(self.current()?)
    }

    /// Run the reconciliation loop against this session's table.
    ///
    /// Mappings committed before an abort are kept; the dataset is then
    /// reclassified so it matches the table.
    pub fn reconcile(&mut self, prompt: &mut dyn OperatorPrompt) -> Result<RunOutcome> {
        let df = match self.current().cloned() {
            Ok(df) => df,
            Err(e) => return self.record(Err(e)),
        };

        let mut reconciler = Reconciler::new(self.roles.designation.clone());
        match reconciler.run(prompt, &mut self.table, df) {
            Ok(outcome) => {
                self.dataset = Some(outcome.dataset.clone());
                self.record(Ok(outcome))
            }
            Err(e) => {
                if let Err(reclassify) = self.classify() {
                    error!("Reclassification after stopped reconciliation failed: {}", reclassify);
                }
                self.record(Err(e))
            }
        }
    }

    pub fn preview(&self, options: &ViewOptions) -> Result<Preview> {
        preview::apply(self.current()?, options)
    }

    /// Workbook of the current dataset, optionally narrowed by a view.
    pub fn export_dataset(&mut self, view: Option<&ViewOptions>) -> Result<Vec<u8>> {
        let result = self.current().and_then(|df| match view {
            Some(options) => {
                let rows = preview::filter_rows(df, options)?;
                let rows = if options.columns.is_empty() {
                    rows
                } else {
                    rows.select(options.columns.iter().map(String::as_str))?
                };
                export::export_dataset_xlsx(&rows)
            }
            None => export::export_dataset_xlsx(df),
        });
        self.record(result)
    }

    pub fn export_mapping(&mut self) -> Result<String> {
        let result = export::export_mapping(&self.table);
        self.record(result)
    }

    pub async fn ask(&mut self, assistant: &DataAssistant, question: &str) -> Result<Answer> {
        let result = match self.current() {
            Ok(df) => assistant.ask(df, question).await,
            Err(e) => Err(e),
        };
        self.record(result)
    }
}
