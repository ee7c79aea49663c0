use thiserror::Error;

#[derive(Error, Debug)]
pub enum WranglerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Column '{0}' not found in the uploaded file")]
    MissingColumn(String),

    #[error("Unknown cadre: '{0}'")]
    UnknownCadre(String),

    #[error("Designation '{0}' is not awaiting a cadre")]
    NotPending(String),

    #[error("Reconciliation aborted by operator")]
    Aborted,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No API key configured (set GOOGLE_API_KEY)")]
    MissingApiKey,

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Polars error: {0}")]
    Polars(String),
}

impl From<polars::error::PolarsError> for WranglerError {
    fn from(err: polars::error::PolarsError) -> Self {
        WranglerError::Polars(err.to_string())
    }
}

impl From<calamine::Error> for WranglerError {
    fn from(err: calamine::Error) -> Self {
        WranglerError::Spreadsheet(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for WranglerError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        WranglerError::Export(err.to_string())
    }
}

impl WranglerError {
    /// Input errors halt processing of the current upload.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            WranglerError::Io(_)
                | WranglerError::Csv(_)
                | WranglerError::Spreadsheet(_)
                | WranglerError::UnsupportedFormat(_)
                | WranglerError::EmptyInput(_)
                | WranglerError::MissingColumn(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, WranglerError>;
