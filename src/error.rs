use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Row could not become a record (missing or unparseable timestamp).
    #[error("row {row}: {reason}")]
    MalformedRecord { row: usize, reason: String },
    #[error("no groups to select from")]
    EmptyInput,
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("input parse error: {0}")]
    Input(#[from] serde_json::Error),
}
