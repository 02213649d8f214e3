use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum PackError {
    #[error("input table is missing required column(s): {}", .0.join(", "))]
    #[diagnostic(help("the first row must contain headers named exactly `Item` and `URL`"))]
    MissingColumns(Vec<String>),

    #[error("failed to read input table: {0}")]
    TableRead(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("failed to start fetch worker: {0}")]
    WorkerSpawn(String),

    #[error("archive write failed: {0}")]
    Archive(String),

    #[error("failure report write failed: {0}")]
    Report(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl PackError {
    /// True for errors raised before any fetch starts; the operator fixes the
    /// input and runs again.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            PackError::MissingColumns(_)
                | PackError::TableRead(_)
                | PackError::ConfigRead(_)
                | PackError::ConfigParse(_)
                | PackError::InvalidConfig(_)
        )
    }
}
