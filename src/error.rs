// file: src/error.rs
// description: Custom error types and result type aliases
// reference: https://docs.rs/thiserror

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Data format error in {file}: {message}")]
    DataFormat { file: String, message: String },

    #[error("Missing data: {0}")]
    MissingData(String),

    #[error("File operation failed for {path}: {source}")]
    FileOperation {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PipelineError {
    pub fn data_format(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DataFormat {
            file: file.into(),
            message: message.into(),
        }
    }

    /// True for failures caused by missing or malformed data and index state.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::DataFormat { .. }
                | Self::MissingData(_)
                | Self::FileOperation { .. }
                | Self::Database(_)
                | Self::Embedding(_)
                | Self::Retrieval(_)
        )
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_format_display() {
        let err = PipelineError::data_format("data/claims_data.csv", "line 3: invalid float");
        assert_eq!(
            err.to_string(),
            "Data format error in data/claims_data.csv: line 3: invalid float"
        );
        assert!(err.is_data_error());
    }

    #[test]
    fn test_generation_is_not_data_error() {
        let err = PipelineError::Generation("HTTP 500".to_string());
        assert!(!err.is_data_error());
    }
}
