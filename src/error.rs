//! Error types for inboxlens

use std::path::PathBuf;
use thiserror::Error;

/// Failures while turning a source file into a raw table
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Cannot read {path:?}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Source file is empty")]
    Empty,

    #[error("Source file contains no parseable rows")]
    NoRows,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Error loading data: {0}")]
    Load(#[from] LoadError),

    #[error("Your file is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Failed to initialize {model}: {reason}")]
    ModelUnavailable { model: &'static str, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl Error {
    /// Remediation text shown under the error message
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Error::Load(_) => Some(
                "Please ensure your CSV/TSV file is correctly formatted and has the expected columns.",
            ),
            Error::MissingColumns(_) => {
                Some("Please ensure your CSV/TSV file has these columns: Subject, Sender, Date, Body.")
            }
            Error::ModelUnavailable { .. } => {
                Some("Check the sentiment lexicon and entity patterns shipped with this build, then restart.")
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message_lists_names() {
        let err = Error::MissingColumns(vec!["Date".into(), "Body".into()]);
        assert_eq!(
            err.to_string(),
            "Your file is missing required columns: Date, Body"
        );
        assert!(err.hint().is_some());
    }

    #[test]
    fn test_load_error_wraps() {
        let err: Error = LoadError::NoRows.into();
        assert!(err.to_string().contains("no parseable rows"));
    }
}
