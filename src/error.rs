// src/error.rs
// =============================================================================
// Error types for the converter.
//
// Every failure the tool can report is one of these variants. None of them
// is fatal to the process state: a failed import leaves the previous
// document set untouched, a refused export writes nothing.
//
// Broken images are NOT errors. A probe always resolves to an outcome, and
// a failed load is just the `Broken` outcome (see checker::probe).
// =============================================================================

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    /// Input text is not valid JSON, or is JSON of the wrong shape
    #[error("could not parse exam document: {message}")]
    Parse { message: String },

    /// Export was requested with nothing loaded
    #[error("nothing to export: the document set is empty")]
    ExportRefused,

    /// Serialization or writing the export file failed
    #[error("export failed: {0}")]
    ExportFailure(String),

    /// Reading the input file (or stdin) failed
    #[error("could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file missing or invalid
    #[error("configuration error: {0}")]
    Config(String),
}

impl ConvertError {
    pub fn parse(message: impl Into<String>) -> Self {
        ConvertError::Parse {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ConvertError {
    fn from(err: serde_json::Error) -> Self {
        ConvertError::parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
