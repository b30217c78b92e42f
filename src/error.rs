//! Error types for the loading and view-spec layers.
//!
//! Decoding CSV and computing views never fail; only reading files,
//! interpreting JSON, and parsing view-spec text can.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced outside the total decode/view cores.
#[derive(Debug, Error)]
pub enum ViewError {
    /// A file could not be read or written.
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON input was not well-formed.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON input parsed, but the top-level value is not an array.
    #[error("JSON input must be an array of objects")]
    NotAnArray,

    /// An element of the JSON array is not an object.
    #[error("JSON element {index} is not an object")]
    NotAnObject { index: usize },

    /// A view-spec line could not be parsed.
    #[error("line {line}: {message}")]
    Spec { line: usize, message: String },
}

impl ViewError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ViewError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_error_names_line() {
        let err = ViewError::Spec {
            line: 3,
            message: "Unknown command: FOO".to_string(),
        };
        assert_eq!(err.to_string(), "line 3: Unknown command: FOO");
    }

    #[test]
    fn test_io_error_names_path() {
        let err = ViewError::io(
            "data/missing.csv",
            io::Error::new(io::ErrorKind::NotFound, "not found"),
        );
        assert_eq!(err.to_string(), "data/missing.csv: not found");
    }
}
