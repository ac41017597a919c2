use crate::commands::{ArgumentError, CompletionResult};
use crate::parameters::{ParseError, ValidationError};
use std::path::PathBuf;
use thiserror::Error;

/// Error types for the drprobe-rs library.
#[derive(Error, Debug)]
pub enum DrProbeError {
    /// The parameter file to load does not exist.
    #[error("parameter file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// The parameter file exists but could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line of the parameter file does not match its field.
    #[error("failed to load {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    /// A value violates the constraint of its field.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// I/O failure while saving a parameter file.
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Missing or malformed command-line arguments.
    #[error("argument error: {0}")]
    Argument(#[from] ArgumentError),

    /// The external program could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The external program exited with a non-zero status.
    #[error("{program} failed with exit code {}", display_code(.result))]
    SimulationFailure {
        program: String,
        result: CompletionResult,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn display_code(result: &CompletionResult) -> String {
    match result.exit_code {
        Some(code) => code.to_string(),
        None => "none (terminated by signal)".to_string(),
    }
}

/// Result type alias for drprobe-rs operations.
pub type Result<T> = std::result::Result<T, DrProbeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::StructuralError;

    #[test]
    fn test_error_display() {
        let err = DrProbeError::NotFound {
            path: PathBuf::from("prm/missing.prm"),
        };
        assert!(format!("{}", err).contains("prm/missing.prm"));

        let err = DrProbeError::Load {
            path: PathBuf::from("wavimg.prm"),
            source: ParseError {
                line: 7,
                field: "output_dim",
                source: StructuralError::UnexpectedEof,
            },
        };
        let message = format!("{}", err);
        assert!(message.contains("line 7"));
        assert!(message.contains("output_dim"));
    }

    #[test]
    fn test_simulation_failure_display() {
        let err = DrProbeError::SimulationFailure {
            program: "wavimg".to_string(),
            result: CompletionResult {
                exit_code: Some(3),
                stdout: String::new(),
                stderr: "error".to_string(),
            },
        };
        assert_eq!(format!("{}", err), "wavimg failed with exit code 3");

        let err = DrProbeError::SimulationFailure {
            program: "msa".to_string(),
            result: CompletionResult {
                exit_code: None,
                stdout: String::new(),
                stderr: String::new(),
            },
        };
        assert!(format!("{}", err).contains("terminated by signal"));
    }

    #[test]
    fn test_error_conversion() {
        let err: DrProbeError = ValidationError::UnknownField {
            name: "focus".to_string(),
        }
        .into();

        match err {
            DrProbeError::Validation(ValidationError::UnknownField { name }) => {
                assert_eq!(name, "focus")
            }
            _ => panic!("Expected Validation variant"),
        }

        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: DrProbeError = json_err.into();
        assert!(matches!(err, DrProbeError::Json(_)));
    }
}
