//! Error types for protrep operations

use thiserror::Error;

/// Main error type for protrep operations
#[derive(Error, Debug)]
pub enum ProtrepError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already loaded: {0}")]
    AlreadyLoaded(String),

    #[error("{0}: no sequences mapped")]
    NoSequenceAvailable(String),

    #[error("{0}: no structures available")]
    NoStructureAvailable(String),

    #[error("{0}: no representative sequence to compare structures to")]
    NoRepresentativeSequence(String),

    #[error("{0}: no structure meets the quality cutoffs")]
    NoQualifyingStructure(String),

    #[error("Incomplete state: {0}")]
    IncompleteState(String),

    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    #[error("Alignment error: {0}")]
    Alignment(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type alias for protrep operations
pub type Result<T> = std::result::Result<T, ProtrepError>;

impl From<anyhow::Error> for ProtrepError {
    fn from(err: anyhow::Error) -> Self {
        ProtrepError::Retrieval(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_display() {
        let not_found = ProtrepError::NotFound("P12345".to_string());
        assert_eq!(format!("{}", not_found), "Not found: P12345");

        let no_seq = ProtrepError::NoSequenceAvailable("b1244".to_string());
        assert_eq!(format!("{}", no_seq), "b1244: no sequences mapped");

        let no_rep = ProtrepError::NoRepresentativeSequence("b1244".to_string());
        assert!(format!("{}", no_rep).contains("no representative sequence"));

        let no_qc = ProtrepError::NoQualifyingStructure("b1244".to_string());
        assert!(format!("{}", no_qc).contains("quality cutoffs"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: ProtrepError = io_err.into();

        match err {
            ProtrepError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::NotFound),
            _ => panic!("Expected Io error variant"),
        }
    }

    #[test]
    fn test_anyhow_error_conversion() {
        let anyhow_err = anyhow::anyhow!("connection refused");
        let err: ProtrepError = anyhow_err.into();

        match err {
            ProtrepError::Retrieval(msg) => assert_eq!(msg, "connection refused"),
            _ => panic!("Expected Retrieval error variant"),
        }
    }

    #[test]
    fn test_error_is_type_checking() {
        fn is_retrieval(err: &ProtrepError) -> bool {
            matches!(err, ProtrepError::Retrieval(_))
        }

        assert!(is_retrieval(&ProtrepError::Retrieval("timeout".into())));
        assert!(!is_retrieval(&ProtrepError::NotFound("x".into())));
    }
}
