//! Error types for reparto
//!
//! Every failure mode of the harness is a named variant: per-classifier
//! failures (`Fit`/`Predict`) are recovered inside a trial, per-trial
//! failures (`Partition`/`Selection`/`Dataset`) are recovered at the
//! scheduler, and `Persist`/`InvalidConfig` are fatal to the whole run.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Reparto error types
#[derive(Error, Debug)]
pub enum Error {
    /// A requested train/test split cannot be produced
    #[error("Partition error: {0}")]
    Partition(String),

    /// Variable selection rejected its inputs (e.g. k exceeds variable count)
    #[error("Selection error: {0}")]
    Selection(String),

    /// A classifier could not produce a model for the given training data
    #[error("Fit error ({classifier}): {message}")]
    Fit {
        /// Name of the classifier that failed
        classifier: &'static str,
        /// Algorithm-specific failure description
        message: String,
    },

    /// A fitted model could not score the given test data
    #[error("Predict error ({classifier}): {message}")]
    Predict {
        /// Name of the classifier that failed
        classifier: &'static str,
        /// Algorithm-specific failure description
        message: String,
    },

    /// Dataset could not be loaded or failed validation
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Any other failure inside a single trial
    #[error("Trial error: {0}")]
    Trial(String),

    /// Failure writing the final batch result (fatal, no partial output)
    #[error("Persist error: {0}")]
    Persist(String),

    /// Run configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Short machine-readable kind tag, used as the failure marker key
    /// in trial records.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Partition(_) => "partition",
            Self::Selection(_) => "selection",
            Self::Fit { .. } => "fit",
            Self::Predict { .. } => "predict",
            Self::Dataset(_) => "dataset",
            Self::Trial(_) => "trial",
            Self::Persist(_) => "persist",
            Self::InvalidConfig(_) => "config",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_classifier_name() {
        let err = Error::Fit {
            classifier: "rda",
            message: "singular covariance".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("rda"));
        assert!(msg.contains("singular covariance"));
    }

    #[test]
    fn test_error_kind_tags() {
        assert_eq!(Error::Partition("x".into()).kind(), "partition");
        assert_eq!(Error::Selection("x".into()).kind(), "selection");
        assert_eq!(
            Error::Predict {
                classifier: "lda",
                message: "x".into()
            }
            .kind(),
            "predict"
        );
        assert_eq!(Error::Persist("x".into()).kind(), "persist");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert_eq!(err.kind(), "io");
    }
}
