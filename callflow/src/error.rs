//! Call flow error types
//!
//! Structured errors for everything that can go wrong server-side while
//! driving a call. Caller input problems are not errors: they surface as
//! retry/hangup directives through the normal flow.

use thiserror::Error;

/// Result type alias for call flow operations
pub type FlowResult<T> = Result<T, FlowError>;

/// Errors that can occur while dispatching call events
#[derive(Error, Debug)]
pub enum FlowError {
    /// Inbound event named a step this build does not know
    #[error("Unknown call step: {step}")]
    UnknownStep { step: String },

    /// Message catalog has no template for this locale/key pair
    #[error("No '{locale}' template for message key '{key}'")]
    MissingTemplate { locale: String, key: String },

    /// Identity record store could not be read or written
    #[error("Identity store error: {message}")]
    Store { message: String },

    /// External intent classifier failed or returned an unusable label
    #[error("Intent classifier error: {message}")]
    Classifier { message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Server-side defect in the flow itself (illegal step transition,
    /// handler invariant broken)
    #[error("Internal flow error: {message}")]
    Internal { message: String },

    /// IO error wrapper
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FlowError {
    /// Create an unknown step error
    pub fn unknown_step(step: impl Into<String>) -> Self {
        Self::UnknownStep { step: step.into() }
    }

    /// Create a missing template error
    pub fn missing_template(locale: impl Into<String>, key: impl Into<String>) -> Self {
        Self::MissingTemplate {
            locale: locale.into(),
            key: key.into(),
        }
    }

    /// Create an identity store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Create a classifier error
    pub fn classifier(message: impl Into<String>) -> Self {
        Self::Classifier {
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal flow error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True for failures of an external collaborator (store, classifier,
    /// filesystem) as opposed to defects in this build or its configuration.
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            Self::Store { .. } | Self::Classifier { .. } | Self::Io(_) | Self::Json(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FlowError::unknown_step("process-fax");
        assert!(err.to_string().contains("process-fax"));

        let err = FlowError::missing_template("es", "ask_zip");
        assert!(err.to_string().contains("es"));
        assert!(err.to_string().contains("ask_zip"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let flow_err: FlowError = io_err.into();
        assert!(matches!(flow_err, FlowError::Io(_)));
    }

    #[test]
    fn test_external_classification() {
        assert!(FlowError::store("unreachable").is_external());
        assert!(FlowError::classifier("timeout").is_external());
        assert!(!FlowError::unknown_step("bogus").is_external());
        assert!(!FlowError::missing_template("en", "greeting").is_external());
        assert!(!FlowError::config("bad cutoff").is_external());
    }
}
