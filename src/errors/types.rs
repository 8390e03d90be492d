//! # Error Types
//!
//! Crate-boundary error types for the gateway translator using `thiserror`.
//! These cover configuration and model loading; failures that happen inside a
//! translation pass are captured as [`TranslationError`](super::TranslationError)
//! values and written into the report instead.

/// Custom result type for translator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the gateway translator
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// I/O errors with additional context
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {context}")]
    Serialization {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
        context: String,
    },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String, field: Option<String> },

    /// Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Add context to an error
    pub fn with_context<S: Into<String>>(mut self, context: S) -> Self {
        let context = context.into();
        match &mut self {
            Error::Io { context: ctx, .. } | Error::Serialization { context: ctx, .. } => {
                *ctx = format!("{}: {}", context, ctx);
            }
            Error::Config { message, .. }
            | Error::Validation { message, .. }
            | Error::Internal { message } => {
                *message = format!("{}: {}", context, message);
            }
        }
        self
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io { source: error, context: "I/O operation failed".to_string() }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization {
            source: Box::new(error),
            context: "JSON serialization failed".to_string(),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(error: serde_yaml::Error) -> Self {
        Self::Serialization {
            source: Box::new(error),
            context: "YAML deserialization failed".to_string(),
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(error: config::ConfigError) -> Self {
        Self::config_with_source("Configuration loading failed", Box::new(error))
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect();
        fields.sort();

        Self::validation(format!("Validation failed: {}", fields.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = Error::config("Test configuration error");
        assert!(matches!(error, Error::Config { .. }));
        assert_eq!(error.to_string(), "Configuration error: Test configuration error");
    }

    #[test]
    fn test_validation_error() {
        let error = Error::validation_field("must be positive", "worker_threads");
        if let Error::Validation { field, .. } = error {
            assert_eq!(field, Some("worker_threads".to_string()));
        } else {
            panic!("expected validation error");
        }
    }

    #[test]
    fn test_error_conversions() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: Error = io_error.into();
        assert!(matches!(error, Error::Io { .. }));

        let json_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let error: Error = json_error.into();
        assert!(matches!(error, Error::Serialization { .. }));

        let yaml_error = serde_yaml::from_str::<Vec<u32>>("{not: a list}").unwrap_err();
        let error: Error = yaml_error.into();
        assert!(matches!(error, Error::Serialization { .. }));
    }

    #[test]
    fn test_context_is_prefixed() {
        let error = Error::internal("boom").with_context("loading proxy");
        assert_eq!(error.to_string(), "Internal error: loading proxy: boom");
    }
}
