//! Unified error handling for the trendlens crate
//!
//! This module provides a unified error type that consolidates query-boundary
//! validation errors and infrastructure errors into a single `Error` enum.
//!
//! # Architecture
//!
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum used across module boundaries
//!
//! "No matching data" is deliberately absent from this enum: an empty corpus
//! slice produces an empty, well-formed result so callers can distinguish
//! "nothing found" from "request malformed".

use std::io;
use thiserror::Error;

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Parameter validation errors (dates, modes, ranges)
    Validation,
    /// Corpus store and I/O errors
    Storage,
    /// Configuration and word-group definition errors
    Config,
    /// External collaborator (crawler) errors
    Upstream,
    /// Query cancelled by the caller
    Cancelled,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Get string representation for logs and status output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Storage => "storage",
            Self::Config => "config",
            Self::Upstream => "upstream",
            Self::Cancelled => "cancelled",
            Self::Other => "other",
        }
    }
}

/// Unified error type for the trendlens crate
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or out-of-policy date input
    #[error("Invalid date expression: {0}")]
    InvalidDateExpression(String),

    /// Unknown analysis/insight/search mode or time preset
    #[error("Unsupported {kind}: {value}")]
    UnsupportedMode { kind: &'static str, value: String },

    /// Numeric parameter outside its documented bounds
    #[error("Parameter {name} out of range: {value} (expected {bounds})")]
    OutOfRangeParameter {
        name: &'static str,
        value: f64,
        bounds: &'static str,
    },

    /// Corpus store or crawling collaborator failed
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Query cancelled by the caller before completion
    #[error("Query cancelled")]
    Cancelled,

    /// Configuration errors (fatal at startup for word-group definitions)
    #[error("Config error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Report template rendering errors
    #[error("Template error: {0}")]
    Template(#[from] handlebars::RenderError),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Check if this error is recoverable (the query can be retried)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::InvalidDateExpression(_)
            | Self::UnsupportedMode { .. }
            | Self::OutOfRangeParameter { .. }
            | Self::Config(_)
            | Self::Json(_)
            | Self::Template(_) => false,
            // Upstream and I/O failures are often transient
            Self::UpstreamUnavailable(_) | Self::Io(_) | Self::Cancelled => true,
            Self::Other { .. } => false,
        }
    }

    /// Get the error category for handling strategies
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidDateExpression(_)
            | Self::UnsupportedMode { .. }
            | Self::OutOfRangeParameter { .. } => ErrorCategory::Validation,
            Self::Io(_) | Self::Json(_) => ErrorCategory::Storage,
            Self::Config(_) | Self::Template(_) => ErrorCategory::Config,
            Self::UpstreamUnavailable(_) => ErrorCategory::Upstream,
            Self::Cancelled => ErrorCategory::Cancelled,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an unsupported-mode error
    pub fn unsupported(kind: &'static str, value: impl Into<String>) -> Self {
        Self::UnsupportedMode {
            kind,
            value: value.into(),
        }
    }

    /// Create an out-of-range parameter error
    pub fn out_of_range(name: &'static str, value: f64, bounds: &'static str) -> Self {
        Self::OutOfRangeParameter {
            name,
            value,
            bounds,
        }
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

// Conversion from anyhow::Error at the CLI boundary
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: err.to_string(),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category() {
        let date_err = Error::InvalidDateExpression("next blue moon".to_string());
        assert_eq!(date_err.category(), ErrorCategory::Validation);

        let up_err = Error::UpstreamUnavailable("no crawler wired".to_string());
        assert_eq!(up_err.category(), ErrorCategory::Upstream);
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::UpstreamUnavailable("transient".to_string()).is_recoverable());
        assert!(!Error::unsupported("analysisType", "sideways").is_recoverable());
        assert!(!Error::config("bad word group").is_recoverable());
    }

    #[test]
    fn test_unsupported_mode_message() {
        let err = Error::unsupported("searchMode", "semantic");
        assert_eq!(err.to_string(), "Unsupported searchMode: semantic");
    }

    #[test]
    fn test_out_of_range_message() {
        let err = Error::out_of_range("threshold", 1.5, "[0, 1]");
        assert!(err.to_string().contains("threshold"));
        assert!(err.to_string().contains("1.5"));
    }

    #[test]
    fn test_category_as_str() {
        assert_eq!(ErrorCategory::Validation.as_str(), "validation");
        assert_eq!(ErrorCategory::Upstream.as_str(), "upstream");
    }
}
