//! Error types for generation plan execution
//!
//! Errors fall into two classes:
//!
//! - **Configuration** errors (malformed path, malformed media type reference,
//!   wrong argument count or type, formatting errors) abort the run.
//! - **Recoverable** errors (I/O, malformed documents, iteration failures) are
//!   caught by the plan that owns the failing step and turned into an absent
//!   binding or an empty result for the current input binding.

use thiserror::Error;

/// Generation plan errors
#[derive(Error, Debug)]
pub enum GenerateError {
    /// Invalid clause or argument configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed path expression
    #[error("Invalid path '{path}': {message}")]
    InvalidPath { path: String, message: String },

    /// Malformed media type reference (ACCEPT clause)
    #[error("Invalid media type reference: {0}")]
    InvalidMediaType(String),

    /// Wrong number of arguments to a function or iterator
    #[error("{function}: {message}")]
    Arity { function: String, message: String },

    /// Expression evaluation error
    #[error("Evaluation error: {0}")]
    Eval(String),

    /// Template formatting error
    #[error("Format error in {call}: {message}")]
    Format { call: String, message: String },

    /// No function registered under this IRI
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// No iterator registered under this IRI
    #[error("Unknown iterator: {0}")]
    UnknownIterator(String),

    /// Iteration failed (document could not be acquired or scanned)
    #[error("Iteration failed: {0}")]
    Iteration(String),

    /// I/O error while reading a document
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON syntax error in a document
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GenerateError {
    /// Whether the owning plan may recover from this error locally
    ///
    /// Recoverable errors degrade to an absent binding or an empty result;
    /// everything else aborts the generation run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            GenerateError::Iteration(_) | GenerateError::Io(_) | GenerateError::Json(_)
        )
    }

    pub(crate) fn arity(function: impl Into<String>, message: impl Into<String>) -> Self {
        GenerateError::Arity {
            function: function.into(),
            message: message.into(),
        }
    }
}

/// Result type for generation operations
pub type Result<T> = std::result::Result<T, GenerateError>;
