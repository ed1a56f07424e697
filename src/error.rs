//! Error types for the Hedvig adapter
//!
//! Provides structured error types for session acquisition, command encoding,
//! response decoding, identifier parsing, and the per-kind lifecycle rules.

use crate::resources::validation::DiskRule;
use thiserror::Error;

/// Unified error type for the adapter
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Session Errors
    // =========================================================================
    #[error("Authentication failed: {0}")]
    Auth(String),

    // =========================================================================
    // Identifier Errors
    // =========================================================================
    #[error("Malformed {kind} identifier '{id}': expected {expected} fields, found {found}")]
    MalformedIdentifier {
        kind: String,
        id: String,
        expected: usize,
        found: usize,
    },

    #[error("Invalid {kind} identifier field '{field}': {reason}")]
    InvalidIdentifierField {
        kind: String,
        field: String,
        reason: String,
    },

    // =========================================================================
    // Wire Errors
    // =========================================================================
    #[error("Value for '{field}' cannot be encoded: {reason}")]
    UnencodableValue { field: String, reason: String },

    #[error("Failed to decode {operation} response: {reason}")]
    Decode { operation: String, reason: String },

    #[error("Remote rejected {operation}: {message}")]
    RemoteRejection { operation: String, message: String },

    // =========================================================================
    // Transport Errors
    // =========================================================================
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {status} for {operation}")]
    HttpStatus { status: u16, operation: String },

    // =========================================================================
    // Attribute Errors
    // =========================================================================
    #[error("Validation failed: {0}")]
    Validation(#[from] DiskRule),

    #[error("Invalid attribute '{field}': {reason}")]
    InvalidAttribute { field: String, reason: String },

    #[error("Attribute '{field}' of {kind} cannot be changed in place; recreate the resource")]
    ImmutableAttribute { kind: String, field: String },

    #[error("Cannot downsize disk {name} from {current} GB to {requested} GB")]
    CannotDownsize {
        name: String,
        current: u64,
        requested: u64,
    },

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this error is transient
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Transport(_) => true,
            Error::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Check if re-invoking the same operation could succeed.
    ///
    /// The adapter itself never retries; this is advice for the orchestrating caller.
    pub fn is_retryable(&self) -> bool {
        self.is_transient() || matches!(self, Error::Auth(_))
    }

    /// Errors detected locally, before any request reached the cluster
    pub fn raised_before_network(&self) -> bool {
        matches!(
            self,
            Error::MalformedIdentifier { .. }
                | Error::InvalidIdentifierField { .. }
                | Error::UnencodableValue { .. }
                | Error::Validation(_)
                | Error::InvalidAttribute { .. }
                | Error::ImmutableAttribute { .. }
                | Error::Configuration(_)
        )
    }
}

/// Result type alias for the adapter
pub type Result<T> = std::result::Result<T, Error>;
