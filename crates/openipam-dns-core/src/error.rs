//! Error types for the OpenIPAM DNS-01 authenticator
//!
//! This module defines all error types used throughout the workspace.

use thiserror::Error;

/// Result type alias for authenticator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the authenticator
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed credentials / configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The TXT record for a challenge could not be created
    #[error("Failed to create TXT record for '{domain}': {message}")]
    RecordCreation {
        /// Domain being validated
        domain: String,
        /// Underlying failure
        message: String,
    },

    /// The TXT record for a challenge could not be removed
    ///
    /// Never fatal: cleanup reports it as a warning.
    #[error("Failed to delete TXT record for '{domain}': {message}")]
    RecordDeletion {
        /// Domain being validated
        domain: String,
        /// Underlying failure
        message: String,
    },

    /// Several TXT records exist at the name and none carries our value
    #[error("{candidates} TXT records exist at '{record_name}' and none matches the validation value")]
    AmbiguousRecord {
        /// Record name that was searched
        record_name: String,
        /// Number of records found at that name
        candidates: usize,
    },

    /// One or more challenges of a batch failed
    #[error("Challenge failed for: {}", failed.join(", "))]
    ChallengeFailed {
        /// Domains whose record could not be created
        failed: Vec<String>,
    },

    /// Invalid input (domain name, validation value)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Record or zone not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A remote call exceeded its time budget
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a record creation error for `domain`
    pub fn record_creation(domain: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::RecordCreation {
            domain: domain.into(),
            message: msg.into(),
        }
    }

    /// Create a record deletion warning for `domain`
    pub fn record_deletion(domain: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::RecordDeletion {
            domain: domain.into(),
            message: msg.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether this is a configuration problem the operator has to fix
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
