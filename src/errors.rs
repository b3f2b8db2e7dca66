//! # Access Errors
//!
//! Failures shared by the policy, store, validation and retrieval layers.
//!
//! The legacy validator propagates the first of these to its caller. The
//! streaming path records them per volume and reports them inside the
//! archive's trailing error entry.

use thiserror::Error;

/// Result type for access operations
pub type AccessResult<T> = Result<T, AccessError>;

/// Access errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// Requested volume or page does not exist in the store
    #[error("Key not found: {token}")]
    KeyNotFound { token: String },

    /// A configured quota was exceeded
    #[error("Policy violation: {policy} limit {limit} exceeded (observed {observed}) at {token}")]
    PolicyViolation {
        policy: String,
        limit: u64,
        observed: u64,
        token: String,
    },

    /// Backing store operation failed after its own retry budget
    #[error("Repository failure: {message}")]
    RepositoryFailure { message: String },
}

impl AccessError {
    /// Key not found for the given token
    pub fn key_not_found(token: impl Into<String>) -> Self {
        AccessError::KeyNotFound {
            token: token.into(),
        }
    }

    /// Repository failure with a message
    pub fn repository(message: impl Into<String>) -> Self {
        AccessError::RepositoryFailure {
            message: message.into(),
        }
    }

    /// Short kind label, used in the archive error entry
    pub fn kind(&self) -> &'static str {
        match self {
            AccessError::KeyNotFound { .. } => "KeyNotFound",
            AccessError::PolicyViolation { .. } => "PolicyViolation",
            AccessError::RepositoryFailure { .. } => "RepositoryFailure",
        }
    }

    /// Error code string
    pub fn code(&self) -> &'static str {
        match self {
            AccessError::KeyNotFound { .. } => "DATAAPI_KEY_NOT_FOUND",
            AccessError::PolicyViolation { .. } => "DATAAPI_POLICY_VIOLATION",
            AccessError::RepositoryFailure { .. } => "DATAAPI_REPOSITORY_FAILURE",
        }
    }

    /// The offending token, if the error names one
    pub fn token(&self) -> Option<&str> {
        match self {
            AccessError::KeyNotFound { token } => Some(token),
            AccessError::PolicyViolation { token, .. } => Some(token),
            AccessError::RepositoryFailure { .. } => None,
        }
    }

    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            AccessError::KeyNotFound { .. } => 404,
            AccessError::PolicyViolation { .. } => 403,
            AccessError::RepositoryFailure { .. } => 500,
        }
    }
}
