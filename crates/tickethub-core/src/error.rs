//! Unified application error types for TicketHub.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator. Every error is recovered at the
//! service boundary and returned as structured data; nothing in this core
//! terminates the process.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Input validation failed.
    Validation,
    /// Login credentials were rejected. Deliberately indistinguishable
    /// between an unknown email and a wrong password.
    CredentialInvalid,
    /// The account exists but its state forbids the operation
    /// (unverified, unapproved, rejected).
    AccountState,
    /// A token's signature is valid but its expiry has passed.
    TokenExpired,
    /// A token is malformed, has a bad signature, or was superseded.
    TokenInvalid,
    /// A concurrent caller already rotated the presented token. Retryable.
    TokenConflict,
    /// The requested resource was not found.
    NotFound,
    /// A database error occurred.
    Database,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal server error occurred.
    Internal,
}

impl ErrorKind {
    /// HTTP status code the excluded transport layer maps this kind to.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::CredentialInvalid => 401,
            Self::AccountState => 403,
            Self::TokenExpired => 401,
            Self::TokenInvalid => 401,
            Self::TokenConflict => 409,
            Self::NotFound => 404,
            Self::Database => 500,
            Self::Configuration => 500,
            Self::Serialization => 500,
            Self::Internal => 500,
        }
    }

    /// Whether a client may safely retry the failed request as-is.
    ///
    /// Only a lost rotation race is designed for automatic retry; every
    /// other kind is terminal for that request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TokenConflict)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "VALIDATION"),
            Self::CredentialInvalid => write!(f, "CREDENTIAL_INVALID"),
            Self::AccountState => write!(f, "ACCOUNT_STATE"),
            Self::TokenExpired => write!(f, "TOKEN_EXPIRED"),
            Self::TokenInvalid => write!(f, "TOKEN_INVALID"),
            Self::TokenConflict => write!(f, "TOKEN_CONFLICT"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Database => write!(f, "DATABASE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error used throughout TicketHub.
///
/// All crate-specific errors are mapped into `AppError` using `From` impls
/// or explicit `.map_err()` calls. This provides a single error type for
/// the entire application boundary.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a credential error with the uniform login-failure message.
    pub fn credential_invalid() -> Self {
        Self::new(ErrorKind::CredentialInvalid, "Invalid email or password")
    }

    /// Create an account-state error.
    pub fn account_state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AccountState, message)
    }

    /// Create a token-expired error.
    pub fn token_expired(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TokenExpired, message)
    }

    /// Create a token-invalid error.
    pub fn token_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TokenInvalid, message)
    }

    /// Create a token-conflict error.
    pub fn token_conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TokenConflict, message)
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ErrorKind::Validation.status_code(), 400);
        assert_eq!(ErrorKind::CredentialInvalid.status_code(), 401);
        assert_eq!(ErrorKind::AccountState.status_code(), 403);
        assert_eq!(ErrorKind::TokenExpired.status_code(), 401);
        assert_eq!(ErrorKind::TokenInvalid.status_code(), 401);
        assert_eq!(ErrorKind::TokenConflict.status_code(), 409);
        assert_eq!(ErrorKind::NotFound.status_code(), 404);
    }

    #[test]
    fn test_only_conflict_is_retryable() {
        assert!(ErrorKind::TokenConflict.is_retryable());
        assert!(!ErrorKind::TokenExpired.is_retryable());
        assert!(!ErrorKind::TokenInvalid.is_retryable());
        assert!(!ErrorKind::CredentialInvalid.is_retryable());
    }

    #[test]
    fn test_display_codes() {
        let err = AppError::token_conflict("refresh token was already rotated");
        assert_eq!(
            err.to_string(),
            "TOKEN_CONFLICT: refresh token was already rotated"
        );
    }
}
