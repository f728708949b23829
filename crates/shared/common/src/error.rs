//! Unified error handling for the account core.
//!
//! Provides a single error type returned by repositories, caches and the
//! account service. Each variant is scoped to the failing call; none is
//! fatal to the process.

use domain::{DomainError, Field};
use thiserror::Error;

/// Application error types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    // Resource errors
    #[error("Resource not found")]
    NotFound,

    #[error("{field} already exists")]
    AlreadyExists { field: Field },

    // Authentication
    //
    // Unknown accounts and wrong passwords share this variant so callers
    // cannot probe for account existence.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is inactive")]
    UserInactive,

    // Validation
    #[error("Invalid {field}: {reason}")]
    Validation { field: Field, reason: String },

    // External collaborators
    #[error("Persistence error while trying to {operation}: {cause}")]
    Persistence { operation: &'static str, cause: String },

    #[error("Cache error: {cause}")]
    Cache { cause: String },

    #[error("Password hashing error: {cause}")]
    Hashing { cause: String },

    #[error("Operation cancelled: {operation}")]
    Cancelled { operation: &'static str },
}

impl AppError {
    /// Get error code for client
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound => "NOT_FOUND",
            AppError::AlreadyExists { .. } => "ALREADY_EXISTS",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::UserInactive => "USER_INACTIVE",
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::Persistence { .. } => "PERSISTENCE_ERROR",
            AppError::Cache { .. } => "CACHE_ERROR",
            AppError::Hashing { .. } => "HASHING_ERROR",
            AppError::Cancelled { .. } => "CANCELLED",
        }
    }

    /// Whether the error was caused by the caller's input rather than
    /// an infrastructure failure
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::NotFound
                | AppError::AlreadyExists { .. }
                | AppError::InvalidCredentials
                | AppError::UserInactive
                | AppError::Validation { .. }
        )
    }

    /// Get user-facing message (hides internal details)
    pub fn user_message(&self) -> String {
        match self {
            AppError::Persistence { operation, cause } => {
                tracing::error!(operation = %operation, "Persistence error: {}", cause);
                "A storage error occurred".to_string()
            }
            AppError::Cache { cause } => {
                tracing::error!("Cache error: {}", cause);
                "A cache error occurred".to_string()
            }
            AppError::Hashing { cause } => {
                tracing::error!("Hashing error: {}", cause);
                "An internal error occurred".to_string()
            }

            // Use default message for others
            _ => self.to_string(),
        }
    }
}

// =============================================================================
// Domain Error Conversion
// =============================================================================

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation { field, reason } => AppError::Validation { field, reason },
            DomainError::Hashing(cause) => AppError::Hashing { cause },
        }
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self) -> AppResult<T> {
        self.ok_or(AppError::NotFound)
    }
}

/// Convenience constructors
impl AppError {
    pub fn already_exists(field: Field) -> Self {
        AppError::AlreadyExists { field }
    }

    pub fn validation(field: Field, reason: impl Into<String>) -> Self {
        AppError::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn persistence(operation: &'static str, cause: impl ToString) -> Self {
        AppError::Persistence {
            operation,
            cause: cause.to_string(),
        }
    }

    pub fn cache(cause: impl ToString) -> Self {
        AppError::Cache {
            cause: cause.to_string(),
        }
    }

    pub fn hashing(cause: impl ToString) -> Self {
        AppError::Hashing {
            cause: cause.to_string(),
        }
    }

    pub fn cancelled(operation: &'static str) -> Self {
        AppError::Cancelled { operation }
    }
}
