//! Domain-level error types.

use thiserror::Error;
use uuid::Uuid;

use crate::ports::AuthError;

/// Domain errors - business logic failures.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Caller does not own {entity_type} {id}")]
    Forbidden { entity_type: &'static str, id: Uuid },

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: &'static str, id: Uuid },

    #[error("Email already registered")]
    EmailTaken,

    #[error("Tag {id} is still linked to {posts} post(s)")]
    TagInUse { id: Uuid, posts: u64 },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Store(#[from] RepoError),
}

impl DomainError {
    /// Short, machine-stable code sent to clients in the `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "validation_failed",
            DomainError::InvalidCredentials => "invalid_credentials",
            DomainError::Unauthenticated => "unauthenticated",
            DomainError::Forbidden { .. } => "forbidden",
            DomainError::NotFound { .. } => "not_found",
            DomainError::EmailTaken => "email_taken",
            DomainError::TagInUse { .. } => "tag_in_use",
            DomainError::Internal(_) => "internal_error",
            DomainError::Store(RepoError::Timeout(_)) => "store_timeout",
            DomainError::Store(_) => "internal_error",
        }
    }

    pub(crate) fn not_found(entity_type: &'static str, id: Uuid) -> Self {
        DomainError::NotFound { entity_type, id }
    }
}

impl From<AuthError> for DomainError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TokenExpired | AuthError::InvalidToken(_) | AuthError::MissingAuth => {
                DomainError::Unauthenticated
            }
            AuthError::HashingError(msg) => DomainError::Internal(msg),
        }
    }
}

/// Repository-level errors.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Query execution failed: {0}")]
    Query(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Referenced entity does not exist: {0}")]
    InvalidReference(String),

    #[error("Store operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl RepoError {
    /// Whether the caller may retry the whole request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RepoError::Timeout(_) | RepoError::Connection(_))
    }
}
