use thiserror::Error;

/// Centralized error types for the core library
///
/// Registry, ledger and user directory operations all return this enum.
/// Membership checks have their own `TransientQueryError` because the
/// verifier recovers from them instead of propagating.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database connection pool errors
    #[error("Database pool error: {0}")]
    DatabasePool(#[from] r2d2::Error),

    /// A channel with this identifier is already registered
    #[error("Channel {0} is already registered")]
    DuplicateIdentifier(String),

    /// The token was removed between selection and dispensing
    #[error("Reward token {0} not found")]
    TokenNotFound(i64),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Anyhow errors (for general error handling)
    #[error("Application error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Whether the failure is scoped to the request and worth retrying as is
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::TokenNotFound(_) | AppError::DatabasePool(_) | AppError::Database(_)
        )
    }
}

/// Returns true if the SQLite error is a UNIQUE constraint violation
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
