use std::borrow::Cow;
use std::io::Error as IoError;

use ricette_moderation::Rejection;
use thiserror::Error;

/// Result type of the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the domain and storage layers.
#[derive(Debug, Error)]
pub enum Error {
    /// Input failed validation. `message` is safe to show to the client.
    #[error("{field}: {message}")]
    Validation {
        /// Name of the first failing field.
        field: Cow<'static, str>,
        /// Localized message.
        message: Cow<'static, str>,
    },
    /// The requested row does not exist, or is not visible to the caller.
    #[error("not found")]
    NotFound,
    /// Authentication failed.
    #[error("unauthorized: {0}")]
    Unauthorized(Cow<'static, str>),
    /// The caller is authenticated but may not act on the resource.
    #[error("forbidden: {0}")]
    Forbidden(Cow<'static, str>),
    /// The request collides with existing state (duplicate email, second report, ...).
    #[error("conflict: {0}")]
    Conflict(Cow<'static, str>),
    /// Storage error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// Migration error.
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    /// Password hashing failed.
    #[error("password hashing error: {0}")]
    Password(password_hash::Error),
    /// Token encoding or decoding failed.
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    /// Filesystem error.
    #[error("io error: {0}")]
    Io(#[from] IoError),
}

impl Error {
    /// Builds a validation error for `field`.
    pub fn validation(
        field: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns `true` for errors caused by the client rather than the server.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::NotFound
                | Self::Unauthorized(_)
                | Self::Forbidden(_)
                | Self::Conflict(_)
        )
    }

    /// Maps a unique-constraint violation to [`Error::Conflict`], leaving other errors alone.
    pub(crate) fn on_unique_violation(err: sqlx::Error, message: &'static str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Conflict(Cow::Borrowed(message))
            }
            _ => Self::Database(err),
        }
    }
}

impl From<Rejection> for Error {
    fn from(rejection: Rejection) -> Self {
        tracing::info!(field = %rejection.field, group = %rejection.group, "content filter rejected input");
        Self::validation(rejection.field.name(), rejection.field.rejection_message())
    }
}

impl From<password_hash::Error> for Error {
    fn from(err: password_hash::Error) -> Self {
        Self::Password(err)
    }
}
