//! Shared error types for the services crate.

use thiserror::Error;

use sat_core::model::{QuestionError, UserError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// A credential rejected by account validation rules.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CredentialError {
    #[error("username must be 3 to 32 characters of letters, digits, '.', '_' or '-'")]
    InvalidUsername,

    #[error("password must be at least 8 characters")]
    PasswordTooShort,

    #[error("password must mix upper case, lower case, digits and punctuation")]
    PasswordTooWeak,
}

/// Errors emitted by `AuthService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error("username or password is incorrect")]
    InvalidCredentials,

    #[error("username is already taken")]
    UsernameTaken,

    #[error("unknown user")]
    UnknownUser,

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error(transparent)]
    User(#[from] UserError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `SurveyService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SurveyError {
    #[error("unknown survey")]
    UnknownSurvey,

    #[error("unknown user")]
    UnknownUser,

    #[error("unknown question")]
    UnknownQuestion,

    #[error("choice is not one of the question's answers")]
    InvalidChoice,

    #[error("administrators do not take surveys")]
    AdministratorExcluded,

    #[error(transparent)]
    Question(#[from] QuestionError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `DraftCollector`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DraftError {
    #[error("draft directory is not usable: {0}")]
    Directory(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ScoringService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScoringError {
    #[error("unknown user")]
    UnknownUser,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Draft(#[from] DraftError),
}
