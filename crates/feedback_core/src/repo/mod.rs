//! Repository layer contracts, error taxonomy and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for feedback and forms.
//! - Isolate SQL details from callers.
//!
//! # Invariants
//! - Write paths validate input before touching storage.
//! - Every failure maps to exactly one `ErrorKind`.
//! - "Nothing matched" keeps its own `NotFound` variant even where it is
//!   reported the same way as a missing resource.

use crate::db::DbError;
use crate::model::validation::ValidationError;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod feedback_repo;
pub mod form_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Coarse failure category exposed to the boundary layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    StorageUnavailable,
    Storage,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation_error",
            Self::NotFound => "not_found",
            Self::StorageUnavailable => "storage_unavailable",
            Self::Storage => "storage_error",
        }
    }
}

/// What exactly could not be found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFound {
    /// No feedback collection exists for the package.
    Package(String),
    /// The package exists but holds no feedback with this id.
    Feedback { package: String, id: String },
    /// The package exists but the filtered result set is empty.
    NoMatchingFeedback {
        package: String,
        form_id: Option<String>,
    },
    /// No form has this id.
    Form(String),
    /// The package has no active form.
    ActiveForm(String),
    /// A form listing came back empty. `package` is `None` for unscoped lists.
    NoForms { package: Option<String> },
}

impl Display for NotFound {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Package(package) => write!(f, "package not found: {package}"),
            Self::Feedback { package, id } => {
                write!(f, "feedback `{id}` not found in package `{package}`")
            }
            Self::NoMatchingFeedback {
                package,
                form_id: Some(form_id),
            } => write!(
                f,
                "no feedback found for form `{form_id}` in package `{package}`"
            ),
            Self::NoMatchingFeedback {
                package,
                form_id: None,
            } => write!(f, "no feedback found in package `{package}`"),
            Self::Form(id) => write!(f, "form not found: {id}"),
            Self::ActiveForm(package) => {
                write!(f, "no active form found for package `{package}`")
            }
            Self::NoForms {
                package: Some(package),
            } => write!(f, "no forms found for package `{package}`"),
            Self::NoForms { package: None } => write!(f, "no forms found"),
        }
    }
}

/// Repository error for feedback and form operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    NotFound(NotFound),
    /// The storage gateway could not produce a usable connection.
    StorageUnavailable(DbError),
    /// A storage operation was attempted and failed.
    Storage(DbError),
    /// Persisted data cannot be converted into a valid record.
    InvalidData(String),
}

impl RepoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::StorageUnavailable(_) => ErrorKind::StorageUnavailable,
            Self::Storage(_) | Self::InvalidData(_) => ErrorKind::Storage,
        }
    }

    /// Returns the not-found detail, if this is a not-found error.
    pub fn not_found(&self) -> Option<&NotFound> {
        match self {
            Self::NotFound(detail) => Some(detail),
            _ => None,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(detail) => write!(f, "{detail}"),
            Self::StorageUnavailable(err) => write!(f, "storage unavailable: {err}"),
            Self::Storage(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::StorageUnavailable(err) | Self::Storage(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<NotFound> for RepoError {
    fn from(value: NotFound) -> Self {
        Self::NotFound(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Storage(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(DbError::Sqlite(value))
    }
}

/// Borrows the gateway connection, reporting open failures as unavailability.
fn connect(gateway: &crate::db::StorageGateway) -> RepoResult<&Connection> {
    gateway.connection().map_err(RepoError::StorageUnavailable)
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
