//! Caller-input validation shared by feedback and form writes.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static PACKAGE_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,254}$").expect("valid package name regex")
});

/// Precondition violations detected before any storage access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required fields absent or blank, in declaration order.
    MissingFields(Vec<&'static str>),
    /// Feedback carries neither a message nor a rating.
    MissingMessageAndRating,
    /// Rating is not an integer in `1..=5`. Holds the rejected input.
    InvalidRating(String),
    /// Package name cannot be used as a collection name.
    InvalidPackageName(String),
    /// Form title is blank.
    EmptyTitle,
    /// Form type is not one of `rating|free_text|rating_text`.
    InvalidFormType(String),
    /// Status filter is not `active` or `inactive`.
    InvalidStatus(String),
    /// Search term cannot be compiled into a matcher.
    InvalidSearchTerm(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingFields(fields) => {
                write!(f, "missing required field(s): {}", fields.join(", "))
            }
            Self::MissingMessageAndRating => {
                write!(f, "at least one of `message` or `rating` must be provided")
            }
            Self::InvalidRating(value) => {
                write!(f, "rating must be an integer between 1 and 5, got `{value}`")
            }
            Self::InvalidPackageName(value) => write!(
                f,
                "invalid package name `{value}`; expected 1-255 characters of [A-Za-z0-9._-] starting with a letter or digit"
            ),
            Self::EmptyTitle => write!(f, "form title cannot be empty"),
            Self::InvalidFormType(value) => write!(
                f,
                "invalid form type `{value}`; expected rating|free_text|rating_text"
            ),
            Self::InvalidStatus(value) => {
                write!(f, "invalid status `{value}`; expected active|inactive")
            }
            Self::InvalidSearchTerm(reason) => write!(f, "invalid search term: {reason}"),
        }
    }
}

impl Error for ValidationError {}

/// Checks that `name` is usable as a feedback collection name.
///
/// # Errors
/// - `MissingFields(["package_name"])` when blank.
/// - `InvalidPackageName` when it contains characters outside `[A-Za-z0-9._-]`,
///   starts with a separator, or exceeds 255 characters.
pub fn validate_package_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::MissingFields(vec!["package_name"]));
    }
    if !PACKAGE_NAME_RE.is_match(name) {
        return Err(ValidationError::InvalidPackageName(name.to_string()));
    }
    Ok(())
}
