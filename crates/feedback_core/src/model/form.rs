//! Form (survey definition) domain model.
//!
//! # Invariants
//! - At most one form per `package_name` has `is_active = true`.
//! - `updated_at` changes on every status change.

use super::validation::{validate_package_name, ValidationError};
use serde::{Deserialize, Serialize};

/// Opaque form identifier.
pub type FormId = String;

/// Kind of answer a form solicits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormType {
    /// Star rating only.
    Rating,
    /// Free-text message only.
    FreeText,
    /// Rating plus message.
    RatingText,
}

impl FormType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rating => "rating",
            Self::FreeText => "free_text",
            Self::RatingText => "rating_text",
        }
    }

    /// Parses the exact wire value (case-sensitive).
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value {
            "rating" => Ok(Self::Rating),
            "free_text" => Ok(Self::FreeText),
            "rating_text" => Ok(Self::RatingText),
            other => Err(ValidationError::InvalidFormType(other.to_string())),
        }
    }
}

/// Status filter for form listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormStatus {
    Active,
    Inactive,
}

impl FormStatus {
    /// Parses an optional status filter, case-insensitively.
    ///
    /// `None` and the empty string both mean "no filter".
    pub fn parse_filter(value: Option<&str>) -> Result<Option<Self>, ValidationError> {
        let Some(raw) = value.filter(|text| !text.is_empty()) else {
            return Ok(None);
        };
        match raw.to_ascii_lowercase().as_str() {
            "active" => Ok(Some(Self::Active)),
            "inactive" => Ok(Some(Self::Inactive)),
            _ => Err(ValidationError::InvalidStatus(raw.to_string())),
        }
    }

    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// One stored form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Form {
    #[serde(rename = "_id")]
    pub id: FormId,
    pub package_name: String,
    pub title: String,
    /// Serialized as `type` to match the external schema.
    #[serde(rename = "type")]
    pub kind: FormType,
    pub created_at: i64,
    pub updated_at: i64,
    pub is_active: bool,
}

/// Validated form creation input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewForm {
    pub package_name: String,
    pub title: String,
    pub kind: FormType,
}

impl NewForm {
    /// Validates raw creation input: package name, then title, then type.
    pub fn validate(package_name: &str, title: &str, kind: &str) -> Result<Self, ValidationError> {
        validate_package_name(package_name)?;
        if title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        let kind = FormType::parse(kind)?;
        Ok(Self {
            package_name: package_name.to_string(),
            title: title.to_string(),
            kind,
        })
    }
}
