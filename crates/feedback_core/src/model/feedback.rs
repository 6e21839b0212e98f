//! Feedback domain model.
//!
//! # Responsibility
//! - Define the stored feedback record and the raw client submission.
//! - Validate submissions into a write-ready `NewFeedback`.
//!
//! # Invariants
//! - A submission carries at least one of `message` or `rating`.
//! - A submitted rating is an integer in `1..=5`.
//! - Stored records may still hold legacy ratings outside that range; readers
//!   must use `Feedback::valid_rating` instead of trusting `rating`.

use super::validation::{validate_package_name, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque feedback identifier.
pub type FeedbackId = String;

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

const REQUIRED_FIELDS: [&str; 4] = ["package_name", "app_version", "form_id", "user_id"];

/// One stored feedback submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    /// Serialized as `_id` to match the external document schema.
    #[serde(rename = "_id")]
    pub id: FeedbackId,
    /// Owning package; also the collection the record lives in.
    pub package_name: String,
    pub message: Option<String>,
    /// Raw stored rating. May be out of range for legacy rows.
    pub rating: Option<i64>,
    pub app_version: String,
    pub device_info: Option<String>,
    /// Form this submission answers. Not checked against existing forms.
    pub form_id: String,
    pub user_id: String,
    /// Epoch milliseconds.
    pub created_at: i64,
}

impl Feedback {
    /// Returns the rating only when it is an integer in `1..=5`.
    pub fn valid_rating(&self) -> Option<u8> {
        valid_rating(self.rating)
    }
}

/// Filters a raw rating down to the accepted `1..=5` range.
pub fn valid_rating(rating: Option<i64>) -> Option<u8> {
    rating
        .filter(|value| (MIN_RATING..=MAX_RATING).contains(value))
        .and_then(|value| u8::try_from(value).ok())
}

/// Client submission as received from the boundary layer.
///
/// Every field is optional so that missing-field reporting stays in core.
/// `rating` keeps the raw JSON value; `validate` decides what is acceptable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSubmission {
    pub package_name: Option<String>,
    pub message: Option<String>,
    pub rating: Option<Value>,
    pub app_version: Option<String>,
    pub device_info: Option<String>,
    pub form_id: Option<String>,
    pub user_id: Option<String>,
}

/// Validated submission, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFeedback {
    pub package_name: String,
    pub message: Option<String>,
    pub rating: Option<u8>,
    pub app_version: String,
    pub device_info: Option<String>,
    pub form_id: String,
    pub user_id: String,
}

impl FeedbackSubmission {
    /// Validates the submission.
    ///
    /// Checks run in a fixed order: required fields, package name, rating
    /// value, then the message-or-rating rule. An empty `message` counts as
    /// absent.
    ///
    /// # Errors
    /// - `MissingFields` lists every blank or absent required field.
    /// - `InvalidPackageName` / `InvalidRating` / `MissingMessageAndRating`.
    pub fn validate(&self) -> Result<NewFeedback, ValidationError> {
        let required = [
            &self.package_name,
            &self.app_version,
            &self.form_id,
            &self.user_id,
        ];
        let missing: Vec<&'static str> = REQUIRED_FIELDS
            .iter()
            .zip(required)
            .filter(|(_, value)| is_blank(value.as_deref()))
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }

        let package_name = self.package_name.clone().unwrap_or_default();
        validate_package_name(&package_name)?;

        let rating = match &self.rating {
            Some(value) => parse_rating(value)?,
            None => None,
        };
        let message = self.message.clone().filter(|text| !text.is_empty());
        if message.is_none() && rating.is_none() {
            return Err(ValidationError::MissingMessageAndRating);
        }

        Ok(NewFeedback {
            package_name,
            message,
            rating,
            app_version: self.app_version.clone().unwrap_or_default(),
            device_info: self.device_info.clone(),
            form_id: self.form_id.clone().unwrap_or_default(),
            user_id: self.user_id.clone().unwrap_or_default(),
        })
    }
}

impl NewFeedback {
    /// Materializes the stored record with its generated identity.
    pub fn into_feedback(self, id: FeedbackId, created_at: i64) -> Feedback {
        Feedback {
            id,
            package_name: self.package_name,
            message: self.message,
            rating: self.rating.map(i64::from),
            app_version: self.app_version,
            device_info: self.device_info,
            form_id: self.form_id,
            user_id: self.user_id,
            created_at,
        }
    }
}

/// Parses a submitted rating.
///
/// Accepts a JSON integer or a string holding an integer (surrounding
/// whitespace ignored). `null` means "no rating".
pub fn parse_rating(value: &Value) -> Result<Option<u8>, ValidationError> {
    let parsed = match value {
        Value::Null => return Ok(None),
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };

    valid_rating(parsed)
        .map(Some)
        .ok_or_else(|| ValidationError::InvalidRating(value.to_string()))
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |text| text.trim().is_empty())
}
