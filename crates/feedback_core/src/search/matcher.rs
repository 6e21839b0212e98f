//! Case-insensitive literal text matching for message and title search.
//!
//! # Invariants
//! - Search terms are literals; regex metacharacters match themselves.
//! - An absent or empty term matches every record, including records with no
//!   text at all.

use crate::model::validation::ValidationError;
use regex::{Regex, RegexBuilder};

/// Compiled search term.
#[derive(Debug, Clone)]
pub struct TextMatcher {
    regex: Option<Regex>,
}

impl TextMatcher {
    /// Builds a matcher for `term`.
    ///
    /// # Errors
    /// - `InvalidSearchTerm` when the escaped term exceeds the regex size limit.
    pub fn new(term: Option<&str>) -> Result<Self, ValidationError> {
        let Some(term) = term.filter(|value| !value.is_empty()) else {
            return Ok(Self { regex: None });
        };
        let regex = RegexBuilder::new(&regex::escape(term))
            .case_insensitive(true)
            .build()
            .map_err(|err| ValidationError::InvalidSearchTerm(err.to_string()))?;
        Ok(Self { regex: Some(regex) })
    }

    /// Whether this matcher accepts everything.
    pub fn matches_all(&self) -> bool {
        self.regex.is_none()
    }

    pub fn matches(&self, text: Option<&str>) -> bool {
        match (&self.regex, text) {
            (None, _) => true,
            (Some(regex), Some(text)) => regex.is_match(text),
            (Some(_), None) => false,
        }
    }
}
