//! Domain model for feedback submissions and the forms that solicit them.
//!
//! # Responsibility
//! - Define the records persisted by the repositories.
//! - Own write-side validation so repositories never persist invalid input.
//!
//! # Invariants
//! - Record ids are opaque strings generated by core, never by storage.
//! - Timestamps are Unix epoch milliseconds.

pub mod feedback;
pub mod form;
pub mod validation;

use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Generates a fresh opaque record id.
pub fn new_record_id() -> String {
    Uuid::new_v4().to_string()
}

/// Current wall-clock time in epoch milliseconds.
///
/// Clocks set before 1970 collapse to `0` instead of failing a write.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
