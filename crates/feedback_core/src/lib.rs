//! Core domain logic for the feedback backend.
//! This crate is the single source of truth for feedback and form invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod stats;

pub use config::{ConfigError, CoreConfig};
pub use db::{StorageGateway, StorageTarget};
pub use logging::{default_log_level, init_logging, logging_status, LogDestination};
pub use model::feedback::{Feedback, FeedbackId, FeedbackSubmission, NewFeedback};
pub use model::form::{Form, FormId, FormStatus, FormType, NewForm};
pub use model::validation::ValidationError;
pub use repo::feedback_repo::{FeedbackRepository, SqliteFeedbackRepository};
pub use repo::form_repo::{
    CreatedForm, FormRepository, FormSearchQuery, FormStatusChange, SqliteFormRepository,
};
pub use repo::{ErrorKind, NotFound, RepoError, RepoResult};
pub use stats::FeedbackStats;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
