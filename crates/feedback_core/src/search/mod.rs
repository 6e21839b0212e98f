//! Text search helpers shared by the feedback and form repositories.

pub mod matcher;

pub use matcher::TextMatcher;
