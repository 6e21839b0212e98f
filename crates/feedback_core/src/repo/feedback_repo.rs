//! Feedback repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/query/aggregate/delete APIs over per-package feedback
//!   collections.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Every package-scoped call validates the package name, then checks that
//!   the package collection exists, before reading feedback rows.
//! - `list_feedback`, `average_rating`, `feedback_stats` and `recent_feedback`
//!   report an empty filtered set as `NotFound::NoMatchingFeedback`.
//! - `list_feedback_by_user`, `search_feedback` and `delete_all_feedback`
//!   treat "nothing matched" as a successful empty result.

use super::{connect, NotFound, RepoError, RepoResult};
use crate::db::{
    collection_exists_in, ensure_collection_in, list_collections_in, StorageGateway,
};
use crate::model::feedback::{Feedback, FeedbackSubmission};
use crate::model::validation::validate_package_name;
use crate::model::{new_record_id, now_epoch_ms};
use crate::search::TextMatcher;
use crate::stats::{summarize_ratings, FeedbackStats};
use log::{debug, info, warn};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};

const FEEDBACK_SELECT_SQL: &str = "SELECT
    id,
    package_name,
    message,
    rating,
    app_version,
    device_info,
    form_id,
    user_id,
    created_at
FROM feedback";

/// Default number of rows returned by `recent_feedback`.
pub const RECENT_DEFAULT_LIMIT: u32 = 10;

/// Repository interface for feedback operations.
pub trait FeedbackRepository {
    /// Validates and stores one submission in its package collection.
    fn create_feedback(&self, submission: &FeedbackSubmission) -> RepoResult<Feedback>;
    /// Lists a package's feedback in insertion order, optionally for one form.
    fn list_feedback(&self, package: &str, form_id: Option<&str>) -> RepoResult<Vec<Feedback>>;
    /// Gets one feedback by id.
    fn get_feedback(&self, package: &str, id: &str) -> RepoResult<Feedback>;
    /// Lists one user's feedback. An empty list is a valid result.
    fn list_feedback_by_user(&self, package: &str, user_id: &str) -> RepoResult<Vec<Feedback>>;
    /// Mean of valid ratings; `0.0` when no feedback carries one.
    fn average_rating(&self, package: &str, form_id: Option<&str>) -> RepoResult<f64>;
    /// Count, average and 1-5 breakdown for the filtered feedback.
    fn feedback_stats(&self, package: &str, form_id: Option<&str>) -> RepoResult<FeedbackStats>;
    /// Case-insensitive literal search over `message`.
    fn search_feedback(&self, package: &str, term: Option<&str>) -> RepoResult<Vec<Feedback>>;
    /// Newest feedback first, at most `limit` rows (default 10, `0` for all).
    fn recent_feedback(
        &self,
        package: &str,
        limit: Option<u32>,
        form_id: Option<&str>,
    ) -> RepoResult<Vec<Feedback>>;
    /// Deletes one feedback by id.
    fn delete_feedback(&self, package: &str, id: &str) -> RepoResult<()>;
    /// Deletes every feedback answering `form_id`; returns the count removed.
    fn delete_feedback_for_form(&self, package: &str, form_id: &str) -> RepoResult<usize>;
    /// Empties the package collection; returns the count removed (may be 0).
    fn delete_all_feedback(&self, package: &str) -> RepoResult<usize>;
    /// Names of all existing feedback collections, sorted.
    fn list_packages(&self) -> RepoResult<Vec<String>>;
}

/// SQLite-backed feedback repository.
pub struct SqliteFeedbackRepository<'g> {
    gateway: &'g StorageGateway,
}

impl<'g> SqliteFeedbackRepository<'g> {
    pub fn new(gateway: &'g StorageGateway) -> Self {
        Self { gateway }
    }

    /// Validates `package`, then resolves its collection.
    fn open_package(&self, package: &str) -> RepoResult<&'g Connection> {
        validate_package_name(package)?;
        let conn = connect(self.gateway)?;
        if !collection_exists_in(conn, package)? {
            warn!("event=package_lookup module=repo status=not_found package={package}");
            return Err(NotFound::Package(package.to_string()).into());
        }
        Ok(conn)
    }
}

impl FeedbackRepository for SqliteFeedbackRepository<'_> {
    fn create_feedback(&self, submission: &FeedbackSubmission) -> RepoResult<Feedback> {
        let new_feedback = submission.validate()?;
        let conn = connect(self.gateway)?;
        let feedback = new_feedback.into_feedback(new_record_id(), now_epoch_ms());

        let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
        ensure_collection_in(&tx, &feedback.package_name, feedback.created_at)?;
        tx.execute(
            "INSERT INTO feedback (
                id,
                package_name,
                message,
                rating,
                app_version,
                device_info,
                form_id,
                user_id,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                feedback.id.as_str(),
                feedback.package_name.as_str(),
                feedback.message.as_deref(),
                feedback.rating,
                feedback.app_version.as_str(),
                feedback.device_info.as_deref(),
                feedback.form_id.as_str(),
                feedback.user_id.as_str(),
                feedback.created_at,
            ],
        )?;
        tx.commit()?;

        info!(
            "event=feedback_create module=repo status=ok package={} feedback_id={} has_rating={}",
            feedback.package_name,
            feedback.id,
            feedback.rating.is_some()
        );
        Ok(feedback)
    }

    fn list_feedback(&self, package: &str, form_id: Option<&str>) -> RepoResult<Vec<Feedback>> {
        let conn = self.open_package(package)?;
        let filter = FeedbackFilter::for_form(form_id);
        let rows = load_feedback(conn, package, filter, ListOrder::Inserted, None)?;
        if rows.is_empty() {
            return Err(filter.no_match(package));
        }
        debug!(
            "event=feedback_list module=repo status=ok package={package} count={}",
            rows.len()
        );
        Ok(rows)
    }

    fn get_feedback(&self, package: &str, id: &str) -> RepoResult<Feedback> {
        let conn = self.open_package(package)?;
        let mut stmt = conn.prepare(&format!(
            "{FEEDBACK_SELECT_SQL} WHERE package_name = ?1 AND id = ?2;"
        ))?;
        let mut rows = stmt.query(params![package, id])?;
        if let Some(row) = rows.next()? {
            return parse_feedback_row(row);
        }

        Err(NotFound::Feedback {
            package: package.to_string(),
            id: id.to_string(),
        }
        .into())
    }

    fn list_feedback_by_user(&self, package: &str, user_id: &str) -> RepoResult<Vec<Feedback>> {
        let conn = self.open_package(package)?;
        let filter = FeedbackFilter {
            user_id: Some(user_id),
            ..FeedbackFilter::default()
        };
        load_feedback(conn, package, filter, ListOrder::Inserted, None)
    }

    fn average_rating(&self, package: &str, form_id: Option<&str>) -> RepoResult<f64> {
        let conn = self.open_package(package)?;
        let filter = FeedbackFilter::for_form(form_id);
        let ratings = load_ratings(conn, package, filter)?;
        if ratings.is_empty() {
            return Err(filter.no_match(package));
        }
        Ok(summarize_ratings(ratings).average)
    }

    fn feedback_stats(&self, package: &str, form_id: Option<&str>) -> RepoResult<FeedbackStats> {
        let conn = self.open_package(package)?;
        let filter = FeedbackFilter::for_form(form_id);
        let ratings = load_ratings(conn, package, filter)?;
        if ratings.is_empty() {
            return Err(filter.no_match(package));
        }
        let stats = summarize_ratings(ratings).into_stats();
        debug!(
            "event=feedback_stats module=repo status=ok package={package} total={} average={:.2}",
            stats.total_feedback, stats.average_rating
        );
        Ok(stats)
    }

    fn search_feedback(&self, package: &str, term: Option<&str>) -> RepoResult<Vec<Feedback>> {
        let matcher = TextMatcher::new(term)?;
        let conn = self.open_package(package)?;
        let filter = FeedbackFilter {
            with_message: !matcher.matches_all(),
            ..FeedbackFilter::default()
        };
        let rows = load_feedback(conn, package, filter, ListOrder::Inserted, None)?;
        Ok(rows
            .into_iter()
            .filter(|feedback| matcher.matches(feedback.message.as_deref()))
            .collect())
    }

    fn recent_feedback(
        &self,
        package: &str,
        limit: Option<u32>,
        form_id: Option<&str>,
    ) -> RepoResult<Vec<Feedback>> {
        let conn = self.open_package(package)?;
        let filter = FeedbackFilter::for_form(form_id);
        let limit = normalize_recent_limit(limit);
        let rows = load_feedback(conn, package, filter, ListOrder::NewestFirst, limit)?;
        if rows.is_empty() {
            return Err(filter.no_match(package));
        }
        Ok(rows)
    }

    fn delete_feedback(&self, package: &str, id: &str) -> RepoResult<()> {
        let conn = self.open_package(package)?;
        let removed = conn.execute(
            "DELETE FROM feedback WHERE package_name = ?1 AND id = ?2;",
            params![package, id],
        )?;

        if removed == 0 {
            warn!("event=feedback_delete module=repo status=not_found package={package}");
            return Err(NotFound::Feedback {
                package: package.to_string(),
                id: id.to_string(),
            }
            .into());
        }

        info!("event=feedback_delete module=repo status=ok package={package} feedback_id={id}");
        Ok(())
    }

    fn delete_feedback_for_form(&self, package: &str, form_id: &str) -> RepoResult<usize> {
        let conn = self.open_package(package)?;
        let removed = conn.execute(
            "DELETE FROM feedback WHERE package_name = ?1 AND form_id = ?2;",
            params![package, form_id],
        )?;

        if removed == 0 {
            return Err(NotFound::NoMatchingFeedback {
                package: package.to_string(),
                form_id: Some(form_id.to_string()),
            }
            .into());
        }

        info!(
            "event=feedback_delete_form module=repo status=ok package={package} form_id={form_id} count={removed}"
        );
        Ok(removed)
    }

    fn delete_all_feedback(&self, package: &str) -> RepoResult<usize> {
        let conn = self.open_package(package)?;
        let removed = conn.execute("DELETE FROM feedback WHERE package_name = ?1;", [package])?;
        info!("event=feedback_delete_all module=repo status=ok package={package} count={removed}");
        Ok(removed)
    }

    fn list_packages(&self) -> RepoResult<Vec<String>> {
        let conn = connect(self.gateway)?;
        Ok(list_collections_in(conn)?)
    }
}

/// Resolves the `recent_feedback` row cap: absent means the default, `0`
/// means no cap.
pub fn normalize_recent_limit(limit: Option<u32>) -> Option<u32> {
    match limit {
        None => Some(RECENT_DEFAULT_LIMIT),
        Some(0) => None,
        Some(value) => Some(value),
    }
}

/// Conjunctive row filter inside one package collection.
#[derive(Debug, Clone, Copy, Default)]
struct FeedbackFilter<'a> {
    form_id: Option<&'a str>,
    user_id: Option<&'a str>,
    with_message: bool,
}

impl<'a> FeedbackFilter<'a> {
    /// An empty `form_id` is treated as no filter.
    fn for_form(form_id: Option<&'a str>) -> Self {
        Self {
            form_id: form_id.filter(|value| !value.is_empty()),
            ..Self::default()
        }
    }

    fn no_match(&self, package: &str) -> RepoError {
        warn!(
            "event=feedback_query module=repo status=empty package={package} form_filter={}",
            self.form_id.is_some()
        );
        NotFound::NoMatchingFeedback {
            package: package.to_string(),
            form_id: self.form_id.map(str::to_string),
        }
        .into()
    }

    fn apply(&self, sql: &mut String, bind_values: &mut Vec<Value>) {
        if let Some(form_id) = self.form_id {
            sql.push_str(" AND form_id = ?");
            bind_values.push(Value::Text(form_id.to_string()));
        }
        if let Some(user_id) = self.user_id {
            sql.push_str(" AND user_id = ?");
            bind_values.push(Value::Text(user_id.to_string()));
        }
        if self.with_message {
            sql.push_str(" AND message IS NOT NULL");
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ListOrder {
    Inserted,
    NewestFirst,
}

impl ListOrder {
    fn sql(self) -> &'static str {
        match self {
            Self::Inserted => " ORDER BY seq ASC",
            Self::NewestFirst => " ORDER BY created_at DESC, seq DESC",
        }
    }
}

fn load_feedback(
    conn: &Connection,
    package: &str,
    filter: FeedbackFilter<'_>,
    order: ListOrder,
    limit: Option<u32>,
) -> RepoResult<Vec<Feedback>> {
    let mut sql = format!("{FEEDBACK_SELECT_SQL} WHERE package_name = ?");
    let mut bind_values = vec![Value::Text(package.to_string())];
    filter.apply(&mut sql, &mut bind_values);
    sql.push_str(order.sql());
    if let Some(limit) = limit {
        sql.push_str(" LIMIT ?");
        bind_values.push(Value::Integer(i64::from(limit)));
    }

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut feedback = Vec::new();
    while let Some(row) = rows.next()? {
        feedback.push(parse_feedback_row(row)?);
    }
    Ok(feedback)
}

/// Loads only the raw ratings of the filtered rows, one entry per row.
fn load_ratings(
    conn: &Connection,
    package: &str,
    filter: FeedbackFilter<'_>,
) -> RepoResult<Vec<Option<i64>>> {
    let mut sql = String::from("SELECT rating FROM feedback WHERE package_name = ?");
    let mut bind_values = vec![Value::Text(package.to_string())];
    filter.apply(&mut sql, &mut bind_values);

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut ratings = Vec::new();
    while let Some(row) = rows.next()? {
        ratings.push(integer_or_none(row.get_ref(0)?));
    }
    Ok(ratings)
}

fn parse_feedback_row(row: &Row<'_>) -> RepoResult<Feedback> {
    let id: String = row.get("id")?;
    let rating_ref = row.get_ref("rating")?;
    let rating = integer_or_none(rating_ref);
    if rating.is_none() && rating_ref != ValueRef::Null {
        warn!(
            "event=feedback_decode module=repo status=legacy feedback_id={id} rating_type={}",
            rating_ref.data_type()
        );
    }

    Ok(Feedback {
        id,
        package_name: row.get("package_name")?,
        message: row.get("message")?,
        rating,
        app_version: row.get("app_version")?,
        device_info: row.get("device_info")?,
        form_id: row.get("form_id")?,
        user_id: row.get("user_id")?,
        created_at: row.get("created_at")?,
    })
}

/// Legacy rows may hold text or real ratings; only integers are kept.
fn integer_or_none(value: ValueRef<'_>) -> Option<i64> {
    match value {
        ValueRef::Integer(rating) => Some(rating),
        _ => None,
    }
}
