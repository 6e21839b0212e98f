//! Form repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/query/status-transition APIs over the shared `forms` table.
//! - Enforce the single-active-form rule per package.
//!
//! # Invariants
//! - Creating a form, or activating one, deactivates every other active form of
//!   the same package inside the same `IMMEDIATE` transaction. The partial
//!   unique index `idx_forms_one_active_per_package` backs this up in storage.
//! - Deactivating a form never promotes another one.
//! - Every status change stamps `updated_at`, including on deactivated siblings.

use super::{bool_to_int, connect, NotFound, RepoError, RepoResult};
use crate::db::StorageGateway;
use crate::model::form::{Form, FormId, FormStatus, FormType, NewForm};
use crate::model::{new_record_id, now_epoch_ms};
use crate::search::TextMatcher;
use log::{debug, info, warn};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use serde::Serialize;

const FORM_SELECT_SQL: &str = "SELECT
    id,
    package_name,
    title,
    type,
    created_at,
    updated_at,
    is_active
FROM forms";

const FORM_ORDER_SQL: &str = " ORDER BY created_at ASC, rowid ASC";

/// Result of `create_form`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedForm {
    /// The stored form, always active.
    pub form: Form,
    /// How many previously active forms of the package were switched off.
    pub deactivated_count: usize,
}

/// Result of `set_form_active`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormStatusChange {
    #[serde(rename = "_id")]
    pub form_id: FormId,
    pub is_active: bool,
    pub updated_at: i64,
    pub deactivated_forms_count: usize,
}

/// Optional, AND-combined filters for `search_forms`.
///
/// Empty strings are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSearchQuery {
    pub package_name: Option<String>,
    /// `active` or `inactive`, case-insensitive.
    pub status: Option<String>,
    /// Case-insensitive literal substring of the title.
    pub title: Option<String>,
    /// Exact form type wire value. An unknown type matches nothing.
    pub kind: Option<String>,
}

/// Repository interface for form operations.
pub trait FormRepository {
    /// Creates an active form and deactivates its package siblings.
    fn create_form(&self, package_name: &str, title: &str, kind: &str) -> RepoResult<CreatedForm>;
    /// Gets one form by id.
    fn get_form(&self, form_id: &str) -> RepoResult<Form>;
    /// Gets the active form of a package.
    fn get_active_form(&self, package_name: &str) -> RepoResult<Form>;
    /// Lists a package's forms, optionally by status. Empty is `NotFound`.
    fn list_forms_by_package(
        &self,
        package_name: &str,
        status: Option<&str>,
    ) -> RepoResult<Vec<Form>>;
    /// Lists all forms, optionally by status. Empty is `NotFound`.
    fn list_forms(&self, status: Option<&str>) -> RepoResult<Vec<Form>>;
    /// Activates or deactivates one form.
    fn set_form_active(&self, form_id: &str, is_active: bool) -> RepoResult<FormStatusChange>;
    /// Filtered search. An empty result is a valid empty list.
    fn search_forms(&self, query: &FormSearchQuery) -> RepoResult<Vec<Form>>;
    /// Distinct package names that own at least one form, sorted.
    fn list_package_names(&self) -> RepoResult<Vec<String>>;
}

/// SQLite-backed form repository.
pub struct SqliteFormRepository<'g> {
    gateway: &'g StorageGateway,
}

impl<'g> SqliteFormRepository<'g> {
    pub fn new(gateway: &'g StorageGateway) -> Self {
        Self { gateway }
    }
}

impl FormRepository for SqliteFormRepository<'_> {
    fn create_form(&self, package_name: &str, title: &str, kind: &str) -> RepoResult<CreatedForm> {
        let new_form = NewForm::validate(package_name, title, kind)?;
        let conn = connect(self.gateway)?;
        let now = now_epoch_ms();
        let form = Form {
            id: new_record_id(),
            package_name: new_form.package_name,
            title: new_form.title,
            kind: new_form.kind,
            created_at: now,
            updated_at: now,
            is_active: true,
        };

        let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
        let deactivated_count = deactivate_active_forms(&tx, &form.package_name, None, now)?;
        tx.execute(
            "INSERT INTO forms (
                id,
                package_name,
                title,
                type,
                created_at,
                updated_at,
                is_active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                form.id.as_str(),
                form.package_name.as_str(),
                form.title.as_str(),
                form.kind.as_str(),
                form.created_at,
                form.updated_at,
                bool_to_int(form.is_active),
            ],
        )?;
        tx.commit()?;

        info!(
            "event=form_create module=repo status=ok package={} form_id={} type={} deactivated={}",
            form.package_name,
            form.id,
            form.kind.as_str(),
            deactivated_count
        );
        Ok(CreatedForm {
            form,
            deactivated_count,
        })
    }

    fn get_form(&self, form_id: &str) -> RepoResult<Form> {
        let conn = connect(self.gateway)?;
        find_form(conn, form_id)?.ok_or_else(|| NotFound::Form(form_id.to_string()).into())
    }

    fn get_active_form(&self, package_name: &str) -> RepoResult<Form> {
        let conn = connect(self.gateway)?;
        let mut stmt = conn.prepare(&format!(
            "{FORM_SELECT_SQL}
             WHERE package_name = ?1 AND is_active = 1
             ORDER BY updated_at DESC
             LIMIT 1;"
        ))?;
        let mut rows = stmt.query([package_name])?;
        if let Some(row) = rows.next()? {
            return parse_form_row(row);
        }

        warn!("event=form_active module=repo status=not_found package={package_name}");
        Err(NotFound::ActiveForm(package_name.to_string()).into())
    }

    fn list_forms_by_package(
        &self,
        package_name: &str,
        status: Option<&str>,
    ) -> RepoResult<Vec<Form>> {
        let status = FormStatus::parse_filter(status)?;
        let conn = connect(self.gateway)?;
        let filter = FormFilter {
            package_name: Some(package_name),
            status,
            kind: None,
        };
        let forms = load_forms(conn, &filter)?;
        if forms.is_empty() {
            return Err(NotFound::NoForms {
                package: Some(package_name.to_string()),
            }
            .into());
        }
        Ok(forms)
    }

    fn list_forms(&self, status: Option<&str>) -> RepoResult<Vec<Form>> {
        let status = FormStatus::parse_filter(status)?;
        let conn = connect(self.gateway)?;
        let filter = FormFilter {
            status,
            ..FormFilter::default()
        };
        let forms = load_forms(conn, &filter)?;
        if forms.is_empty() {
            return Err(NotFound::NoForms { package: None }.into());
        }
        Ok(forms)
    }

    fn set_form_active(&self, form_id: &str, is_active: bool) -> RepoResult<FormStatusChange> {
        let conn = connect(self.gateway)?;
        let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
        let form = find_form(&tx, form_id)?.ok_or_else(|| {
            warn!("event=form_status module=repo status=not_found");
            RepoError::from(NotFound::Form(form_id.to_string()))
        })?;

        let updated_at = now_epoch_ms();
        let deactivated_forms_count = if is_active {
            deactivate_active_forms(&tx, &form.package_name, Some(form_id), updated_at)?
        } else {
            0
        };
        tx.execute(
            "UPDATE forms SET is_active = ?2, updated_at = ?3 WHERE id = ?1;",
            params![form_id, bool_to_int(is_active), updated_at],
        )?;
        tx.commit()?;

        info!(
            "event=form_status module=repo status=ok package={} form_id={form_id} is_active={is_active} deactivated={deactivated_forms_count}",
            form.package_name
        );
        Ok(FormStatusChange {
            form_id: form_id.to_string(),
            is_active,
            updated_at,
            deactivated_forms_count,
        })
    }

    fn search_forms(&self, query: &FormSearchQuery) -> RepoResult<Vec<Form>> {
        let status = FormStatus::parse_filter(query.status.as_deref())?;
        let kind = match non_empty(query.kind.as_deref()) {
            Some(value) => match FormType::parse(value) {
                Ok(kind) => Some(kind),
                Err(_) => {
                    debug!("event=form_search module=repo status=ok count=0 reason=unknown_type");
                    return Ok(Vec::new());
                }
            },
            None => None,
        };
        let title = TextMatcher::new(query.title.as_deref())?;
        let conn = connect(self.gateway)?;

        let filter = FormFilter {
            package_name: non_empty(query.package_name.as_deref()),
            status,
            kind,
        };
        let forms: Vec<Form> = load_forms(conn, &filter)?
            .into_iter()
            .filter(|form| title.matches(Some(form.title.as_str())))
            .collect();
        debug!(
            "event=form_search module=repo status=ok count={}",
            forms.len()
        );
        Ok(forms)
    }

    fn list_package_names(&self) -> RepoResult<Vec<String>> {
        let conn = connect(self.gateway)?;
        let mut stmt =
            conn.prepare("SELECT DISTINCT package_name FROM forms ORDER BY package_name ASC;")?;
        let mut rows = stmt.query([])?;
        let mut names = Vec::new();
        while let Some(row) = rows.next()? {
            names.push(row.get(0)?);
        }
        Ok(names)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct FormFilter<'a> {
    package_name: Option<&'a str>,
    status: Option<FormStatus>,
    kind: Option<FormType>,
}

fn load_forms(conn: &Connection, filter: &FormFilter<'_>) -> RepoResult<Vec<Form>> {
    let mut sql = format!("{FORM_SELECT_SQL} WHERE 1 = 1");
    let mut bind_values: Vec<Value> = Vec::new();

    if let Some(package_name) = filter.package_name {
        sql.push_str(" AND package_name = ?");
        bind_values.push(Value::Text(package_name.to_string()));
    }
    if let Some(status) = filter.status {
        sql.push_str(" AND is_active = ?");
        bind_values.push(Value::Integer(bool_to_int(status.is_active())));
    }
    if let Some(kind) = filter.kind {
        sql.push_str(" AND type = ?");
        bind_values.push(Value::Text(kind.as_str().to_string()));
    }
    sql.push_str(FORM_ORDER_SQL);

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut forms = Vec::new();
    while let Some(row) = rows.next()? {
        forms.push(parse_form_row(row)?);
    }
    Ok(forms)
}

fn find_form(conn: &Connection, form_id: &str) -> RepoResult<Option<Form>> {
    let mut stmt = conn.prepare(&format!("{FORM_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([form_id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_form_row(row)?));
    }

    Ok(None)
}

/// Switches off every active form of `package_name` except `keep`.
fn deactivate_active_forms(
    conn: &Connection,
    package_name: &str,
    keep: Option<&str>,
    updated_at: i64,
) -> RepoResult<usize> {
    let changed = conn.execute(
        "UPDATE forms
         SET
            is_active = 0,
            updated_at = ?2
         WHERE package_name = ?1
           AND is_active = 1
           AND (?3 IS NULL OR id <> ?3);",
        params![package_name, updated_at, keep],
    )?;
    Ok(changed)
}

fn parse_form_row(row: &Row<'_>) -> RepoResult<Form> {
    let type_text: String = row.get("type")?;
    let kind = FormType::parse(&type_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid form type `{type_text}` in forms.type"))
    })?;

    let is_active = match row.get::<_, i64>("is_active")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_active value `{other}` in forms.is_active"
            )));
        }
    };

    Ok(Form {
        id: row.get("id")?,
        package_name: row.get("package_name")?,
        title: row.get("title")?,
        kind,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        is_active,
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.is_empty())
}
