use feedback_core::db::migrations::latest_version;
use feedback_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "feedback_collections");
    assert_table_exists(&conn, "feedback");
    assert_table_exists(&conn, "forms");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feedback.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "feedback");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn schema_rejects_second_active_form_for_same_package() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO forms (id, package_name, title, type, created_at, updated_at, is_active)
         VALUES ('a', 'com.app', 'A', 'rating', 1, 1, 1);",
        [],
    )
    .unwrap();

    let second = conn.execute(
        "INSERT INTO forms (id, package_name, title, type, created_at, updated_at, is_active)
         VALUES ('b', 'com.app', 'B', 'rating', 2, 2, 1);",
        [],
    );
    assert!(second.is_err());

    conn.execute(
        "INSERT INTO forms (id, package_name, title, type, created_at, updated_at, is_active)
         VALUES ('c', 'com.other', 'C', 'rating', 3, 3, 1);",
        [],
    )
    .unwrap();
}

#[test]
fn feedback_rating_keeps_stored_value_type() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO feedback_collections (name, created_at) VALUES ('com.app', 1);",
        [],
    )
    .unwrap();
    for (id, rating) in [("text", "'4'"), ("real", "4.0"), ("int", "4")] {
        conn.execute(
            &format!(
                "INSERT INTO feedback (id, package_name, rating, app_version, form_id, user_id, created_at)
                 VALUES ('{id}', 'com.app', {rating}, '1.0.0', 'form', 'user', 1);"
            ),
            [],
        )
        .unwrap();
    }

    let stored_type = |id: &str| -> String {
        conn.query_row(
            "SELECT typeof(rating) FROM feedback WHERE id = ?1;",
            [id],
            |row| row.get(0),
        )
        .unwrap()
    };
    assert_eq!(stored_type("text"), "text");
    assert_eq!(stored_type("real"), "real");
    assert_eq!(stored_type("int"), "integer");
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
