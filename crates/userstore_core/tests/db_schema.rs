use rusqlite::Connection;
use userstore_core::db::{open_db, open_db_in_memory, DbError};

#[test]
fn open_db_in_memory_creates_users_table() {
    let conn = open_db_in_memory().unwrap();

    assert_table_exists(&conn, "users");
}

#[test]
fn opening_same_database_twice_is_idempotent_and_keeps_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.db");

    let conn_first = open_db(&path).unwrap();
    conn_first
        .execute(
            "INSERT INTO users (name, email) VALUES ('Ann', 'ann@x.com');",
            [],
        )
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    let count: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn existing_users_table_is_reused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );
        INSERT INTO users (name, email) VALUES ('Old', 'old@x.com');",
    )
    .unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    let name: String = conn
        .query_row("SELECT name FROM users WHERE id = 1;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(name, "Old");
}

#[test]
fn foreign_user_version_is_left_alone() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tagged.db");

    let conn = open_db(&path).unwrap();
    conn.execute_batch(
        "INSERT INTO users (name, email) VALUES ('Ann', 'ann@x.com');
        PRAGMA user_version = 7;",
    )
    .unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    assert_eq!(user_version(&conn), 7);
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn opening_unreachable_path_returns_sqlite_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("nested").join("users.db");

    let err = open_db(&path).unwrap_err();
    assert!(matches!(err, DbError::Sqlite(_)));
}

fn user_version(conn: &Connection) -> u32 {
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
