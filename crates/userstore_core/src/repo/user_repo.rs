//! User repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over the `users` table.
//! - Translate SQLite constraint failures into semantic errors.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - All SQL is parameterized; only column names from a fixed set are
//!   interpolated.
//! - Write paths validate input before any SQL mutation.
//! - `update_user`/`delete_user` run existence check, mutation and read-back
//!   inside one immediate transaction.

use crate::db::DbError;
use crate::model::user::{NewUser, User, UserId, UserPatch, UserValidationError};
use rusqlite::types::Value;
use rusqlite::{
    ffi, params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row, Transaction,
    TransactionBehavior,
};
use std::error::Error;
use std::fmt::{Display, Formatter};

const USER_SELECT_SQL: &str = "SELECT
    id,
    name,
    email,
    created_at
FROM users";

const USERS_DEFAULT_LIMIT: i64 = 100;
const USERS_LIMIT_MAX: i64 = 1000;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for user persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Input rejected before reaching SQLite.
    Validation(UserValidationError),
    /// `users.email` unique constraint violated.
    DuplicateEmail,
    /// No row with the given id.
    NotFound(UserId),
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Persisted row cannot be converted to a valid `User`.
    InvalidData(String),
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::DuplicateEmail => write!(f, "Email already exists"),
            Self::NotFound(id) => write!(f, "User with ID {id} not found"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted user data: {message}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "user repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "user repository requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<UserValidationError> for RepoError {
    fn from(value: UserValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        if is_unique_violation(&value) {
            return Self::DuplicateEmail;
        }
        Self::Db(DbError::Sqlite(value))
    }
}

/// Applied pagination window for user listing.
///
/// Out-of-range input is silently replaced instead of rejected: `limit`
/// outside `(0, 1000]` becomes 100 and a negative `offset` becomes 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListPage {
    pub limit: i64,
    pub offset: i64,
}

impl ListPage {
    pub fn normalize(limit: Option<i64>, offset: Option<i64>) -> Self {
        let limit = match limit {
            Some(value) if value > 0 && value <= USERS_LIMIT_MAX => value,
            _ => USERS_DEFAULT_LIMIT,
        };
        let offset = match offset {
            Some(value) if value >= 0 => value,
            _ => 0,
        };
        Self { limit, offset }
    }
}

impl Default for ListPage {
    fn default() -> Self {
        Self::normalize(None, None)
    }
}

/// Repository interface for user CRUD operations.
pub trait UserRepository {
    /// Inserts one user and returns the stored row.
    fn insert_user(&self, input: &NewUser) -> RepoResult<User>;
    /// Gets one user by id.
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    /// Lists users ordered by `id DESC` inside the given window.
    fn list_users(&self, page: ListPage) -> RepoResult<Vec<User>>;
    /// Counts all users, independent of any window.
    fn count_users(&self) -> RepoResult<i64>;
    /// Applies the present fields of `patch` and returns the updated row.
    fn update_user(&self, id: UserId, patch: &UserPatch) -> RepoResult<User>;
    /// Removes one user and returns its last state.
    fn delete_user(&self, id: UserId) -> RepoResult<User>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    /// Wraps a connection already bootstrapped by `open_db`.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Constructs a repository after checking the `users` table shape.
    ///
    /// # Errors
    /// - `MissingRequiredTable`/`MissingRequiredColumn` on schema drift.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_user_connection_ready(conn)?;
        Ok(Self::new(conn))
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn insert_user(&self, input: &NewUser) -> RepoResult<User> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO users (name, email) VALUES (?1, ?2);",
            params![input.name(), input.email()],
        )?;
        let id = tx.last_insert_rowid();
        let user = select_user(&tx, id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("inserted user {id} missing on read-back"))
        })?;
        tx.commit()?;
        Ok(user)
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        select_user(self.conn, id)
    }

    fn list_users(&self, page: ListPage) -> RepoResult<Vec<User>> {
        let mut stmt = self.conn.prepare(&format!(
            "{USER_SELECT_SQL}
             ORDER BY id DESC
             LIMIT ?1 OFFSET ?2;"
        ))?;

        let mut rows = stmt.query(params![page.limit, page.offset])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }

        Ok(users)
    }

    fn count_users(&self) -> RepoResult<i64> {
        let total = self
            .conn
            .query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))?;
        Ok(total)
    }

    fn update_user(&self, id: UserId, patch: &UserPatch) -> RepoResult<User> {
        let patch = patch.normalized()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if select_user(&tx, id)?.is_none() {
            return Err(RepoError::NotFound(id));
        }

        let mut assignments = Vec::with_capacity(2);
        let mut bind_values: Vec<Value> = Vec::with_capacity(3);
        if let Some(name) = patch.name {
            assignments.push("name = ?");
            bind_values.push(Value::Text(name));
        }
        if let Some(email) = patch.email {
            assignments.push("email = ?");
            bind_values.push(Value::Text(email));
        }
        bind_values.push(Value::Integer(id));

        tx.execute(
            &format!("UPDATE users SET {} WHERE id = ?;", assignments.join(", ")),
            params_from_iter(bind_values),
        )?;

        let user = select_user(&tx, id)?.ok_or(RepoError::NotFound(id))?;
        tx.commit()?;
        Ok(user)
    }

    fn delete_user(&self, id: UserId) -> RepoResult<User> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let snapshot = select_user(&tx, id)?.ok_or(RepoError::NotFound(id))?;
        tx.execute("DELETE FROM users WHERE id = ?1;", [id])?;
        tx.commit()?;
        Ok(snapshot)
    }
}

fn select_user(conn: &Connection, id: UserId) -> RepoResult<Option<User>> {
    let user = conn
        .query_row(
            &format!("{USER_SELECT_SQL} WHERE id = ?1;"),
            [id],
            |row| Ok(parse_user_row(row)),
        )
        .optional()?;
    user.transpose()
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let id: UserId = row.get("id")?;
    if id <= 0 {
        return Err(RepoError::InvalidData(format!(
            "invalid id value `{id}` in users.id"
        )));
    }

    let created_at: Option<String> = row.get("created_at")?;
    let created_at = created_at.ok_or_else(|| {
        RepoError::InvalidData(format!("missing created_at for user {id} in users.created_at"))
    })?;

    Ok(User {
        id,
        name: row.get("name")?,
        email: row.get("email")?,
        created_at,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation
                && failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn ensure_user_connection_ready(conn: &Connection) -> RepoResult<()> {
    if !table_exists(conn, "users")? {
        return Err(RepoError::MissingRequiredTable("users"));
    }

    let columns = table_columns(conn, "users")?;
    for column in ["id", "name", "email", "created_at"] {
        if !columns.iter().any(|current| current == column) {
            return Err(RepoError::MissingRequiredColumn {
                table: "users",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}
