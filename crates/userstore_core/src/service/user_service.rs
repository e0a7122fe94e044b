//! User record store use-cases.
//!
//! # Responsibility
//! - Expose create/get/list/update/delete with strict input validation.
//! - Fold repository failures into the four caller-facing error kinds.
//! - Emit one metadata-only log event per operation.
//!
//! # Invariants
//! - Validation failures never reach the repository.
//! - `list_users` never fails on input; it clamps the window instead.
//! - User-provided text (names, emails) is never written to logs.

use crate::model::user::{validate_user_id, NewUser, User, UserId, UserPatch, UserValidationError};
use crate::repo::user_repo::{ListPage, RepoError, UserRepository};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Stable tag for each caller-facing error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Duplicate,
    NotFound,
    Storage,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Duplicate => "duplicate",
            Self::NotFound => "not_found",
            Self::Storage => "storage",
        }
    }
}

/// Service error for user use-cases.
#[derive(Debug)]
pub enum UserServiceError {
    /// Malformed or missing input.
    Validation(UserValidationError),
    /// Email already belongs to another user.
    Duplicate,
    /// Referenced user id does not exist.
    NotFound(UserId),
    /// Any other persistence failure.
    Storage(RepoError),
}

impl UserServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Duplicate => ErrorKind::Duplicate,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }
}

impl Display for UserServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Duplicate => write!(f, "Email already exists"),
            Self::NotFound(id) => write!(f, "User with ID {id} not found"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for UserServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<UserValidationError> for UserServiceError {
    fn from(value: UserValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for UserServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::DuplicateEmail => Self::Duplicate,
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Storage(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, UserServiceError>;

/// One page of users plus the total row count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserList {
    /// Users ordered by `id DESC`.
    pub users: Vec<User>,
    /// Count of all users, independent of the window.
    pub total: i64,
    /// Applied limit after clamping.
    pub limit: i64,
    /// Applied offset after clamping.
    pub offset: i64,
}

/// User record store facade over repository implementations.
pub struct UserService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> UserService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one user.
    ///
    /// # Errors
    /// - `Validation` for a blank name or an email without `@`.
    /// - `Duplicate` when the email is already taken.
    pub fn create_user(&self, name: &str, email: &str) -> ServiceResult<User> {
        observe("user_create", || {
            let input = NewUser::new(name, email)?;
            Ok(self.repo.insert_user(&input)?)
        })
    }

    /// Gets one user by id.
    pub fn get_user(&self, id: i64) -> ServiceResult<User> {
        observe("user_get", || {
            let id = validate_user_id(id)?;
            self.repo
                .get_user(id)?
                .ok_or(UserServiceError::NotFound(id))
        })
    }

    /// Lists users newest first.
    ///
    /// Invalid `limit`/`offset` values are clamped, never rejected.
    pub fn list_users(&self, limit: Option<i64>, offset: Option<i64>) -> ServiceResult<UserList> {
        observe("user_list", || {
            let page = ListPage::normalize(limit, offset);
            let users = self.repo.list_users(page)?;
            let total = self.repo.count_users()?;
            Ok(UserList {
                users,
                total,
                limit: page.limit,
                offset: page.offset,
            })
        })
    }

    /// Updates name and/or email of an existing user.
    ///
    /// # Errors
    /// - `Validation` for a non-positive id, an empty patch or invalid fields.
    /// - `NotFound` when no user has `id`.
    /// - `Duplicate` when the new email belongs to another user.
    pub fn update_user(&self, id: i64, patch: &UserPatch) -> ServiceResult<User> {
        observe("user_update", || {
            let id = validate_user_id(id)?;
            let patch = patch.normalized()?;
            Ok(self.repo.update_user(id, &patch)?)
        })
    }

    /// Deletes one user and returns its state before removal.
    pub fn delete_user(&self, id: i64) -> ServiceResult<User> {
        observe("user_delete", || {
            let id = validate_user_id(id)?;
            Ok(self.repo.delete_user(id)?)
        })
    }
}

fn observe<T>(event: &'static str, op: impl FnOnce() -> ServiceResult<T>) -> ServiceResult<T> {
    let started_at = Instant::now();
    let result = op();
    match &result {
        Ok(_) => info!(
            "event={event} module=service status=ok duration_ms={}",
            started_at.elapsed().as_millis()
        ),
        Err(UserServiceError::Storage(err)) => error!(
            "event={event} module=service status=error duration_ms={} error_kind=storage error={err}",
            started_at.elapsed().as_millis()
        ),
        Err(err) => warn!(
            "event={event} module=service status=error duration_ms={} error_kind={}",
            started_at.elapsed().as_millis(),
            err.kind().as_str()
        ),
    }
    result
}
