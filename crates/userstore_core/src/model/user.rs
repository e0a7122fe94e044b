//! User domain model.
//!
//! # Responsibility
//! - Define the persisted `User` record and its create/update inputs.
//! - Normalize (trim) and validate user-provided fields before storage.
//!
//! # Invariants
//! - `id` is assigned by the store, positive, and never reused.
//! - `name` is non-empty after trimming.
//! - `email` contains `@` and is stored trimmed.
//! - `created_at` is assigned at insert and never changes.

use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned user identifier (SQLite rowid).
pub type UserId = i64;

/// Canonical persisted user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    /// SQLite `CURRENT_TIMESTAMP` text, `YYYY-MM-DD HH:MM:SS` in UTC.
    pub created_at: String,
}

/// Validation error for user write inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    EmptyName,
    InvalidEmail,
    InvalidId(i64),
    EmptyPatch,
}

impl Display for UserValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "Name must be a non-empty string"),
            Self::InvalidEmail => write!(f, "Email must be a valid email address"),
            Self::InvalidId(_) => write!(f, "User ID must be a positive integer"),
            Self::EmptyPatch => write!(f, "At least one field (name or email) must be provided"),
        }
    }
}

impl Error for UserValidationError {}

/// Validated input for creating a user.
///
/// Fields are already trimmed; construct through [`NewUser::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    name: String,
    email: String,
}

impl NewUser {
    /// Trims and validates create input.
    ///
    /// # Errors
    /// - `EmptyName` when `name` is blank after trimming.
    /// - `InvalidEmail` when `email` does not contain `@`.
    pub fn new(
        name: impl AsRef<str>,
        email: impl AsRef<str>,
    ) -> Result<Self, UserValidationError> {
        Ok(Self {
            name: normalize_name(name.as_ref())?,
            email: normalize_email(email.as_ref())?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}

/// Partial update for an existing user.
///
/// `None` means "leave untouched"; `Some("")` is a present-but-invalid value
/// and is rejected by [`UserPatch::normalized`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }

    /// Returns a trimmed copy with every present field validated.
    ///
    /// # Errors
    /// - `EmptyPatch` when neither field is present.
    /// - Field errors use the same rules as [`NewUser::new`].
    pub fn normalized(&self) -> Result<Self, UserValidationError> {
        if self.is_empty() {
            return Err(UserValidationError::EmptyPatch);
        }

        Ok(Self {
            name: self.name.as_deref().map(normalize_name).transpose()?,
            email: self.email.as_deref().map(normalize_email).transpose()?,
        })
    }
}

/// Rejects non-positive ids before they reach storage.
pub fn validate_user_id(id: i64) -> Result<UserId, UserValidationError> {
    if id <= 0 {
        return Err(UserValidationError::InvalidId(id));
    }
    Ok(id)
}

fn normalize_name(value: &str) -> Result<String, UserValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(UserValidationError::EmptyName);
    }
    Ok(trimmed.to_string())
}

fn normalize_email(value: &str) -> Result<String, UserValidationError> {
    let trimmed = value.trim();
    if !trimmed.contains('@') {
        return Err(UserValidationError::InvalidEmail);
    }
    Ok(trimmed.to_string())
}
