//! Core record store for user records.
//! This crate is the single source of truth for validation and persistence
//! invariants; transport layers only map calls onto [`UserService`].

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::user::{NewUser, User, UserId, UserPatch, UserValidationError};
pub use repo::user_repo::{
    ListPage, RepoError, RepoResult, SqliteUserRepository, UserRepository,
};
pub use service::user_service::{
    ErrorKind, ServiceResult, UserList, UserService, UserServiceError,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
