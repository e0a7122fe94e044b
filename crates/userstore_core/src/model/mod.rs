//! User record domain model.
//!
//! # Responsibility
//! - Define the canonical user record and its write-side inputs.
//! - Own validation/normalization rules shared by create and update paths.
//!
//! # Invariants
//! - Every persisted user is identified by a store-assigned `UserId`.
//! - Deletion is a hard delete; there is no tombstone state.

pub mod user;
