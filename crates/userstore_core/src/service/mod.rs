//! Core use-case services.
//!
//! Keeps transport layers decoupled from storage details.

pub mod user_service;
