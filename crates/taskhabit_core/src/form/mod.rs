//! Submitted-form input contracts.
//!
//! # Invariants
//! - A form is validated completely before any database access.

pub mod login;
