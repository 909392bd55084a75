//! Account record.
//!
//! # Invariants
//! - `username` is unique across all users (enforced by the `users` table).
//! - `password` only ever holds a salted digest.

use super::{require_text, today, Model, ModelValidationError};
use crate::auth::password::{PasswordDigest, PasswordError};
use crate::db::schema::TableDef;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt::{Display, Formatter};

pub type UserId = i64;

pub const USERNAME_MAX_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// Never serialized.
    #[serde(skip)]
    pub password: PasswordDigest,
    pub created_at: NaiveDate,
}

impl User {
    /// Replaces the stored digest with a fresh salted hash of `plaintext`.
    ///
    /// Persist with `UserRepository::update_password`.
    pub fn set_password(&mut self, plaintext: &str) -> Result<(), PasswordError> {
        self.password = PasswordDigest::from_plaintext(plaintext)?;
        Ok(())
    }

    /// Returns whether `candidate` matches the stored digest.
    pub fn check_password(&self, candidate: &str) -> bool {
        self.password.matches(candidate)
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("user", "username", &self.username, USERNAME_MAX_CHARS)
    }
}

impl Model for User {
    const TABLE: TableDef = TableDef {
        name: "users",
        ddl: include_str!("../db/schema/users.sql"),
    };
}

impl Display for User {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "User(username={:?})", self.username)
    }
}

/// Insert request for `users`.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: PasswordDigest,
    /// Defaults to today when `None`.
    pub created_at: Option<NaiveDate>,
}

impl NewUser {
    /// Hashes `password` immediately; the plaintext is not retained.
    /// Surrounding whitespace is stripped from `username`.
    pub fn new(username: impl Into<String>, password: &str) -> Result<Self, PasswordError> {
        Ok(Self {
            username: username.into().trim().to_string(),
            password: PasswordDigest::from_plaintext(password)?,
            created_at: None,
        })
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("user", "username", &self.username, USERNAME_MAX_CHARS)
    }

    /// Creation date that will be stored.
    pub fn created_on(&self) -> NaiveDate {
        self.created_at.unwrap_or_else(today)
    }

    pub(crate) fn into_user(self, id: UserId, created_at: NaiveDate) -> User {
        User {
            id,
            username: self.username,
            password: self.password,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> User {
        let request = NewUser::new("alice", "secret123").unwrap();
        let created_at = request.created_on();
        request.into_user(1, created_at)
    }

    #[test]
    fn set_password_then_check() {
        let mut user = alice();
        user.set_password("n3w-pass").unwrap();
        assert_ne!(user.password.as_str(), "n3w-pass");
        assert!(user.check_password("n3w-pass"));
        assert!(!user.check_password("secret123"));
    }

    #[test]
    fn display_names_username() {
        assert_eq!(alice().to_string(), "User(username=\"alice\")");
    }

    #[test]
    fn serialization_omits_password() {
        let json = serde_json::to_value(alice()).unwrap();
        assert_eq!(json["username"], "alice");
        assert!(json.get("password").is_none());
    }

    #[test]
    fn overlong_username_is_rejected() {
        let request = NewUser::new("x".repeat(51), "secret123").unwrap();
        assert!(matches!(
            request.validate(),
            Err(ModelValidationError::TooLong { field: "username", .. })
        ));
    }

    #[test]
    fn username_is_trimmed() {
        let request = NewUser::new("  alice\t", "secret123").unwrap();
        assert_eq!(request.username, "alice");
    }

    #[test]
    fn created_at_defaults_to_today() {
        let mut request = NewUser::new("bob", "pw").unwrap();
        assert_eq!(request.created_on(), today());

        let fixed = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        request.created_at = Some(fixed);
        assert_eq!(request.created_on(), fixed);
    }
}
