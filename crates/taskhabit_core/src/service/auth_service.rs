//! Account registration and sign-in.
//!
//! # Invariants
//! - Unknown username and wrong password are indistinguishable to callers.
//! - Logs carry outcome metadata only, never usernames or secrets.

use crate::auth::password::PasswordError;
use crate::form::login::Credentials;
use crate::model::{NewUser, User};
use crate::repo::user_repo::UserRepository;
use crate::repo::RepoError;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum AuthError {
    Repo(RepoError),
    Password(PasswordError),
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Password(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AuthError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Password(err) => Some(err),
        }
    }
}

impl From<RepoError> for AuthError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<PasswordError> for AuthError {
    fn from(value: PasswordError) -> Self {
        Self::Password(value)
    }
}

pub struct AuthService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> AuthService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates an account with a hashed password.
    ///
    /// A taken username is returned as a repository constraint violation.
    pub fn register(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let request = NewUser::new(username, password)?;
        let user = self.repo.create_user(&request)?;
        info!(
            "event=user_register module=auth status=ok user_id={}",
            user.id
        );
        Ok(user)
    }

    /// Returns the matching user, or `None` for bad credentials.
    pub fn authenticate(&self, credentials: &Credentials) -> Result<Option<User>, AuthError> {
        let Some(user) = self.repo.find_by_username(&credentials.username)? else {
            warn!("event=user_login module=auth status=rejected reason=bad_credentials");
            return Ok(None);
        };

        if !user.check_password(&credentials.password) {
            warn!("event=user_login module=auth status=rejected reason=bad_credentials");
            return Ok(None);
        }

        info!("event=user_login module=auth status=ok user_id={}", user.id);
        Ok(Some(user))
    }

    /// Verifies `current` and stores a digest of `new_password`.
    ///
    /// Returns `Ok(false)` when `current` does not match.
    pub fn change_password(
        &self,
        user: &mut User,
        current: &str,
        new_password: &str,
    ) -> Result<bool, AuthError> {
        if !user.check_password(current) {
            return Ok(false);
        }
        user.set_password(new_password)?;
        self.repo.update_password(user)?;
        info!(
            "event=password_change module=auth status=ok user_id={}",
            user.id
        );
        Ok(true)
    }
}
