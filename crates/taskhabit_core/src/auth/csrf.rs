//! Time-limited form tokens signed with the application secret key.
//!
//! Token format: `<issued_at_unix_secs>.<hex hmac-sha256>`, where the MAC
//! covers the per-client nonce and the issue time.

use crate::config::SecretKey;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::error::Error;
use std::fmt::{Display, Formatter};

type HmacSha256 = Hmac<Sha256>;

/// Default token lifetime.
pub const DEFAULT_MAX_AGE_SECS: i64 = 3600;
/// Tolerated clock skew for tokens that appear to come from the future.
const MAX_CLOCK_SKEW_SECS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CsrfError {
    Missing,
    Malformed,
    BadSignature,
    Expired { age_secs: i64, max_age_secs: i64 },
}

impl Display for CsrfError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "form token is missing"),
            Self::Malformed => write!(f, "form token is malformed"),
            Self::BadSignature => write!(f, "form token signature does not match"),
            Self::Expired {
                age_secs,
                max_age_secs,
            } => write!(
                f,
                "form token expired ({age_secs}s old, limit {max_age_secs}s)"
            ),
        }
    }
}

impl Error for CsrfError {}

/// Issues and checks form tokens.
#[derive(Debug, Clone)]
pub struct CsrfGuard {
    key: SecretKey,
    max_age_secs: i64,
}

impl CsrfGuard {
    pub fn new(key: &SecretKey) -> Self {
        Self {
            key: key.clone(),
            max_age_secs: DEFAULT_MAX_AGE_SECS,
        }
    }

    pub fn with_max_age(mut self, max_age_secs: i64) -> Self {
        self.max_age_secs = max_age_secs;
        self
    }

    /// Issues a token bound to `nonce` (typically the client's session id).
    pub fn issue(&self, nonce: &str) -> String {
        self.issue_at(nonce, Utc::now().timestamp())
    }

    pub fn issue_at(&self, nonce: &str, issued_at: i64) -> String {
        let signature = hex::encode(self.mac(nonce, issued_at).finalize().into_bytes());
        format!("{issued_at}.{signature}")
    }

    pub fn verify(&self, token: &str, nonce: &str) -> Result<(), CsrfError> {
        self.verify_at(token, nonce, Utc::now().timestamp())
    }

    pub fn verify_at(&self, token: &str, nonce: &str, now: i64) -> Result<(), CsrfError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(CsrfError::Missing);
        }

        let (issued_at, signature) = token.split_once('.').ok_or(CsrfError::Malformed)?;
        let issued_at = issued_at
            .parse::<i64>()
            .map_err(|_| CsrfError::Malformed)?;
        let signature = hex::decode(signature).map_err(|_| CsrfError::Malformed)?;

        self.mac(nonce, issued_at)
            .verify_slice(&signature)
            .map_err(|_| CsrfError::BadSignature)?;

        let age_secs = now - issued_at;
        if age_secs > self.max_age_secs || age_secs < -MAX_CLOCK_SKEW_SECS {
            return Err(CsrfError::Expired {
                age_secs,
                max_age_secs: self.max_age_secs,
            });
        }
        Ok(())
    }

    fn mac(&self, nonce: &str, issued_at: i64) -> HmacSha256 {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(self.key.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(nonce.as_bytes());
        mac.update(b"|");
        mac.update(issued_at.to_string().as_bytes());
        mac
    }
}
