//! Username/password sign-in form.
//!
//! # Responsibility
//! - Decode an urlencoded submission into typed fields.
//! - Reject missing fields and forged or stale form tokens.
//!
//! # Invariants
//! - `Debug` output never contains the submitted password.

use crate::auth::csrf::{CsrfError, CsrfGuard};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use validator::{Validate, ValidationError, ValidationErrors};

/// Input widget type of a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Password,
    Submit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormField {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

#[derive(Debug)]
pub enum FormError {
    /// Body is not valid `application/x-www-form-urlencoded`.
    Malformed(serde_urlencoded::de::Error),
    Invalid(ValidationErrors),
    Csrf(CsrfError),
}

impl FormError {
    /// Names of the fields that failed validation, sorted.
    pub fn invalid_fields(&self) -> Vec<String> {
        match self {
            Self::Invalid(errors) => {
                let mut fields: Vec<String> = errors
                    .field_errors()
                    .keys()
                    .map(|field| field.to_string())
                    .collect();
                fields.sort();
                fields
            }
            Self::Malformed(_) | Self::Csrf(_) => Vec::new(),
        }
    }
}

impl Display for FormError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(err) => write!(f, "malformed form body: {err}"),
            Self::Invalid(_) => write!(
                f,
                "missing required fields: {}",
                self.invalid_fields().join(", ")
            ),
            Self::Csrf(err) => write!(f, "{err}"),
        }
    }
}

impl Error for FormError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Malformed(err) => Some(err),
            Self::Invalid(err) => Some(err),
            Self::Csrf(err) => Some(err),
        }
    }
}

impl From<CsrfError> for FormError {
    fn from(value: CsrfError) -> Self {
        Self::Csrf(value)
    }
}

/// Validated sign-in input, ready for `AuthService::authenticate`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Raw sign-in submission. Absent fields decode as empty strings.
#[derive(Clone, Default, Deserialize, Validate)]
pub struct LoginForm {
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "This field is required."))]
    pub username: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "This field is required."))]
    pub password: String,
    #[serde(default)]
    pub csrf_token: String,
}

impl LoginForm {
    pub const FIELDS: [FormField; 3] = [
        FormField {
            name: "username",
            label: "Login",
            kind: FieldKind::Text,
            required: true,
        },
        FormField {
            name: "password",
            label: "Password",
            kind: FieldKind::Password,
            required: true,
        },
        FormField {
            name: "submit",
            label: "Sign in",
            kind: FieldKind::Submit,
            required: false,
        },
    ];

    pub fn from_urlencoded(body: &str) -> Result<Self, FormError> {
        serde_urlencoded::from_str(body).map_err(FormError::Malformed)
    }

    /// Checks required fields, then the form token bound to `nonce`.
    pub fn into_credentials(
        self,
        guard: &CsrfGuard,
        nonce: &str,
    ) -> Result<Credentials, FormError> {
        self.validate().map_err(FormError::Invalid)?;
        guard.verify(&self.csrf_token, nonce)?;
        Ok(Credentials {
            username: self.username.trim().to_string(),
            password: self.password,
        })
    }
}

impl Debug for LoginForm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("csrf_token", &self.csrf_token)
            .finish()
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecretKey;

    fn guard() -> CsrfGuard {
        CsrfGuard::new(&SecretKey::new("s".repeat(48)).unwrap())
    }

    #[test]
    fn decodes_urlencoded_body() {
        let form = LoginForm::from_urlencoded("username=alice&password=p%40ss+word").unwrap();
        assert_eq!(form.username, "alice");
        assert_eq!(form.password, "p@ss word");
        assert!(form.validate().is_ok());
    }

    #[test]
    fn missing_fields_fail_validation() {
        let form = LoginForm::from_urlencoded("username=%20%20").unwrap();
        let err = form.into_credentials(&guard(), "n").unwrap_err();
        assert_eq!(err.invalid_fields(), vec!["password", "username"]);
    }

    #[test]
    fn valid_submission_needs_matching_token() {
        let guard = guard();
        let token = guard.issue("client-1");
        let body = format!("username=+alice+&password=secret123&csrf_token={token}");

        let credentials = LoginForm::from_urlencoded(&body)
            .unwrap()
            .into_credentials(&guard, "client-1")
            .unwrap();
        assert_eq!(credentials.username, "alice");
        assert_eq!(credentials.password, "secret123");

        let err = LoginForm::from_urlencoded(&body)
            .unwrap()
            .into_credentials(&guard, "client-2")
            .unwrap_err();
        assert!(matches!(err, FormError::Csrf(CsrfError::BadSignature)));
    }

    #[test]
    fn debug_output_redacts_password() {
        let form = LoginForm {
            username: "alice".to_string(),
            password: "secret123".to_string(),
            csrf_token: String::new(),
        };
        assert!(!format!("{form:?}").contains("secret123"));
    }

    #[test]
    fn fields_describe_two_inputs_and_submit() {
        let required: Vec<_> = LoginForm::FIELDS
            .iter()
            .filter(|field| field.required)
            .map(|field| field.name)
            .collect();
        assert_eq!(required, vec!["username", "password"]);
        assert_eq!(LoginForm::FIELDS[2].kind, FieldKind::Submit);
    }
}
