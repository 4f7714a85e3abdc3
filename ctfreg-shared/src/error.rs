/// Error types for the registration flow
///
/// [`FormErrors`] collects field-level validation messages, the way a form
/// reports them back to the user. [`RegistrationError`] wraps everything
/// that can go wrong while saving a registration or sending its mail.

use crate::auth::{password::PasswordError, token::TokenError};
use crate::mail::MailError;
use crate::media::MediaError;
use crate::store::StoreError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Field name → validation messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages reported for one field
    pub fn field(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Iterates `(field, message)` pairs in field order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .flat_map(|(field, messages)| messages.iter().map(move |m| (field.as_str(), m.as_str())))
    }

    /// Merges the errors of another form into this one
    pub fn merge(&mut self, other: FormErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    /// `Ok(())` if no errors were collected
    pub fn into_result(self) -> Result<(), FormErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<validator::ValidationErrors> for FormErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut form_errors = FormErrors::new();
        for (field, errors) in errors.field_errors() {
            for error in errors.iter() {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Validation failed".to_string());
                form_errors.add(field.to_string(), message);
            }
        }
        form_errors
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

/// Registration error types
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    /// One or more fields failed validation
    #[error("Validation failed: {0}")]
    Validation(FormErrors),

    /// `send_confirmation_mail` was called before the user was saved
    #[error("The user has not been saved yet")]
    NotSaved,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error(transparent)]
    Media(#[from] MediaError),
}

impl From<FormErrors> for RegistrationError {
    fn from(errors: FormErrors) -> Self {
        RegistrationError::Validation(errors)
    }
}

/// Registration result type alias
pub type RegistrationResult<T> = Result<T, RegistrationError>;
