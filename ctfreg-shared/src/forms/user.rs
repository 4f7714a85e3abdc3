use super::{FieldDescriptor, FieldKind, REQUIRED};
use crate::auth::password::hash_password;
use crate::error::{FormErrors, RegistrationError, RegistrationResult};
use crate::mail::{ConfirmationMailer, RequestSite};
use crate::models::user::{NewUser, User};
use crate::store::{RegistrationStore, StoreError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

static USERNAME_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w.@+-]+$").unwrap());

const INVALID_USERNAME: &str = "Enter a valid username. This value may contain only letters, \
     numbers, and @/./+/-/_ characters.";

const USERNAME_TAKEN: &str = "A user with that username already exists.";

const FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor {
        name: "username",
        label: "Name",
        help_text: None,
        required: true,
        kind: FieldKind::Text,
    },
    FieldDescriptor {
        name: "password",
        label: "Password",
        help_text: None,
        required: true,
        kind: FieldKind::Password,
    },
    FieldDescriptor {
        name: "email",
        label: "Formal email",
        help_text: Some(
            "Your authorative contact address. It will be used sensitive requests, such as \
             password resets or prize pay-outs.",
        ),
        required: true,
        kind: FieldKind::Email,
    },
];

/// Raw input of the identity portion of a registration
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UserCredentialsData {
    #[validate(length(max = 150, message = "Ensure this value has at most 150 characters."))]
    pub username: String,

    #[validate(length(max = 128, message = "Ensure this value has at most 128 characters."))]
    pub password: String,

    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 254, message = "Ensure this value has at most 254 characters.")
    )]
    pub email: String,
}

impl UserCredentialsData {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            email: email.into(),
        }
    }

    /// Strips surrounding whitespace from all fields, the password included
    fn cleaned(&self) -> Self {
        Self {
            username: self.username.trim().to_string(),
            password: self.password.trim().to_string(),
            email: self.email.trim().to_string(),
        }
    }
}

/// The portion of the registration stored in the user record
///
/// Saving always produces an inactive user. The account stays inactive until
/// its formal email address has been confirmed through the link sent by
/// [`send_confirmation_mail`](Self::send_confirmation_mail).
#[derive(Debug, Clone)]
pub struct UserCredentialsForm {
    data: UserCredentialsData,
    instance: Option<User>,
}

impl UserCredentialsForm {
    pub fn new(data: UserCredentialsData) -> Self {
        Self {
            data: data.cleaned(),
            instance: None,
        }
    }

    /// Field descriptions, in display order
    pub fn fields() -> &'static [FieldDescriptor] {
        FIELDS
    }

    /// The user persisted by [`save`](Self::save), if any
    pub fn user(&self) -> Option<&User> {
        self.instance.as_ref()
    }

    /// Collects field errors, including the username uniqueness check
    pub async fn errors(&self, store: &dyn RegistrationStore) -> Result<FormErrors, StoreError> {
        let mut errors = FormErrors::new();

        let required = [
            ("username", self.data.username.is_empty()),
            ("password", self.data.password.is_empty()),
            ("email", self.data.email.is_empty()),
        ];
        for (field, missing) in required {
            if missing {
                errors.add(field, REQUIRED);
            }
        }

        if let Err(validation) = self.data.validate() {
            for (field, message) in FormErrors::from(validation).iter() {
                if !errors.contains(field) {
                    errors.add(field, message);
                }
            }
        }

        if !errors.contains("username") {
            if !USERNAME_PATTERN.is_match(&self.data.username) {
                errors.add("username", INVALID_USERNAME);
            } else if store.username_exists(&self.data.username).await? {
                errors.add("username", USERNAME_TAKEN);
            }
        }

        Ok(errors)
    }

    pub async fn is_valid(&self, store: &dyn RegistrationStore) -> Result<bool, StoreError> {
        Ok(self.errors(store).await?.is_empty())
    }

    /// Builds the user record without persisting it
    ///
    /// The password is hashed and `is_active` is false regardless of input.
    pub fn build(&self) -> RegistrationResult<NewUser> {
        let password_hash = hash_password(&self.data.password)?;

        Ok(NewUser::inactive(
            self.data.username.clone(),
            password_hash,
            self.data.email.clone(),
        ))
    }

    /// Validates and persists the user as inactive
    ///
    /// The saved user is kept by the form for
    /// [`send_confirmation_mail`](Self::send_confirmation_mail).
    pub async fn save(&mut self, store: &dyn RegistrationStore) -> RegistrationResult<User> {
        self.errors(store).await?.into_result()?;

        let user = match store.insert_user(self.build()?).await {
            Ok(user) => user,
            // Lost a race against a concurrent registration with the same name
            Err(StoreError::Conflict(_)) => {
                let mut errors = FormErrors::new();
                errors.add("username", USERNAME_TAKEN);
                return Err(errors.into());
            }
            Err(e) => return Err(e.into()),
        };

        info!(user_id = %user.id, username = %user.username, "Saved inactive user");
        self.instance = Some(user.clone());
        Ok(user)
    }

    /// Sends the address confirmation mail for the saved user
    ///
    /// # Errors
    ///
    /// `RegistrationError::NotSaved` if [`save`](Self::save) has not
    /// succeeded yet; mail transport errors are passed through.
    pub async fn send_confirmation_mail(
        &self,
        site: &RequestSite,
        confirmation: &ConfirmationMailer,
    ) -> RegistrationResult<()> {
        let user = self.instance.as_ref().ok_or(RegistrationError::NotSaved)?;
        confirmation.send(user, site).await
    }
}
