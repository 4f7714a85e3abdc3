/// Address confirmation mail
///
/// Renders the confirmation template for a saved user and hands the result
/// to the injected [`Mailer`]. The template context is:
///
/// | name               | value                                        |
/// |--------------------|----------------------------------------------|
/// | `competition_name` | configured competition name                  |
/// | `protocol`         | `https` if the request was secure, else `http` |
/// | `host`             | current site host                            |
/// | `user`             | user ID                                      |
/// | `token`            | confirmation token for the user              |

use super::{
    template::{MailTemplate, TemplateContext},
    Mailer, OutgoingMail,
};
use crate::auth::token::{TokenError, TokenGenerator};
use crate::error::RegistrationError;
use crate::models::user::User;
use std::sync::Arc;
use tracing::info;

/// The part of the inbound request that ends up in confirmation links
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSite {
    /// Whether the request arrived over HTTPS
    pub secure: bool,

    /// Host of the current site, e.g. `ctf.example.org`
    pub host: String,
}

impl RequestSite {
    pub fn new(secure: bool, host: impl Into<String>) -> Self {
        Self {
            secure,
            host: host.into(),
        }
    }

    /// URL scheme mirrored from the inbound request
    pub fn protocol(&self) -> &'static str {
        if self.secure {
            "https"
        } else {
            "http"
        }
    }
}

/// Builds and sends confirmation mails
#[derive(Clone)]
pub struct ConfirmationMailer {
    mailer: Arc<dyn Mailer>,
    tokens: TokenGenerator,
    competition_name: String,
    from_email: String,
    template: MailTemplate,
}

impl std::fmt::Debug for ConfirmationMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmationMailer")
            .field("competition_name", &self.competition_name)
            .field("from_email", &self.from_email)
            .finish_non_exhaustive()
    }
}

impl ConfirmationMailer {
    pub fn new(
        mailer: Arc<dyn Mailer>,
        tokens: TokenGenerator,
        competition_name: impl Into<String>,
        from_email: impl Into<String>,
    ) -> Self {
        Self {
            mailer,
            tokens,
            competition_name: competition_name.into(),
            from_email: from_email.into(),
            template: MailTemplate::confirmation(),
        }
    }

    /// Replaces the built-in template
    pub fn with_template(mut self, template: MailTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn tokens(&self) -> &TokenGenerator {
        &self.tokens
    }

    pub fn subject(&self) -> String {
        format!("{} email confirmation", self.competition_name)
    }

    /// Renders the mail for a persisted user without sending it
    pub fn build(&self, user: &User, site: &RequestSite) -> Result<OutgoingMail, TokenError> {
        let token = self.tokens.make_token(user)?;

        let mut context = TemplateContext::new();
        context
            .insert("competition_name", &self.competition_name)
            .insert("protocol", site.protocol())
            .insert("host", &site.host)
            .insert("user", user.id)
            .insert("token", token);

        Ok(OutgoingMail {
            subject: self.subject(),
            body: self.template.render(&context),
            from: self.from_email.clone(),
            to: vec![user.email.clone()],
        })
    }

    /// Sends one confirmation mail to the user's formal email address
    ///
    /// No retry; transport errors are returned to the caller.
    pub async fn send(&self, user: &User, site: &RequestSite) -> Result<(), RegistrationError> {
        let mail = self.build(user, site)?;
        self.mailer.send_mail(mail).await?;

        info!(user_id = %user.id, "Confirmation mail sent");
        Ok(())
    }
}
