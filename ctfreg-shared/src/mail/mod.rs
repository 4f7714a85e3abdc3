/// Outbound mail
///
/// Registration sends exactly one kind of mail, the address confirmation.
/// Delivery is delegated to a [`Mailer`] injected by the caller; this crate
/// does not queue, retry or track delivery.
///
/// # Modules
///
/// - `backends`: [`ConsoleMailer`], [`HttpMailer`] and [`MemoryMailer`]
/// - [`template`]: `{{ name }}` placeholder rendering
/// - [`confirmation`]: builds and sends the confirmation mail

mod backends;
pub mod confirmation;
pub mod template;

pub use backends::{ConsoleMailer, HttpMailer, MemoryMailer};
pub use confirmation::{ConfirmationMailer, RequestSite};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Mail error types
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// The mail has no recipients
    #[error("Mail has no recipients")]
    NoRecipients,

    /// The transport rejected or failed to deliver the mail
    #[error("Mail transport failed: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for MailError {
    fn from(err: reqwest::Error) -> Self {
        MailError::Transport(err.to_string())
    }
}

/// A plaintext mail ready to be handed to a transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMail {
    pub subject: String,
    pub body: String,
    pub from: String,
    pub to: Vec<String>,
}

/// Mail-sending capability
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Hands one mail to the transport
    ///
    /// Failures are returned to the caller as-is.
    async fn send_mail(&self, mail: OutgoingMail) -> Result<(), MailError>;
}
