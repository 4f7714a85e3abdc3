use super::{MailError, Mailer, OutgoingMail};
use async_trait::async_trait;
use std::sync::Mutex;
use tracing::{debug, info};

/// Writes mails to the log instead of delivering them
///
/// Meant for development: the confirmation link shows up in the server log.
#[derive(Debug, Default, Clone)]
pub struct ConsoleMailer;

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send_mail(&self, mail: OutgoingMail) -> Result<(), MailError> {
        if mail.to.is_empty() {
            return Err(MailError::NoRecipients);
        }

        info!(
            from = %mail.from,
            to = ?mail.to,
            subject = %mail.subject,
            "Outgoing mail\n{}",
            mail.body
        );
        Ok(())
    }
}

/// Hands mails to an HTTP mail relay
///
/// Posts the mail as JSON (`subject`, `body`, `from`, `to`) to the relay URL,
/// optionally with a bearer token. Any non-2xx answer is a transport error.
#[derive(Debug, Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl HttpMailer {
    pub fn new(url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            token,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send_mail(&self, mail: OutgoingMail) -> Result<(), MailError> {
        if mail.to.is_empty() {
            return Err(MailError::NoRecipients);
        }

        let mut request = self.client.post(&self.url).json(&mail);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MailError::Transport(format!(
                "Relay answered with status {}",
                status
            )));
        }

        debug!(to = ?mail.to, "Mail handed to relay");
        Ok(())
    }
}

/// Collects mails in memory
///
/// Used by tests to inspect what would have been sent.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    outbox: Mutex<Vec<OutgoingMail>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every mail sent so far
    pub fn outbox(&self) -> Vec<OutgoingMail> {
        self.outbox
            .lock()
            .map(|outbox| outbox.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send_mail(&self, mail: OutgoingMail) -> Result<(), MailError> {
        if mail.to.is_empty() {
            return Err(MailError::NoRecipients);
        }

        self.outbox
            .lock()
            .map_err(|_| MailError::Transport("Outbox lock poisoned".to_string()))?
            .push(mail);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail(to: &[&str]) -> OutgoingMail {
        OutgoingMail {
            subject: "Subject".to_string(),
            body: "Body".to_string(),
            from: "webmaster@localhost".to_string(),
            to: to.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_memory_mailer_collects() {
        let mailer = MemoryMailer::new();

        mailer.send_mail(mail(&["a@example.org"])).await.unwrap();
        mailer.send_mail(mail(&["b@example.org"])).await.unwrap();

        let outbox = mailer.outbox();
        assert_eq!(outbox.len(), 2);
        assert_eq!(outbox[1].to, vec!["b@example.org".to_string()]);
    }

    #[tokio::test]
    async fn test_no_recipients_rejected() {
        assert!(matches!(
            MemoryMailer::new().send_mail(mail(&[])).await,
            Err(MailError::NoRecipients)
        ));
        assert!(matches!(
            ConsoleMailer.send_mail(mail(&[])).await,
            Err(MailError::NoRecipients)
        ));
    }

    #[tokio::test]
    async fn test_http_mailer_unreachable_relay() {
        let mailer = HttpMailer::new("http://127.0.0.1:9/send", None);

        let result = mailer.send_mail(mail(&["a@example.org"])).await;
        assert!(matches!(result, Err(MailError::Transport(_))));
    }
}
