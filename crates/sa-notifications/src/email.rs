//! Email delivery
//!
//! Account mail always goes to exactly one person, so a message carries a
//! single recipient.

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("transport rejected message: {0}")]
    Rejected(String),
    #[error("invalid recipient address: {0:?}")]
    InvalidRecipient(String),
}

pub type EmailResult<T> = Result<T, EmailError>;

/// Mailbox with optional display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress {
    pub email: String,
    pub name: Option<String>,
}

impl EmailAddress {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }

    /// Blank names are dropped
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.name = Some(name).filter(|n| !n.trim().is_empty());
        self
    }

    /// `Name <address>`, quoting names that need it
    pub fn to_rfc5322(&self) -> String {
        match &self.name {
            Some(name) if name.contains([',', '<', '>', '"', ';', ':']) => {
                format!("\"{}\" <{}>", name.replace('"', "'"), self.email)
            }
            Some(name) => format!("{} <{}>", name, self.email),
            None => self.email.clone(),
        }
    }

    fn is_plausible(&self) -> bool {
        match self.email.split_once('@') {
            Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !self.email.contains(char::is_whitespace),
            None => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub id: String,
    pub from: EmailAddress,
    pub to: EmailAddress,
    pub subject: String,
    pub text_body: String,
    pub html_body: Option<String>,
}

impl EmailMessage {
    pub fn new(
        from: EmailAddress,
        to: EmailAddress,
        subject: impl Into<String>,
        text_body: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            from,
            to,
            subject: subject.into(),
            text_body: text_body.into(),
            html_body: None,
        }
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html_body = Some(html.into());
        self
    }

    fn check_recipient(&self) -> EmailResult<()> {
        if self.to.is_plausible() {
            Ok(())
        } else {
            Err(EmailError::InvalidRecipient(self.to.email.clone()))
        }
    }
}

/// Outgoing mail transport
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Hand the message to the transport, returning its id
    async fn send(&self, message: &EmailMessage) -> EmailResult<String>;
}

/// Writes outgoing mail to the log instead of delivering it
#[derive(Debug, Default)]
pub struct ConsoleEmailSender;

impl ConsoleEmailSender {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EmailSender for ConsoleEmailSender {
    async fn send(&self, message: &EmailMessage) -> EmailResult<String> {
        message.check_recipient()?;

        tracing::info!(
            message_id = %message.id,
            from = %message.from.to_rfc5322(),
            to = %message.to.to_rfc5322(),
            subject = %message.subject,
            "Account mail written to log"
        );
        // bodies carry one-time links
        tracing::debug!(message_id = %message.id, body = %message.text_body, "Account mail body");

        Ok(message.id.clone())
    }
}

/// Keeps every message so tests can read the links that were mailed
#[derive(Debug, Default)]
pub struct RecordingEmailSender {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().clone()
    }

    pub fn sent_to(&self, email: &str) -> Vec<EmailMessage> {
        self.sent
            .lock()
            .iter()
            .filter(|m| m.to.email == email)
            .cloned()
            .collect()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send(&self, message: &EmailMessage) -> EmailResult<String> {
        message.check_recipient()?;
        self.sent.lock().push(message.clone());
        Ok(message.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_to(address: &str) -> EmailMessage {
        EmailMessage::new(
            EmailAddress::new("no-reply@campus.example").with_name("SuperApp"),
            EmailAddress::new(address),
            "Verify Email Address",
            "link",
        )
    }

    #[test]
    fn test_rfc5322() {
        assert_eq!(EmailAddress::new("alice@x").to_rfc5322(), "alice@x");
        assert_eq!(
            EmailAddress::new("alice@x").with_name("Alice").to_rfc5322(),
            "Alice <alice@x>"
        );
        assert_eq!(
            EmailAddress::new("alice@x").with_name("Doe, Alice").to_rfc5322(),
            "\"Doe, Alice\" <alice@x>"
        );
        assert!(EmailAddress::new("alice@x").with_name("  ").name.is_none());
    }

    #[tokio::test]
    async fn test_recording_sender() {
        let sender = RecordingEmailSender::new();
        let msg = message_to("alice@x");

        let id = sender.send(&msg).await.unwrap();
        assert_eq!(id, msg.id);
        assert_eq!(sender.count(), 1);
        assert_eq!(sender.sent_to("alice@x").len(), 1);
        assert!(sender.sent_to("bob@x").is_empty());
    }

    #[tokio::test]
    async fn test_implausible_recipient_is_refused() {
        for address in ["", "alice", "@x", "alice @x"] {
            let result = ConsoleEmailSender::new().send(&message_to(address)).await;
            assert!(matches!(result, Err(EmailError::InvalidRecipient(_))), "{address}");
        }

        let sender = RecordingEmailSender::new();
        assert!(sender.send(&message_to("alice")).await.is_err());
        assert_eq!(sender.count(), 0);
    }
}
