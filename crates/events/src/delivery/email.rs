//! Email delivery.
//!
//! [`Mailer`] is the seam the dispatcher sends through. [`SmtpMailer`] wraps
//! the `lettre` async SMTP transport and addresses every recipient of a batch
//! as Bcc; [`LogMailer`] only logs and is used when SMTP is not configured.
//! Configuration is loaded from environment variables; if `SMTP_HOST` is not
//! set, [`EmailConfig::from_env`] returns `None`.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "noreply@eduboard.local";

/// Configuration for the SMTP email delivery service.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 587).
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    /// Optional SMTP username.
    pub smtp_user: Option<String>,
    /// Optional SMTP password.
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set, signalling that email
    /// delivery is not configured and a [`LogMailer`] should be used.
    ///
    /// | Variable        | Required | Default                    |
    /// |-----------------|----------|----------------------------|
    /// | `SMTP_HOST`     | yes      | —                          |
    /// | `SMTP_PORT`     | no       | `587`                      |
    /// | `SMTP_FROM`     | no       | `noreply@eduboard.local`   |
    /// | `SMTP_USER`     | no       | —                          |
    /// | `SMTP_PASSWORD` | no       | —                          |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok().filter(|h| !h.trim().is_empty())?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// Mailer
// ---------------------------------------------------------------------------

/// One email addressed to a batch of recipients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError>;
}

/// Sends batches over SMTP, one message per batch with recipients in Bcc.
pub struct SmtpMailer {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Build the transport from `config`. Fails on an invalid sender address
    /// or relay host.
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
                .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            from: config.from_address.parse()?,
            transport: transport_builder.build(),
        })
    }

    /// Assemble the batch message. `None` when no recipient address parses.
    fn build_message(&self, email: &OutgoingEmail) -> Result<Option<Message>, EmailError> {
        let recipients = parse_recipients(&email.recipients);
        if recipients.is_empty() {
            return Ok(None);
        }

        // The visible recipient is the sender itself; the batch goes in Bcc.
        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(self.from.clone())
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN);

        for recipient in recipients {
            builder = builder.bcc(recipient);
        }

        builder
            .body(email.body.clone())
            .map(Some)
            .map_err(|e| EmailError::Build(e.to_string()))
    }
}

/// Parse each recipient, dropping the ones that are not valid addresses so a
/// single bad row cannot fail the whole batch.
fn parse_recipients(recipients: &[String]) -> Vec<Mailbox> {
    recipients
        .iter()
        .filter_map(|raw| match raw.parse::<Mailbox>() {
            Ok(mailbox) => Some(mailbox),
            Err(error) => {
                tracing::warn!(recipient = %raw, %error, "Skipping unparseable recipient");
                None
            }
        })
        .collect()
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        let Some(message) = self.build_message(email)? else {
            tracing::warn!(
                recipients = email.recipients.len(),
                subject = %email.subject,
                "No valid recipient in batch, nothing sent"
            );
            return Ok(());
        };
        let sent_to = message.envelope().to().len() - 1;
        self.transport.send(message).await?;

        tracing::info!(
            recipients = sent_to,
            subject = %email.subject,
            "Notification email sent"
        );
        Ok(())
    }
}

/// Logs instead of sending. Used when SMTP is not configured.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        tracing::info!(
            recipients = email.recipients.len(),
            subject = %email.subject,
            "SMTP not configured, notification email logged only"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EmailConfig {
        EmailConfig {
            smtp_host: "smtp.example.com".into(),
            smtp_port: 587,
            from_address: "jobs@eduboard.example".into(),
            smtp_user: None,
            smtp_password: None,
        }
    }

    #[test]
    fn from_env_returns_none_without_smtp_host() {
        // Ensure SMTP_HOST is not set in the test environment.
        std::env::remove_var("SMTP_HOST");
        assert!(EmailConfig::from_env().is_none());
    }

    #[test]
    fn email_error_display_build() {
        let err = EmailError::Build("missing body".to_string());
        assert_eq!(err.to_string(), "Email build error: missing body");
    }

    #[tokio::test]
    async fn batch_recipients_go_in_bcc() {
        let mailer = SmtpMailer::new(&config()).unwrap();
        let message = mailer
            .build_message(&OutgoingEmail {
                recipients: vec!["a@x.com".into(), "b@x.com".into()],
                subject: "New vacancy".into(),
                body: "Hello".into(),
            })
            .unwrap()
            .unwrap();

        let envelope = message.envelope();
        assert_eq!(envelope.to().len(), 3);
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("To: jobs@eduboard.example"));
        assert!(!raw.contains("a@x.com"));
    }

    #[tokio::test]
    async fn invalid_recipients_are_skipped() {
        let mailer = SmtpMailer::new(&config()).unwrap();
        let message = mailer
            .build_message(&OutgoingEmail {
                recipients: vec!["a@x.com".into(), "not-an-email".into(), "b@x.com".into()],
                subject: "s".into(),
                body: "b".into(),
            })
            .unwrap()
            .unwrap();

        let to: Vec<String> = message.envelope().to().iter().map(|a| a.to_string()).collect();
        assert_eq!(to.len(), 3);
        assert!(to.contains(&"a@x.com".to_string()));
        assert!(to.contains(&"b@x.com".to_string()));
    }

    #[tokio::test]
    async fn batch_without_valid_recipients_builds_nothing() {
        let mailer = SmtpMailer::new(&config()).unwrap();
        let message = mailer
            .build_message(&OutgoingEmail {
                recipients: vec!["not-an-email".into(), "".into()],
                subject: "s".into(),
                body: "b".into(),
            })
            .unwrap();
        assert!(message.is_none());
    }

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        let email = OutgoingEmail {
            recipients: vec!["a@x.com".into()],
            subject: "s".into(),
            body: "b".into(),
        };
        LogMailer.send(&email).await.unwrap();
    }
}
