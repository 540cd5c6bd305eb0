//! Mail transport seam and the SMTP implementation.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use warmer_core::EmailConfig;

use crate::error::{NotifyError, NotifyResult};

/// A composed alert, ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub from: String,
    pub from_name: String,
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// Delivers a [`MailMessage`]. Errors are reported, never retried here.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &MailMessage) -> NotifyResult<()>;
}

/// SMTP delivery over a plain connection with optional credentials.
#[derive(Clone)]
pub struct SmtpMailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailTransport {
    pub fn new(config: &EmailConfig) -> Self {
        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(config.host.as_str())
                .port(config.port);
        if let Some((username, password)) = config.credentials() {
            builder = builder.credentials(Credentials::new(
                username.to_string(),
                password.to_string(),
            ));
        }
        debug!(host = %config.host, port = config.port, "SMTP transport configured");
        Self {
            transport: builder.build(),
        }
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, message: &MailMessage) -> NotifyResult<()> {
        let email = build_message(message)?;
        self.transport.send(email).await?;
        Ok(())
    }
}

fn parse_address(address: &str) -> NotifyResult<Address> {
    address
        .trim()
        .parse::<Address>()
        .map_err(|source| NotifyError::Address {
            address: address.to_string(),
            source,
        })
}

fn build_message(message: &MailMessage) -> NotifyResult<Message> {
    let from = Mailbox::new(Some(message.from_name.clone()), parse_address(&message.from)?);
    let to = Mailbox::new(None, parse_address(&message.to)?);

    Ok(Message::builder()
        .from(from)
        .to(to)
        .subject(message.subject.as_str())
        .header(ContentType::TEXT_HTML)
        .body(message.html_body.clone())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> MailMessage {
        MailMessage {
            from: "warmer@example.com".to_string(),
            from_name: "Page Warmer".to_string(),
            to: "ops@example.com".to_string(),
            subject: "Page Warmer: Invalid Response".to_string(),
            html_body: "<p>Request: https://example.com/</p><p>Token missing.</p>".to_string(),
        }
    }

    #[test]
    fn builds_html_message_with_display_name() {
        let email = build_message(&message()).unwrap();
        let raw = String::from_utf8(email.formatted()).unwrap();
        assert!(raw.contains("Page Warmer"));
        assert!(raw.contains("<warmer@example.com>"));
        assert!(raw.contains("ops@example.com"));
        assert!(raw.contains("Subject: Page Warmer: Invalid Response"));
        assert!(raw.contains("Content-Type: text/html"));
    }

    #[test]
    fn rejects_bad_recipient() {
        let mut msg = message();
        msg.to = "not-an-address".to_string();
        let err = build_message(&msg).unwrap_err();
        assert!(matches!(err, NotifyError::Address { ref address, .. } if address == "not-an-address"));
    }

    #[tokio::test]
    async fn unreachable_smtp_host_reports_error() {
        let config = EmailConfig {
            to: "ops@example.com".to_string(),
            from: "warmer@example.com".to_string(),
            from_name: "Page Warmer".to_string(),
            host: "127.0.0.1".to_string(),
            port: 1,
            username: None,
            password: None,
        };
        let transport = SmtpMailTransport::new(&config);
        assert!(transport.send(&message()).await.is_err());
    }
}
