//! Failure notifications.

use async_trait::async_trait;
use tracing::{debug, error, warn};

use warmer_core::{CheckOutcome, EmailConfig, FailureKind, Page};

use crate::transport::{MailMessage, MailTransport};

/// Receives failed checks. Implementations swallow their own delivery
/// errors; nothing here may fail the calling tick.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_transport_failure(&self, page: &Page, error: &str);

    async fn notify_threshold_exceeded(&self, elapsed_ms: f64, page: &Page);

    async fn notify_invalid_response(&self, body: &str, page: &Page);

    /// Dispatch to the operation matching `kind`.
    async fn notify(&self, kind: FailureKind, page: &Page, outcome: &CheckOutcome) {
        match kind {
            FailureKind::TransportFailure => {
                let error = outcome.transport_error.as_deref().unwrap_or("request failed");
                self.notify_transport_failure(page, error).await;
            }
            FailureKind::ThresholdExceeded => {
                self.notify_threshold_exceeded(outcome.elapsed_ms, page).await;
            }
            FailureKind::InvalidResponse => {
                self.notify_invalid_response(&outcome.body, page).await;
            }
        }
    }
}

/// Sends an HTML email per failure through a [`MailTransport`].
pub struct EmailNotifier<T> {
    transport: T,
    from: String,
    from_name: String,
    to: String,
}

impl<T: MailTransport> EmailNotifier<T> {
    pub fn new(transport: T, config: &EmailConfig) -> Self {
        Self {
            transport,
            from: config.from.clone(),
            from_name: config.from_name.clone(),
            to: config.to.clone(),
        }
    }

    fn message(&self, subject: &str, html_body: String) -> MailMessage {
        MailMessage {
            from: self.from.clone(),
            from_name: self.from_name.clone(),
            to: self.to.clone(),
            subject: subject.to_string(),
            html_body,
        }
    }

    async fn deliver(&self, message: MailMessage) {
        match self.transport.send(&message).await {
            Ok(()) => debug!(to = %message.to, subject = %message.subject, "notification email sent"),
            Err(e) => error!(to = %message.to, subject = %message.subject, error = %e, "failed to send notification email"),
        }
    }
}

#[async_trait]
impl<T: MailTransport> Notifier for EmailNotifier<T> {
    async fn notify_transport_failure(&self, page: &Page, error: &str) {
        let message = self.message(
            "Page Warmer: Request failed",
            transport_failure_body(page, error),
        );
        self.deliver(message).await;
    }

    async fn notify_threshold_exceeded(&self, elapsed_ms: f64, page: &Page) {
        let message = self.message(
            "Page Warmer: Request threshold exceeded",
            threshold_exceeded_body(elapsed_ms, page),
        );
        self.deliver(message).await;
    }

    async fn notify_invalid_response(&self, body: &str, page: &Page) {
        let message = self.message(
            "Page Warmer: Invalid Response",
            invalid_response_body(body, page),
        );
        self.deliver(message).await;
    }
}

/// Reports alerts through the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_transport_failure(&self, page: &Page, error: &str) {
        warn!(url = %page.url, %error, "alert: request failed");
    }

    async fn notify_threshold_exceeded(&self, elapsed_ms: f64, page: &Page) {
        warn!(
            url = %page.url,
            elapsed_secs = elapsed_ms / 1000.0,
            threshold_secs = page.response_threshold_seconds,
            "alert: request threshold exceeded"
        );
    }

    async fn notify_invalid_response(&self, body: &str, page: &Page) {
        let reason = if body.is_empty() { "empty body" } else { "token missing" };
        warn!(url = %page.url, reason, "alert: invalid response");
    }
}

fn transport_failure_body(page: &Page, error: &str) -> String {
    format!(
        "<p>Request: {}</p><p>Error: {}</p>",
        escape_html(&page.url),
        escape_html(error)
    )
}

fn threshold_exceeded_body(elapsed_ms: f64, page: &Page) -> String {
    format!(
        "<p>Request: {}</p><p>Time to respond: {}</p>",
        escape_html(&page.url),
        elapsed_ms / 1000.0
    )
}

fn invalid_response_body(body: &str, page: &Page) -> String {
    let reason = if body.is_empty() {
        "<p>Empty body.</p>"
    } else {
        "<p>Token missing.</p>"
    };
    format!("<p>Request: {}</p>{reason}", escape_html(&page.url))
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
