//! warmer-notify — alerting for failed page checks.
//!
//! The scheduler talks to a [`Notifier`]. Two implementations ship:
//!
//! - [`EmailNotifier`] composes an HTML message per failure kind and hands
//!   it to a [`MailTransport`] (SMTP via lettre in production).
//! - [`LogNotifier`] only logs, for deployments without mail settings.
//!
//! Delivery is best effort. A failed send is logged at error level and
//! dropped; it is never retried and never reaches the caller.

pub mod error;
pub mod notifier;
pub mod transport;

pub use error::{NotifyError, NotifyResult};
pub use notifier::{EmailNotifier, LogNotifier, Notifier};
pub use transport::{MailMessage, MailTransport, SmtpMailTransport};
