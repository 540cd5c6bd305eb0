//! Page fetch with wall-clock timing.
//!
//! Issues a single GET against a page URL and reports elapsed time and
//! body. Any transport problem (DNS, refused connection, non-2xx status,
//! timeout, body read error) is logged and folded into the outcome.

use std::error::Error as StdError;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, warn};

use warmer_core::CheckOutcome;

/// Fetches a URL and reports how it went. Implementations must not fail.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> CheckOutcome;
}

/// `Fetcher` backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher. Without a timeout the client default applies.
    pub fn new(timeout: Option<Duration>) -> reqwest::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("warmer/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    async fn get_body(&self, url: &str) -> reqwest::Result<String> {
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> CheckOutcome {
        let started = Instant::now();
        match self.get_body(url).await {
            Ok(body) => {
                let elapsed = started.elapsed();
                debug!(%url, elapsed_ms = elapsed.as_millis() as u64, bytes = body.len(), "page fetched");
                CheckOutcome::completed(elapsed, body)
            }
            Err(e) => {
                let elapsed = started.elapsed();
                let error = error_chain(&e);
                warn!(%url, elapsed_ms = elapsed.as_millis() as u64, %error, "page request failed");
                CheckOutcome::failed(elapsed, error)
            }
        }
    }
}

/// Render an error with its source chain, `outer: inner: root`.
fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
