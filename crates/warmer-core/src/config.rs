//! Warmer configuration model and loader.
//!
//! Accepts either TOML or JSON. Keys are snake_case; the camelCase spelling
//! of each key (`timerResolutionSeconds`, `emailTo`, ...) is accepted as an
//! alias. Other casings are not recognised.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ConfigError, ConfigResult};

/// Sender display name used when `email.from_name` is not configured.
pub const DEFAULT_FROM_NAME: &str = "Page Warmer";

/// Default SMTP port.
pub const DEFAULT_SMTP_PORT: u16 = 25;

/// Upper bound for the tick interval and request timeout (one week).
pub const MAX_DURATION_SECONDS: f64 = 604_800.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WarmerConfig {
    /// Seconds between timer ticks.
    #[serde(alias = "timerResolutionSeconds", alias = "timerResolution")]
    pub timer_resolution_seconds: f64,

    /// Check one randomly chosen page per tick instead of every page.
    #[serde(default, alias = "warmOneRandomPagePerTimerLoop")]
    pub warm_one_random_page_per_timer_loop: bool,

    /// Optional per-request timeout. Absent means the HTTP client default.
    #[serde(default, alias = "requestTimeoutSeconds")]
    pub request_timeout_seconds: Option<f64>,

    /// Pages to warm, in check order.
    pub pages: Vec<Page>,

    /// Alert delivery settings. Without them alerts are only logged.
    #[serde(default)]
    pub email: Option<EmailConfig>,
}

/// A single endpoint to keep warm.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page {
    pub url: String,

    /// Substring that must appear in the response body.
    #[serde(default)]
    pub token: Option<String>,

    /// Maximum acceptable latency, in seconds.
    #[serde(
        alias = "responseThresholdSeconds",
        alias = "responseThreshold",
        alias = "reponseThreshold"
    )]
    pub response_threshold_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmailConfig {
    #[serde(alias = "emailTo")]
    pub to: String,
    #[serde(alias = "emailFrom")]
    pub from: String,
    #[serde(default = "default_from_name", alias = "fromName")]
    pub from_name: String,
    #[serde(alias = "emailHost")]
    pub host: String,
    #[serde(default = "default_smtp_port", alias = "emailHostPort")]
    pub port: u16,
    #[serde(default, alias = "emailUsername")]
    pub username: Option<String>,
    #[serde(default, alias = "emailPassword")]
    pub password: Option<String>,
}

fn default_from_name() -> String {
    DEFAULT_FROM_NAME.to_string()
}

fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

impl Page {
    /// Create a page with no content token.
    pub fn new(url: impl Into<String>, response_threshold_seconds: f64) -> Self {
        Self {
            url: url.into(),
            token: None,
            response_threshold_seconds,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// The content token, treating an empty string as "no token".
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }

    /// Latency threshold in milliseconds.
    pub fn threshold_ms(&self) -> f64 {
        self.response_threshold_seconds * 1000.0
    }
}

impl EmailConfig {
    /// Username/password pair, only when both are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() => Some((user, pass)),
            _ => None,
        }
    }
}

impl WarmerConfig {
    /// Load and validate a config file. `.json` files are parsed as JSON,
    /// everything else as TOML.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    pub fn from_toml_str(s: &str) -> ConfigResult<Self> {
        let config: WarmerConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(s: &str) -> ConfigResult<Self> {
        let config: WarmerConfig = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges and URL shapes.
    pub fn validate(&self) -> ConfigResult<()> {
        self.timer_resolution()?;
        self.request_timeout()?;

        if self.pages.is_empty() {
            return Err(ConfigError::invalid("pages", "at least one page is required"));
        }

        for (index, page) in self.pages.iter().enumerate() {
            check_http_url(&page.url).map_err(|reason| {
                ConfigError::invalid(format!("pages[{index}].url"), reason)
            })?;
            let threshold = page.response_threshold_seconds;
            if !(threshold.is_finite() && threshold >= 0.0) {
                return Err(ConfigError::invalid(
                    format!("pages[{index}].response_threshold_seconds"),
                    format!("must be a non-negative number, got {threshold}"),
                ));
            }
        }

        if let Some(email) = &self.email {
            for (field, value) in [
                ("email.to", &email.to),
                ("email.from", &email.from),
                ("email.host", &email.host),
            ] {
                if value.trim().is_empty() {
                    return Err(ConfigError::invalid(field, "must not be empty"));
                }
            }
        }

        Ok(())
    }

    /// Interval between timer ticks.
    pub fn timer_resolution(&self) -> ConfigResult<Duration> {
        bounded_duration("timer_resolution_seconds", self.timer_resolution_seconds)
    }

    /// Per-request timeout, if configured.
    pub fn request_timeout(&self) -> ConfigResult<Option<Duration>> {
        self.request_timeout_seconds
            .map(|secs| bounded_duration("request_timeout_seconds", secs))
            .transpose()
    }
}

fn bounded_duration(field: &'static str, secs: f64) -> ConfigResult<Duration> {
    if !(secs > 0.0 && secs <= MAX_DURATION_SECONDS) {
        return Err(ConfigError::invalid(
            field,
            format!("must be greater than 0 and at most {MAX_DURATION_SECONDS} seconds, got {secs}"),
        ));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| ConfigError::invalid(field, format!("not a valid duration: {e}")))
}

fn check_http_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| format!("invalid URL {raw:?}: {e}"))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("expected an http(s) URL, got scheme {other:?}")),
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(format!("URL {raw:?} has no host"));
    }
    Ok(())
}
