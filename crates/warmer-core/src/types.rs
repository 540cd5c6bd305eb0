//! Per-check types passed between the checker, validator, and notifier.

use std::fmt;
use std::time::Duration;

/// Result of fetching a single page. Created per check, consumed immediately.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    /// Wall-clock time from request start to completion or failure.
    pub elapsed_ms: f64,
    /// Response body. Always empty when `transport_error` is set.
    pub body: String,
    /// Set when the request could not complete (network error, non-2xx, timeout).
    pub transport_error: Option<String>,
}

impl CheckOutcome {
    /// A request that completed with a 2xx response.
    pub fn completed(elapsed: Duration, body: impl Into<String>) -> Self {
        Self::from_millis(elapsed.as_secs_f64() * 1000.0, body)
    }

    /// A request that failed before a usable response was read.
    pub fn failed(elapsed: Duration, error: impl Into<String>) -> Self {
        Self {
            elapsed_ms: elapsed.as_secs_f64() * 1000.0,
            body: String::new(),
            transport_error: Some(error.into()),
        }
    }

    pub fn from_millis(elapsed_ms: f64, body: impl Into<String>) -> Self {
        Self {
            elapsed_ms,
            body: body.into(),
            transport_error: None,
        }
    }

    pub fn is_transport_failure(&self) -> bool {
        self.transport_error.is_some()
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_ms / 1000.0
    }
}

/// Why a page check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The request could not complete.
    TransportFailure,
    /// A valid response arrived, but slower than the page threshold.
    ThresholdExceeded,
    /// Fast enough, but the body was empty or missing the token.
    InvalidResponse,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::TransportFailure => "transport_failure",
            FailureKind::ThresholdExceeded => "threshold_exceeded",
            FailureKind::InvalidResponse => "invalid_response",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a check outcome against its page rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Success,
    Failure(FailureKind),
}

impl Verdict {
    pub fn is_success(&self) -> bool {
        matches!(self, Verdict::Success)
    }

    pub fn failure(&self) -> Option<FailureKind> {
        match self {
            Verdict::Success => None,
            Verdict::Failure(kind) => Some(*kind),
        }
    }
}
