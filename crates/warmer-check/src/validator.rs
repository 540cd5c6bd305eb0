//! Response validation against per-page latency and content rules.

use tracing::{debug, warn};

use warmer_core::{CheckOutcome, FailureKind, Page, Verdict};

/// Classify a check outcome for `page`.
///
/// Rules apply in order and the first failing one wins: transport error,
/// then latency threshold, then body content.
pub fn classify(outcome: &CheckOutcome, page: &Page) -> Verdict {
    if let Some(error) = &outcome.transport_error {
        warn!(url = %page.url, %error, "warming failed - request did not complete");
        return Verdict::Failure(FailureKind::TransportFailure);
    }

    if !is_valid_time_threshold(outcome.elapsed_ms, page) {
        return Verdict::Failure(FailureKind::ThresholdExceeded);
    }

    if !is_valid_response(&outcome.body, page) {
        return Verdict::Failure(FailureKind::InvalidResponse);
    }

    Verdict::Success
}

/// Whether `elapsed_ms` is within the page threshold. Equal counts as valid.
pub fn is_valid_time_threshold(elapsed_ms: f64, page: &Page) -> bool {
    let threshold_ms = page.threshold_ms();
    if elapsed_ms <= threshold_ms {
        return true;
    }

    warn!(
        url = %page.url,
        elapsed_secs = elapsed_ms / 1000.0,
        threshold_secs = page.response_threshold_seconds,
        "warming failed - response time exceeded threshold"
    );
    false
}

/// Whether `body` is non-empty and contains the page token, if any.
/// Token matching is a case-sensitive substring search.
pub fn is_valid_response(body: &str, page: &Page) -> bool {
    if body.is_empty() {
        debug!(url = %page.url, "empty response");
        return false;
    }

    match page.token() {
        None => true,
        Some(token) if body.contains(token) => true,
        Some(token) => {
            debug!(url = %page.url, %token, "token missing");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn page_with_token() -> Page {
        Page::new("https://example.com/", 2.0).with_token("OK")
    }

    #[test]
    fn fast_response_with_token_is_success() {
        let outcome = CheckOutcome::from_millis(500.0, "status OK");
        assert_eq!(classify(&outcome, &page_with_token()), Verdict::Success);
    }

    #[test]
    fn slow_response_exceeds_threshold() {
        let outcome = CheckOutcome::from_millis(3000.0, "status OK");
        assert_eq!(
            classify(&outcome, &page_with_token()),
            Verdict::Failure(FailureKind::ThresholdExceeded)
        );
    }

    #[test]
    fn empty_body_is_invalid() {
        let outcome = CheckOutcome::from_millis(500.0, "");
        assert_eq!(
            classify(&outcome, &page_with_token()),
            Verdict::Failure(FailureKind::InvalidResponse)
        );

        let no_token = Page::new("https://example.com/", 2.0);
        assert_eq!(
            classify(&outcome, &no_token),
            Verdict::Failure(FailureKind::InvalidResponse)
        );
    }

    #[test]
    fn missing_token_is_invalid() {
        let outcome = CheckOutcome::from_millis(500.0, "status FAIL");
        assert_eq!(
            classify(&outcome, &page_with_token()),
            Verdict::Failure(FailureKind::InvalidResponse)
        );
    }

    #[test]
    fn token_match_is_case_sensitive() {
        let outcome = CheckOutcome::from_millis(500.0, "status ok");
        assert!(!classify(&outcome, &page_with_token()).is_success());
    }

    #[test]
    fn any_non_empty_body_passes_without_token() {
        let page = Page::new("https://example.com/", 1.0);
        for body in ["x", " ", "<html></html>", "status FAIL"] {
            let outcome = CheckOutcome::from_millis(10.0, body);
            assert_eq!(classify(&outcome, &page), Verdict::Success, "body {body:?}");
        }
    }

    #[test]
    fn empty_token_disables_content_check() {
        let page = Page::new("https://example.com/", 1.0).with_token("");
        let outcome = CheckOutcome::from_millis(10.0, "anything");
        assert_eq!(classify(&outcome, &page), Verdict::Success);
    }

    #[test]
    fn threshold_boundary_is_exclusive() {
        let page = page_with_token();
        let at = CheckOutcome::from_millis(2000.0, "OK");
        assert_eq!(classify(&at, &page), Verdict::Success);

        let over = CheckOutcome::from_millis(2000.001, "OK");
        assert_eq!(
            classify(&over, &page),
            Verdict::Failure(FailureKind::ThresholdExceeded)
        );
    }

    #[test]
    fn transport_error_short_circuits() {
        // Slow and empty too, but the transport error is reported.
        let outcome = CheckOutcome::failed(Duration::from_secs(30), "connection refused");
        assert_eq!(
            classify(&outcome, &page_with_token()),
            Verdict::Failure(FailureKind::TransportFailure)
        );
    }

    #[test]
    fn threshold_checked_before_content() {
        let outcome = CheckOutcome::from_millis(5000.0, "");
        assert_eq!(
            classify(&outcome, &page_with_token()),
            Verdict::Failure(FailureKind::ThresholdExceeded)
        );
    }

    #[test]
    fn zero_threshold_only_accepts_zero_latency() {
        let page = Page::new("https://example.com/", 0.0);
        assert!(is_valid_time_threshold(0.0, &page));
        assert!(!is_valid_time_threshold(0.5, &page));
    }
}
