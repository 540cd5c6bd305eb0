//! One tick of warming: select pages, check, validate, notify.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, error, warn};

use warmer_check::{classify, Fetcher};
use warmer_core::{FailureKind, Page, Verdict, WarmerConfig};
use warmer_notify::Notifier;

/// A page that failed during a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFailure {
    pub url: String,
    pub kind: FailureKind,
}

/// Summary of a single `Warmer::run()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Pages whose check ran to completion.
    pub checked: usize,
    pub succeeded: usize,
    pub failures: Vec<PageFailure>,
    /// Pages whose check panicked and was abandoned.
    pub aborted: usize,
}

impl TickReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.aborted == 0
    }

    fn record(&mut self, page: &Page, verdict: Verdict) {
        self.checked += 1;
        match verdict {
            Verdict::Success => self.succeeded += 1,
            Verdict::Failure(kind) => self.failures.push(PageFailure {
                url: page.url.clone(),
                kind,
            }),
        }
    }
}

/// Owns the page list and runs the checker → validator → notifier pipeline.
///
/// No state survives between ticks apart from the random source used for
/// single-page selection.
pub struct Warmer {
    config: Arc<WarmerConfig>,
    fetcher: Arc<dyn Fetcher>,
    notifier: Arc<dyn Notifier>,
    rng: Mutex<StdRng>,
}

impl Warmer {
    /// Create a warmer. The page-selection RNG is seeded from the OS once.
    pub fn new(
        config: Arc<WarmerConfig>,
        fetcher: Arc<dyn Fetcher>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            fetcher,
            notifier,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Reseed page selection deterministically (for testing).
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn config(&self) -> &WarmerConfig {
        &self.config
    }

    /// Execute one tick. Pages are checked one after another; a failing or
    /// panicking page does not stop the rest. Never fails.
    pub async fn run(&self) -> TickReport {
        let pages = self.select_pages();
        let mut report = TickReport::default();

        for page in pages {
            match AssertUnwindSafe(self.warm_page(page)).catch_unwind().await {
                Ok(verdict) => report.record(page, verdict),
                Err(panic) => {
                    error!(
                        url = %page.url,
                        panic = %panic_message(panic.as_ref()),
                        "page check aborted"
                    );
                    report.aborted += 1;
                }
            }
        }

        report
    }

    /// Check a single page and notify on failure.
    pub async fn warm_page(&self, page: &Page) -> Verdict {
        let outcome = self.fetcher.fetch(&page.url).await;
        let verdict = classify(&outcome, page);

        match verdict.failure() {
            None => debug!(
                url = %page.url,
                elapsed_secs = outcome.elapsed_secs(),
                "warming success"
            ),
            Some(kind) => self.notifier.notify(kind, page, &outcome).await,
        }

        verdict
    }

    fn select_pages(&self) -> Vec<&Page> {
        let pages = &self.config.pages;
        if pages.is_empty() {
            warn!("no pages configured");
            return Vec::new();
        }

        if self.config.warm_one_random_page_per_timer_loop {
            let index = self
                .rng
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .random_range(0..pages.len());
            vec![&pages[index]]
        } else {
            pages.iter().collect()
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
