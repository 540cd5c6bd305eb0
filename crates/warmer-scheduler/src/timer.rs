//! Timer loop — fires ticks on a fixed interval and runs at most one
//! `Warmer::run()` at a time.
//!
//! The timer runs on its own task. Each tick tries to take the single
//! permit of a [`TickGate`]; on success the tick's work is spawned on a
//! separate worker task that owns the permit until it finishes. If the
//! permit is still held, the tick is skipped.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use warmer_core::ConfigResult;

use crate::warmer::{panic_message, Warmer};

/// Single-slot, non-blocking "tick in progress" flag.
#[derive(Debug, Clone)]
pub struct TickGate {
    slot: Arc<Semaphore>,
}

impl TickGate {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Semaphore::new(1)),
        }
    }

    /// Take the slot if it is free. The slot is released when the returned
    /// permit is dropped.
    pub fn try_enter(&self) -> Option<OwnedSemaphorePermit> {
        self.slot.clone().try_acquire_owned().ok()
    }

    pub fn is_busy(&self) -> bool {
        self.slot.available_permits() == 0
    }
}

impl Default for TickGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to the running timer task.
struct TimerSlot {
    handle: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

/// Lifecycle wrapper around the timer loop, driven by the hosting process.
pub struct WarmerService {
    warmer: Arc<Warmer>,
    interval: Duration,
    gate: TickGate,
    timer: Option<TimerSlot>,
}

impl WarmerService {
    /// Create a stopped service ticking at the configured timer resolution.
    /// Fails if the configured interval is not a usable duration.
    pub fn new(warmer: Arc<Warmer>) -> ConfigResult<Self> {
        let interval = warmer.config().timer_resolution()?;
        Ok(Self {
            warmer,
            interval,
            gate: TickGate::new(),
            timer: None,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Whether a tick's worker is currently executing.
    pub fn is_tick_in_progress(&self) -> bool {
        self.gate.is_busy()
    }

    /// Start the timer. The first tick fires one interval from now.
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        if self.timer.is_some() {
            warn!("warmer service already running");
            return;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let warmer = self.warmer.clone();
        let gate = self.gate.clone();
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            run_timer_loop(warmer, gate, interval, shutdown_rx).await;
        });

        self.timer = Some(TimerSlot {
            handle,
            shutdown_tx,
        });
        info!(interval_secs = interval.as_secs_f64(), "warmer service started");
    }

    /// Stop the timer. A tick already in progress keeps running to completion
    /// on its worker task; no new ticks are scheduled.
    pub async fn stop(&mut self) {
        let Some(slot) = self.timer.take() else {
            debug!("warmer service not running");
            return;
        };

        let _ = slot.shutdown_tx.send(true);
        if let Err(e) = slot.handle.await {
            error!(error = %e, "timer task ended abnormally");
        }

        if self.gate.is_busy() {
            info!("warmer service stopped; in-flight tick left to finish");
        } else {
            info!("warmer service stopped");
        }
    }

    pub async fn pause(&mut self) {
        self.stop().await;
    }

    pub fn resume(&mut self) {
        self.start();
    }
}

impl Drop for WarmerService {
    fn drop(&mut self) {
        if let Some(slot) = self.timer.take() {
            let _ = slot.shutdown_tx.send(true);
        }
    }
}

async fn run_timer_loop(
    warmer: Arc<Warmer>,
    gate: TickGate,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    debug!("timer loop starting");

    loop {
        tokio::select! {
            _ = ticker.tick() => on_tick(&warmer, &gate),
            _ = shutdown.changed() => {
                debug!("timer loop shutting down");
                break;
            }
        }
    }
}

fn on_tick(warmer: &Arc<Warmer>, gate: &TickGate) {
    let Some(permit) = gate.try_enter() else {
        debug!("worker busy, skipping tick");
        return;
    };

    debug!("running worker");
    let warmer = warmer.clone();
    tokio::spawn(async move {
        let _permit = permit;
        match AssertUnwindSafe(warmer.run()).catch_unwind().await {
            Ok(report) => debug!(
                checked = report.checked,
                succeeded = report.succeeded,
                failed = report.failures.len(),
                aborted = report.aborted,
                "tick complete"
            ),
            Err(panic) => error!(panic = %panic_message(panic.as_ref()), "tick aborted"),
        }
    });
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use warmer_check::Fetcher;
    use warmer_core::{CheckOutcome, Page, WarmerConfig};
    use warmer_notify::LogNotifier;

    use super::*;

    /// Counts fetches and takes `delay` of (virtual) time per fetch.
    struct SlowFetcher {
        delay: Duration,
        calls: AtomicUsize,
    }

    impl SlowFetcher {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                delay,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetcher for SlowFetcher {
        async fn fetch(&self, _url: &str) -> CheckOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            CheckOutcome::completed(self.delay, "OK")
        }
    }

    fn config(timer_resolution_seconds: f64) -> Arc<WarmerConfig> {
        Arc::new(WarmerConfig {
            timer_resolution_seconds,
            warm_one_random_page_per_timer_loop: false,
            request_timeout_seconds: None,
            pages: vec![Page::new("https://example.com/", 10.0)],
            email: None,
        })
    }

    fn service(fetcher: Arc<SlowFetcher>) -> WarmerService {
        let warmer = Warmer::new(config(1.0), fetcher, Arc::new(LogNotifier));
        WarmerService::new(Arc::new(warmer)).unwrap()
    }

    #[test]
    fn unusable_interval_is_rejected() {
        for secs in [0.0, -1.0, f64::INFINITY, 1e17] {
            let warmer = Warmer::new(
                config(secs),
                SlowFetcher::new(Duration::ZERO),
                Arc::new(LogNotifier),
            );
            assert!(WarmerService::new(Arc::new(warmer)).is_err(), "{secs}");
        }
    }

    #[test]
    fn gate_admits_one_holder() {
        let gate = TickGate::new();
        assert!(!gate.is_busy());

        let permit = gate.try_enter().unwrap();
        assert!(gate.is_busy());
        assert!(gate.try_enter().is_none());

        drop(permit);
        assert!(!gate.is_busy());
        assert!(gate.try_enter().is_some());
    }

    #[test]
    fn gate_clones_share_the_slot() {
        let gate = TickGate::new();
        let other = gate.clone();
        let _permit = gate.try_enter().unwrap();
        assert!(other.try_enter().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_waits_one_interval() {
        let fetcher = SlowFetcher::new(Duration::from_millis(10));
        let mut service = service(fetcher.clone());
        assert_eq!(service.interval(), Duration::from_secs(1));

        service.start();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fetcher.calls(), 0);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(fetcher.calls(), 1);

        service.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_repeat_at_interval() {
        let fetcher = SlowFetcher::new(Duration::from_millis(10));
        let mut service = service(fetcher.clone());

        service.start();
        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(fetcher.calls(), 3);

        service.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn busy_worker_skips_ticks() {
        // Ticks at 1s, 2s, 3s, 4s, 5s. The run started at 1s holds the
        // slot until 3.5s, so 2s and 3s are skipped; 4s runs; 5s is skipped.
        let fetcher = SlowFetcher::new(Duration::from_millis(2500));
        let mut service = service(fetcher.clone());

        service.start();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(service.is_tick_in_progress());

        tokio::time::sleep(Duration::from_millis(4000)).await;
        assert_eq!(fetcher.calls(), 2);

        service.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_ticks_but_not_inflight_run() {
        let fetcher = SlowFetcher::new(Duration::from_millis(800));
        let mut service = service(fetcher.clone());

        service.start();
        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert_eq!(fetcher.calls(), 1);
        assert!(service.is_tick_in_progress());

        service.stop().await;
        assert!(!service.is_running());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fetcher.calls(), 1);
        assert!(!service.is_tick_in_progress());
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_idempotent() {
        let fetcher = SlowFetcher::new(Duration::from_millis(10));
        let mut service = service(fetcher.clone());

        service.start();
        service.start();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(fetcher.calls(), 1);

        service.stop().await;
        // Stopping twice is harmless.
        service.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn pause_and_resume() {
        let fetcher = SlowFetcher::new(Duration::from_millis(10));
        let mut service = service(fetcher.clone());

        service.start();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        service.pause().await;
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(fetcher.calls(), 1);

        service.resume();
        assert!(service.is_running());
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(fetcher.calls(), 2);

        service.stop().await;
    }
}
