//! warmer-scheduler — the check loop.
//!
//! ```text
//! WarmerService (timer task)
//!   └── every `timer_resolution`:
//!       ├── TickGate busy? → skip tick (debug log)
//!       └── spawn worker: Warmer::run()
//!           └── for each selected page (sequential):
//!               Fetcher::fetch → classify → Notifier::notify on failure
//! ```
//!
//! At most one `Warmer::run()` is in flight. A tick that fires while the
//! previous one is still running is dropped, not queued. Stopping the
//! service stops the timer; an in-flight tick is left to finish.

pub mod timer;
pub mod warmer;

pub use timer::{TickGate, WarmerService};
pub use warmer::{PageFailure, TickReport, Warmer};
