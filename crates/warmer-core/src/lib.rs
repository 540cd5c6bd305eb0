//! warmer-core — shared types and configuration for the page warmer.
//!
//! The configuration is loaded once by the hosting process and then shared
//! read-only (`Arc<WarmerConfig>`) with every component. The per-check types
//! (`CheckOutcome`, `Verdict`, `FailureKind`) flow through the pipeline:
//!
//! ```text
//! Fetcher ──► CheckOutcome ──► validator ──► Verdict ──► Notifier (on failure)
//! ```

pub mod config;
pub mod error;
pub mod types;

pub use config::{EmailConfig, Page, WarmerConfig};
pub use error::{ConfigError, ConfigResult};
pub use types::*;
