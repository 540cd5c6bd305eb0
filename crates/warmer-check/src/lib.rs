//! warmer-check — fetch a page and classify the result.
//!
//! The checker never fails: transport problems come back as a
//! `CheckOutcome` with `transport_error` set. The validator then applies
//! the page rules in a fixed order:
//!
//! ```text
//! transport error? ──yes──► TransportFailure
//!       │ no
//! elapsed > threshold? ──yes──► ThresholdExceeded
//!       │ no
//! body empty / token missing? ──yes──► InvalidResponse
//!       │ no
//!    Success
//! ```

pub mod checker;
pub mod validator;

pub use checker::{Fetcher, HttpFetcher};
pub use validator::{classify, is_valid_response, is_valid_time_threshold};
