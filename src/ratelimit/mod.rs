//! Rate limiting for the trigger endpoint.
//!
//! A coarse fixed-window counter keyed by caller identity. Owned by the
//! application state and injected into the handler, never held as
//! process-wide mutable state.

mod fixed_window;

pub use fixed_window::{FixedWindowLimiter, RateLimitResult};
