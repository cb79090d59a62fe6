//! # window-limit
//!
//! `window-limit` provides a lock-free, fixed-window rate limiter.
//!
//! ## Core Philosophy
//!
//! A fixed window limiter needs two pieces of state: when the window started and how many
//! tokens have been handed out since. Keeping those in two atomics opens a gap where a reader
//! sees a fresh timestamp next to a stale counter. `window-limit` packs both into one `u64`
//! and moves them together with a single Compare-And-Swap (CAS), so no `Mutex` is ever needed.
//!
//! ## Key Concepts
//!
//! * **Lock-Free**: No `Mutex` or `RwLock` anywhere. Contention is resolved by retrying the CAS.
//! * **Lazy Evaluation**: Windows are rearmed at the moment of a request, with no background
//!   worker threads or timers.
//! * **Partial Grants**: [`RateLimiter::try_acquire`] never blocks and never fails. It returns
//!   how many of the requested tokens were granted, and the caller decides what to do with
//!   the shortfall.
//! * **Strategy Trait**: [`RateLimiter`] also implements [`Strategy`] for one-token-per-request
//!   callers.
//!
//! ## Example
//!
//! ```rust
//! use window_limit::RateLimiter;
//!
//! let limiter = RateLimiter::new(5).unwrap();
//!
//! assert_eq!(limiter.try_acquire(3), 3);
//! // Only two tokens left in this window
//! assert_eq!(limiter.try_acquire(3), 2);
//! assert!(!limiter.try_acquire_one());
//! ```

use std::fmt::Debug;
use std::ops::ControlFlow;
use std::time::Duration;

mod error;
mod limiter;
mod state;

pub use error::LimitError;
pub use limiter::RateLimiter;
pub use limiter::WINDOW_MS;
pub use state::MAX_CAPACITY;
pub use state::PackedState;
pub use state::TIMESTAMP_BITS;
pub use state::TIMESTAMP_MODULUS;
pub use state::TOKEN_BITS;
pub use state::TokenBucketState;

/// Reasons why a request might be rejected by a strategy.
#[derive(Debug, PartialEq)]
pub enum Reason {
    Overloaded { retry_after: Duration },
}

/// The core trait for rate-limiting algorithms.
///
/// Strategies must be `Send` and `Sync` to allow sharing across thread boundaries
/// via `Arc`.
pub trait Strategy: Debug {
    /// Attempts to process a single request.
    ///
    /// This method is non-blocking and uses atomic operations to update
    /// internal state.
    ///
    /// # Errors
    ///
    /// Returns `Reason` if the rate limit has been reached.
    fn process(&self) -> ControlFlow<Reason>;
}
