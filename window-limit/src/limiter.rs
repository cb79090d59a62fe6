use std::ops::ControlFlow;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use quanta::Clock;
use quanta::Instant;
use tracing::debug;
use tracing::trace;

use crate::LimitError;
use crate::Reason;
use crate::Strategy;
use crate::state::MAX_CAPACITY;
use crate::state::PackedState;
use crate::state::TIMESTAMP_MODULUS;
use crate::state::TokenBucketState;
use crate::state::elapsed_ms;

/// Length of a window in milliseconds.
pub const WINDOW_MS: u64 = 1_000;

/// A lock-free fixed window rate limiter.
///
/// Grants up to `capacity` tokens per one second window. The window start and the
/// tokens used so far live in one [`TokenBucketState`], and every change goes through a
/// single CAS, so concurrent callers can never observe (or produce) a half-updated window.
///
/// A window opens on the first request after the previous one expired and lasts
/// [`WINDOW_MS`] from that moment. Later grants inside the window do not extend it.
#[derive(Debug)]
pub struct RateLimiter {
    capacity: u32,
    state: TokenBucketState,
    clock: Clock,
    /// A fixed point in time (TSC tick) to calculate deltas from.
    anchor: Instant,
    /// Wall clock milliseconds since the Unix epoch at `anchor`.
    origin_ms: u64,
}

impl RateLimiter {
    /// Creates a limiter granting at most `capacity` tokens per window.
    ///
    /// # Errors
    ///
    /// Returns [`LimitError::CapacityOutOfRange`] if `capacity` exceeds [`MAX_CAPACITY`].
    pub fn new(capacity: u32) -> Result<Self, LimitError> {
        Self::with_clock(capacity, Clock::new())
    }

    /// Creates a limiter driven by the supplied clock.
    ///
    /// Wall clock time is sampled once here; after that the limiter only advances by
    /// what `clock` reports, so it never sees time move backwards.
    pub fn with_clock(capacity: u32, clock: Clock) -> Result<Self, LimitError> {
        let origin_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|since| since.as_millis() as u64)
            .unwrap_or_default();
        Self::with_origin(capacity, clock, origin_ms)
    }

    pub(crate) fn with_origin(
        capacity: u32,
        clock: Clock,
        origin_ms: u64,
    ) -> Result<Self, LimitError> {
        if capacity > MAX_CAPACITY {
            return Err(LimitError::CapacityOutOfRange {
                capacity,
                max: MAX_CAPACITY,
            });
        }
        debug!(capacity, origin_ms, "created fixed window rate limiter");

        let anchor = clock.now();
        Ok(Self {
            capacity,
            state: TokenBucketState::new(),
            clock,
            anchor,
            origin_ms,
        })
    }

    /// The most tokens a single window will ever grant.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Attempts to take `requested` tokens from the current window.
    ///
    /// Returns the number actually granted, between 0 and `requested`. A short grant is
    /// the rate limit signal; this call never blocks and never fails.
    pub fn try_acquire(&self, requested: u32) -> u32 {
        if requested == 0 {
            return 0;
        }

        loop {
            let current = self.state.load();
            let (last, used) = current.unpack();
            let now = self.now_ms();

            if window_age(current, now) < WINDOW_MS {
                if used >= self.capacity {
                    trace!(requested, used, "window exhausted");
                    return 0;
                }

                let actual = requested.min(self.capacity - used);
                if self
                    .state
                    .compare_and_swap(current, PackedState::pack(last, used + actual))
                {
                    return actual;
                }
            } else {
                // Seed the new window with what we grant, never more than capacity
                let granted = requested.min(self.capacity);
                if self
                    .state
                    .compare_and_swap(current, PackedState::pack(now, granted))
                {
                    trace!(
                        capacity = self.capacity,
                        granted,
                        now_ms = now,
                        "window rolled over"
                    );
                    return granted;
                }
            }

            std::hint::spin_loop();
        }
    }

    /// Attempts to take a single token. Returns `true` if it was granted.
    #[inline]
    pub fn try_acquire_one(&self) -> bool {
        self.try_acquire(1) == 1
    }

    /// Tokens still available in the current window.
    ///
    /// This is a snapshot; concurrent callers may take them first.
    pub fn remaining(&self) -> u32 {
        let current = self.state.load();
        if window_age(current, self.now_ms()) < WINDOW_MS {
            self.capacity.saturating_sub(current.used_tokens())
        } else {
            self.capacity
        }
    }

    /// Time until the current window expires, or zero if it already has.
    pub fn retry_after(&self) -> Duration {
        let age = window_age(self.state.load(), self.now_ms());
        Duration::from_millis(WINDOW_MS.saturating_sub(age))
    }

    #[inline]
    fn now_ms(&self) -> u64 {
        let since_anchor = self.clock.now().duration_since(self.anchor).as_millis() as u64;
        self.origin_ms.wrapping_add(since_anchor) % TIMESTAMP_MODULUS
    }
}

/// Milliseconds since the window held in `state` opened.
///
/// [`PackedState::ZERO`] means no window has opened yet, which counts as expired.
#[inline]
fn window_age(state: PackedState, now: u64) -> u64 {
    if state == PackedState::ZERO {
        u64::MAX
    } else {
        elapsed_ms(now, state.timestamp_ms())
    }
}

impl Strategy for RateLimiter {
    #[inline]
    fn process(&self) -> ControlFlow<Reason> {
        if self.try_acquire_one() {
            ControlFlow::Continue(())
        } else {
            ControlFlow::Break(Reason::Overloaded {
                retry_after: self.retry_after(),
            })
        }
    }
}
