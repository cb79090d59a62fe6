/// Errors produced when building a [`RateLimiter`](crate::RateLimiter).
///
/// Acquisition itself never fails: a denied request shows up as a short grant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LimitError {
    /// The requested capacity does not fit in the packed token field.
    #[error("capacity {capacity} exceeds the maximum of {max} tokens per window")]
    CapacityOutOfRange {
        /// The capacity that was asked for.
        capacity: u32,
        /// The largest capacity the packed state can count.
        max: u32,
    },
}
