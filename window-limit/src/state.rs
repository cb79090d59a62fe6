use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

/// Width of the used-token counter in the low bits of the packed word.
pub const TOKEN_BITS: u32 = 16;

/// Width of the millisecond timestamp in the high bits of the packed word.
pub const TIMESTAMP_BITS: u32 = u64::BITS - TOKEN_BITS;

/// Timestamps are stored modulo this value.
pub const TIMESTAMP_MODULUS: u64 = 1 << TIMESTAMP_BITS;

/// Largest per-window capacity the counter field can represent.
pub const MAX_CAPACITY: u32 = TOKEN_MASK as u32;

const TOKEN_MASK: u64 = (1 << TOKEN_BITS) - 1;
const TIMESTAMP_MASK: u64 = TIMESTAMP_MODULUS - 1;

/// A window start timestamp and a used-token count, packed into one `u64`.
///
/// The timestamp occupies the high [`TIMESTAMP_BITS`], the counter the low [`TOKEN_BITS`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PackedState(u64);

impl PackedState {
    /// Timestamp 0, nothing used. Every limiter starts here.
    pub const ZERO: PackedState = PackedState(0);

    /// Packs a timestamp (reduced modulo [`TIMESTAMP_MODULUS`]) and a used-token count.
    ///
    /// `used_tokens` must not exceed [`MAX_CAPACITY`]; the limiter guarantees this by
    /// refusing larger capacities at construction.
    #[inline]
    pub fn pack(timestamp_ms: u64, used_tokens: u32) -> Self {
        debug_assert!(used_tokens <= MAX_CAPACITY);
        let timestamp = timestamp_ms & TIMESTAMP_MASK;
        Self((timestamp << TOKEN_BITS) | (u64::from(used_tokens) & TOKEN_MASK))
    }

    #[inline]
    pub fn unpack(self) -> (u64, u32) {
        (self.timestamp_ms(), self.used_tokens())
    }

    #[inline]
    pub fn timestamp_ms(self) -> u64 {
        self.0 >> TOKEN_BITS
    }

    #[inline]
    pub fn used_tokens(self) -> u32 {
        (self.0 & TOKEN_MASK) as u32
    }

    /// The raw packed word.
    #[inline]
    pub fn bits(self) -> u64 {
        self.0
    }
}

/// Milliseconds from `last` to `now`, both taken modulo [`TIMESTAMP_MODULUS`].
///
/// A `now` that has wrapped past the modulus still yields the forward distance.
#[inline]
pub(crate) fn elapsed_ms(now: u64, last: u64) -> u64 {
    now.wrapping_sub(last) & TIMESTAMP_MASK
}

/// The atomic cell holding a [`PackedState`].
///
/// Reads and writes always move both fields at once. [`compare_and_swap`] is the
/// only way to change the value.
///
/// [`compare_and_swap`]: TokenBucketState::compare_and_swap
#[derive(Debug, Default)]
pub struct TokenBucketState {
    bucket: AtomicU64,
}

impl TokenBucketState {
    pub fn new() -> Self {
        Self {
            bucket: AtomicU64::new(PackedState::ZERO.bits()),
        }
    }

    #[inline]
    pub fn load(&self) -> PackedState {
        PackedState(self.bucket.load(Ordering::Acquire))
    }

    /// Stores `desired` if the cell still holds exactly `expected`.
    ///
    /// Returns `true` if the swap happened.
    #[inline]
    pub fn compare_and_swap(&self, expected: PackedState, desired: PackedState) -> bool {
        self.bucket
            .compare_exchange(expected.0, desired.0, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
