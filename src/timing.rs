//! Wraparound-safe millisecond timing helpers.
//!
//! Every timestamp in the engine is a `u32` millisecond count from a
//! monotonic clock that wraps after ~49.7 days.  Comparisons are done on
//! the wrapping difference, never on raw magnitude.

/// Milliseconds elapsed from `since` to `now`, tolerating one wrap.
#[inline]
pub fn elapsed_ms(now: u32, since: u32) -> u32 {
    now.wrapping_sub(since)
}

/// `true` once strictly more than `timeout` ms have passed since `last`.
#[inline]
pub fn is_timeout(now: u32, last: u32, timeout: u32) -> bool {
    elapsed_ms(now, last) > timeout
}

/// `true` once at least `interval` ms have passed since `last`.
#[inline]
pub fn has_elapsed(now: u32, last: u32, interval: u32) -> bool {
    elapsed_ms(now, last) >= interval
}

/// The later of two timestamps, assuming they are less than half the
/// clock range apart.
#[inline]
pub fn later_of(a: u32, b: u32) -> u32 {
    if b.wrapping_sub(a) < u32::MAX / 2 { b } else { a }
}
