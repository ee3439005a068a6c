#![forbid(unsafe_code)]

//! Conversions between browser millisecond clocks and mirror time.
//!
//! Kept free of `web-sys` so it is testable on native targets.

use core::time::Duration;

/// Largest delay `setTimeout` accepts before overflowing to immediate firing.
pub const MAX_TIMEOUT_MS: i32 = i32::MAX;

/// Convert a `performance.now()` style timestamp into mirror time.
///
/// Negative and non-finite readings map to zero.
#[must_use]
pub fn duration_from_ms(ms: f64) -> Duration {
    if ms.is_finite() && ms > 0.0 {
        Duration::from_secs_f64(ms / 1000.0)
    } else {
        Duration::ZERO
    }
}

/// Delay to pass to `setTimeout` so the callback runs no earlier than
/// `deadline`.
///
/// Rounds up: firing a fraction of a millisecond early would leave the
/// deadline unmet and cost an extra timer round trip.
#[must_use]
pub fn timeout_ms_until(deadline: Duration, now: Duration) -> i32 {
    let remaining = deadline.saturating_sub(now);
    let ms = remaining.as_secs_f64() * 1000.0;
    let ms = ms.ceil();
    if ms >= f64::from(MAX_TIMEOUT_MS) {
        MAX_TIMEOUT_MS
    } else {
        ms as i32
    }
}
