#![forbid(unsafe_code)]

//! Trailing-edge debouncing for scroll offsets.
//!
//! Browsers fire `scroll` many times per gesture. [`Debouncer`] collapses a
//! burst into the most recent offset and releases it once no newer value has
//! arrived for a full quiet window.
//!
//! # Design
//!
//! - **Latest wins**: a push replaces any pending offset.
//! - **Trailing edge**: every push restarts the window; the first event of a
//!   burst is never emitted early.
//! - **Host time**: `now` is always passed in, so identical input yields
//!   identical output.
//!
//! # Usage
//!
//! ```
//! use core::time::Duration;
//! use scrollsync_core::debounce::Debouncer;
//!
//! let mut d = Debouncer::new(Duration::from_millis(50));
//! d.push(200.0, Duration::from_millis(0));
//! d.push(300.0, Duration::from_millis(20));
//!
//! // Window restarted at 20ms.
//! assert_eq!(d.take_due(Duration::from_millis(60)), None);
//! assert_eq!(d.take_due(Duration::from_millis(70)), Some(300.0));
//! ```

use core::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pending {
    offset: f64,
    deadline: Duration,
}

/// Trailing-edge coalescer for one region's offsets.
///
/// All operations are O(1); at most one offset is held.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    pending: Option<Pending>,
    /// Diagnostic: offsets dropped because a newer one superseded them.
    coalesced: u64,
}

impl Debouncer {
    /// Create a debouncer with the given quiet window.
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
            coalesced: 0,
        }
    }

    /// Record an offset observed at `now`, restarting the quiet window.
    ///
    /// Returns `true` if a pending offset was superseded.
    pub fn push(&mut self, offset: f64, now: Duration) -> bool {
        let superseded = self.pending.is_some();
        if superseded {
            self.coalesced = self.coalesced.saturating_add(1);
        }
        self.pending = Some(Pending {
            offset,
            deadline: now.saturating_add(self.window),
        });
        superseded
    }

    /// Whether the pending offset's quiet window has elapsed at `now`.
    #[must_use]
    pub fn due(&self, now: Duration) -> bool {
        self.pending.is_some_and(|p| p.deadline <= now)
    }

    /// Take the pending offset if its quiet window has elapsed.
    pub fn take_due(&mut self, now: Duration) -> Option<f64> {
        if self.due(now) {
            self.pending.take().map(|p| p.offset)
        } else {
            None
        }
    }

    /// When the pending offset will be released, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.pending.map(|p| p.deadline)
    }

    /// The offset currently waiting out its window.
    #[must_use]
    pub fn pending_offset(&self) -> Option<f64> {
        self.pending.map(|p| p.offset)
    }

    #[must_use]
    pub const fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    #[must_use]
    pub const fn coalesced(&self) -> u64 {
        self.coalesced
    }

    /// Discard the pending offset without emitting it.
    pub fn clear(&mut self) {
        self.pending = None;
    }
}
