#![forbid(unsafe_code)]

//! Scrollable regions and the notifications they produce.

use serde::{Deserialize, Serialize};

/// Which of the two mirrored regions an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Primary,
    Secondary,
}

impl Side {
    /// Both sides in slot order.
    pub const ALL: [Self; 2] = [Self::Primary, Self::Secondary];

    /// The region a change on `self` is mirrored into.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Primary => Self::Secondary,
            Self::Secondary => Self::Primary,
        }
    }

    /// Stable slot index (`0` primary, `1` secondary).
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Primary => 0,
            Self::Secondary => 1,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }
}

/// A scroll notification: `origin` moved to `offset` pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrollEvent {
    pub origin: Side,
    pub offset: f64,
}

impl ScrollEvent {
    #[must_use]
    pub const fn new(origin: Side, offset: f64) -> Self {
        Self { origin, offset }
    }
}

/// Anything with a mutable vertical scroll offset.
///
/// Writes may be clamped by the implementation; callers read the offset back
/// to learn where the region actually settled.
pub trait ScrollRegion {
    /// Current vertical scroll offset in pixels.
    fn scroll_top(&self) -> f64;

    /// Request a new vertical scroll offset in pixels.
    fn set_scroll_top(&mut self, offset: f64);
}

/// In-memory scroll region with browser-like clamping.
///
/// Every effective change (user or programmatic) leaves a pending native
/// notification, just as a DOM element fires `scroll` after its `scrollTop`
/// moves. Assigning the current offset again fires nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRegion {
    offset: f64,
    max_offset: f64,
    notification: Option<f64>,
}

impl MemoryRegion {
    /// Create a region scrolled to the top that can scroll to `max_offset`.
    ///
    /// Negative or non-finite maxima are treated as `0.0` (not scrollable).
    #[must_use]
    pub fn new(max_offset: f64) -> Self {
        let max_offset = if max_offset.is_finite() {
            max_offset.max(0.0)
        } else {
            0.0
        };
        Self {
            offset: 0.0,
            max_offset,
            notification: None,
        }
    }

    #[must_use]
    pub const fn max_offset(&self) -> f64 {
        self.max_offset
    }

    /// Drain the pending native scroll notification, if any.
    pub fn take_notification(&mut self) -> Option<f64> {
        self.notification.take()
    }

    #[must_use]
    pub const fn has_notification(&self) -> bool {
        self.notification.is_some()
    }
}

impl ScrollRegion for MemoryRegion {
    fn scroll_top(&self) -> f64 {
        self.offset
    }

    fn set_scroll_top(&mut self, offset: f64) {
        if !offset.is_finite() {
            return;
        }
        let clamped = offset.clamp(0.0, self.max_offset);
        if clamped != self.offset {
            self.offset = clamped;
            self.notification = Some(clamped);
        }
    }
}
