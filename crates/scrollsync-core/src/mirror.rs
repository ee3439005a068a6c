#![forbid(unsafe_code)]

//! Loop-guarded scroll mirroring between two regions.
//!
//! [`ScrollMirror`] observes native scroll notifications from a primary and a
//! secondary region and copies each settled offset into the other region.
//!
//! # Pipeline
//!
//! 1. [`notify`](ScrollMirror::notify) feeds a per-side [`Debouncer`]
//!    (trailing edge, latest wins, 50 ms quiet window by default).
//! 2. [`poll`](ScrollMirror::poll) releases the debounced events whose window
//!    elapsed, merged into one stream ordered by release time and then by
//!    notification arrival.
//! 3. Each released event passes the re-entrancy guard and, if allowed,
//!    writes its offset into the opposite region.
//!
//! # State machine
//!
//! ```text
//!          event passes the guard
//!   Idle ─────────────────────────▶ Propagating
//!    ▲                                   │
//!    └────── ResetTimer fires ◀──────────┘
//!           (next host turn)
//! ```
//!
//! While `Propagating`, every released event is discarded, whichever side it
//! comes from. The reset is armed at the instant of the `poll` that handled
//! the event, with a zero delay by default, so it fires on a later `poll`.
//! Events released together in one late `poll` therefore see the guard set.
//!
//! # Echo handling
//!
//! A write makes the target region emit its own scroll notification, usually
//! a frame later. Three checks keep it from bouncing back:
//!
//! - **Echo absorption**: the offset the target settled at is remembered. The
//!   next notification from that side is absorbed on arrival if it matches,
//!   and clears the expectation if it does not.
//! - **Stale discard**: a write replaces whatever the target held, so an
//!   offset still waiting out the target's quiet window is dropped.
//! - **No-op skip**: no write when the target already sits at the offset
//!   (within `offset_epsilon`), or when the write did not move it.
//!
//! # Invariants
//!
//! - Once both debouncers and the reset timer are empty, the regions hold
//!   equal offsets unless one of them clamped the write.
//! - One user scroll burst yields at most one write.
//! - Identical notification and poll sequences yield identical writes.

use core::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::ConfigError;
use crate::debounce::Debouncer;
use crate::region::{ScrollEvent, ScrollRegion, Side};

/// Default quiet window before a scroll burst is considered settled.
pub const DEFAULT_QUIET_WINDOW_MS: u64 = 50;
/// Default tolerance when comparing offsets, in pixels.
pub const DEFAULT_OFFSET_EPSILON: f64 = 0.5;

/// Configuration for the scroll mirror.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Quiet window per region (ms). Only the last offset of a burst is
    /// mirrored, once no newer notification arrived for this long.
    pub quiet_window_ms: u64,

    /// Delay before the guard returns to idle after a write (ms).
    /// `0` means "next host turn".
    pub reset_delay_ms: u64,

    /// Offsets closer than this are considered equal (px).
    pub offset_epsilon: f64,

    /// Absorb the echo notification of the mirror's own writes.
    pub echo_absorption: bool,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            quiet_window_ms: DEFAULT_QUIET_WINDOW_MS,
            reset_delay_ms: 0,
            offset_epsilon: DEFAULT_OFFSET_EPSILON,
            echo_absorption: true,
        }
    }
}

impl MirrorConfig {
    #[must_use]
    pub fn with_quiet_window_ms(mut self, ms: u64) -> Self {
        self.quiet_window_ms = ms;
        self
    }

    #[must_use]
    pub fn with_reset_delay_ms(mut self, ms: u64) -> Self {
        self.reset_delay_ms = ms;
        self
    }

    #[must_use]
    pub fn with_offset_epsilon(mut self, epsilon: f64) -> Self {
        self.offset_epsilon = epsilon;
        self
    }

    #[must_use]
    pub fn with_echo_absorption(mut self, enabled: bool) -> Self {
        self.echo_absorption = enabled;
        self
    }

    #[must_use]
    pub const fn quiet_window(&self) -> Duration {
        Duration::from_millis(self.quiet_window_ms)
    }

    #[must_use]
    pub const fn reset_delay(&self) -> Duration {
        Duration::from_millis(self.reset_delay_ms)
    }

    /// Check that the configuration can drive a mirror.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quiet_window_ms == 0 {
            return Err(ConfigError::ZeroQuietWindow);
        }
        if !self.offset_epsilon.is_finite() || self.offset_epsilon < 0.0 {
            return Err(ConfigError::InvalidEpsilon(self.offset_epsilon));
        }
        Ok(())
    }
}

/// Re-entrancy guard state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MirrorState {
    #[default]
    Idle,
    Propagating,
}

impl MirrorState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Propagating => "propagating",
        }
    }
}

/// One corrective write performed by the mirror.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MirrorWrite {
    /// Region that was written.
    pub target: Side,
    /// Offset taken from the origin region.
    pub offset: f64,
    /// Offset the target settled at after its own clamping.
    pub applied: f64,
    /// Release time of the event that caused the write.
    pub at: Duration,
}

/// Diagnostic counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MirrorStats {
    /// Native notifications accepted by [`ScrollMirror::notify`].
    pub notifications: u64,
    /// Notifications superseded inside a quiet window.
    pub coalesced: u64,
    /// Corrective writes performed.
    pub writes: u64,
    /// Released events discarded by the guard.
    pub dropped_while_propagating: u64,
    /// Notifications recognised as the echo of a write.
    pub echoes_absorbed: u64,
    /// Pending target offsets discarded because a write replaced them.
    pub stale_discarded: u64,
    /// Released events that would not have moved the target.
    pub noop_skips: u64,
    /// Guard resets fired.
    pub resets: u64,
}

/// One-shot timer returning the guard to [`MirrorState::Idle`].
///
/// Arming replaces any pending deadline. Firing clears it.
#[derive(Debug, Clone, Default)]
pub struct ResetTimer {
    deadline: Option<Duration>,
}

impl ResetTimer {
    /// Arm the timer to fire `delay` after `at`.
    ///
    /// Returns `true` if a pending deadline was replaced.
    pub fn arm(&mut self, at: Duration, delay: Duration) -> bool {
        self.deadline
            .replace(at.saturating_add(delay))
            .is_some()
    }

    #[must_use]
    pub const fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Fire if armed and `ready(deadline)` holds. Returns whether it fired.
    fn fire_if(&mut self, ready: impl FnOnce(Duration) -> bool) -> bool {
        let Some(deadline) = self.deadline else {
            return false;
        };
        if !ready(deadline) {
            return false;
        }
        self.deadline = None;
        true
    }

    fn cancel(&mut self) {
        self.deadline = None;
    }
}

/// Debounced, loop-guarded scroll mirror for two regions.
///
/// The mirror never owns the regions. The host passes them to
/// [`poll`](Self::poll), which keeps the engine usable with DOM elements and
/// in-memory regions alike.
#[derive(Debug, Clone)]
pub struct ScrollMirror {
    config: MirrorConfig,
    state: MirrorState,
    debouncers: [Debouncer; 2],
    /// Arrival sequence of the latest notification per side (merge tie-break).
    arrivals: [u64; 2],
    next_arrival: u64,
    reset: ResetTimer,
    /// Offset each side settled at after our last write into it.
    expected_echo: [Option<f64>; 2],
    stats: MirrorStats,
}

impl Default for ScrollMirror {
    fn default() -> Self {
        Self::new(MirrorConfig::default())
    }
}

impl ScrollMirror {
    /// Create a mirror. The configuration is used as given; see
    /// [`try_new`](Self::try_new) for a validating constructor.
    #[must_use]
    pub fn new(config: MirrorConfig) -> Self {
        let window = config.quiet_window();
        Self {
            config,
            state: MirrorState::Idle,
            debouncers: [Debouncer::new(window), Debouncer::new(window)],
            arrivals: [0; 2],
            next_arrival: 0,
            reset: ResetTimer::default(),
            expected_echo: [None; 2],
            stats: MirrorStats::default(),
        }
    }

    /// Create a mirror after validating `config`.
    pub fn try_new(config: MirrorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    #[must_use]
    pub const fn config(&self) -> &MirrorConfig {
        &self.config
    }

    #[must_use]
    pub const fn state(&self) -> MirrorState {
        self.state
    }

    #[must_use]
    pub const fn stats(&self) -> MirrorStats {
        self.stats
    }

    #[must_use]
    pub const fn reset_timer(&self) -> &ResetTimer {
        &self.reset
    }

    /// Record a native scroll notification from `side`.
    ///
    /// Non-finite offsets are ignored. The echo of the mirror's own write is
    /// absorbed here and never reaches the debouncer.
    pub fn notify(&mut self, side: Side, offset: f64, now: Duration) {
        if !offset.is_finite() {
            trace!(side = side.as_str(), "ignoring non-finite scroll offset");
            return;
        }
        let idx = side.index();
        self.stats.notifications = self.stats.notifications.saturating_add(1);
        let eps = self.config.offset_epsilon;
        if self.expected_echo[idx]
            .take()
            .is_some_and(|echo| (echo - offset).abs() <= eps)
        {
            self.stats.echoes_absorbed = self.stats.echoes_absorbed.saturating_add(1);
            trace!(side = side.as_str(), offset, "echo absorbed");
            return;
        }
        self.next_arrival = self.next_arrival.wrapping_add(1);
        self.arrivals[idx] = self.next_arrival;
        if self.debouncers[idx].push(offset, now) {
            self.stats.coalesced = self.stats.coalesced.saturating_add(1);
        }
    }

    /// Advance the mirror to `now`, releasing settled events and writing them
    /// into the opposite region.
    ///
    /// Returns the writes performed, in order.
    pub fn poll<R: ScrollRegion>(
        &mut self,
        now: Duration,
        primary: &mut R,
        secondary: &mut R,
    ) -> Vec<MirrorWrite> {
        // Only a reset armed by an earlier poll can fire; one armed below
        // waits for the next turn.
        self.fire_reset(|deadline| deadline <= now);

        let mut writes = Vec::new();
        for (at, event) in self.take_released(now) {
            let target = match event.origin.other() {
                Side::Primary => &mut *primary,
                Side::Secondary => &mut *secondary,
            };
            if let Some(write) = self.dispatch(event, at, now, target) {
                writes.push(write);
            }
        }
        writes
    }

    /// Earliest instant at which [`poll`](Self::poll) has work to do.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.debouncers
            .iter()
            .filter_map(Debouncer::deadline)
            .chain(self.reset.deadline())
            .min()
    }

    /// Whether any event or guard reset is still outstanding.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.next_deadline().is_some()
    }

    /// Drop pending events, cancel the reset and return to idle.
    ///
    /// Statistics are kept.
    pub fn clear(&mut self) {
        for debouncer in &mut self.debouncers {
            debouncer.clear();
        }
        self.reset.cancel();
        self.expected_echo = [None; 2];
        self.state = MirrorState::Idle;
    }

    fn take_released(&mut self, now: Duration) -> Vec<(Duration, ScrollEvent)> {
        let mut released: Vec<(Duration, u64, ScrollEvent)> = Side::ALL
            .into_iter()
            .filter_map(|side| {
                let idx = side.index();
                let debouncer = &mut self.debouncers[idx];
                let deadline = debouncer.deadline()?;
                let offset = debouncer.take_due(now)?;
                Some((deadline, self.arrivals[idx], ScrollEvent::new(side, offset)))
            })
            .collect();
        released.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
        released
            .into_iter()
            .map(|(at, _, event)| (at, event))
            .collect()
    }

    fn fire_reset(&mut self, ready: impl FnOnce(Duration) -> bool) {
        if self.reset.fire_if(ready) {
            self.state = MirrorState::Idle;
            self.stats.resets = self.stats.resets.saturating_add(1);
            trace!("scroll mirror guard reset");
        }
    }

    fn dispatch<R: ScrollRegion>(
        &mut self,
        event: ScrollEvent,
        at: Duration,
        now: Duration,
        target: &mut R,
    ) -> Option<MirrorWrite> {
        let origin = event.origin;
        let target_side = origin.other();
        let eps = self.config.offset_epsilon;

        if self.state == MirrorState::Propagating {
            self.stats.dropped_while_propagating =
                self.stats.dropped_while_propagating.saturating_add(1);
            trace!(
                origin = origin.as_str(),
                offset = event.offset,
                "dropped while propagating"
            );
            return None;
        }

        self.state = MirrorState::Propagating;
        self.reset.arm(now, self.config.reset_delay());

        let before = target.scroll_top();
        if (before - event.offset).abs() <= eps {
            self.stats.noop_skips = self.stats.noop_skips.saturating_add(1);
            return None;
        }

        target.set_scroll_top(event.offset);
        let applied = target.scroll_top();
        if (applied - before).abs() <= eps {
            // Clamped in place: nothing moved, so no echo will follow.
            self.stats.noop_skips = self.stats.noop_skips.saturating_add(1);
            return None;
        }

        let stale = &mut self.debouncers[target_side.index()];
        if stale.has_pending() {
            stale.clear();
            self.stats.stale_discarded = self.stats.stale_discarded.saturating_add(1);
        }
        if self.config.echo_absorption {
            self.expected_echo[target_side.index()] = Some(applied);
        }
        self.stats.writes = self.stats.writes.saturating_add(1);
        trace!(
            origin = origin.as_str(),
            target_side = target_side.as_str(),
            offset = event.offset,
            applied,
            "mirrored scroll offset"
        );

        Some(MirrorWrite {
            target: target_side,
            offset: event.offset,
            applied,
            at,
        })
    }
}
