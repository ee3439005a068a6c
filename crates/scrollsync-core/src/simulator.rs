#![forbid(unsafe_code)]

//! Deterministic page simulator for testing.
//!
//! `MirrorSimulator` runs a [`ScrollMirror`] against two in-memory regions
//! without a browser. Writes made by the mirror raise native notifications on
//! the written region, as a DOM element fires `scroll` after its `scrollTop`
//! changes, so echoes travel through the same pipeline as user input. Echoes
//! arrive [`DEFAULT_ECHO_DELAY`] after the write, like a browser delivering
//! `scroll` on the next frame; a user scroll in the meantime replaces the
//! pending echo.
//!
//! # Example
//!
//! ```
//! use core::time::Duration;
//! use scrollsync_core::mirror::MirrorConfig;
//! use scrollsync_core::region::Side;
//! use scrollsync_core::simulator::MirrorSimulator;
//!
//! let mut sim = MirrorSimulator::new(MirrorConfig::default(), 10_000.0, 10_000.0);
//! sim.user_scroll(Side::Secondary, 200.0);
//! sim.advance(Duration::from_millis(10));
//! sim.user_scroll(Side::Secondary, 300.0);
//! sim.settle();
//!
//! assert_eq!(sim.offset(Side::Primary), 300.0);
//! assert_eq!(sim.writes().len(), 1);
//! ```

use core::time::Duration;

use crate::clock::DeterministicClock;
use crate::mirror::{MirrorConfig, MirrorWrite, ScrollMirror};
use crate::region::{MemoryRegion, ScrollRegion, Side};

/// Simulation step. Matches the millisecond resolution of browser timers.
const STEP: Duration = Duration::from_millis(1);
/// Upper bound on steps taken by [`MirrorSimulator::settle`].
const MAX_SETTLE_STEPS: u32 = 100_000;
/// One 60 Hz frame, rounded down to whole milliseconds.
pub const DEFAULT_ECHO_DELAY: Duration = Duration::from_millis(16);

/// Deterministic two-region page driving a [`ScrollMirror`].
#[derive(Debug, Clone)]
pub struct MirrorSimulator {
    clock: DeterministicClock,
    primary: MemoryRegion,
    secondary: MemoryRegion,
    mirror: ScrollMirror,
    writes: Vec<MirrorWrite>,
    echo_delay: Duration,
    /// When each region's pending echo is delivered.
    echo_at: [Option<Duration>; 2],
}

impl MirrorSimulator {
    /// Create a page whose regions can scroll to `primary_max` and
    /// `secondary_max` pixels respectively. Both start at the top.
    #[must_use]
    pub fn new(config: MirrorConfig, primary_max: f64, secondary_max: f64) -> Self {
        Self {
            clock: DeterministicClock::new(),
            primary: MemoryRegion::new(primary_max),
            secondary: MemoryRegion::new(secondary_max),
            mirror: ScrollMirror::new(config),
            writes: Vec::new(),
            echo_delay: DEFAULT_ECHO_DELAY,
            echo_at: [None; 2],
        }
    }

    /// Deliver write echoes `delay` after the write. `Duration::ZERO`
    /// delivers them in the turn that wrote.
    #[must_use]
    pub fn with_echo_delay(mut self, delay: Duration) -> Self {
        self.echo_delay = delay;
        self
    }

    /// Scroll `side` to `offset` as the user would.
    ///
    /// The region clamps the offset; a change is reported to the mirror at
    /// the current instant.
    pub fn user_scroll(&mut self, side: Side, offset: f64) {
        let now = self.clock.now();
        let region = self.region_mut(side);
        let before = region.scroll_top();
        region.set_scroll_top(offset);
        if region.scroll_top() == before {
            return;
        }
        let Some(offset) = region.take_notification() else {
            return;
        };
        // The user's `scroll` event also reports any pending echo.
        self.echo_at[side.index()] = None;
        self.mirror.notify(side, offset, now);
    }

    /// Jump to `now` without polling in between, as a throttled tab does,
    /// then run one host turn. Earlier instants are ignored.
    pub fn jump_to(&mut self, now: Duration) {
        self.clock.set(now);
        self.pump();
    }

    /// Advance simulated time by `dt`, one millisecond at a time.
    pub fn advance(&mut self, dt: Duration) {
        let mut remaining = dt;
        while !remaining.is_zero() {
            let step = remaining.min(STEP);
            self.clock.advance(step);
            remaining -= step;
            self.pump();
        }
    }

    /// Advance until neither the mirror nor the page has anything pending.
    ///
    /// Returns `false` if the page did not settle within the step budget.
    pub fn settle(&mut self) -> bool {
        // A reset due at the current instant still needs its own turn.
        self.pump();
        for _ in 0..MAX_SETTLE_STEPS {
            if self.is_settled() {
                return true;
            }
            self.advance(STEP);
        }
        self.is_settled()
    }

    /// Whether no event, guard reset or echo is outstanding.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !self.mirror.has_pending() && self.echo_at.iter().all(Option::is_none)
    }

    #[must_use]
    pub fn offset(&self, side: Side) -> f64 {
        self.region(side).scroll_top()
    }

    #[must_use]
    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Every write the mirror has performed so far.
    #[must_use]
    pub fn writes(&self) -> &[MirrorWrite] {
        &self.writes
    }

    #[must_use]
    pub const fn mirror(&self) -> &ScrollMirror {
        &self.mirror
    }

    #[must_use]
    pub fn region(&self, side: Side) -> &MemoryRegion {
        match side {
            Side::Primary => &self.primary,
            Side::Secondary => &self.secondary,
        }
    }

    fn region_mut(&mut self, side: Side) -> &mut MemoryRegion {
        match side {
            Side::Primary => &mut self.primary,
            Side::Secondary => &mut self.secondary,
        }
    }

    /// One host turn: deliver due echoes, poll the mirror, then schedule the
    /// echoes its writes raised.
    fn pump(&mut self) {
        let now = self.clock.now();
        self.deliver_echoes(now);
        let writes = self
            .mirror
            .poll(now, &mut self.primary, &mut self.secondary);
        for write in &writes {
            let slot = &mut self.echo_at[write.target.index()];
            // One `scroll` event per frame: a pending echo already covers it.
            if slot.is_none() {
                *slot = Some(now.saturating_add(self.echo_delay));
            }
        }
        self.writes.extend(writes);
        if self.echo_delay.is_zero() {
            self.deliver_echoes(now);
        }
    }

    fn deliver_echoes(&mut self, now: Duration) {
        for side in Side::ALL {
            let idx = side.index();
            if !self.echo_at[idx].is_some_and(|at| at <= now) {
                continue;
            }
            self.echo_at[idx] = None;
            if let Some(offset) = self.region_mut(side).take_notification() {
                self.mirror.notify(side, offset, now);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::MirrorState;

    use pretty_assertions::assert_eq;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn sim() -> MirrorSimulator {
        MirrorSimulator::new(MirrorConfig::default(), 10_000.0, 10_000.0)
    }

    #[test]
    fn primary_scroll_reaches_secondary_after_quiet_window() {
        let mut sim = sim();
        sim.user_scroll(Side::Primary, 500.0);

        sim.advance(ms(49));
        assert_eq!(sim.offset(Side::Secondary), 0.0);

        sim.advance(ms(1));
        assert_eq!(sim.offset(Side::Secondary), 500.0);
        assert_eq!(sim.mirror().state(), MirrorState::Propagating);

        assert!(sim.settle());
        assert_eq!(sim.mirror().state(), MirrorState::Idle);
        assert_eq!(sim.writes().len(), 1);
    }

    #[test]
    fn secondary_burst_mirrors_only_last_offset() {
        let mut sim = sim();
        sim.user_scroll(Side::Secondary, 200.0);
        sim.advance(ms(10));
        sim.user_scroll(Side::Secondary, 300.0);
        assert!(sim.settle());

        let offsets: Vec<_> = sim.writes().iter().map(|w| (w.target, w.offset)).collect();
        assert_eq!(offsets, vec![(Side::Primary, 300.0)]);
        assert_eq!(sim.offset(Side::Primary), 300.0);
        assert_eq!(sim.mirror().stats().coalesced, 1);
    }

    #[test]
    fn echo_produces_no_second_write() {
        let mut sim = sim();
        sim.user_scroll(Side::Primary, 1234.0);
        assert!(sim.settle());

        let stats = sim.mirror().stats();
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.echoes_absorbed, 1);
        assert_eq!(sim.offset(Side::Primary), sim.offset(Side::Secondary));
    }

    #[test]
    fn stable_page_stays_quiet() {
        let mut sim = sim();
        sim.user_scroll(Side::Primary, 800.0);
        assert!(sim.settle());
        let writes = sim.writes().len();

        sim.advance(ms(1000));
        assert_eq!(sim.writes().len(), writes);
        assert!(!sim.mirror().has_pending());
    }

    #[test]
    fn differing_ranges_are_not_scaled() {
        let mut sim = MirrorSimulator::new(MirrorConfig::default(), 2000.0, 600.0);
        sim.user_scroll(Side::Primary, 1500.0);
        assert!(sim.settle());

        assert_eq!(sim.offset(Side::Primary), 1500.0);
        assert_eq!(sim.offset(Side::Secondary), 600.0);
        assert_eq!(sim.writes().len(), 1);
    }

    #[test]
    fn alternating_sides_converge() {
        let mut sim = sim();
        sim.user_scroll(Side::Primary, 100.0);
        sim.advance(ms(20));
        sim.user_scroll(Side::Secondary, 900.0);
        sim.advance(ms(35));
        sim.user_scroll(Side::Primary, 400.0);
        assert!(sim.settle());

        assert_eq!(sim.offset(Side::Primary), sim.offset(Side::Secondary));
    }

    #[test]
    fn crossing_scrolls_with_frame_delayed_echoes_settle() {
        let mut sim = sim();
        sim.user_scroll(Side::Primary, 100.0);
        sim.advance(ms(10));
        sim.user_scroll(Side::Secondary, 300.0);
        assert!(sim.settle());

        let stats = sim.mirror().stats();
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.stale_discarded, 1);
        assert_eq!(stats.echoes_absorbed, 1);
        assert_eq!(sim.offset(Side::Primary), 100.0);
        assert_eq!(sim.offset(Side::Secondary), 100.0);
    }

    #[test]
    fn throttled_turn_handles_both_sides_under_one_guard() {
        let mut sim = sim();
        sim.user_scroll(Side::Primary, 100.0);
        sim.advance(ms(10));
        sim.user_scroll(Side::Secondary, 300.0);
        sim.jump_to(ms(70));

        assert_eq!(sim.writes().len(), 1);
        assert_eq!(sim.mirror().stats().dropped_while_propagating, 1);
        assert!(sim.settle());
        assert_eq!(sim.offset(Side::Primary), 100.0);
        assert_eq!(sim.offset(Side::Secondary), 100.0);
    }

    #[test]
    fn same_turn_echo_is_absorbed() {
        let mut sim = sim().with_echo_delay(Duration::ZERO);
        sim.user_scroll(Side::Secondary, 640.0);
        sim.advance(ms(50));
        assert_eq!(sim.mirror().stats().echoes_absorbed, 1);
        assert!(sim.settle());
        assert_eq!(sim.writes().len(), 1);
    }

    #[test]
    fn user_scroll_replaces_pending_echo() {
        let mut sim = sim();
        sim.user_scroll(Side::Primary, 500.0);
        sim.advance(ms(55));
        assert!(!sim.is_settled());

        // Before the frame-delayed echo lands.
        sim.user_scroll(Side::Secondary, 800.0);
        assert!(sim.settle());
        // Only the echo of the second write is absorbed.
        assert_eq!(sim.mirror().stats().echoes_absorbed, 1);
        assert_eq!(sim.writes().len(), 2);
        assert_eq!(sim.offset(Side::Primary), 800.0);
        assert_eq!(sim.offset(Side::Secondary), 800.0);
    }

    #[test]
    fn settle_on_idle_page_is_immediate() {
        let mut sim = sim();
        assert!(sim.settle());
        assert_eq!(sim.now(), Duration::ZERO);
        assert!(sim.writes().is_empty());
    }
}
