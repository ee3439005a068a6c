//! Property-based invariant tests for scroll mirroring.
//!
//! Verifies:
//! 1. Last offset wins: after a single-side burst settles, the other region
//!    holds the burst's final offset.
//! 2. Symmetry: the same holds with primary and secondary swapped.
//! 3. No write chains: one burst produces at most one write, even when the
//!    regions clamp differently.
//! 4. Convergence: interleaved bursts on both sides settle to equal offsets
//!    when both regions share a scroll range.
//! 5. Idempotence: a settled page performs no further writes.
//! 6. Determinism: the same scroll script yields the same writes.
//!
//! Each property runs with write echoes delivered anywhere from the same turn
//! to a few frames after the write.

use core::time::Duration;

use proptest::prelude::*;
use scrollsync_core::mirror::{MirrorConfig, MirrorWrite};
use scrollsync_core::region::Side;
use scrollsync_core::simulator::{DEFAULT_ECHO_DELAY, MirrorSimulator};

const RANGE: f64 = 20_000.0;

/// One user scroll: side, target offset, then idle time before the next one.
#[derive(Debug, Clone, Copy)]
struct Step {
    side: Side,
    offset: f64,
    gap_ms: u64,
}

// ── Strategy helpers ──────────────────────────────────────────────────

/// Delay between a write and its `scroll` echo.
fn arb_echo_delay() -> impl Strategy<Value = Duration> {
    prop_oneof![Just(0u64), Just(16u64), 1u64..48].prop_map(Duration::from_millis)
}

fn arb_side() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Primary), Just(Side::Secondary)]
}

/// Whole-pixel offsets, as browsers report them for integer layouts.
fn arb_offset() -> impl Strategy<Value = f64> {
    (0u32..20_000).prop_map(f64::from)
}

/// A burst on one side: offsets strictly increase (every scroll moves the
/// region) and every gap stays inside the 50ms quiet window.
fn arb_burst() -> impl Strategy<Value = Vec<(f64, u64)>> {
    prop::collection::vec((1u32..500, 0u64..50), 1..20).prop_map(|deltas| {
        let mut offset = 0u32;
        deltas
            .into_iter()
            .map(|(delta, gap_ms)| {
                offset += delta;
                (f64::from(offset), gap_ms)
            })
            .collect()
    })
}

fn arb_script() -> impl Strategy<Value = Vec<Step>> {
    prop::collection::vec(
        (arb_side(), arb_offset(), 0u64..150).prop_map(|(side, offset, gap_ms)| Step {
            side,
            offset,
            gap_ms,
        }),
        1..30,
    )
}

fn run_burst(sim: &mut MirrorSimulator, side: Side, burst: &[(f64, u64)]) {
    for &(offset, gap_ms) in burst {
        sim.user_scroll(side, offset);
        sim.advance(Duration::from_millis(gap_ms));
    }
}

fn run_script(sim: &mut MirrorSimulator, script: &[Step]) {
    for step in script {
        sim.user_scroll(step.side, step.offset);
        sim.advance(Duration::from_millis(step.gap_ms));
    }
}

fn page(echo_delay: Duration) -> MirrorSimulator {
    MirrorSimulator::new(MirrorConfig::default(), RANGE, RANGE).with_echo_delay(echo_delay)
}

proptest! {
    #[test]
    fn burst_last_offset_wins(
        side in arb_side(),
        burst in arb_burst(),
        echo_delay in arb_echo_delay(),
    ) {
        let mut sim = page(echo_delay);
        run_burst(&mut sim, side, &burst);
        prop_assert!(sim.settle());

        let last = burst.last().map(|&(offset, _)| offset).unwrap_or_default();
        prop_assert_eq!(sim.offset(side), last);
        prop_assert_eq!(sim.offset(side.other()), last);
        prop_assert!(sim.writes().len() <= 1);
    }

    #[test]
    fn single_burst_never_chains(
        burst in arb_burst(),
        primary_max in 0u32..20_000,
        secondary_max in 0u32..20_000,
        echo_delay in arb_echo_delay(),
    ) {
        let mut sim = MirrorSimulator::new(
            MirrorConfig::default(),
            f64::from(primary_max),
            f64::from(secondary_max),
        )
        .with_echo_delay(echo_delay);
        run_burst(&mut sim, Side::Primary, &burst);
        prop_assert!(sim.settle());

        prop_assert!(sim.writes().len() <= 1);
        for write in sim.writes() {
            prop_assert_eq!(write.target, Side::Secondary);
        }
    }

    #[test]
    fn interleaved_bursts_converge(script in arb_script(), echo_delay in arb_echo_delay()) {
        let mut sim = page(echo_delay);
        run_script(&mut sim, &script);
        prop_assert!(sim.settle());

        prop_assert_eq!(sim.offset(Side::Primary), sim.offset(Side::Secondary));
    }

    #[test]
    fn settled_page_is_idempotent(
        script in arb_script(),
        idle_ms in 50u64..2_000,
        echo_delay in arb_echo_delay(),
    ) {
        let mut sim = page(echo_delay);
        run_script(&mut sim, &script);
        prop_assert!(sim.settle());
        let writes = sim.writes().len();

        sim.advance(Duration::from_millis(idle_ms));
        prop_assert_eq!(sim.writes().len(), writes);
        prop_assert!(sim.is_settled());
    }

    #[test]
    fn same_script_same_writes(script in arb_script(), echo_delay in arb_echo_delay()) {
        let run = |script: &[Step]| -> Vec<MirrorWrite> {
            let mut sim = page(echo_delay);
            run_script(&mut sim, script);
            sim.settle();
            sim.writes().to_vec()
        };
        prop_assert_eq!(run(&script), run(&script));
    }
}

// ── Scenarios ─────────────────────────────────────────────────────────

#[test]
fn primary_to_500_then_idle() {
    let mut sim = page(DEFAULT_ECHO_DELAY);
    sim.user_scroll(Side::Primary, 500.0);
    sim.advance(Duration::from_millis(50));
    assert_eq!(sim.offset(Side::Secondary), 500.0);
}

#[test]
fn secondary_200_then_300_mirrors_only_300() {
    let mut sim = page(DEFAULT_ECHO_DELAY);
    sim.user_scroll(Side::Secondary, 200.0);
    sim.advance(Duration::from_millis(5));
    sim.user_scroll(Side::Secondary, 300.0);
    assert!(sim.settle());

    assert_eq!(sim.writes().len(), 1);
    assert_eq!(sim.writes()[0].offset, 300.0);
    assert_eq!(sim.offset(Side::Primary), 300.0);
}
