#![forbid(unsafe_code)]

//! `scrollsync-core` keeps the vertical scroll offsets of two scrollable
//! regions in lockstep.
//!
//! Design goals:
//! - **Host-driven I/O**: the embedding environment pushes native scroll
//!   notifications and advances time. Nothing here blocks or spawns.
//! - **Deterministic time**: every operation takes `now` explicitly, so the
//!   same notification sequence always yields the same writes.
//! - **No feedback loops**: a re-entrancy guard plus echo absorption keep a
//!   single user scroll from bouncing between the regions.
//!
//! The DOM binding lives in `scrollsync-web`; this crate only knows about the
//! [`ScrollRegion`] trait.
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
//! sim.user_scroll(Side::Primary, 500.0);
//! sim.advance(Duration::from_millis(60));
//! assert_eq!(sim.offset(Side::Secondary), 500.0);
//! ```

pub mod clock;
pub mod debounce;
pub mod mirror;
pub mod page;
pub mod region;
pub mod simulator;

pub use clock::DeterministicClock;
pub use debounce::Debouncer;
pub use mirror::{MirrorConfig, MirrorState, MirrorStats, MirrorWrite, ScrollMirror};
pub use page::{ElementLookup, ListItem, PageConfig, PageElements, list_items};
pub use region::{MemoryRegion, ScrollEvent, ScrollRegion, Side};

/// Configuration error.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The quiet window must be non-zero, otherwise nothing is coalesced.
    ZeroQuietWindow,
    /// The offset tolerance must be finite and non-negative.
    InvalidEpsilon(f64),
    /// A required element id was empty.
    EmptyElementId(&'static str),
    /// A page must render at least one list item.
    ZeroItemCount,
    /// The JSON configuration could not be parsed.
    Json(String),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ZeroQuietWindow => write!(f, "quiet window must be greater than zero"),
            Self::InvalidEpsilon(eps) => {
                write!(f, "offset epsilon must be finite and >= 0 (got {eps})")
            }
            Self::EmptyElementId(field) => write!(f, "element id `{field}` must not be empty"),
            Self::ZeroItemCount => write!(f, "item count must be greater than zero"),
            Self::Json(msg) => write!(f, "invalid config json: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}
