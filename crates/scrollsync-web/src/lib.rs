#![forbid(unsafe_code)]

//! WASM frontend for scrollsync.
//!
//! Binds a [`scrollsync_core::ScrollMirror`] to two DOM elements:
//! - `scroll` listeners feed native notifications into the mirror,
//! - a single browser timeout is kept armed for the mirror's next deadline,
//! - list containers are populated with sequential items at bootstrap.
//!
//! JS entry points: `bootstrap()`, `bootstrapWithConfig(json)` and
//! `ScrollSyncWeb.attach(primary, secondary, configJson?)`.

pub mod timing;

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::{ScrollSyncWeb, bootstrap, bootstrap_with_config};

/// Native builds compile this crate as a stub so `cargo check --workspace` stays
/// green on non-wasm targets.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Default)]
pub struct ScrollSyncWeb;

#[cfg(not(target_arch = "wasm32"))]
impl ScrollSyncWeb {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self
    }
}
