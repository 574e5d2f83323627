//! Shared test fixtures for HybridForge crates.
//!
//! This crate provides pure factory functions for testing. Nothing here keeps
//! state between calls: every fixture is rebuilt from its parameters.
//!
//! - [`scalar`] - 1-D prior, between and switching factors implementing
//!   [`Linearize`](hybridforge_inference::Linearize)
//! - [`switching`] - the 1-D switching-system problem and its helpers
//! - [`scenarios`] - measurement lists and expected mode sequences
//!
//! # Usage
//!
//! Add as a dev-dependency in your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! hybridforge-test = { workspace = true }
//! ```
//!
//! Then build the fixture you need:
//!
//! ```
//! use hybridforge_test::switching::{switching, SwitchingParams};
//!
//! let problem = switching(&SwitchingParams::new(3)).unwrap();
//! assert_eq!(problem.linearized.len(), 7);
//! ```

use std::sync::OnceLock;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

pub mod scalar;
pub mod scenarios;
pub mod switching;

pub use scalar::{ScalarFactor, ScalarModel};
pub use switching::{discrete_sequence, specific_problem, switching, Switching, SwitchingParams};

static INIT: OnceLock<()> = OnceLock::new();

/// Installs a `tracing` subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call has effect. The level
/// defaults to `warn` and follows `RUST_LOG` when set.
pub fn init_tracing() {
    INIT.get_or_init(|| {
        let filter = EnvFilter::builder()
            .with_default_directive(LevelFilter::WARN.into())
            .from_env_lossy();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
