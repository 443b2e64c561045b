//! Lazy logger init (SPEC_FULL.md §6): [`crate::interpreter::Interpreter`]
//! calls this once before running anything, so `log::debug!`/`log::warn!`
//! calls throughout the pipeline and unifier have a destination without
//! forcing every embedder to configure `flexi_logger` itself.
//!
//! Grounded on the teacher's own `logger.rs`, narrowed to the single
//! `flexi_logger` backend it already carried as its default feature --
//! the wasm/esp/env_logger branches existed for targets this crate
//! doesn't ship for.

use std::sync::Once;

static INIT: Once = Once::new();

/// Initializes `flexi_logger` from `RUST_LOG`, defaulting to `info`.
/// Safe to call repeatedly; only the first call takes effect.
pub fn init() {
    INIT.call_once(|| {
        #[cfg(feature = "flexi_logger")]
        {
            let _ = flexi_logger::Logger::try_with_env_or_str("info").and_then(|logger| logger.start());
        }
    });
}
