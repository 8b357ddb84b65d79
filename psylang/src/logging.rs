//! Diagnostic tracing for the interpreter and its host loop.
//!
//! Output goes to stderr so that stdout carries only program output (frames
//! and parse dumps).

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. Call once, before parsing the program.
///
/// The level comes from `RUST_LOG` and falls back to `warn`, which surfaces
/// malformed task intervals. `debug` on the `psylang` target traces each
/// key dispatch, task firing and loop stop:
///
/// ```bash
/// RUST_LOG=psylang=debug psylang run demo.psy --virtual-time --ticks 90
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
