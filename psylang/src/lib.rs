//! Interpreter for PsyLang, a small grid-painting esoteric language.
//!
//! A program moves a pointer over a square grid and changes each cell's
//! color and opacity. Besides the main program, a source can bind code to
//! keys and schedule code to re-run at fixed wall-clock intervals.
//!
//! - **[`core`]**: Pure, deterministic logic (parsing, interpretation,
//!   scheduling). No I/O; every input text yields a valid next state.
//! - **[`io`]**: Host-side effects (config and source files, clocks, input,
//!   frame output).
//!
//! [`run`] couples the two into the tick loop behind `psylang run`.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod run;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
