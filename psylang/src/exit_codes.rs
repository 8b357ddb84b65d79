//! Stable exit codes for the `psylang` CLI.

/// The program ran (or parsed) and its output was written.
pub const OK: i32 = 0;
/// Startup failed: unreadable source, invalid config or invalid arguments.
pub const INVALID: i32 = 1;
