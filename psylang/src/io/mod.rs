//! Host-side helpers for `psylang run`.

pub mod clock;
pub mod config;
pub mod input;
pub mod render;
pub mod source;
