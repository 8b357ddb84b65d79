//! Deterministic, pure logic of the interpreter.
//!
//! Core modules must be free of I/O side effects. Time is passed in by the
//! caller and randomness comes from the seedable source inside
//! [`state::InterpreterState`], so every module is testable in isolation.

pub mod frame;
pub mod grid;
pub mod interpreter;
pub mod parser;
pub mod scheduler;
pub mod state;
