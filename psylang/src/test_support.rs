//! Test-only helpers for interpreter states and program files.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::core::grid::DEFAULT_GRID_SIZE;
use crate::core::state::InterpreterState;

/// Seed used by [`seeded_state`].
pub const TEST_SEED: u64 = 0;

/// A default-sized state with a fixed random seed.
pub fn seeded_state() -> InterpreterState {
    InterpreterState::seeded(DEFAULT_GRID_SIZE, TEST_SEED)
}

/// Write `source` to `program.psy` inside `dir`.
pub fn write_program(dir: &Path, source: &str) -> Result<PathBuf> {
    let path = dir.join("program.psy");
    fs::write(&path, source).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

/// A temp directory holding `program.psy`. Keep the `TempDir` alive for as
/// long as the path is used.
pub fn program_file(source: &str) -> Result<(TempDir, PathBuf)> {
    let temp = tempfile::tempdir().context("create tempdir")?;
    let path = write_program(temp.path(), source)?;
    Ok((temp, path))
}
