//! Program source loading.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

/// Read a program source file as UTF-8.
///
/// This is the only fatal condition of a run: nothing executes if the source
/// cannot be read.
pub fn load_source(path: &Path) -> Result<String> {
    debug!(path = %path.display(), "loading program source");
    let source = fs::read_to_string(path)
        .with_context(|| format!("read program source {}", path.display()))?;
    debug!(bytes = source.len(), "program source loaded");
    Ok(source)
}
