//! Host run configuration, optionally read from a TOML file.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::core::grid::DEFAULT_GRID_SIZE;
use crate::core::parser::BracketMode;

/// Settings for the host loop around the interpreter.
///
/// Missing fields take their defaults, so an empty file is valid.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunConfig {
    /// Side length of the square grid.
    pub grid_size: usize,

    /// Ticks per second.
    pub fps: u32,

    /// Stop after this many ticks. Unset runs until quit or idle.
    pub max_ticks: Option<u64>,

    /// Seed for `%[lo/hi]` draws. Unset seeds from entropy.
    pub seed: Option<u64>,

    /// Task and key-binding body matching.
    pub brackets: BracketMode,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            fps: 30,
            max_ticks: None,
            seed: None,
            brackets: BracketMode::Lazy,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        if self.grid_size == 0 {
            return Err(anyhow!("grid_size must be > 0"));
        }
        if self.fps == 0 {
            return Err(anyhow!("fps must be > 0"));
        }
        Ok(())
    }

    /// Wall-clock length of one tick.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(1) / self.fps.max(1)
    }
}

/// Load config from a TOML file, or defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<RunConfig> {
    let Some(path) = path else {
        let cfg = RunConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    };
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RunConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_path_returns_default() {
        let cfg = load_config(None).expect("load");
        assert_eq!(cfg, RunConfig::default());
        assert_eq!(cfg.grid_size, 16);
        assert_eq!(cfg.fps, 30);
    }

    #[test]
    fn missing_file_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = load_config(Some(&temp.path().join("missing.toml"))).expect_err("missing");
        assert!(format!("{err:#}").contains("missing.toml"));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("run.toml");
        fs::write(&path, "seed = 9\nbrackets = \"balanced\"\n").expect("write");

        let cfg = load_config(Some(&path)).expect("load");
        assert_eq!(cfg.seed, Some(9));
        assert_eq!(cfg.brackets, BracketMode::Balanced);
        assert_eq!(cfg.grid_size, 16);
        assert_eq!(cfg.max_ticks, None);
    }

    #[test]
    fn zero_fps_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("run.toml");
        fs::write(&path, "fps = 0\n").expect("write");

        let err = load_config(Some(&path)).expect_err("invalid");
        assert!(format!("{err:#}").contains("fps must be > 0"));
    }

    #[test]
    fn tick_interval_follows_fps() {
        let cfg = RunConfig {
            fps: 4,
            ..RunConfig::default()
        };
        assert_eq!(cfg.tick_interval(), Duration::from_millis(250));
    }
}
