//! Playground configuration stored in `playground.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Default location of the config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "playground.toml";

/// Playground configuration (TOML).
///
/// Missing fields default to the values the browser client was tuned for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlaygroundConfig {
    /// Pause between entering `Running` and executing, so the running state
    /// is observable before the blocking execution starts.
    pub run_delay_ms: u64,

    /// Catalog file to load instead of the built-in patterns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,

    pub evaluator: EvaluatorConfig,
}

/// Interpreter limits. Unset means unlimited.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Abort a run after this many iterations of any single loop.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loop_iteration_limit: Option<u64>,

    /// Abort a run once the call stack gets this deep.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recursion_limit: Option<usize>,
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        Self {
            run_delay_ms: 100,
            catalog_path: None,
            evaluator: EvaluatorConfig::default(),
        }
    }
}

impl PlaygroundConfig {
    pub fn run_delay(&self) -> Duration {
        Duration::from_millis(self.run_delay_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.evaluator.loop_iteration_limit == Some(0) {
            return Err(anyhow!("evaluator.loop_iteration_limit must be > 0"));
        }
        if self.evaluator.recursion_limit == Some(0) {
            return Err(anyhow!("evaluator.recursion_limit must be > 0"));
        }
        if let Some(path) = &self.catalog_path
            && path.as_os_str().is_empty()
        {
            return Err(anyhow!("catalog_path must not be empty"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `PlaygroundConfig::default()`.
pub fn load_config(path: &Path) -> Result<PlaygroundConfig> {
    if !path.exists() {
        let cfg = PlaygroundConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: PlaygroundConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &PlaygroundConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, PlaygroundConfig::default());
        assert_eq!(cfg.run_delay(), Duration::from_millis(100));
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("playground.toml");
        let cfg = PlaygroundConfig {
            run_delay_ms: 5,
            catalog_path: Some(PathBuf::from("catalog.json")),
            evaluator: EvaluatorConfig {
                loop_iteration_limit: Some(10_000),
                recursion_limit: None,
            },
        };
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("playground.toml");
        fs::write(&path, "[evaluator]\nrecursion_limit = 64\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.run_delay_ms, 100);
        assert_eq!(cfg.evaluator.recursion_limit, Some(64));
        assert_eq!(cfg.evaluator.loop_iteration_limit, None);
    }

    #[test]
    fn zero_limits_are_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("playground.toml");
        fs::write(&path, "[evaluator]\nloop_iteration_limit = 0\n").expect("write");
        let err = load_config(&path).expect_err("zero limit");
        assert!(err.to_string().contains("loop_iteration_limit"));
    }
}
