use crate::error::{ClippyResult, VbLintError};
use crate::level::LintLevel;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Contents of `vb-lint.toml`.
///
/// ```toml
/// [lints]
/// disabled = ["read_only_by_ref"]
/// read_only_by_ref = "error"
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct VbLintConfig {
    #[serde(default)]
    pub lints: LintsConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct LintsConfig {
    #[serde(default)]
    pub disabled: Vec<String>,

    #[serde(flatten)]
    pub levels: HashMap<String, LintLevel>,
}

impl VbLintConfig {
    /// Reject lint names that no registered rule carries.
    pub fn validate(&self, known: &HashSet<&'static str>) -> ClippyResult<()> {
        let mut unknown: Vec<&str> = self
            .lints
            .disabled
            .iter()
            .chain(self.lints.levels.keys())
            .map(String::as_str)
            .filter(|name| !known.contains(*name))
            .collect();
        if unknown.is_empty() {
            return Ok(());
        }
        unknown.sort_unstable();
        unknown.dedup();
        Err(VbLintError::config(format!(
            "unknown lint(s) in config: {}",
            unknown.join(", ")
        )))
    }
}

pub const DEFAULT_CONFIG_FILE_NAME: &str = "vb-lint.toml";

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    start_dir
        .ancestors()
        .map(|dir| dir.join(DEFAULT_CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

pub fn load_config_file(path: &Path) -> Result<VbLintConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let cfg: VbLintConfig = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;
    Ok(cfg)
}

/// Load the explicit config, or the nearest `vb-lint.toml` above `start_dir`.
pub fn load_config(
    explicit_path: Option<&Path>,
    start_dir: &Path,
) -> Result<Option<(PathBuf, VbLintConfig)>> {
    let path = match explicit_path {
        Some(p) => p.to_path_buf(),
        None => match find_config_file(start_dir) {
            Some(p) => p,
            None => return Ok(None),
        },
    };
    let cfg = load_config_file(&path)?;
    cfg.validate(&crate::lint::all_known_lints())
        .with_context(|| format!("invalid config file: {}", path.display()))?;
    Ok(Some((path, cfg)))
}
