//! Command implementations for the braceview CLI
//!
//! Each command module handles the CLI interface and delegates to
//! braceview-template for the actual work.

use std::path::PathBuf;

use anyhow::{Context, Result};
use braceview_template::{CONFIG_FILE_NAME, EngineConfig};
use tracing::debug;

pub mod check;
pub mod render;

/// Options shared by every command that needs an engine.
#[derive(Debug, Default)]
pub struct EngineArgs {
    /// Template root; overrides the configuration file's `root`.
    pub root: Option<PathBuf>,
    /// Explicit configuration file.
    pub config: Option<PathBuf>,
}

impl EngineArgs {
    /// Resolve the engine configuration.
    ///
    /// An explicit `--config` wins. Otherwise `braceview.toml` is looked up
    /// in the root (or the current directory), falling back to defaults.
    ///
    /// A configuration found inside `--root` keeps its own `root`, resolved
    /// against that directory. An explicit `--config`, or no configuration at
    /// all, takes `--root` as the template root.
    pub fn load_config(&self) -> Result<EngineConfig> {
        let config_path = match &self.config {
            Some(path) => Some(path.clone()),
            None => {
                let base = self.root.clone().unwrap_or_else(|| PathBuf::from("."));
                let candidate = base.join(CONFIG_FILE_NAME);
                candidate.is_file().then_some(candidate)
            }
        };
        let discovered = self.config.is_none() && config_path.is_some();

        let mut config = match &config_path {
            Some(path) => {
                debug!("Loading configuration from {}", path.display());
                EngineConfig::load(path)
                    .with_context(|| format!("Failed to load {}", path.display()))?
            }
            None => EngineConfig::default(),
        };

        match &self.root {
            Some(root) if !discovered => config.root = root.clone(),
            _ => {}
        }
        Ok(config)
    }
}
