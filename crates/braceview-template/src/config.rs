/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Engine configuration.
//!
//! An [`EngineConfig`] is usually read from a `braceview.toml` file:
//!
//! ```toml
//! root = "views"
//! extension = ".template"
//! templates_dir = "templates"
//! partials_dir = "partials"
//! max_partial_depth = 32
//! malformed = "strict"       # or "pass-through"
//!
//! [settings]
//! title = "My blog"
//! pretty_links = true
//! ```
//!
//! Every field is optional.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::directive::MalformedPolicy;
use crate::error::{TemplateError, TemplateResult};
use crate::link::Settings;
use crate::renderer::{DEFAULT_MAX_PARTIAL_DEPTH, RenderOptions, Renderer};
use crate::source::{FileSystemLoader, SourceLayout, TEMPLATE_EXTENSION};

/// Conventional name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "braceview.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Directory containing the templates and partials directories.
    pub root: PathBuf,
    pub extension: String,
    pub templates_dir: String,
    pub partials_dir: String,
    pub max_partial_depth: usize,
    pub malformed: MalformedPolicy,
    pub settings: Settings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let layout = SourceLayout::default();
        Self {
            root: PathBuf::from("."),
            extension: TEMPLATE_EXTENSION.to_string(),
            templates_dir: layout.templates_dir,
            partials_dir: layout.partials_dir,
            max_partial_depth: DEFAULT_MAX_PARTIAL_DEPTH,
            malformed: MalformedPolicy::default(),
            settings: Settings::default(),
        }
    }
}

impl EngineConfig {
    /// Parse configuration from TOML text. A relative `root` is kept as is.
    pub fn from_toml_str(text: &str) -> TemplateResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| TemplateError::Config {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file. A relative `root` is resolved against
    /// the directory containing the file.
    pub fn load(path: impl AsRef<Path>) -> TemplateResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| TemplateError::Config {
            message: format!("{}: {}", path.display(), e),
        })?;
        let mut config = Self::from_toml_str(&text).map_err(|e| match e {
            TemplateError::Config { message } => TemplateError::Config {
                message: format!("{}: {}", path.display(), message),
            },
            other => other,
        })?;

        if let Some(dir) = path.parent().filter(|_| config.root.is_relative()) {
            config.root = dir.join(&config.root);
        }
        tracing::debug!(
            config = %path.display(),
            root = %config.root.display(),
            "Loaded engine configuration"
        );
        Ok(config)
    }

    fn validate(&self) -> TemplateResult<()> {
        if self.max_partial_depth == 0 {
            return Err(TemplateError::Config {
                message: "max_partial_depth must be at least 1".to_string(),
            });
        }
        if self.extension.is_empty() {
            return Err(TemplateError::Config {
                message: "extension must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn layout(&self) -> SourceLayout {
        SourceLayout {
            templates_dir: self.templates_dir.clone(),
            partials_dir: self.partials_dir.clone(),
            extension: self.extension.clone(),
        }
    }

    pub fn file_loader(&self) -> FileSystemLoader {
        FileSystemLoader::with_layout(&self.root, self.layout())
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            max_partial_depth: self.max_partial_depth,
            malformed: self.malformed,
        }
    }

    /// A renderer reading from [`EngineConfig::file_loader`] with the
    /// configured settings as link policy.
    pub fn renderer(&self) -> Renderer<FileSystemLoader, Settings> {
        Renderer::new(self.file_loader(), self.settings.clone())
            .with_options(self.render_options())
    }
}
