/*
 * render.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Render command implementation
 */

//! Render command implementation.
//!
//! Loads the engine configuration, reads an optional JSON or YAML context
//! file, merges the configured site settings underneath it and renders one
//! template to stdout or a file.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use braceview_template::Context;
use tracing::{debug, info};

use super::EngineArgs;

/// Arguments for the render command
#[derive(Debug, Default)]
pub struct RenderArgs {
    /// Template name
    pub name: String,
    pub engine: EngineArgs,
    /// Context file (JSON, or YAML by extension)
    pub context: Option<PathBuf>,
    /// Force pretty links on regardless of configuration
    pub pretty_links: bool,
    /// Output file; stdout when absent
    pub output: Option<PathBuf>,
}

/// Execute the render command
pub fn execute(args: RenderArgs) -> Result<()> {
    let rendered = render(&args)?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}

/// Render the requested template to a string.
pub fn render(args: &RenderArgs) -> Result<String> {
    let mut config = args.engine.load_config()?;
    if args.pretty_links {
        config.settings.pretty_links = true;
    }

    let mut context = match &args.context {
        Some(path) => load_context(path)?,
        None => Context::new(),
    };
    context.merge_missing(&config.settings.to_context());
    debug!(keys = context.len(), "Prepared render context");

    config
        .renderer()
        .render(&args.name, &context)
        .with_context(|| format!("Failed to render {}", args.name))
}

/// Read a context file. `.yaml`/`.yml` files are parsed as YAML, everything
/// else as JSON.
pub fn load_context(path: &Path) -> Result<Context> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read context file {}", path.display()))?;

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    );
    let value: serde_json::Value = if is_yaml {
        serde_yaml::from_str(&text)
            .with_context(|| format!("Invalid YAML in {}", path.display()))?
    } else {
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?
    };

    Context::from_json(value).with_context(|| format!("Invalid context in {}", path.display()))
}
