/*
 * check.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Check command implementation
 */

//! Check command implementation.
//!
//! Reads one template or partial and validates its directives without
//! rendering. A malformed directive makes the command fail, so the process
//! exits with a non-zero status.

use anyhow::{Context as _, Result};
use braceview_template::{Namespace, SourceLoader, check};
use tracing::info;

use super::EngineArgs;

/// Arguments for the check command
#[derive(Debug, Default)]
pub struct CheckArgs {
    /// Template or partial name
    pub name: String,
    pub engine: EngineArgs,
    /// Resolve the name among partials
    pub partial: bool,
}

/// Execute the check command
pub fn execute(args: CheckArgs) -> Result<()> {
    let config = args.engine.load_config()?;
    let namespace = if args.partial {
        Namespace::Partial
    } else {
        Namespace::Template
    };

    let text = config
        .file_loader()
        .read(namespace, &args.name)
        .with_context(|| format!("Failed to read {namespace} {}", args.name))?;

    check(&text).with_context(|| format!("{namespace} {} is malformed", args.name))?;
    info!("{namespace} {} is well formed", args.name);
    Ok(())
}
