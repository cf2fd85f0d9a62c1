/*
 * main.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! braceview CLI - Main entry point

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "braceview")]
#[command(version)]
#[command(about = "Render brace-directive view templates", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template with a context file
    Render {
        /// Template name, relative to the templates directory
        name: String,

        /// Site directory; holds braceview.toml or templates/ and partials/
        #[arg(long)]
        root: Option<PathBuf>,

        /// Engine configuration file (defaults to braceview.toml in the root)
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,

        /// JSON or YAML file with the render context
        #[arg(long)]
        context: Option<PathBuf>,

        /// Rewrite links as path segments
        #[arg(long)]
        pretty_links: bool,

        /// Write output to FILE instead of stdout
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Check a template for malformed directives
    Check {
        /// Template or partial name
        name: String,

        /// Site directory; holds braceview.toml or templates/ and partials/
        #[arg(long)]
        root: Option<PathBuf>,

        /// Engine configuration file (defaults to braceview.toml in the root)
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,

        /// Look the name up among partials instead of templates
        #[arg(long)]
        partial: bool,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "braceview=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            name,
            root,
            config,
            context,
            pretty_links,
            output,
        } => commands::render::execute(commands::render::RenderArgs {
            name,
            engine: commands::EngineArgs { root, config },
            context,
            pretty_links,
            output,
        }),
        Commands::Check {
            name,
            root,
            config,
            partial,
        } => commands::check::execute(commands::check::CheckArgs {
            name,
            engine: commands::EngineArgs { root, config },
            partial,
        }),
    }
}
