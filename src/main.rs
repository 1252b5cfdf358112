// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmopipe contributors

//! osmopipe - Osmosis pipeline converter
//!
//! Convert between Osmosis command lines and typed pipeline graphs.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use osmopipe::cli::{Cli, Commands};

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "osmopipe=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    // Dispatch to command handlers
    match cli.command {
        Commands::Check { file, strict } => {
            osmopipe::cli::check::run(file, strict, cli.settings, cli.registry, cli.verbose)
        }
        Commands::Graph { file, format } => {
            osmopipe::cli::graph::run(file, format, cli.settings, cli.registry, cli.verbose)
        }
        Commands::Rewrite {
            file,
            output,
            short_names,
            export_defaults,
        } => osmopipe::cli::rewrite::run(
            file,
            output,
            short_names,
            export_defaults,
            cli.settings,
            cli.registry,
            cli.verbose,
        ),
    }
}
