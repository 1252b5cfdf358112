// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmopipe contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for osmopipe.

pub mod check;
pub mod graph;
pub mod rewrite;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::errors::OsmopipeError;
use crate::registry::Registry;
use crate::settings::Settings;

/// Osmosis command-line / pipeline-graph converter
#[derive(Parser, Debug)]
#[clap(
    name = "osmopipe",
    version,
    about = "Bidirectional converter between Osmosis command lines and pipeline graphs",
    long_about = None,
    after_help = "Examples:\n\
        osmopipe check pipeline.txt          Parse and validate a pipeline\n\
        osmopipe graph pipeline.txt -f dot   Render the pipeline graph\n\
        osmopipe rewrite pipeline.txt        Parse and re-serialize (normalize)\n\n\
        See 'osmopipe <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Settings file (TOML)
    #[clap(short, long, global = true, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Extra task templates merged over the built-in catalog (YAML)
    #[clap(short, long, global = true, value_name = "FILE")]
    pub registry: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse a pipeline file and report its structure
    Check {
        /// Pipeline file to check
        file: PathBuf,

        /// Treat unconnected required inputs as errors
        #[clap(long)]
        strict: bool,
    },

    /// Show a parsed pipeline as a graph
    Graph {
        /// Pipeline file
        file: PathBuf,

        /// Output format
        #[clap(short, long, value_enum, default_value_t = GraphFormat::Text)]
        format: GraphFormat,
    },

    /// Parse and re-serialize a pipeline (normalization)
    Rewrite {
        /// Pipeline file
        file: PathBuf,

        /// Output file (default: stdout)
        #[clap(short, long)]
        output: Option<PathBuf>,

        /// Emit short task names where available
        #[clap(long)]
        short_names: bool,

        /// Emit parameters still at their template default
        #[clap(long)]
        export_defaults: bool,
    },
}

/// Graph output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    Text,
    Dot,
    Mermaid,
    Json,
}

/// Load settings, falling back to defaults when no file is given.
pub(crate) fn load_settings(path: Option<&PathBuf>) -> Result<Settings, OsmopipeError> {
    match path {
        Some(p) => Settings::from_file(p),
        None => Ok(Settings::default()),
    }
}

/// Load the registry, merging an extension file when given.
pub(crate) fn load_registry(path: Option<&PathBuf>) -> Result<Registry, OsmopipeError> {
    match path {
        Some(p) => Registry::from_file(p),
        None => Ok(Registry::builtin()),
    }
}

/// Read a pipeline file.
pub(crate) fn read_input(path: &PathBuf) -> Result<String, OsmopipeError> {
    std::fs::read_to_string(path).map_err(|e| OsmopipeError::FileReadError {
        path: path.clone(),
        error: e.to_string(),
    })
}

/// Serialized text for display: the serializer prefixes every task with
/// the linebreak marker, so drop the leading one.
pub(crate) fn display_pipeline(text: &str, settings: &Settings) -> String {
    text.trim_start()
        .strip_prefix(&settings.linebreak_symbol)
        .unwrap_or(text)
        .trim_start()
        .to_string()
}
