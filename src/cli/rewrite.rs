// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmopipe contributors

//! Rewrite command - parse and re-serialize a pipeline
//!
//! The output is the normalized form: implicit connections become
//! numbered pipes and fan-out becomes explicit tee lines.

use miette::Result;
use std::path::PathBuf;

use crate::errors::OsmopipeError;
use crate::parser::Parser;
use crate::serializer::Serializer;

/// Run the rewrite command
#[allow(clippy::too_many_arguments)]
pub fn run(
    file: PathBuf,
    output: Option<PathBuf>,
    short_names: bool,
    export_defaults: bool,
    settings_path: Option<PathBuf>,
    registry_path: Option<PathBuf>,
    _verbose: bool,
) -> Result<()> {
    let mut settings = super::load_settings(settings_path.as_ref())?;
    settings.prefer_short_task_names = settings.prefer_short_task_names || short_names;
    settings.export_default_parameters = settings.export_default_parameters || export_defaults;

    let registry = super::load_registry(registry_path.as_ref())?;
    let input = super::read_input(&file)?;

    let pipeline = Parser::new(&registry, &settings)
        .parse(&input)
        .map_err(OsmopipeError::from)?;
    let text = Serializer::new(&settings)
        .serialize(&pipeline)
        .map_err(OsmopipeError::from)?;

    let text = super::display_pipeline(&text, &settings);
    match output {
        Some(path) => {
            std::fs::write(&path, &text).map_err(|e| OsmopipeError::FileWriteError {
                path,
                error: e.to_string(),
            })?;
        }
        None => println!("{}", text),
    }

    Ok(())
}
