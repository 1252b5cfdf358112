// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmopipe contributors

//! Check command - parse and validate a pipeline file

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use crate::parser::Parser;
use crate::serializer::Serializer;
use crate::settings::Settings;

/// Run the check command
pub fn run(
    file: PathBuf,
    strict: bool,
    settings_path: Option<PathBuf>,
    registry_path: Option<PathBuf>,
    verbose: bool,
) -> Result<()> {
    println!("{}", "Checking pipeline...".bold());
    println!();

    let mut settings = super::load_settings(settings_path.as_ref())?;
    settings.strict_inputs = settings.strict_inputs || strict;
    let registry = super::load_registry(registry_path.as_ref())?;
    let input = super::read_input(&file)?;

    let pipeline = match Parser::new(&registry, &settings).parse(&input) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("  {} Parse failed", "✗".red());
            eprintln!();
            return Err(e.into());
        }
    };

    println!("  {} Parsed {} function(s)", "✓".green(), pipeline.len());

    let arrangement = pipeline
        .arrange()
        .map_err(crate::errors::OsmopipeError::from)?;
    println!("  {} Dependency graph is acyclic", "✓".green());

    if !arrangement.unconnected.is_empty() {
        println!();
        println!("{}:", "Unconnected inputs".yellow().bold());
        for open in &arrangement.unconnected {
            let name = pipeline
                .get(open.function)
                .map(|f| f.name().to_string())
                .unwrap_or_default();
            println!("  {} --{} inPipe.{}", "⚠".yellow(), name, open.slot);
        }
    }

    if verbose {
        println!();
        println!("{}:", "Pipeline summary".bold());
        for id in &arrangement.order {
            if let Some(f) = pipeline.get(*id) {
                let set_params: Vec<String> = f
                    .parameters()
                    .iter()
                    .filter(|p| !p.is_default())
                    .filter_map(|p| p.value().map(|v| format!("{}={}", p.name(), v)))
                    .collect();
                println!("    - {} {}", f.name(), set_params.join(" ").dimmed());
            }
        }

        // Show what the normalized form would look like.
        let text = Serializer::new(&settings)
            .serialize(&pipeline)
            .map_err(crate::errors::OsmopipeError::from)?;
        println!();
        println!("{}:", "Normalized".bold());
        println!("{}", super::display_pipeline(&text, &settings));
    }

    println!();
    println!("{}", "Pipeline is valid!".green().bold());
    Ok(())
}
