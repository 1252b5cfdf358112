// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmopipe contributors

//! Graph command - visualize a parsed pipeline

use miette::Result;
use std::path::PathBuf;

use super::GraphFormat;
use crate::errors::OsmopipeError;
use crate::parser::Parser;

/// Run the graph command
pub fn run(
    file: PathBuf,
    format: GraphFormat,
    settings_path: Option<PathBuf>,
    registry_path: Option<PathBuf>,
    _verbose: bool,
) -> Result<()> {
    let settings = super::load_settings(settings_path.as_ref())?;
    let registry = super::load_registry(registry_path.as_ref())?;
    let input = super::read_input(&file)?;

    let pipeline = Parser::new(&registry, &settings)
        .parse(&input)
        .map_err(OsmopipeError::from)?;

    let output = match format {
        GraphFormat::Text => {
            let arrangement = pipeline.arrange().map_err(OsmopipeError::from)?;
            let mut out = String::new();
            for (i, id) in arrangement.order.iter().enumerate() {
                if let Some(f) = pipeline.get(*id) {
                    let upstream: Vec<String> = f
                        .inputs()
                        .iter()
                        .flat_map(|c| c.peers())
                        .filter_map(|p| pipeline.get(p.function))
                        .map(|f| f.name().to_string())
                        .collect();
                    out.push_str(&format!("{}. {}", i + 1, f.name()));
                    if !upstream.is_empty() {
                        out.push_str(&format!(" [from: {}]", upstream.join(", ")));
                    }
                    out.push('\n');
                }
            }
            out
        }
        GraphFormat::Dot => pipeline.to_dot(),
        GraphFormat::Mermaid => pipeline.to_mermaid(),
        GraphFormat::Json => render_json(&pipeline)?,
    };

    println!("{}", output);

    Ok(())
}

/// Machine-readable node/edge dump.
fn render_json(pipeline: &crate::pipeline::Pipeline) -> Result<String> {
    let nodes: Vec<_> = pipeline
        .functions()
        .iter()
        .map(|f| {
            serde_json::json!({
                "id": f.id().to_string(),
                "task": f.name(),
                "parameters": f
                    .parameters()
                    .iter()
                    .filter_map(|p| p.value().map(|v| (p.name().to_string(), v.to_string())))
                    .collect::<std::collections::BTreeMap<_, _>>(),
            })
        })
        .collect();

    let mut edges = Vec::new();
    for f in pipeline.functions() {
        for conn in f.outputs() {
            for peer in conn.peers() {
                edges.push(serde_json::json!({
                    "from": f.id().to_string(),
                    "to": peer.function.to_string(),
                    "stream": conn.kind().to_string(),
                }));
            }
        }
    }

    serde_json::to_string_pretty(&serde_json::json!({ "nodes": nodes, "edges": edges }))
        .map_err(|e| miette::miette!("failed to encode graph as JSON: {}", e))
}
