// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmopipe contributors

//! # osmopipe - Osmosis pipeline converter
//!
//! `osmopipe` converts between the flat Osmosis command-line form of a
//! data-processing pipeline and a typed graph of function nodes, in both
//! directions.
//!
//! ## Features
//!
//! - **Parsing** - Command-line text to a connector graph, resolving
//!   explicit pipe labels and implicit FIFO connections
//! - **Serialization** - Dependency-ordered command-line output with
//!   synthesized tee adapters for fan-out
//! - **Graph editing** - Typed, capacity-checked connect/disconnect with
//!   cycle validation
//! - **Task registry** - Built-in Osmosis task catalog plus YAML
//!   extension files
//!
//! ## Quick Start
//!
//! ```bash
//! # Parse and validate a pipeline file
//! osmopipe check pipeline.txt
//!
//! # Render the dependency graph
//! osmopipe graph pipeline.txt --format dot
//!
//! # Normalize: parse then re-serialize
//! osmopipe rewrite pipeline.txt
//! ```

pub mod cli;
pub mod errors;
pub mod parser;
pub mod pipeline;
pub mod registry;
pub mod serializer;
pub mod settings;

// Re-export commonly used types
pub use errors::{OsmopipeError, OsmopipeResult, ParseError, SerializeError};
pub use parser::Parser;
pub use pipeline::{
    Connector, ConnectorRef, ConnectorType, Direction, Function, FunctionId, Pipeline,
};
pub use registry::{FunctionTemplate, ParameterSpec, Registry};
pub use serializer::Serializer;
pub use settings::Settings;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
