// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmopipe contributors

//! Error types
//!
//! Parse failures carry the task-name context the user needs to find the
//! offending spot in the command line; connect rejections are typed and
//! recoverable; serializer faults indicate a broken graph invariant, not
//! bad user input.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for osmopipe operations
pub type OsmopipeResult<T> = Result<T, OsmopipeError>;

/// Rejection of a single connect operation.
///
/// Recoverable: a failed connect leaves both endpoints unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Diagnostic)]
pub enum ConnectError {
    #[error("connector stream types do not match")]
    #[diagnostic(code(osmopipe::type_mismatch))]
    TypeMismatch,

    #[error("connector already carries its maximum number of connections")]
    #[diagnostic(code(osmopipe::at_capacity))]
    AtCapacity,

    #[error("the connectors are already linked")]
    #[diagnostic(code(osmopipe::already_linked))]
    AlreadyLinked,

    #[error("connector reference does not resolve")]
    #[diagnostic(code(osmopipe::invalid_reference))]
    InvalidReference,
}

/// The dependency graph contains a cycle.
#[derive(Debug, Clone, Error, Diagnostic)]
#[error("pipeline contains a cycle involving: {}", tasks.join(" -> "))]
#[diagnostic(
    code(osmopipe::loop_detected),
    help("Remove one of the pipe references forming the feedback loop")
)]
pub struct CycleError {
    pub tasks: Vec<String>,
}

/// A parse failure. The whole parse aborts; no partial pipeline is
/// returned.
#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("unknown task '--{task}'")]
    #[diagnostic(
        code(osmopipe::unknown_task),
        help("The task name was not found in the function registry")
    )]
    UnknownTask { task: String },

    #[error("'--{task}' cannot resolve its input stream")]
    #[diagnostic(
        code(osmopipe::unknown_pipe_stream),
        help("Give the tee an explicit inPipe.0 label or place a producing task before it")
    )]
    UnknownPipeStream { task: String },

    #[error("task '--{task}' has no positional parameter to take '{value}'")]
    #[diagnostic(
        code(osmopipe::no_default_parameter),
        help("Write the value as key=value using one of the task's parameter names")
    )]
    NoDefaultParameter { task: String, value: String },

    #[error("unknown parameter '{parameter}' on task '--{task}'")]
    #[diagnostic(code(osmopipe::unknown_parameter))]
    UnknownParameter { task: String, parameter: String },

    #[error("inPipe.{slot} of '--{task}' references pipe '{label}', which no earlier task produced")]
    #[diagnostic(code(osmopipe::missing_counterpart_pipe))]
    MissingCounterpartPipe {
        task: String,
        slot: usize,
        label: String,
    },

    #[error("cannot connect '--{from}' to '--{to}'")]
    #[diagnostic(code(osmopipe::connection_not_permitted))]
    ConnectionNotPermitted {
        from: String,
        to: String,
        #[source]
        reason: ConnectError,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    LoopDetected(#[from] CycleError),

    #[error("input connector {slot} of '--{task}' is not connected")]
    #[diagnostic(
        code(osmopipe::unconnected_input),
        help("Add an inPipe reference, or disable strict input checking")
    )]
    UnconnectedInput { task: String, slot: usize },

    #[error("tee fan-out count '{value}' on '--{task}' is not a number")]
    #[diagnostic(code(osmopipe::invalid_tee_count))]
    InvalidTeeCount { task: String, value: String },
}

/// A serializer fault.
///
/// These indicate a violated graph invariant (a programming error), never
/// bad pipeline text; the serializer aborts instead of emitting malformed
/// output.
#[derive(Debug, Error, Diagnostic)]
pub enum SerializeError {
    #[error("a connection on '--{task}' exists in one direction only")]
    #[diagnostic(
        code(osmopipe::dangling_connection),
        help("This is a defect in graph maintenance, not in the pipeline itself")
    )]
    DanglingConnection { task: String },

    #[error("no serialization order exists; functions still waiting: {}", remaining.join(", "))]
    #[diagnostic(code(osmopipe::serialize_stalled))]
    Stalled { remaining: Vec<String> },
}

/// Main error type for osmopipe
#[derive(Debug, Error, Diagnostic)]
pub enum OsmopipeError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Serialize(#[from] SerializeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Cycle(#[from] CycleError),

    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(osmopipe::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(osmopipe::file_write_error))]
    FileWriteError { path: PathBuf, error: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(osmopipe::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(osmopipe::yaml_error))]
    Yaml { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(osmopipe::toml_error))]
    Toml { message: String },
}

impl From<std::io::Error> for OsmopipeError {
    fn from(e: std::io::Error) -> Self {
        Self::Io {
            message: e.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for OsmopipeError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml {
            message: e.to_string(),
        }
    }
}

impl From<toml::de::Error> for OsmopipeError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml {
            message: e.to_string(),
        }
    }
}
