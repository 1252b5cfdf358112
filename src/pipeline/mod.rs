// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmopipe contributors

//! Pipeline graph model
//!
//! Functions joined by typed, capacity-limited connectors, held in an
//! arena indexed by stable function ids.

mod connector;
mod function;
mod graph;

pub use connector::{Connector, ConnectorRef, ConnectorType, Direction};
pub use function::{Function, Parameter};
pub use graph::{Arrangement, FunctionId, Pipeline};
