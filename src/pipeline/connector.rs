// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmopipe contributors

//! Typed connector endpoints
//!
//! A connector is one typed endpoint (input or output) of a function.
//! Connections are mutual: each side holds a reference to the other, and
//! both sides are updated together by the owning [`Pipeline`](super::Pipeline).

use serde::{Deserialize, Serialize};

use super::FunctionId;

/// Category of data flowing through a pipe.
///
/// Each type fixes how many connections an input or output endpoint of
/// that type may carry. Fan-out on outputs is unbounded here; the textual
/// form expresses it through synthesized tee adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorType {
    /// Full entity streams (nodes, ways, relations).
    Entity,
    /// Change streams (create/modify/delete deltas).
    Change,
}

impl ConnectorType {
    /// Maximum connections on an input endpoint of this type.
    pub const fn max_in(self) -> usize {
        match self {
            Self::Entity => 1,
            Self::Change => 1,
        }
    }

    /// Maximum connections on an output endpoint of this type.
    pub const fn max_out(self) -> usize {
        match self {
            Self::Entity => usize::MAX,
            Self::Change => usize::MAX,
        }
    }

    /// Name of the fan-out adapter task for this stream type.
    pub const fn tee_task_name(self) -> &'static str {
        match self {
            Self::Entity => "tee",
            Self::Change => "tee-change",
        }
    }

    /// Resolve a tee task name back to its stream type.
    pub fn from_tee_task_name(name: &str) -> Option<Self> {
        match name {
            "tee" => Some(Self::Entity),
            "tee-change" => Some(Self::Change),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConnectorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Entity => write!(f, "entity"),
            Self::Change => write!(f, "change"),
        }
    }
}

/// Whether a connector receives or produces a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    In,
    Out,
}

/// Stable address of a connector inside a pipeline arena.
///
/// Connections are stored as pairs of these instead of mutual smart
/// pointers, so the cyclic object graph never owns itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectorRef {
    pub function: FunctionId,
    pub direction: Direction,
    pub slot: usize,
}

/// One typed endpoint of a function.
#[derive(Debug, Clone)]
pub struct Connector {
    kind: ConnectorType,
    direction: Direction,
    slot: usize,
    peers: Vec<ConnectorRef>,
}

impl Connector {
    pub(crate) fn new(kind: ConnectorType, direction: Direction, slot: usize) -> Self {
        Self {
            kind,
            direction,
            slot,
            peers: Vec::new(),
        }
    }

    pub fn kind(&self) -> ConnectorType {
        self.kind
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Position among the owner's connectors of the same direction.
    /// Stable, dense, and used for pipe addressing in the textual form.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Connected peer endpoints, in the order the links were made.
    pub fn peers(&self) -> &[ConnectorRef] {
        &self.peers
    }

    /// Maximum number of peers this endpoint may carry.
    pub fn capacity(&self) -> usize {
        match self.direction {
            Direction::In => self.kind.max_in(),
            Direction::Out => self.kind.max_out(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.peers.len() >= self.capacity()
    }

    pub fn is_linked_to(&self, peer: ConnectorRef) -> bool {
        self.peers.contains(&peer)
    }

    pub(crate) fn add_peer(&mut self, peer: ConnectorRef) {
        self.peers.push(peer);
    }

    pub(crate) fn remove_peer(&mut self, peer: ConnectorRef) -> bool {
        match self.peers.iter().position(|p| *p == peer) {
            Some(idx) => {
                self.peers.remove(idx);
                true
            }
            None => false,
        }
    }

}
