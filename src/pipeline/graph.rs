// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmopipe contributors

//! Pipeline arena and graph operations
//!
//! Holds the ordered collection of functions, wires connectors together,
//! and validates that the induced dependency graph stays acyclic.
//! Connections are id pairs kept in sync on both endpoints; a rejected
//! connect leaves both sides untouched.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use crate::errors::{ConnectError, CycleError};
use crate::registry::FunctionTemplate;

use super::{Connector, ConnectorRef, Direction, Function};

/// Stable identifier of a function within one [`Pipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub(crate) usize);

impl std::fmt::Display for FunctionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// Result of [`Pipeline::arrange`]: a dependency-respecting order plus the
/// input connectors that remain unconnected.
#[derive(Debug, Clone)]
pub struct Arrangement {
    /// Functions in topological order.
    pub order: Vec<FunctionId>,
    /// Input connectors with no peer. Structurally suspect, but not an
    /// error at this level; callers decide how strict to be.
    pub unconnected: Vec<ConnectorRef>,
}

/// An ordered collection of functions forming a DAG through connectors.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    functions: Vec<Function>,
    next_id: usize,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiate a function from a template and append it.
    pub fn add(&mut self, template: &FunctionTemplate) -> FunctionId {
        let id = FunctionId(self.next_id);
        self.next_id += 1;
        self.functions.push(Function::from_template(id, template));
        id
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn get(&self, id: FunctionId) -> Option<&Function> {
        self.functions.iter().find(|f| f.id() == id)
    }

    pub fn get_mut(&mut self, id: FunctionId) -> Option<&mut Function> {
        self.functions.iter_mut().find(|f| f.id() == id)
    }

    pub fn contains(&self, id: FunctionId) -> bool {
        self.get(id).is_some()
    }

    /// Position of a function in pipeline order.
    pub fn index_of(&self, id: FunctionId) -> Option<usize> {
        self.functions.iter().position(|f| f.id() == id)
    }

    /// Resolve a connector reference.
    pub fn connector(&self, r: ConnectorRef) -> Option<&Connector> {
        self.get(r.function)?.connector(r.direction, r.slot)
    }

    /// Link an output connector to an input connector.
    ///
    /// Both endpoints are validated before either is touched: the
    /// directions must be out-to-in, the stream types must match, neither
    /// side may be at capacity, and the link must not already exist.
    pub fn connect(&mut self, from: ConnectorRef, to: ConnectorRef) -> Result<(), ConnectError> {
        if from.direction != Direction::Out || to.direction != Direction::In {
            return Err(ConnectError::InvalidReference);
        }
        let out_conn = self.connector(from).ok_or(ConnectError::InvalidReference)?;
        let in_conn = self.connector(to).ok_or(ConnectError::InvalidReference)?;

        if out_conn.kind() != in_conn.kind() {
            return Err(ConnectError::TypeMismatch);
        }
        if out_conn.is_linked_to(to) || in_conn.is_linked_to(from) {
            return Err(ConnectError::AlreadyLinked);
        }
        if out_conn.is_full() || in_conn.is_full() {
            return Err(ConnectError::AtCapacity);
        }

        self.connector_mut(from)
            .ok_or(ConnectError::InvalidReference)?
            .add_peer(to);
        self.connector_mut(to)
            .ok_or(ConnectError::InvalidReference)?
            .add_peer(from);
        Ok(())
    }

    /// Connect an upstream function into a specific input slot of a
    /// downstream function, picking the first free upstream output of the
    /// matching stream type.
    pub fn connect_into_slot(
        &mut self,
        from: FunctionId,
        to: FunctionId,
        slot: usize,
    ) -> Result<(), ConnectError> {
        let in_ref = ConnectorRef {
            function: to,
            direction: Direction::In,
            slot,
        };
        let in_kind = self
            .connector(in_ref)
            .ok_or(ConnectError::InvalidReference)?
            .kind();

        let source = self.get(from).ok_or(ConnectError::InvalidReference)?;
        let mut saw_kind = false;
        let mut out_slot = None;
        for conn in source.outputs() {
            if conn.kind() != in_kind {
                continue;
            }
            saw_kind = true;
            if conn.is_full() || conn.is_linked_to(in_ref) {
                continue;
            }
            out_slot = Some(conn.slot());
            break;
        }
        let out_slot = match (out_slot, saw_kind) {
            (Some(s), _) => s,
            (None, true) => return Err(ConnectError::AtCapacity),
            (None, false) => return Err(ConnectError::TypeMismatch),
        };

        self.connect(
            ConnectorRef {
                function: from,
                direction: Direction::Out,
                slot: out_slot,
            },
            in_ref,
        )
    }

    /// Connect two functions through their first compatible connector pair.
    pub fn connect_functions(
        &mut self,
        from: FunctionId,
        to: FunctionId,
    ) -> Result<(), ConnectError> {
        let slots: Vec<usize> = self
            .get(to)
            .ok_or(ConnectError::InvalidReference)?
            .inputs()
            .iter()
            .map(|c| c.slot())
            .collect();

        let mut last_err = ConnectError::TypeMismatch;
        for slot in slots {
            match self.connect_into_slot(from, to, slot) {
                Ok(()) => return Ok(()),
                Err(e) => last_err = e,
            }
        }
        Err(last_err)
    }

    /// Remove the link between two connectors. Returns false if no such
    /// link existed; both sides stay consistent either way.
    pub fn disconnect(&mut self, from: ConnectorRef, to: ConnectorRef) -> bool {
        let forward = self
            .connector_mut(from)
            .map(|c| c.remove_peer(to))
            .unwrap_or(false);
        let backward = self
            .connector_mut(to)
            .map(|c| c.remove_peer(from))
            .unwrap_or(false);
        forward && backward
    }

    /// Remove a function, unlinking all its connections first.
    pub fn remove_function(&mut self, id: FunctionId) -> Option<Function> {
        let idx = self.index_of(id)?;

        // Gather (self_ref, peer_ref) pairs before mutating.
        let mut links: Vec<(ConnectorRef, ConnectorRef)> = Vec::new();
        for conn in self.functions[idx]
            .inputs()
            .iter()
            .chain(self.functions[idx].outputs().iter())
        {
            let self_ref = ConnectorRef {
                function: id,
                direction: conn.direction(),
                slot: conn.slot(),
            };
            for peer in conn.peers() {
                links.push((self_ref, *peer));
            }
        }
        for (self_ref, peer) in links {
            if let Some(c) = self.connector_mut(peer) {
                c.remove_peer(self_ref);
            }
            if let Some(c) = self.connector_mut(self_ref) {
                c.remove_peer(peer);
            }
        }

        Some(self.functions.remove(idx))
    }

    /// Validate and order the pipeline: the dependency graph induced by
    /// connector links must be acyclic. Also reports input connectors
    /// that remain unconnected.
    pub fn arrange(&self) -> Result<Arrangement, CycleError> {
        let (graph, node_to_id) = self.dependency_graph();

        let order = toposort(&graph, None).map_err(|cycle| CycleError {
            tasks: self.cycle_members(&graph, &node_to_id, cycle.node_id()),
        })?;

        let mut unconnected = Vec::new();
        for f in &self.functions {
            for conn in f.inputs() {
                if conn.peers().is_empty() {
                    unconnected.push(ConnectorRef {
                        function: f.id(),
                        direction: Direction::In,
                        slot: conn.slot(),
                    });
                }
            }
        }

        Ok(Arrangement {
            order: order.into_iter().map(|n| graph[n]).collect(),
            unconnected,
        })
    }

    /// Generate a DOT rendering of the dependency graph.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph pipeline {\n");
        out.push_str("    rankdir=TB;\n");
        out.push_str("    node [shape=box, style=rounded];\n\n");

        for f in &self.functions {
            out.push_str(&format!("    {} [label=\"{}\"];\n", f.id(), f.name()));
        }
        for (from, to, kind) in self.edges() {
            out.push_str(&format!("    {} -> {} [label=\"{}\"];\n", from, to, kind));
        }

        out.push_str("}\n");
        out
    }

    /// Generate a Mermaid rendering of the dependency graph.
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");

        for f in &self.functions {
            out.push_str(&format!("    {}[{}]\n", f.id(), f.name()));
        }
        for (from, to, kind) in self.edges() {
            out.push_str(&format!("    {} -->|{}| {}\n", from, kind, to));
        }

        out
    }

    fn edges(&self) -> Vec<(FunctionId, FunctionId, super::ConnectorType)> {
        let mut edges = Vec::new();
        for f in &self.functions {
            for conn in f.outputs() {
                for peer in conn.peers() {
                    edges.push((f.id(), peer.function, conn.kind()));
                }
            }
        }
        edges
    }

    fn connector_mut(&mut self, r: ConnectorRef) -> Option<&mut Connector> {
        self.get_mut(r.function)?.connector_mut(r.direction, r.slot)
    }

    fn dependency_graph(&self) -> (DiGraph<FunctionId, ()>, HashMap<NodeIndex, FunctionId>) {
        let mut graph = DiGraph::new();
        let mut id_to_node = HashMap::new();
        let mut node_to_id = HashMap::new();

        for f in &self.functions {
            let node = graph.add_node(f.id());
            id_to_node.insert(f.id(), node);
            node_to_id.insert(node, f.id());
        }
        for f in &self.functions {
            let src = id_to_node[&f.id()];
            for conn in f.outputs() {
                for peer in conn.peers() {
                    // Links to functions outside the pipeline carry no
                    // dependency here.
                    if let Some(&dst) = id_to_node.get(&peer.function) {
                        if !graph.contains_edge(src, dst) {
                            graph.add_edge(src, dst, ());
                        }
                    }
                }
            }
        }

        (graph, node_to_id)
    }

    fn cycle_members(
        &self,
        graph: &DiGraph<FunctionId, ()>,
        node_to_id: &HashMap<NodeIndex, FunctionId>,
        start: NodeIndex,
    ) -> Vec<String> {
        use petgraph::visit::{depth_first_search, Control, DfsEvent};

        let mut members = Vec::new();
        depth_first_search(graph, Some(start), |event| {
            if let DfsEvent::Discover(node, _) = event {
                if let Some(name) = node_to_id
                    .get(&node)
                    .and_then(|id| self.get(*id))
                    .map(|f| f.name().to_string())
                {
                    if members.contains(&name) {
                        return Control::Break(());
                    }
                    members.push(name);
                }
            }
            Control::<()>::Continue
        });
        members
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    fn chain(tasks: &[&str]) -> (Pipeline, Vec<FunctionId>) {
        let registry = Registry::builtin();
        let mut pipeline = Pipeline::new();
        let ids: Vec<FunctionId> = tasks
            .iter()
            .map(|t| pipeline.add(registry.lookup(t).expect("builtin task")))
            .collect();
        (pipeline, ids)
    }

    #[test]
    fn test_connect_and_arrange_linear() {
        let (mut p, ids) = chain(&["read-xml", "sort", "write-xml"]);
        p.connect_functions(ids[0], ids[1]).unwrap();
        p.connect_functions(ids[1], ids[2]).unwrap();

        let arrangement = p.arrange().unwrap();
        assert_eq!(arrangement.order, ids);
        assert!(arrangement.unconnected.is_empty());
    }

    #[test]
    fn test_connect_type_mismatch() {
        let (mut p, ids) = chain(&["read-xml", "write-xml-change"]);
        let err = p.connect_functions(ids[0], ids[1]).unwrap_err();
        assert_eq!(err, ConnectError::TypeMismatch);
        assert!(p.get(ids[1]).unwrap().inputs()[0].peers().is_empty());
    }

    #[test]
    fn test_input_capacity_enforced() {
        let (mut p, ids) = chain(&["read-xml", "read-xml", "write-xml"]);
        p.connect_functions(ids[0], ids[2]).unwrap();
        let err = p.connect_functions(ids[1], ids[2]).unwrap_err();
        assert_eq!(err, ConnectError::AtCapacity);
        // Rejection left both sides unchanged.
        assert!(p.get(ids[1]).unwrap().outputs()[0].peers().is_empty());
        assert_eq!(p.get(ids[2]).unwrap().inputs()[0].peers().len(), 1);
    }

    #[test]
    fn test_duplicate_link_rejected() {
        let (mut p, ids) = chain(&["read-xml", "merge"]);
        p.connect_into_slot(ids[0], ids[1], 0).unwrap();
        let err = p.connect_into_slot(ids[0], ids[1], 0).unwrap_err();
        assert_eq!(err, ConnectError::AtCapacity);
    }

    #[test]
    fn test_fan_out_from_single_output() {
        let (mut p, ids) = chain(&["read-xml", "write-xml", "write-xml", "write-xml"]);
        for consumer in &ids[1..] {
            p.connect_functions(ids[0], *consumer).unwrap();
        }
        let peers = p.get(ids[0]).unwrap().outputs()[0].peers();
        assert_eq!(peers.len(), 3);
    }

    #[test]
    fn test_cycle_detected() {
        let (mut p, ids) = chain(&["sort", "sort"]);
        p.connect_functions(ids[0], ids[1]).unwrap();
        p.connect_functions(ids[1], ids[0]).unwrap();

        let err = p.arrange().unwrap_err();
        assert_eq!(err.tasks.len(), 2);
    }

    #[test]
    fn test_disconnect_restores_capacity() {
        let (mut p, ids) = chain(&["read-xml", "write-xml"]);
        p.connect_functions(ids[0], ids[1]).unwrap();

        let out_ref = ConnectorRef {
            function: ids[0],
            direction: Direction::Out,
            slot: 0,
        };
        let in_ref = ConnectorRef {
            function: ids[1],
            direction: Direction::In,
            slot: 0,
        };
        assert!(p.disconnect(out_ref, in_ref));
        assert!(!p.disconnect(out_ref, in_ref));
        p.connect(out_ref, in_ref).unwrap();
    }

    #[test]
    fn test_remove_function_unlinks_peers() {
        let (mut p, ids) = chain(&["read-xml", "sort", "write-xml"]);
        p.connect_functions(ids[0], ids[1]).unwrap();
        p.connect_functions(ids[1], ids[2]).unwrap();

        p.remove_function(ids[1]).unwrap();
        assert_eq!(p.len(), 2);
        assert!(p.get(ids[0]).unwrap().outputs()[0].peers().is_empty());
        assert!(p.get(ids[2]).unwrap().inputs()[0].peers().is_empty());
    }

    #[test]
    fn test_arrange_reports_unconnected_inputs() {
        let (p, ids) = chain(&["write-xml"]);
        let arrangement = p.arrange().unwrap();
        assert_eq!(arrangement.unconnected.len(), 1);
        assert_eq!(arrangement.unconnected[0].function, ids[0]);
    }

    #[test]
    fn test_dot_output_names_edges() {
        let (mut p, ids) = chain(&["read-xml", "write-xml"]);
        p.connect_functions(ids[0], ids[1]).unwrap();

        let dot = p.to_dot();
        assert!(dot.contains("digraph pipeline"));
        assert!(dot.contains("label=\"read-xml\""));
        assert!(dot.contains("[label=\"entity\"]"));
    }
}
