// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmopipe contributors

//! Pipeline serializer
//!
//! Linearizes a pipeline graph back into command-line text. Functions
//! are emitted in dependency order through a retry round-robin: a
//! function is ready once every upstream peer inside the pipeline has
//! been emitted. An output feeding more than one consumer gets a
//! synthesized tee (or tee-change) line; each consumer then references
//! the tee output matching its position in the producer's peer list.

use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, trace};

use crate::errors::SerializeError;
use crate::pipeline::{ConnectorRef, Direction, FunctionId, Pipeline};
use crate::settings::Settings;

/// Serializer from a [`Pipeline`] to command-line text.
pub struct Serializer<'a> {
    settings: &'a Settings,
}

impl<'a> Serializer<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Serialize the pipeline. The input graph must be acyclic; a graph
    /// whose connections exist in one direction only is a programming
    /// error and aborts the serialization.
    pub fn serialize(&self, pipeline: &Pipeline) -> Result<String, SerializeError> {
        let members: HashSet<FunctionId> = pipeline.functions().iter().map(|f| f.id()).collect();
        let mut queue: VecDeque<FunctionId> =
            pipeline.functions().iter().map(|f| f.id()).collect();
        let mut emitted: HashSet<FunctionId> = HashSet::new();

        // Each emitted output connector gets a monotonically increasing
        // pipe index; fan-out records the first tee output index instead.
        let mut assigned: HashMap<ConnectorRef, usize> = HashMap::new();
        let mut pipe_index = 0usize;

        let mut out = String::new();
        if let Some(path) = self.settings.tool_path.as_deref() {
            if !path.is_empty() {
                out.push_str(&self.quote(path));
            }
        }

        let mut stalled = 0usize;
        while let Some(id) = queue.pop_front() {
            if !self.is_ready(pipeline, id, &members, &emitted) {
                queue.push_back(id);
                stalled += 1;
                // A full pass with no progress means no order exists.
                if stalled > queue.len() {
                    let remaining = queue
                        .iter()
                        .filter_map(|id| pipeline.get(*id))
                        .map(|f| f.name().to_string())
                        .collect();
                    return Err(SerializeError::Stalled { remaining });
                }
                continue;
            }
            stalled = 0;

            self.emit_function(pipeline, id, &members, &mut assigned, &mut pipe_index, &mut out)?;
            emitted.insert(id);
        }

        debug!(functions = pipeline.len(), "serialized pipeline");
        Ok(out)
    }

    /// A function is ready once every peer of every input connector that
    /// belongs to the pipeline has been emitted.
    fn is_ready(
        &self,
        pipeline: &Pipeline,
        id: FunctionId,
        members: &HashSet<FunctionId>,
        emitted: &HashSet<FunctionId>,
    ) -> bool {
        let Some(function) = pipeline.get(id) else {
            return false;
        };
        for conn in function.inputs() {
            for peer in conn.peers() {
                if members.contains(&peer.function) && !emitted.contains(&peer.function) {
                    return false;
                }
            }
        }
        true
    }

    fn emit_function(
        &self,
        pipeline: &Pipeline,
        id: FunctionId,
        members: &HashSet<FunctionId>,
        assigned: &mut HashMap<ConnectorRef, usize>,
        pipe_index: &mut usize,
        out: &mut String,
    ) -> Result<(), SerializeError> {
        let Some(function) = pipeline.get(id) else {
            return Ok(());
        };

        self.append_line_break(out);

        let name = match function.short_name() {
            Some(short) if self.settings.prefer_short_task_names => short,
            _ => function.name(),
        };
        out.push_str("--");
        out.push_str(name);

        for param in function.parameters() {
            if param.is_default() && !self.settings.export_default_parameters {
                continue;
            }
            let Some(value) = param.value() else {
                continue;
            };
            if param.allows_spaces() && param.is_positional() {
                out.push(' ');
                out.push_str(value);
            } else {
                out.push(' ');
                out.push_str(param.name());
                out.push('=');
                out.push_str(&self.quote(value));
            }
        }

        // Inputs reference the peer's assigned index plus this
        // connector's position in the peer's own peer list, which is
        // exactly the matching branch of a synthesized tee.
        for conn in function.inputs() {
            let self_ref = ConnectorRef {
                function: id,
                direction: Direction::In,
                slot: conn.slot(),
            };
            for peer in conn.peers() {
                if !members.contains(&peer.function) {
                    continue;
                }
                let offset = self
                    .member_peers(pipeline, *peer, members)?
                    .iter()
                    .position(|r| *r == self_ref)
                    .ok_or_else(|| SerializeError::DanglingConnection {
                        task: function.name().to_string(),
                    })?;
                let base =
                    assigned
                        .get(peer)
                        .copied()
                        .ok_or_else(|| SerializeError::DanglingConnection {
                            task: function.name().to_string(),
                        })?;
                out.push_str(&format!(" inPipe.{}={}", conn.slot(), base + offset));
            }
        }

        // Outputs take the next pipe index; fan-out adds a tee line whose
        // first output index becomes the recorded index for offsets.
        let mut tee_lines = String::new();
        for conn in function.outputs() {
            *pipe_index += 1;
            out.push_str(&format!(" outPipe.{}={}", conn.slot(), *pipe_index));

            let self_ref = ConnectorRef {
                function: id,
                direction: Direction::Out,
                slot: conn.slot(),
            };
            let fan_out = self.member_peers(pipeline, self_ref, members)?.len();
            if fan_out > 1 {
                assigned.insert(self_ref, *pipe_index + 1);

                self.append_line_break(&mut tee_lines);
                tee_lines.push_str(&format!(
                    "--{} {} inPipe.0={}",
                    conn.kind().tee_task_name(),
                    fan_out,
                    *pipe_index
                ));
                for branch in 0..fan_out {
                    *pipe_index += 1;
                    tee_lines.push_str(&format!(" outPipe.{}={}", branch, *pipe_index));
                }
                trace!(task = %function.name(), fan_out, "synthesized tee");
            } else {
                assigned.insert(self_ref, *pipe_index);
            }
        }
        out.push_str(&tee_lines);

        Ok(())
    }

    /// Peers of a connector restricted to functions in the pipeline, in
    /// peer-list order. Their positions define the tee branch offsets.
    fn member_peers(
        &self,
        pipeline: &Pipeline,
        conn_ref: ConnectorRef,
        members: &HashSet<FunctionId>,
    ) -> Result<Vec<ConnectorRef>, SerializeError> {
        let conn = pipeline
            .connector(conn_ref)
            .ok_or(SerializeError::DanglingConnection {
                task: String::new(),
            })?;
        Ok(conn
            .peers()
            .iter()
            .filter(|p| members.contains(&p.function))
            .copied()
            .collect())
    }

    fn append_line_break(&self, out: &mut String) {
        out.push(' ');
        out.push_str(&self.settings.linebreak_symbol);
        out.push('\n');
    }

    fn quote(&self, value: &str) -> String {
        if value.contains(' ') {
            format!(
                "{q}{value}{q}",
                q = self.settings.quote_char,
                value = value
            )
        } else {
            value.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Pipeline;
    use crate::registry::Registry;

    fn build(tasks: &[&str]) -> (Pipeline, Vec<FunctionId>) {
        let registry = Registry::builtin();
        let mut pipeline = Pipeline::new();
        let ids = tasks
            .iter()
            .map(|t| pipeline.add(registry.lookup(t).expect("builtin task")))
            .collect();
        (pipeline, ids)
    }

    fn serialize(pipeline: &Pipeline) -> String {
        let settings = Settings::default();
        Serializer::new(&settings).serialize(pipeline).unwrap()
    }

    #[test]
    fn test_linear_chain() {
        let (mut p, ids) = build(&["read-xml", "write-xml"]);
        p.get_mut(ids[0])
            .unwrap()
            .parameter_mut("file")
            .unwrap()
            .set_value("a.osm");
        p.get_mut(ids[1])
            .unwrap()
            .parameter_mut("file")
            .unwrap()
            .set_value("b.osm");
        p.connect_functions(ids[0], ids[1]).unwrap();

        let text = serialize(&p);
        assert_eq!(
            text,
            " <linebreak>\n--read-xml file=a.osm outPipe.0=1 \
             <linebreak>\n--write-xml file=b.osm inPipe.0=1"
        );
    }

    #[test]
    fn test_default_parameters_are_skipped() {
        let (p, _) = build(&["read-xml"]);
        let text = serialize(&p);
        assert_eq!(text, " <linebreak>\n--read-xml outPipe.0=1");
    }

    #[test]
    fn test_export_defaults_setting() {
        let (p, _) = build(&["read-xml"]);
        let settings = Settings {
            export_default_parameters: true,
            ..Settings::default()
        };
        let text = Serializer::new(&settings).serialize(&p).unwrap();
        assert!(text.contains("file=dump.osm"));
        assert!(text.contains("enableDateParsing=yes"));
    }

    #[test]
    fn test_short_names_setting() {
        let (p, _) = build(&["read-xml"]);
        let settings = Settings {
            prefer_short_task_names: true,
            ..Settings::default()
        };
        let text = Serializer::new(&settings).serialize(&p).unwrap();
        assert!(text.contains("--rx"));
        assert!(!text.contains("--read-xml"));
    }

    #[test]
    fn test_value_with_spaces_is_quoted() {
        let (mut p, ids) = build(&["read-xml"]);
        p.get_mut(ids[0])
            .unwrap()
            .parameter_mut("file")
            .unwrap()
            .set_value("my dump.osm");
        let text = serialize(&p);
        assert!(text.contains("file=\"my dump.osm\""));
    }

    #[test]
    fn test_tool_path_prefix() {
        let (p, _) = build(&["read-xml"]);
        let settings = Settings {
            tool_path: Some("/opt/osmosis/bin/osmosis".into()),
            ..Settings::default()
        };
        let text = Serializer::new(&settings).serialize(&p).unwrap();
        assert!(text.starts_with("/opt/osmosis/bin/osmosis "));
    }

    #[test]
    fn test_fan_out_synthesizes_tee() {
        let (mut p, ids) = build(&["read-xml", "write-xml", "write-xml", "write-xml"]);
        for consumer in &ids[1..] {
            p.connect_functions(ids[0], *consumer).unwrap();
        }

        let text = serialize(&p);
        assert!(text.contains("--tee 3 inPipe.0=1 outPipe.0=2 outPipe.1=3 outPipe.2=4"));
        // Consumers reference tee branches by their peer-list position.
        assert!(text.contains("--write-xml inPipe.0=2"));
        assert!(text.contains("--write-xml inPipe.0=3"));
        assert!(text.contains("--write-xml inPipe.0=4"));
        // Exactly one tee line.
        assert_eq!(text.matches("--tee ").count(), 1);
    }

    #[test]
    fn test_change_fan_out_uses_tee_change() {
        let (mut p, ids) = build(&["read-xml-change", "write-xml-change", "write-xml-change"]);
        p.connect_functions(ids[0], ids[1]).unwrap();
        p.connect_functions(ids[0], ids[2]).unwrap();

        let text = serialize(&p);
        assert!(text.contains("--tee-change 2 inPipe.0=1"));
    }

    #[test]
    fn test_emission_is_dependency_ordered_not_insertion_ordered() {
        // Consumer added first; producer must still be emitted first.
        let (mut p, ids) = build(&["write-xml", "read-xml"]);
        p.connect_functions(ids[1], ids[0]).unwrap();

        let text = serialize(&p);
        let read_at = text.find("--read-xml").unwrap();
        let write_at = text.find("--write-xml").unwrap();
        assert!(read_at < write_at);
    }

    #[test]
    fn test_cyclic_graph_stalls_with_error() {
        let (mut p, ids) = build(&["sort", "sort"]);
        p.connect_functions(ids[0], ids[1]).unwrap();
        p.connect_functions(ids[1], ids[0]).unwrap();

        let settings = Settings::default();
        let err = Serializer::new(&settings).serialize(&p).unwrap_err();
        assert!(matches!(err, SerializeError::Stalled { remaining } if remaining.len() == 2));
    }

    #[test]
    fn test_embedded_spaces_parameter_is_emitted_bare() {
        let (mut p, ids) = build(&["read-xml", "tag-filter", "write-xml"]);
        p.get_mut(ids[1])
            .unwrap()
            .parameter_mut("filterSpec")
            .unwrap()
            .set_value("accept-ways highway=*");
        p.connect_functions(ids[0], ids[1]).unwrap();
        p.connect_functions(ids[1], ids[2]).unwrap();

        let text = serialize(&p);
        assert!(text.contains("--tag-filter accept-ways highway=* inPipe.0=1 outPipe.0=2"));
    }
}
