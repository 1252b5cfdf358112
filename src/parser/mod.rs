// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmopipe contributors

//! Command-line parser
//!
//! Builds a pipeline graph from task text. Explicit pipe labels resolve
//! through a label map; unlabeled connections resolve through per-type
//! FIFO queues of still-open outputs, so the oldest matching output is
//! always consumed first. `tee` and `tee-change` are virtual: they shape
//! the label map and the queues but never become graph nodes.

mod tokenizer;

pub use tokenizer::{ParamToken, PipeReference, RawTask, TaskArgument, Tokenizer};

use std::collections::{BTreeMap, HashMap, VecDeque};
use tracing::{debug, trace};

use crate::errors::ParseError;
use crate::pipeline::{ConnectorType, Direction, FunctionId, Pipeline};
use crate::registry::Registry;
use crate::settings::Settings;

/// Transient state of one parse call: the pipe-label bindings and the
/// per-type queues of functions whose latest output has no explicit
/// label yet.
struct ParseState {
    labels: HashMap<String, FunctionId>,
    pending: HashMap<ConnectorType, VecDeque<FunctionId>>,
}

impl ParseState {
    fn new() -> Self {
        let mut pending = HashMap::new();
        for kind in [ConnectorType::Entity, ConnectorType::Change] {
            pending.insert(kind, VecDeque::new());
        }
        Self {
            labels: HashMap::new(),
            pending,
        }
    }

    fn enqueue(&mut self, kind: ConnectorType, id: FunctionId) {
        if let Some(queue) = self.pending.get_mut(&kind) {
            queue.push_back(id);
        }
    }

    fn dequeue(&mut self, kind: ConnectorType) -> Option<FunctionId> {
        self.pending.get_mut(&kind)?.pop_front()
    }
}

/// Parser from command-line text to a [`Pipeline`].
pub struct Parser<'a> {
    registry: &'a Registry,
    settings: &'a Settings,
    tokenizer: Tokenizer,
}

impl<'a> Parser<'a> {
    pub fn new(registry: &'a Registry, settings: &'a Settings) -> Self {
        Self {
            registry,
            settings,
            tokenizer: Tokenizer::new(&settings.linebreak_symbol),
        }
    }

    /// Parse pipeline text into a graph.
    ///
    /// Any failure aborts the whole parse; no partial pipeline is
    /// returned.
    pub fn parse(&self, input: &str) -> Result<Pipeline, ParseError> {
        let mut pipeline = Pipeline::new();
        let mut state = ParseState::new();

        for raw in self.tokenizer.tasks(input) {
            let mut parameters: Vec<ParamToken> = Vec::new();
            let mut in_pipes: BTreeMap<usize, String> = BTreeMap::new();
            let mut out_pipes: BTreeMap<usize, String> = BTreeMap::new();

            for argument in self.tokenizer.scan(&raw.arguments) {
                match argument {
                    TaskArgument::Parameter(p) => parameters.push(p),
                    TaskArgument::Pipe(p) => {
                        match p.direction {
                            Direction::In => in_pipes.insert(p.slot, p.label),
                            Direction::Out => out_pipes.insert(p.slot, p.label),
                        };
                    }
                }
            }

            if let Some(kind) = ConnectorType::from_tee_task_name(&raw.name) {
                self.resolve_tee(&raw, kind, &parameters, &in_pipes, &out_pipes, &mut state)?;
            } else {
                self.resolve_task(
                    &raw,
                    &parameters,
                    &in_pipes,
                    &out_pipes,
                    &mut pipeline,
                    &mut state,
                )?;
            }
        }

        // Implicit resolution alone cannot form a loop; explicit labels
        // can, so validate the finished graph.
        let arrangement = pipeline.arrange().map_err(ParseError::from)?;

        if self.settings.strict_inputs {
            if let Some(open) = arrangement.unconnected.first() {
                let task = pipeline
                    .get(open.function)
                    .map(|f| f.name().to_string())
                    .unwrap_or_default();
                return Err(ParseError::UnconnectedInput {
                    task,
                    slot: open.slot,
                });
            }
        }

        debug!(
            functions = pipeline.len(),
            "parsed pipeline from command line"
        );
        Ok(pipeline)
    }

    /// Handle a `tee`/`tee-change` task. No node is created; the resolved
    /// upstream function is bound to the tee's output labels and
    /// re-enqueued once per unlabeled fan-out slot.
    fn resolve_tee(
        &self,
        raw: &RawTask,
        kind: ConnectorType,
        parameters: &[ParamToken],
        in_pipes: &BTreeMap<usize, String>,
        out_pipes: &BTreeMap<usize, String>,
        state: &mut ParseState,
    ) -> Result<(), ParseError> {
        let mut fan_out = 2usize;
        let count_value = parameters
            .iter()
            .find(|p| p.key.is_none())
            .or_else(|| {
                parameters
                    .iter()
                    .find(|p| p.key.as_deref().is_some_and(|k| k.eq_ignore_ascii_case("outputCount")))
            })
            .map(|p| p.value.as_str());
        if let Some(value) = count_value {
            fan_out = value.parse().map_err(|_| ParseError::InvalidTeeCount {
                task: raw.name.clone(),
                value: value.to_string(),
            })?;
        }

        // Explicit input label first, then the oldest open output of the
        // matching stream type.
        let mut source = None;
        for label in in_pipes.values() {
            source = state.labels.get(label).copied();
        }
        if source.is_none() {
            source = state.dequeue(kind);
        }
        let source = source.ok_or_else(|| ParseError::UnknownPipeStream {
            task: raw.name.clone(),
        })?;

        let mut declared = 0usize;
        for label in out_pipes.values() {
            declared += 1;
            state.labels.insert(label.clone(), source);
            trace!(label = %label, source = %source, "bound tee output label");
        }
        // Remaining fan-out slots become open outputs again, once per
        // slot, which is how an implicit multi-consumer fan-out stays
        // visible to later implicit resolution.
        while declared < fan_out {
            declared += 1;
            state.enqueue(kind, source);
        }

        Ok(())
    }

    /// Handle an ordinary task: instantiate its template, bind
    /// parameters, and wire explicit then implicit connections.
    fn resolve_task(
        &self,
        raw: &RawTask,
        parameters: &[ParamToken],
        in_pipes: &BTreeMap<usize, String>,
        out_pipes: &BTreeMap<usize, String>,
        pipeline: &mut Pipeline,
        state: &mut ParseState,
    ) -> Result<(), ParseError> {
        let template = self
            .registry
            .lookup(&raw.name)
            .ok_or_else(|| ParseError::UnknownTask {
                task: raw.name.clone(),
            })?;
        let id = pipeline.add(template);
        debug!(task = %raw.name, id = %id, "instantiated task");

        self.bind_parameters(raw, parameters, id, pipeline)?;

        // Explicit inputs resolve through the label map.
        for (&slot, label) in in_pipes {
            let source = state.labels.get(label).copied().ok_or_else(|| {
                ParseError::MissingCounterpartPipe {
                    task: raw.name.clone(),
                    slot,
                    label: label.clone(),
                }
            })?;
            self.connect(pipeline, source, id, slot)?;
        }

        // Inputs without an explicit reference take the oldest open
        // output of their type; an empty queue is not a parse error
        // unless strict checking is on (the arrange step reports it).
        let implicit_slots: Vec<(usize, ConnectorType)> = pipeline
            .get(id)
            .into_iter()
            .flat_map(|f| f.inputs())
            .filter(|c| !in_pipes.contains_key(&c.slot()))
            .map(|c| (c.slot(), c.kind()))
            .collect();
        for (slot, kind) in implicit_slots {
            if let Some(source) = state.dequeue(kind) {
                self.connect(pipeline, source, id, slot)?;
                trace!(task = %raw.name, slot, source = %source, "implicit connection");
            }
        }

        // Explicit output labels bind to this function; unlabeled
        // outputs join the open queue of their type.
        for label in out_pipes.values() {
            state.labels.insert(label.clone(), id);
        }
        let open_outputs: Vec<ConnectorType> = pipeline
            .get(id)
            .into_iter()
            .flat_map(|f| f.outputs())
            .filter(|c| !out_pipes.contains_key(&c.slot()))
            .map(|c| c.kind())
            .collect();
        for kind in open_outputs {
            state.enqueue(kind, id);
        }

        Ok(())
    }

    fn bind_parameters(
        &self,
        raw: &RawTask,
        parameters: &[ParamToken],
        id: FunctionId,
        pipeline: &mut Pipeline,
    ) -> Result<(), ParseError> {
        let Some(function) = pipeline.get_mut(id) else {
            return Ok(());
        };

        // A template with an embedded-spaces parameter takes the whole
        // parameter text up to the first pipe keyword, verbatim.
        let spaces_value = function
            .spaces_parameter_mut()
            .is_some()
            .then(|| self.tokenizer.spaces_prefix(&raw.arguments).to_string());
        if let Some(value) = spaces_value {
            if let Some(param) = function.spaces_parameter_mut() {
                param.set_value(value);
            }
            return Ok(());
        }

        for token in parameters {
            match &token.key {
                Some(key) => {
                    let Some(param) = function.parameter_mut(key) else {
                        return Err(ParseError::UnknownParameter {
                            task: raw.name.clone(),
                            parameter: key.clone(),
                        });
                    };
                    param.set_value(token.value.clone());
                }
                None => {
                    let Some(param) = function.positional_parameter_mut() else {
                        return Err(ParseError::NoDefaultParameter {
                            task: raw.name.clone(),
                            value: token.value.clone(),
                        });
                    };
                    param.set_value(token.value.clone());
                }
            }
        }
        Ok(())
    }

    fn connect(
        &self,
        pipeline: &mut Pipeline,
        from: FunctionId,
        to: FunctionId,
        slot: usize,
    ) -> Result<(), ParseError> {
        pipeline
            .connect_into_slot(from, to, slot)
            .map_err(|reason| ParseError::ConnectionNotPermitted {
                from: pipeline
                    .get(from)
                    .map(|f| f.name().to_string())
                    .unwrap_or_default(),
                to: pipeline
                    .get(to)
                    .map(|f| f.name().to_string())
                    .unwrap_or_default(),
                reason,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ConnectError;

    fn parse(input: &str) -> Result<Pipeline, ParseError> {
        let registry = Registry::builtin();
        let settings = Settings::default();
        Parser::new(&registry, &settings).parse(input)
    }

    fn connection_exists(p: &Pipeline, from: usize, to: usize) -> bool {
        let from_id = p.functions()[from].id();
        let to_id = p.functions()[to].id();
        p.functions()[from]
            .outputs()
            .iter()
            .any(|c| c.peers().iter().any(|r| r.function == to_id))
            && p.functions()[to]
                .inputs()
                .iter()
                .any(|c| c.peers().iter().any(|r| r.function == from_id))
    }

    #[test]
    fn test_explicit_pipe_connection() {
        let p = parse("--read-xml file=a.osm outPipe.0=x --write-xml inPipe.0=x file=b.osm")
            .unwrap();
        assert_eq!(p.len(), 2);
        assert_eq!(p.functions()[0].name(), "read-xml");
        assert_eq!(p.functions()[1].name(), "write-xml");
        assert!(connection_exists(&p, 0, 1));
        assert_eq!(
            p.functions()[1].parameter("file").unwrap().value(),
            Some("b.osm")
        );
    }

    #[test]
    fn test_implicit_connection() {
        let p = parse("--read-xml file=a.osm --write-xml file=b.osm").unwrap();
        assert!(connection_exists(&p, 0, 1));
    }

    #[test]
    fn test_implicit_resolution_is_fifo() {
        // Outputs opened in order A then B: the next unlabeled input of
        // that type must take A.
        let p = parse(
            "--read-xml file=a.osm --read-xml file=b.osm \
             --write-xml file=out1.osm --write-xml file=out2.osm",
        )
        .unwrap();
        assert!(connection_exists(&p, 0, 2));
        assert!(connection_exists(&p, 1, 3));
        assert!(!connection_exists(&p, 1, 2));
    }

    #[test]
    fn test_positional_parameter_binds_to_default_slot() {
        let p = parse("--read-xml a.osm --sort TypeThenId --write-xml b.osm").unwrap();
        assert_eq!(
            p.functions()[1].parameter("type").unwrap().value(),
            Some("TypeThenId")
        );
        assert!(!p.functions()[1].parameter("type").unwrap().is_default());
    }

    #[test]
    fn test_parameter_keys_bind_case_insensitively() {
        let p = parse("--read-xml FILE=a.osm").unwrap();
        assert_eq!(
            p.functions()[0].parameter("file").unwrap().value(),
            Some("a.osm")
        );
    }

    #[test]
    fn test_unknown_task() {
        let err = parse("--frobnicate file=a.osm").unwrap_err();
        assert!(matches!(err, ParseError::UnknownTask { task } if task == "frobnicate"));
    }

    #[test]
    fn test_unknown_parameter() {
        let err = parse("--read-xml speed=11").unwrap_err();
        assert!(
            matches!(err, ParseError::UnknownParameter { parameter, .. } if parameter == "speed")
        );
    }

    #[test]
    fn test_no_default_parameter() {
        let err = parse("--derive-change something").unwrap_err();
        assert!(matches!(err, ParseError::NoDefaultParameter { .. }));
    }

    #[test]
    fn test_missing_counterpart_pipe() {
        let err = parse("--write-xml inPipe.0=ghost file=b.osm").unwrap_err();
        assert!(
            matches!(err, ParseError::MissingCounterpartPipe { label, .. } if label == "ghost")
        );
    }

    #[test]
    fn test_connection_type_mismatch() {
        let err = parse("--read-xml outPipe.0=x --write-xml-change inPipe.0=x").unwrap_err();
        assert!(matches!(
            err,
            ParseError::ConnectionNotPermitted {
                reason: ConnectError::TypeMismatch,
                ..
            }
        ));
    }

    #[test]
    fn test_tee_with_explicit_labels() {
        let p = parse(
            "--read-xml file=a.osm outPipe.0=1 \
             --tee 2 inPipe.0=1 outPipe.0=2 outPipe.1=3 \
             --write-xml inPipe.0=2 file=b.osm \
             --write-xml inPipe.0=3 file=c.osm",
        )
        .unwrap();
        // The tee is virtual: three real functions, fan-out on read-xml.
        assert_eq!(p.len(), 3);
        assert!(connection_exists(&p, 0, 1));
        assert!(connection_exists(&p, 0, 2));
        assert_eq!(p.functions()[0].outputs()[0].peers().len(), 2);
    }

    #[test]
    fn test_tee_with_implicit_fan_out() {
        let p = parse(
            "--read-xml file=a.osm --tee 2 \
             --write-xml file=b.osm --write-xml file=c.osm",
        )
        .unwrap();
        assert_eq!(p.len(), 3);
        assert!(connection_exists(&p, 0, 1));
        assert!(connection_exists(&p, 0, 2));
    }

    #[test]
    fn test_tee_output_count_parameter() {
        let p = parse(
            "--read-xml file=a.osm --tee outputCount=3 \
             --write-xml --write-xml --write-xml",
        )
        .unwrap();
        assert_eq!(p.functions()[0].outputs()[0].peers().len(), 3);
    }

    #[test]
    fn test_tee_change_uses_change_queue() {
        let p = parse(
            "--read-xml-change file=a.osc --tee-change 2 \
             --write-xml-change file=b.osc --write-xml-change file=c.osc",
        )
        .unwrap();
        assert!(connection_exists(&p, 0, 1));
        assert!(connection_exists(&p, 0, 2));
    }

    #[test]
    fn test_tee_without_source_fails() {
        let err = parse("--tee 2").unwrap_err();
        assert!(matches!(err, ParseError::UnknownPipeStream { task } if task == "tee"));
    }

    #[test]
    fn test_tee_with_bad_count_fails() {
        let err = parse("--read-xml file=a.osm --tee lots").unwrap_err();
        assert!(matches!(err, ParseError::InvalidTeeCount { value, .. } if value == "lots"));
    }

    #[test]
    fn test_embedded_spaces_parameter_takes_text_verbatim() {
        let p = parse("--read-xml file=a.osm --tag-filter accept-ways highway=* --write-xml")
            .unwrap();
        assert_eq!(
            p.functions()[1].parameter("filterSpec").unwrap().value(),
            Some("accept-ways highway=*")
        );
        assert!(connection_exists(&p, 0, 1));
        assert!(connection_exists(&p, 1, 2));
    }

    #[test]
    fn test_unconnected_input_is_silent_by_default() {
        let p = parse("--write-xml file=b.osm").unwrap();
        let arrangement = p.arrange().unwrap();
        assert_eq!(arrangement.unconnected.len(), 1);
    }

    #[test]
    fn test_strict_inputs_rejects_unconnected() {
        let registry = Registry::builtin();
        let settings = Settings {
            strict_inputs: true,
            ..Settings::default()
        };
        let err = Parser::new(&registry, &settings)
            .parse("--write-xml file=b.osm")
            .unwrap_err();
        assert!(matches!(err, ParseError::UnconnectedInput { slot: 0, .. }));
    }

    #[test]
    fn test_short_names_resolve() {
        let p = parse("--rx a.osm --wx b.osm").unwrap();
        assert_eq!(p.functions()[0].name(), "read-xml");
        assert!(connection_exists(&p, 0, 1));
    }

    #[test]
    fn test_label_rebinding_uses_latest_producer() {
        let p = parse(
            "--read-xml a.osm outPipe.0=x --read-xml b.osm outPipe.0=x \
             --write-xml inPipe.0=x c.osm",
        )
        .unwrap();
        assert!(connection_exists(&p, 1, 2));
        assert!(!connection_exists(&p, 0, 2));
    }

    #[test]
    fn test_two_input_task_mixes_explicit_and_implicit() {
        let p = parse(
            "--read-xml a.osm outPipe.0=x --read-xml b.osm \
             --merge inPipe.0=x --write-xml out.osm",
        )
        .unwrap();
        assert!(connection_exists(&p, 0, 2));
        assert!(connection_exists(&p, 1, 2));
        assert!(connection_exists(&p, 2, 3));
    }
}
