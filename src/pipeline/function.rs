// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmopipe contributors

//! Function nodes and their parameters
//!
//! A function wraps one task invocation: its canonical name, optional
//! short name, ordered parameters, and the typed connectors through which
//! it joins the rest of the graph.

use super::{Connector, Direction, FunctionId};
use crate::registry::FunctionTemplate;

/// One parameter of a function.
///
/// Tracks the template default separately from the user-assigned value,
/// so the serializer can skip parameters still at their default.
#[derive(Debug, Clone)]
pub struct Parameter {
    name: String,
    value: Option<String>,
    default_value: Option<String>,
    positional: bool,
    allows_spaces: bool,
}

impl Parameter {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The effective value: the user-assigned value, or the template default.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref().or(self.default_value.as_deref())
    }

    /// True while no value has been assigned by the user.
    pub fn is_default(&self) -> bool {
        self.value.is_none()
    }

    /// Whether this parameter occupies the unlabeled slot in text form.
    pub fn is_positional(&self) -> bool {
        self.positional
    }

    /// Whether this parameter consumes the remainder of the task's
    /// parameter text verbatim instead of being tokenized.
    pub fn allows_spaces(&self) -> bool {
        self.allows_spaces
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = Some(value.into());
    }

    /// Drop the user-assigned value, reverting to the template default.
    pub fn reset(&mut self) {
        self.value = None;
    }
}

/// A node in the pipeline graph: one task invocation.
#[derive(Debug, Clone)]
pub struct Function {
    id: FunctionId,
    name: String,
    short_name: Option<String>,
    parameters: Vec<Parameter>,
    inputs: Vec<Connector>,
    outputs: Vec<Connector>,
}

impl Function {
    pub(crate) fn from_template(id: FunctionId, template: &FunctionTemplate) -> Self {
        let parameters = template
            .parameters
            .iter()
            .map(|spec| Parameter {
                name: spec.name.clone(),
                value: None,
                default_value: spec.default.clone(),
                positional: spec.positional,
                allows_spaces: spec.allows_spaces,
            })
            .collect();

        let inputs = template
            .inputs
            .iter()
            .enumerate()
            .map(|(slot, kind)| Connector::new(*kind, Direction::In, slot))
            .collect();
        let outputs = template
            .outputs
            .iter()
            .enumerate()
            .map(|(slot, kind)| Connector::new(*kind, Direction::Out, slot))
            .collect();

        Self {
            id,
            name: template.name.clone(),
            short_name: template.short_name.clone(),
            parameters,
            inputs,
            outputs,
        }
    }

    pub fn id(&self) -> FunctionId {
        self.id
    }

    /// Canonical task name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn short_name(&self) -> Option<&str> {
        self.short_name.as_deref()
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Case-insensitive parameter lookup.
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn parameter_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.parameters
            .iter_mut()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// The parameter taking the unlabeled value in text form, if any.
    pub fn positional_parameter_mut(&mut self) -> Option<&mut Parameter> {
        self.parameters.iter_mut().find(|p| p.positional)
    }

    /// The parameter consuming embedded-space text verbatim, if any.
    pub fn spaces_parameter_mut(&mut self) -> Option<&mut Parameter> {
        self.parameters.iter_mut().find(|p| p.allows_spaces)
    }

    pub fn inputs(&self) -> &[Connector] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Connector] {
        &self.outputs
    }

    pub(crate) fn connector(&self, direction: Direction, slot: usize) -> Option<&Connector> {
        match direction {
            Direction::In => self.inputs.get(slot),
            Direction::Out => self.outputs.get(slot),
        }
    }

    pub(crate) fn connector_mut(
        &mut self,
        direction: Direction,
        slot: usize,
    ) -> Option<&mut Connector> {
        match direction {
            Direction::In => self.inputs.get_mut(slot),
            Direction::Out => self.outputs.get_mut(slot),
        }
    }

}
