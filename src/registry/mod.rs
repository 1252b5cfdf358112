// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmopipe contributors

//! Function template registry
//!
//! Maps task names to function templates. Ships with a built-in catalog
//! of Osmosis tasks and accepts YAML extension files that add or override
//! templates.

mod builtin;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::errors::OsmopipeError;
use crate::pipeline::ConnectorType;

/// Specification of one template parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,

    /// Default value carried when the user sets nothing.
    #[serde(default)]
    pub default: Option<String>,

    /// Occupies the unlabeled slot in text form.
    #[serde(default)]
    pub positional: bool,

    /// Consumes the remainder of the task's parameter text verbatim.
    #[serde(default)]
    pub allows_spaces: bool,
}

/// Prototype of a function: everything needed to instantiate a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionTemplate {
    pub name: String,

    #[serde(default)]
    pub short_name: Option<String>,

    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,

    /// Stream types of the input connectors, in slot order.
    #[serde(default)]
    pub inputs: Vec<ConnectorType>,

    /// Stream types of the output connectors, in slot order.
    #[serde(default)]
    pub outputs: Vec<ConnectorType>,
}

/// Schema of a registry extension file.
#[derive(Debug, Deserialize)]
struct RegistryFile {
    tasks: Vec<FunctionTemplate>,
}

/// Task-name to template lookup, case-insensitive over full and short
/// names.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    templates: Vec<FunctionTemplate>,
    by_name: HashMap<String, usize>,
}

impl Registry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in Osmosis task catalog.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for template in builtin::templates() {
            registry.register(template);
        }
        registry
    }

    /// Add a template, replacing any existing one with the same name.
    pub fn register(&mut self, template: FunctionTemplate) {
        let idx = match self.by_name.get(&template.name.to_lowercase()) {
            Some(&existing) => {
                self.templates[existing] = template;
                existing
            }
            None => {
                self.templates.push(template);
                self.templates.len() - 1
            }
        };

        let template = &self.templates[idx];
        self.by_name.insert(template.name.to_lowercase(), idx);
        if let Some(short) = &template.short_name {
            self.by_name.insert(short.to_lowercase(), idx);
        }
    }

    /// Look up a template by full or short task name.
    pub fn lookup(&self, task_name: &str) -> Option<&FunctionTemplate> {
        self.by_name
            .get(&task_name.to_lowercase())
            .map(|&idx| &self.templates[idx])
    }

    /// All registered templates, in registration order.
    pub fn templates(&self) -> &[FunctionTemplate] {
        &self.templates
    }

    /// Merge templates from a YAML extension file over this registry.
    pub fn merge_file(&mut self, path: &Path) -> Result<(), OsmopipeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| OsmopipeError::FileReadError {
                path: path.to_path_buf(),
                error: e.to_string(),
            })?;
        let file: RegistryFile = serde_yaml::from_str(&content)?;
        for template in file.tasks {
            self.register(template);
        }
        Ok(())
    }

    /// Built-in catalog with an extension file merged on top.
    pub fn from_file(path: &Path) -> Result<Self, OsmopipeError> {
        let mut registry = Self::builtin();
        registry.merge_file(path)?;
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_full_name() {
        let registry = Registry::builtin();
        let t = registry.lookup("read-xml").unwrap();
        assert_eq!(t.outputs, vec![ConnectorType::Entity]);
    }

    #[test]
    fn test_lookup_by_short_name() {
        let registry = Registry::builtin();
        assert_eq!(registry.lookup("rx").unwrap().name, "read-xml");
        assert_eq!(registry.lookup("wx").unwrap().name, "write-xml");
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = Registry::builtin();
        assert!(registry.lookup("Read-XML").is_some());
        assert!(registry.lookup("SORT").is_some());
    }

    #[test]
    fn test_tee_is_not_a_template() {
        // tee and tee-change are virtual adapters handled by the parser,
        // never materialized as functions.
        let registry = Registry::builtin();
        assert!(registry.lookup("tee").is_none());
        assert!(registry.lookup("tee-change").is_none());
    }

    #[test]
    fn test_register_overrides_by_name() {
        let mut registry = Registry::builtin();
        registry.register(FunctionTemplate {
            name: "read-xml".into(),
            short_name: Some("rx".into()),
            parameters: vec![],
            inputs: vec![],
            outputs: vec![ConnectorType::Change],
        });
        assert_eq!(
            registry.lookup("read-xml").unwrap().outputs,
            vec![ConnectorType::Change]
        );
    }

    #[test]
    fn test_merge_yaml_file() {
        let yaml = r#"
tasks:
  - name: my-filter
    short_name: mf
    parameters:
      - name: expression
        positional: true
    inputs: [entity]
    outputs: [entity]
"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.yaml");
        std::fs::write(&path, yaml).unwrap();

        let registry = Registry::from_file(&path).unwrap();
        let t = registry.lookup("mf").unwrap();
        assert_eq!(t.name, "my-filter");
        assert!(t.parameters[0].positional);
        // Built-ins survive the merge.
        assert!(registry.lookup("read-xml").is_some());
    }
}
