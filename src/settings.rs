// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmopipe contributors

//! Converter settings
//!
//! The handful of toggles the parser and serializer consult. Loadable
//! from a TOML file; every field has a default so a partial file works.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::OsmopipeError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Emit short task names (e.g. `--rx`) where a template defines one.
    pub prefer_short_task_names: bool,

    /// Emit parameters still carrying their template default.
    pub export_default_parameters: bool,

    /// External tool path prepended to serialized output (e.g. the
    /// osmosis binary). Empty/absent means no prefix.
    pub tool_path: Option<String>,

    /// Quoting character for values containing whitespace.
    pub quote_char: char,

    /// Marker joining physical lines in the textual form.
    pub linebreak_symbol: String,

    /// Treat a required input left unconnected after implicit resolution
    /// as a parse error instead of a structural warning.
    pub strict_inputs: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            prefer_short_task_names: false,
            export_default_parameters: false,
            tool_path: None,
            quote_char: '"',
            linebreak_symbol: "<linebreak>".to_string(),
            strict_inputs: false,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, OsmopipeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| OsmopipeError::FileReadError {
                path: path.to_path_buf(),
                error: e.to_string(),
            })?;
        Ok(toml::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert!(!s.prefer_short_task_names);
        assert!(!s.export_default_parameters);
        assert_eq!(s.quote_char, '"');
        assert_eq!(s.linebreak_symbol, "<linebreak>");
        assert!(s.tool_path.is_none());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let s: Settings = toml::from_str("prefer_short_task_names = true").unwrap();
        assert!(s.prefer_short_task_names);
        assert_eq!(s.linebreak_symbol, "<linebreak>");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "tool_path = \"/usr/bin/osmosis\"\nstrict_inputs = true\n")
            .unwrap();

        let s = Settings::from_file(&path).unwrap();
        assert_eq!(s.tool_path.as_deref(), Some("/usr/bin/osmosis"));
        assert!(s.strict_inputs);
    }
}
