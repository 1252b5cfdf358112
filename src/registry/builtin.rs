// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmopipe contributors

//! Built-in Osmosis task catalog
//!
//! The common subset of the Osmosis task vocabulary. Extension files can
//! add to or override these (see [`Registry::merge_file`](super::Registry::merge_file)).

use crate::pipeline::ConnectorType::{Change, Entity};

use super::{FunctionTemplate, ParameterSpec};

fn param(name: &str, default: Option<&str>, positional: bool) -> ParameterSpec {
    ParameterSpec {
        name: name.into(),
        default: default.map(Into::into),
        positional,
        allows_spaces: false,
    }
}

pub(super) fn templates() -> Vec<FunctionTemplate> {
    vec![
        FunctionTemplate {
            name: "read-xml".into(),
            short_name: Some("rx".into()),
            parameters: vec![
                param("file", Some("dump.osm"), true),
                param("enableDateParsing", Some("yes"), false),
                param("compressionMethod", Some("auto"), false),
            ],
            inputs: vec![],
            outputs: vec![Entity],
        },
        FunctionTemplate {
            name: "read-pbf".into(),
            short_name: Some("rb".into()),
            parameters: vec![param("file", Some("dump.osm.pbf"), true)],
            inputs: vec![],
            outputs: vec![Entity],
        },
        FunctionTemplate {
            name: "write-xml".into(),
            short_name: Some("wx".into()),
            parameters: vec![
                param("file", Some("dump.osm"), true),
                param("compressionMethod", Some("auto"), false),
            ],
            inputs: vec![Entity],
            outputs: vec![],
        },
        FunctionTemplate {
            name: "write-pbf".into(),
            short_name: Some("wb".into()),
            parameters: vec![param("file", Some("dump.osm.pbf"), true)],
            inputs: vec![Entity],
            outputs: vec![],
        },
        FunctionTemplate {
            name: "sort".into(),
            short_name: Some("s".into()),
            parameters: vec![param("type", Some("TypeThenId"), true)],
            inputs: vec![Entity],
            outputs: vec![Entity],
        },
        FunctionTemplate {
            name: "bounding-box".into(),
            short_name: Some("bb".into()),
            parameters: vec![
                param("left", Some("-180"), false),
                param("right", Some("180"), false),
                param("top", Some("90"), false),
                param("bottom", Some("-90"), false),
                param("completeWays", Some("no"), false),
            ],
            inputs: vec![Entity],
            outputs: vec![Entity],
        },
        FunctionTemplate {
            name: "merge".into(),
            short_name: Some("m".into()),
            parameters: vec![param(
                "conflictResolutionMethod",
                Some("version"),
                false,
            )],
            inputs: vec![Entity, Entity],
            outputs: vec![Entity],
        },
        FunctionTemplate {
            name: "buffer".into(),
            short_name: Some("b".into()),
            parameters: vec![param("bufferCapacity", Some("100"), true)],
            inputs: vec![Entity],
            outputs: vec![Entity],
        },
        FunctionTemplate {
            name: "tag-filter".into(),
            short_name: Some("tf".into()),
            parameters: vec![ParameterSpec {
                name: "filterSpec".into(),
                default: None,
                positional: true,
                allows_spaces: true,
            }],
            inputs: vec![Entity],
            outputs: vec![Entity],
        },
        FunctionTemplate {
            name: "read-xml-change".into(),
            short_name: Some("rxc".into()),
            parameters: vec![param("file", Some("change.osc"), true)],
            inputs: vec![],
            outputs: vec![Change],
        },
        FunctionTemplate {
            name: "write-xml-change".into(),
            short_name: Some("wxc".into()),
            parameters: vec![param("file", Some("change.osc"), true)],
            inputs: vec![Change],
            outputs: vec![],
        },
        FunctionTemplate {
            name: "sort-change".into(),
            short_name: Some("sc".into()),
            parameters: vec![param("type", Some("streamable"), true)],
            inputs: vec![Change],
            outputs: vec![Change],
        },
        FunctionTemplate {
            name: "derive-change".into(),
            short_name: Some("dc".into()),
            parameters: vec![],
            inputs: vec![Entity, Entity],
            outputs: vec![Change],
        },
        FunctionTemplate {
            name: "apply-change".into(),
            short_name: Some("ac".into()),
            parameters: vec![],
            inputs: vec![Entity, Change],
            outputs: vec![Entity],
        },
    ]
}
