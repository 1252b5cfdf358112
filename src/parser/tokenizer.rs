// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 osmopipe contributors

//! Command-line tokenizer
//!
//! Splits raw pipeline text into task tokens and scans each task's
//! parameter text. Parameter forms are tried in priority order, first
//! match wins per scan position:
//! `key='value'`, `key="value"`, `key=value`, `'value'`, `"value"`,
//! bare `value`. Keys of the form `(in|out)pipe.<digits>` are pipe
//! references, not parameters.

use regex::Regex;

use crate::pipeline::Direction;

/// One task invocation as raw text: lowercased name plus untokenized
/// parameter text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTask {
    pub name: String,
    pub arguments: String,
}

/// A scanned `(key, value)` pair. A missing key marks the task's
/// positional parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamToken {
    pub key: Option<String>,
    pub value: String,
}

/// An explicit pipe declaration: `inPipe.<slot>=<label>` or
/// `outPipe.<slot>=<label>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeReference {
    pub direction: Direction,
    pub slot: usize,
    pub label: String,
}

/// One classified argument of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskArgument {
    Parameter(ParamToken),
    Pipe(PipeReference),
}

pub struct Tokenizer {
    linebreak_symbol: String,
    parameter: Regex,
    pipe: Regex,
    pipe_keyword: Regex,
}

impl Tokenizer {
    pub fn new(linebreak_symbol: &str) -> Self {
        Self {
            linebreak_symbol: linebreak_symbol.to_string(),
            parameter: Regex::new(
                r#"([^= ]+)='([^']+)'|([^= ]+)="([^"]+)"|([^= ]+)=([^ ]+)|'([^']+)'|"([^"]+)"|([^ ]+)"#,
            )
            .expect("parameter pattern"),
            pipe: Regex::new(r"^(in|out)pipe\.([0-9]+)$").expect("pipe pattern"),
            pipe_keyword: Regex::new(r"(?i)(in|out)pipe").expect("pipe keyword pattern"),
        }
    }

    /// Split input text into task tokens.
    ///
    /// Linebreak markers and physical line breaks are joined first, so a
    /// task spans lines; anything before the first `--` (such as a tool
    /// path) is ignored.
    pub fn tasks(&self, input: &str) -> Vec<RawTask> {
        let joined = input
            .replace(&self.linebreak_symbol, " ")
            .replace(['\r', '\n'], " ");

        let starts: Vec<usize> = joined.match_indices("--").map(|(i, _)| i).collect();
        let mut tasks = Vec::new();
        for (n, &start) in starts.iter().enumerate() {
            let end = starts.get(n + 1).copied().unwrap_or(joined.len());
            let body = joined[start + 2..end].trim();
            if body.is_empty() {
                continue;
            }
            let (name, arguments) = match body.find(' ') {
                Some(i) => (&body[..i], body[i + 1..].trim()),
                None => (body, ""),
            };
            tasks.push(RawTask {
                name: name.to_lowercase(),
                arguments: arguments.to_string(),
            });
        }
        tasks
    }

    /// Scan a task's parameter text into classified arguments.
    pub fn scan(&self, arguments: &str) -> Vec<TaskArgument> {
        let mut scanned = Vec::new();
        for caps in self.parameter.captures_iter(arguments) {
            let token = if let (Some(k), Some(v)) = (caps.get(1), caps.get(2)) {
                ParamToken {
                    key: Some(k.as_str().to_string()),
                    value: v.as_str().to_string(),
                }
            } else if let (Some(k), Some(v)) = (caps.get(3), caps.get(4)) {
                ParamToken {
                    key: Some(k.as_str().to_string()),
                    value: v.as_str().to_string(),
                }
            } else if let (Some(k), Some(v)) = (caps.get(5), caps.get(6)) {
                ParamToken {
                    key: Some(k.as_str().to_string()),
                    value: v.as_str().to_string(),
                }
            } else if let Some(v) = caps.get(7).or_else(|| caps.get(8)).or_else(|| caps.get(9)) {
                ParamToken {
                    key: None,
                    value: v.as_str().to_string(),
                }
            } else {
                continue;
            };
            scanned.push(self.classify(token));
        }
        scanned
    }

    /// The prefix of a task's parameter text up to the first pipe-direction
    /// keyword. This is what an embedded-spaces parameter consumes.
    pub fn spaces_prefix<'a>(&self, arguments: &'a str) -> &'a str {
        match self.pipe_keyword.find(arguments) {
            Some(m) => arguments[..m.start()].trim(),
            None => arguments.trim(),
        }
    }

    fn classify(&self, token: ParamToken) -> TaskArgument {
        if let Some(key) = &token.key {
            if let Some(caps) = self.pipe.captures(&key.to_lowercase()) {
                let direction = if &caps[1] == "in" {
                    Direction::In
                } else {
                    Direction::Out
                };
                if let Ok(slot) = caps[2].parse::<usize>() {
                    return TaskArgument::Pipe(PipeReference {
                        direction,
                        slot,
                        label: token.value,
                    });
                }
            }
        }
        TaskArgument::Parameter(token)
    }
}
