//! DSL input adapter: turns the loosely-typed `input` map of a
//! `DSLWorkflow` start request into a [`StepTree`].
//!
//! Strategies are tried in a fixed order:
//! 1. the whole map as a step tree (must be meaningful, otherwise falls through);
//! 2. the object under `"input"`;
//! 3. the object under `"Input"`.
//!
//! A nested object that fails to decode stops the search. If nothing
//! matches, the error lists the observed top-level keys.

use std::fmt;

use serde_json::{Map, Value};
use tracing::{error, info};

use crate::models::StepTree;
use crate::WorkflowError;

/// Result of one decoding strategy.
#[derive(Debug)]
pub enum DecodeOutcome {
    Matched(StepTree),
    /// The strategy does not apply; try the next one.
    NoMatch,
    /// The strategy applies but the payload is broken.
    Malformed(serde_json::Error),
}

/// Which strategy produced the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputShape {
    Direct,
    Nested,
    NestedCapitalized,
}

impl InputShape {
    /// Strategy order used by [`normalize`].
    pub const ORDER: [InputShape; 3] = [Self::Direct, Self::Nested, Self::NestedCapitalized];

    pub fn decode(self, input: &Map<String, Value>) -> DecodeOutcome {
        match self {
            Self::Direct => decode_direct(input),
            Self::Nested | Self::NestedCapitalized => decode_nested(input, self.as_str()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Nested => "input",
            Self::NestedCapitalized => "Input",
        }
    }
}

impl fmt::Display for InputShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strategy 1. Decode errors and empty trees both fall through.
pub fn decode_direct(input: &Map<String, Value>) -> DecodeOutcome {
    match StepTree::from_map(input) {
        Ok(tree) if tree.is_meaningful() => DecodeOutcome::Matched(tree),
        _ => DecodeOutcome::NoMatch,
    }
}

/// Strategies 2 and 3. Only an object under `key` applies; the decoded
/// tree is accepted even when empty.
pub fn decode_nested(input: &Map<String, Value>, key: &str) -> DecodeOutcome {
    match input.get(key) {
        Some(Value::Object(nested)) => match StepTree::from_map(nested) {
            Ok(tree) => DecodeOutcome::Matched(tree),
            Err(e) => DecodeOutcome::Malformed(e),
        },
        _ => DecodeOutcome::NoMatch,
    }
}

/// Run the strategies in order and return the first match.
pub fn normalize(
    input: &Map<String, Value>,
    version: &str,
) -> Result<(StepTree, InputShape), WorkflowError> {
    for shape in InputShape::ORDER {
        match shape.decode(input) {
            DecodeOutcome::Matched(tree) => {
                info!(shape = %shape, version, nodes = tree.len(), "dsl input parsed");
                return Ok((tree, shape));
            }
            DecodeOutcome::NoMatch => continue,
            DecodeOutcome::Malformed(source) => {
                let key = shape.as_str().to_string();
                error!(key = %key, version, error = %source, "dsl input malformed");
                return Err(WorkflowError::MalformedDsl { key, source });
            }
        }
    }

    let mut keys: Vec<String> = input.keys().cloned().collect();
    keys.sort();
    error!(input_keys = ?keys, version, "unable to parse workflow input into dsl");
    Err(WorkflowError::DslParse { keys })
}
