use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt::{Display, Formatter};

use crate::{Result, TransferError};

/// Ordered JSON object carried by one connection.
///
/// Key order is insertion order and survives encoding, so two encodings of the
/// same payload are byte-identical.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct Payload(Map<String, Value>);

impl Payload {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Serialize to compact UTF-8 JSON text.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.0)?)
    }

    /// Parse exactly one JSON object out of `bytes`.
    ///
    /// Empty, truncated and malformed input are all errors, as is any
    /// top-level value that is not an object.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)?;
        let value: Value = serde_json::from_str(text)?;
        Self::try_from(value)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Payload {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Payload {
    type Error = TransferError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(TransferError::NotAnObject(json_kind(&other))),
        }
    }
}

impl Display for Payload {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let text = serde_json::to_string(&self.0).map_err(|_| std::fmt::Error)?;
        f.write_str(&text)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// The fixed payloads a sender can transmit.
#[derive(
    clap::ValueEnum, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default,
)]
#[serde(rename_all = "kebab-case")]
pub enum PayloadKind {
    /// Window configuration of a real-time plot
    #[default]
    PlotWindow,
    /// Small user record with a boolean and a string list
    Profile,
}

impl PayloadKind {
    pub fn build(self) -> Payload {
        match self {
            Self::PlotWindow => plot_window(),
            Self::Profile => profile(),
        }
    }
}

impl Display for PayloadKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PlotWindow => f.write_str("plot-window"),
            Self::Profile => f.write_str("profile"),
        }
    }
}

fn from_literal(value: Value) -> Payload {
    match value {
        Value::Object(map) => Payload(map),
        _ => unreachable!("payload literals are objects"),
    }
}

/// Three-trace plot window, 800x400, one colour per trace.
pub fn plot_window() -> Payload {
    from_literal(json!({
        "title": "larrylisky",
        "x_label": "t (sec)",
        "y_label": "v (V)",
        "width": 800,
        "height": 400,
        "y_count": 3,
        "max_point": 1000,
        "x_step": 0.1,
        "x_range": 10.0,
        "y_min": -2.0,
        "y_max": 2.0,
        "x_grid_step": 1.0,
        "y_grid_step": 0.5,
        "y_color": [
            {"r": 255, "b": 0, "g": 0, "a": 255},
            {"r": 0, "b": 255, "g": 0, "a": 255},
            {"r": 0, "b": 0, "g": 255, "a": 255}
        ]
    }))
}

pub fn profile() -> Payload {
    from_literal(json!({
        "username": "larrylisky",
        "score": 100,
        "active": true,
        "tags": ["python", "json", "network"]
    }))
}
