//! Typed attribute values.
//!
//! Agent-valued attributes never hold the agent itself, only its id.
//! The Model is the sole owner of every agent; references are resolved
//! through it on demand. This is what keeps cyclic agent graphs
//! representable and serialisable.

use crate::{
    error::{SimError, SimResult},
    types::AgentId,
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Int,
    Float,
    Str,
    Bool,
    Agent,
}

impl ValueType {
    /// Parse the tag used by the type catalog (`int`, `float`, `str`, `bool`, `agent`).
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            "str" | "string" => Some(Self::Str),
            "bool" => Some(Self::Bool),
            "agent" => Some(Self::Agent),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
            Self::Bool => "bool",
            Self::Agent => "agent",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    /// A reference to another agent by id. `None` is the empty reference.
    Agent(Option<AgentId>),
}

impl AttrValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Int(_) => ValueType::Int,
            Self::Float(_) => ValueType::Float,
            Self::Str(_) => ValueType::Str,
            Self::Bool(_) => ValueType::Bool,
            Self::Agent(_) => ValueType::Agent,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// The referenced agent id, if this is a non-empty agent reference.
    pub fn as_agent(&self) -> Option<AgentId> {
        match self {
            Self::Agent(id) => *id,
            _ => None,
        }
    }

    /// Convert to `target`, applying the numeric/string/boolean coercions.
    /// `name` is only used for the error.
    pub fn coerce(self, target: ValueType, name: &str) -> SimResult<AttrValue> {
        let found = self.value_type();
        if found == target {
            return Ok(self);
        }
        let mismatch = || SimError::TypeMismatch {
            name: name.to_string(),
            expected: target.to_string(),
            found: found.to_string(),
        };

        let coerced = match (target, &self) {
            (_, Self::Agent(_)) | (ValueType::Agent, _) => None,

            (ValueType::Int, Self::Float(v)) if v.is_finite() => Some(Self::Int(v.trunc() as i64)),
            (ValueType::Int, Self::Bool(v)) => Some(Self::Int(i64::from(*v))),
            (ValueType::Int, Self::Str(s)) => s.trim().parse().ok().map(Self::Int),

            (ValueType::Float, Self::Int(v)) => Some(Self::Float(*v as f64)),
            (ValueType::Float, Self::Bool(v)) => Some(Self::Float(if *v { 1.0 } else { 0.0 })),
            (ValueType::Float, Self::Str(s)) => s.trim().parse().ok().map(Self::Float),

            (ValueType::Str, Self::Int(v)) => Some(Self::Str(v.to_string())),
            (ValueType::Str, Self::Float(v)) => Some(Self::Str(v.to_string())),
            (ValueType::Str, Self::Bool(v)) => Some(Self::Str(v.to_string())),

            (ValueType::Bool, Self::Int(v)) => Some(Self::Bool(*v != 0)),
            (ValueType::Bool, Self::Float(v)) => Some(Self::Bool(*v != 0.0)),
            (ValueType::Bool, Self::Str(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(Self::Bool(true)),
                "false" | "0" => Some(Self::Bool(false)),
                _ => None,
            },

            _ => None,
        };
        coerced.ok_or_else(mismatch)
    }

    /// Render as JSON for client-facing state. Agent references become ids.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Int(v) => serde_json::Value::from(*v),
            Self::Float(v) => serde_json::Value::from(*v),
            Self::Str(v) => serde_json::Value::from(v.as_str()),
            Self::Bool(v) => serde_json::Value::from(*v),
            Self::Agent(id) => id.map(serde_json::Value::from).unwrap_or(serde_json::Value::Null),
        }
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}
