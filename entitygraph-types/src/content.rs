//! Content held by predicate and detail containers.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;

/// The kind of a predicate content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// A literal value (string).
    Literal,
    /// A reference to another entity (IRI or entity id).
    Reference,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::Literal => f.write_str("literal"),
            ContentKind::Reference => f.write_str("reference"),
        }
    }
}

/// One item added to or removed from a predicate container.
///
/// Containers store and compare items by their exact string form; the kind
/// only decides whether a container accepts the item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Content {
    Literal(String),
    Reference(String),
}

impl Content {
    pub fn literal(value: impl Into<String>) -> Self {
        Content::Literal(value.into())
    }

    pub fn reference(target: impl Into<String>) -> Self {
        Content::Reference(target.into())
    }

    pub fn kind(&self) -> ContentKind {
        match self {
            Content::Literal(_) => ContentKind::Literal,
            Content::Reference(_) => ContentKind::Reference,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Content::Literal(s) | Content::Reference(s) => s,
        }
    }

    pub fn into_string(self) -> String {
        match self {
            Content::Literal(s) | Content::Reference(s) => s,
        }
    }
}

impl From<&str> for Content {
    fn from(value: &str) -> Self {
        Content::Literal(value.to_string())
    }
}

impl From<String> for Content {
    fn from(value: String) -> Self {
        Content::Literal(value)
    }
}

impl From<&String> for Content {
    fn from(value: &String) -> Self {
        Content::Literal(value.clone())
    }
}

/// The content of a single detail (annotation) on a value.
///
/// `Empty` doubles as the "no annotation" sentinel: an empty string always
/// normalizes to `Empty`, never to `Text("")`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DetailContent {
    #[default]
    Empty,
    Text(String),
    Number(Number),
    Object(Map<String, Value>),
}

impl DetailContent {
    pub fn is_empty(&self) -> bool {
        matches!(self, DetailContent::Empty)
    }

    /// The request body used when writing this content.
    pub fn to_wire(&self) -> String {
        match self {
            DetailContent::Empty => String::new(),
            DetailContent::Text(s) => s.clone(),
            DetailContent::Number(n) => n.to_string(),
            DetailContent::Object(m) => Value::Object(m.clone()).to_string(),
        }
    }

    /// The content type matching [`to_wire`](Self::to_wire).
    pub fn media_type(&self) -> &'static str {
        match self {
            DetailContent::Object(_) => "application/json",
            _ => "text/plain",
        }
    }

    /// Interprets a stored detail as returned by the remote store.
    ///
    /// Detail values are stored as text; text that parses as a JSON number or
    /// object is returned as such, anything else stays text.
    pub fn from_wire(raw: &Value) -> Self {
        match raw {
            Value::Null => DetailContent::Empty,
            Value::String(s) if s.is_empty() => DetailContent::Empty,
            Value::String(s) => match serde_json::from_str::<Value>(s) {
                Ok(Value::Number(n)) => DetailContent::Number(n),
                Ok(Value::Object(m)) => DetailContent::Object(m),
                _ => DetailContent::Text(s.clone()),
            },
            Value::Number(n) => DetailContent::Number(n.clone()),
            Value::Object(m) => DetailContent::Object(m.clone()),
            other => DetailContent::Text(other.to_string()),
        }
    }

    /// The content as a JSON value (`null` when empty).
    pub fn to_json(&self) -> Value {
        match self {
            DetailContent::Empty => Value::Null,
            DetailContent::Text(s) => Value::String(s.clone()),
            DetailContent::Number(n) => Value::Number(n.clone()),
            DetailContent::Object(m) => Value::Object(m.clone()),
        }
    }
}

impl fmt::Display for DetailContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl TryFrom<Value> for DetailContent {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::String(s) if s.is_empty() => Ok(DetailContent::Empty),
            Value::String(s) => Ok(DetailContent::Text(s)),
            Value::Number(n) => Ok(DetailContent::Number(n)),
            Value::Object(m) => Ok(DetailContent::Object(m)),
            other => Err(Error::InvalidContentType {
                expected: "string, number or object".into(),
                actual: json_type_name(&other).into(),
            }),
        }
    }
}

impl From<&str> for DetailContent {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            DetailContent::Empty
        } else {
            DetailContent::Text(value.to_string())
        }
    }
}

impl From<String> for DetailContent {
    fn from(value: String) -> Self {
        if value.is_empty() {
            DetailContent::Empty
        } else {
            DetailContent::Text(value)
        }
    }
}

impl From<i64> for DetailContent {
    fn from(value: i64) -> Self {
        DetailContent::Number(value.into())
    }
}

impl TryFrom<f64> for DetailContent {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self> {
        Number::from_f64(value)
            .map(DetailContent::Number)
            .ok_or_else(|| Error::InvalidContentType {
                expected: "finite number".into(),
                actual: value.to_string(),
            })
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
