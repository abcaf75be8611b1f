//! Values moved in and out of registry files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::format::TabularHandle;

/// A self-contained value stored as one binary-object record.
///
/// Binary records are not self-describing on disk, so arbitrary data is
/// carried through this closed shape rather than through a dynamic value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Record {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    List(Vec<Record>),
    Map(BTreeMap<String, Record>),
}

impl Record {
    /// Number of elements when this is a list.
    pub fn list_len(&self) -> Option<usize> {
        match self {
            Self::List(items) => Some(items.len()),
            _ => None,
        }
    }

    /// Convert to a JSON value. Byte strings become arrays of numbers.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Int(i) => JsonValue::from(*i),
            Self::Float(f) => JsonValue::from(*f),
            Self::Text(s) => JsonValue::String(s.clone()),
            Self::Bytes(bytes) => JsonValue::Array(bytes.iter().map(|b| JsonValue::from(*b)).collect()),
            Self::List(items) => JsonValue::Array(items.iter().map(Record::to_json).collect()),
            Self::Map(map) => JsonValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<JsonValue> for Record {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => Self::Text(s),
            JsonValue::Array(items) => Self::List(items.into_iter().map(Record::from).collect()),
            JsonValue::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Record::from(v))).collect())
            }
        }
    }
}

impl From<i64> for Record {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Record {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Record {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Record {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Record {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<Record>> From<Vec<T>> for Record {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

/// Result of loading a registry file, shaped by the leaf's format.
#[derive(Debug)]
pub enum Payload {
    /// binary-object: one record, or a list of records in file order.
    Object(Record),
    /// structured-text: the parsed JSON document.
    Json(JsonValue),
    /// line-text: lines in order, terminators stripped.
    Lines(Vec<String>),
    /// markup-config: the parsed YAML document.
    Markup(serde_yaml::Value),
    /// tabular-binary: an open handle owned by the caller.
    Table(TabularHandle),
}

impl Payload {
    pub fn into_object(self) -> Option<Record> {
        match self {
            Self::Object(record) => Some(record),
            _ => None,
        }
    }

    pub fn into_json(self) -> Option<JsonValue> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_lines(self) -> Option<Vec<String>> {
        match self {
            Self::Lines(lines) => Some(lines),
            _ => None,
        }
    }

    pub fn into_markup(self) -> Option<serde_yaml::Value> {
        match self {
            Self::Markup(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_table(self) -> Option<TabularHandle> {
        match self {
            Self::Table(handle) => Some(handle),
            _ => None,
        }
    }

    /// Short name of the payload kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Object(_) => "object",
            Self::Json(_) => "json",
            Self::Lines(_) => "lines",
            Self::Markup(_) => "markup",
            Self::Table(_) => "table",
        }
    }
}
