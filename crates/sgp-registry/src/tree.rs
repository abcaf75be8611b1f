//! The compiled, read-only registry tree.

use std::collections::BTreeMap;

use serde_yaml::{Mapping, Value};

use crate::descriptor::{kind_of, Descriptor};
use crate::error::{RegistryError, RegistryResult};
use crate::record::{LeafRecord, RECORD_KEYS};

/// A node of the registry tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// A descriptor mapping. It is a leaf when it carries a location; it may
    /// hold children either way.
    Table {
        record: Option<LeafRecord>,
        children: BTreeMap<String, Node>,
    },
    /// Any non-mapping descriptor value, e.g. a bare string left by an
    /// override. Scalars never resolve and have no children.
    Scalar(Value),
}

impl Node {
    pub fn record(&self) -> Option<&LeafRecord> {
        match self {
            Self::Table { record, .. } => record.as_ref(),
            Self::Scalar(_) => None,
        }
    }

    pub fn child(&self, token: &str) -> Option<&Node> {
        match self {
            Self::Table { children, .. } => children.get(token),
            Self::Scalar(_) => None,
        }
    }
}

/// Hierarchical catalog compiled from a (merged) descriptor.
#[derive(Clone, Debug, PartialEq)]
pub struct RegistryTree {
    pub(crate) root: Node,
}

impl RegistryTree {
    /// Compile a descriptor into typed nodes.
    ///
    /// Fails with `DescriptorParse` when a table that carries a location has
    /// malformed record fields, or when a key is not a scalar.
    pub fn compile(descriptor: &Descriptor) -> RegistryResult<Self> {
        let children = compile_children(descriptor.origin(), "", descriptor.root(), false)?;
        Ok(Self {
            root: Node::Table {
                record: None,
                children,
            },
        })
    }

    /// The root node.
    pub fn root(&self) -> &Node {
        &self.root
    }
}

fn is_leaf_table(table: &Mapping) -> bool {
    table.contains_key("location") || table.get("name").is_some_and(Value::is_string)
}

fn compile_table(origin: &str, path: &str, table: &Mapping) -> RegistryResult<Node> {
    let leaf = is_leaf_table(table);
    let record = if leaf {
        Some(LeafRecord::from_table(path, table).map_err(|e| match e {
            RegistryError::DescriptorParse { path, reason } => {
                RegistryError::descriptor(origin, format!("{path}: {reason}"))
            }
            other => other,
        })?)
    } else {
        None
    };
    let children = compile_children(origin, path, table, leaf)?;
    Ok(Node::Table { record, children })
}

fn compile_children(
    origin: &str,
    path: &str,
    table: &Mapping,
    skip_record_keys: bool,
) -> RegistryResult<BTreeMap<String, Node>> {
    let mut children = BTreeMap::new();
    for (key, value) in table {
        let key = key_string(origin, path, key)?;
        if skip_record_keys && RECORD_KEYS.contains(&key.as_str()) {
            continue;
        }
        let child_path = if path.is_empty() {
            key.clone()
        } else {
            format!("{path}.{key}")
        };
        let node = match value {
            Value::Mapping(sub) => compile_table(origin, &child_path, sub)?,
            other => Node::Scalar(other.clone()),
        };
        children.insert(key, node);
    }
    Ok(children)
}

fn key_string(origin: &str, path: &str, key: &Value) -> RegistryResult<String> {
    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(RegistryError::descriptor(
            origin,
            format!("{path}: keys must be scalars, found {}", kind_of(other)),
        )),
    }
}
