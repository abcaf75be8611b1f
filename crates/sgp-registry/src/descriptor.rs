//! Descriptor documents: the YAML nested mappings the registry is built from.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_yaml::{Mapping, Value};

use crate::error::{RegistryError, RegistryResult};
use crate::merge::merge;

/// A parsed descriptor document (base or overrides).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Descriptor {
    origin: String,
    root: Mapping,
}

impl Descriptor {
    /// Read and parse a descriptor file.
    pub fn from_path(path: &Path) -> RegistryResult<Self> {
        let origin = path.display().to_string();
        let text = std::fs::read_to_string(path)
            .map_err(|e| RegistryError::descriptor(origin.clone(), e))?;
        Self::parse(origin, &text)
    }

    /// Parse descriptor text. `origin` names the document in errors.
    pub fn parse(origin: impl Into<String>, text: &str) -> RegistryResult<Self> {
        let origin = origin.into();
        let value: Value =
            serde_yaml::from_str(text).map_err(|e| RegistryError::descriptor(origin.clone(), e))?;
        match value {
            Value::Mapping(root) => Ok(Self { origin, root }),
            // An empty document is an empty registry.
            Value::Null => Ok(Self {
                origin,
                root: Mapping::new(),
            }),
            other => Err(RegistryError::descriptor(
                origin,
                format!("root must be a mapping, found {}", kind_of(&other)),
            )),
        }
    }

    /// Wrap an already-built mapping.
    pub fn from_mapping(origin: impl Into<String>, root: Mapping) -> Self {
        Self {
            origin: origin.into(),
            root,
        }
    }

    /// Overlay `overrides` onto this descriptor.
    pub fn apply_overrides(&mut self, overrides: &Descriptor) {
        tracing::info!(base = %self.origin, overrides = %overrides.origin, "applying descriptor overrides");
        merge(&mut self.root, &overrides.root);
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn root(&self) -> &Mapping {
        &self.root
    }
}

impl FromStr for Descriptor {
    type Err = RegistryError;

    /// Parse descriptor text that did not come from a file.
    fn from_str(text: &str) -> RegistryResult<Self> {
        Self::parse("<inline>", text)
    }
}

/// Resolve an override descriptor path against the base descriptor's
/// directory. Absolute paths are kept as given.
pub fn resolve_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match base.parent() {
        Some(dir) => dir.join(path),
        None => path.to_path_buf(),
    }
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}
