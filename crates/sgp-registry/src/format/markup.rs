use std::path::Path;

use super::FormatStrategy;
use crate::error::{RegistryError, RegistryResult};
use crate::record::{FileFormat, LeafRecord};
use crate::value::Payload;

/// YAML documents, parsed into the same value shape descriptors use.
#[derive(Clone, Copy, Debug, Default)]
pub struct MarkupFormat;

impl FormatStrategy for MarkupFormat {
    fn format(&self) -> FileFormat {
        FileFormat::MarkupConfig
    }

    fn load(&self, path: &Path, _leaf: &LeafRecord) -> RegistryResult<Payload> {
        let text = std::fs::read_to_string(path)?;
        let value = serde_yaml::from_str(&text).map_err(|e| RegistryError::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Payload::Markup(value))
    }
}
