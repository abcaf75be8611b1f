use std::path::Path;

use tracing::debug;

use super::FormatStrategy;
use crate::error::{RegistryError, RegistryResult};
use crate::record::{FileFormat, LeafRecord};
use crate::value::Payload;

/// JSON documents, parsed in full.
#[derive(Clone, Copy, Debug, Default)]
pub struct StructuredTextFormat;

impl FormatStrategy for StructuredTextFormat {
    fn format(&self) -> FileFormat {
        FileFormat::StructuredText
    }

    fn load(&self, path: &Path, _leaf: &LeafRecord) -> RegistryResult<Payload> {
        let text = std::fs::read_to_string(path)?;
        let value = serde_json::from_str(&text).map_err(|e| RegistryError::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!(path = %path.display(), "parsed json file");
        Ok(Payload::Json(value))
    }
}
