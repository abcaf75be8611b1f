use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::error::{RegistryError, RegistryResult};

/// Keys a descriptor table may use for record fields, including the legacy
/// spellings (`name`, `type`, `nof_objects`). Any other key names a child.
pub(crate) const RECORD_KEYS: &[&str] = &[
    "location",
    "name",
    "format",
    "type",
    "objectCount",
    "nof_objects",
    "versions",
    "doc",
];

/// Legacy spellings and the keys they stand for. When a table carries both,
/// the canonical key wins.
const LEGACY_KEYS: &[(&str, &str)] = &[
    ("name", "location"),
    ("type", "format"),
    ("nof_objects", "objectCount"),
];

/// Serialization format declared by a leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileFormat {
    /// Sequentially serialized binary records.
    #[serde(alias = "pickle")]
    BinaryObject,
    /// JSON document.
    #[serde(alias = "json")]
    StructuredText,
    /// Container of named array datasets with lazy row access.
    #[serde(alias = "h5py")]
    TabularBinary,
    /// Plain text, one entry per line.
    #[serde(alias = "text")]
    LineText,
    /// YAML document, same shape as a descriptor.
    #[serde(alias = "yaml")]
    MarkupConfig,
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BinaryObject => write!(f, "binary-object"),
            Self::StructuredText => write!(f, "structured-text"),
            Self::TabularBinary => write!(f, "tabular-binary"),
            Self::LineText => write!(f, "line-text"),
            Self::MarkupConfig => write!(f, "markup-config"),
        }
    }
}

/// Alternate location for a leaf, selectable by version id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    #[serde(alias = "name")]
    pub location: String,
    #[serde(default)]
    pub doc: Option<String>,
    /// Record count for this version when it differs from the leaf's.
    #[serde(default, alias = "nof_objects")]
    pub object_count: Option<usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLeaf {
    #[serde(alias = "name")]
    location: String,
    #[serde(default, alias = "type")]
    format: Option<FileFormat>,
    #[serde(default, alias = "nof_objects")]
    object_count: Option<usize>,
    #[serde(default)]
    versions: Option<BTreeMap<u32, VersionEntry>>,
    #[serde(default)]
    doc: Option<String>,
}

/// A descriptor entry bound to a concrete file.
///
/// Leaf records are immutable once compiled. Deriving a versioned record
/// builds a new value; the version map is shared, never copied.
#[derive(Clone, Debug, PartialEq)]
pub struct LeafRecord {
    location: String,
    format: Option<FileFormat>,
    object_count: usize,
    versions: Option<Arc<BTreeMap<u32, VersionEntry>>>,
    doc: Option<String>,
}

impl LeafRecord {
    /// Create a single-record leaf with no versions.
    pub fn new(location: impl Into<String>, format: Option<FileFormat>) -> Self {
        Self {
            location: location.into(),
            format,
            object_count: 1,
            versions: None,
            doc: None,
        }
    }

    /// Set the number of sequential records stored at the location.
    pub fn with_object_count(mut self, object_count: usize) -> Self {
        self.object_count = object_count;
        self
    }

    /// Attach a version map.
    pub fn with_versions(mut self, versions: BTreeMap<u32, VersionEntry>) -> Self {
        self.versions = Some(Arc::new(versions));
        self
    }

    /// Compile a leaf from the record keys of a descriptor table.
    ///
    /// Child tables living next to the record keys are ignored here; the
    /// tree compiler handles them.
    pub(crate) fn from_table(path: &str, table: &Mapping) -> RegistryResult<Self> {
        let mut fields = Mapping::new();
        for (key, value) in table {
            if key.as_str().is_some_and(|k| RECORD_KEYS.contains(&k)) {
                fields.insert(key.clone(), value.clone());
            }
        }
        for (legacy, canonical) in LEGACY_KEYS {
            if fields.contains_key(*canonical) {
                fields.remove(*legacy);
            }
        }

        let raw: RawLeaf = serde_yaml::from_value(Value::Mapping(fields))
            .map_err(|e| RegistryError::descriptor(path, e))?;

        if raw.location.is_empty() {
            return Err(RegistryError::descriptor(path, "location must not be empty"));
        }
        let object_count = raw.object_count.unwrap_or(1);
        if object_count == 0 {
            return Err(RegistryError::descriptor(path, "objectCount must be at least 1"));
        }
        if let Some(versions) = &raw.versions {
            for (id, entry) in versions {
                if entry.location.is_empty() {
                    return Err(RegistryError::descriptor(
                        path,
                        format!("version {id} has an empty location"),
                    ));
                }
                if entry.object_count == Some(0) {
                    return Err(RegistryError::descriptor(
                        path,
                        format!("version {id} objectCount must be at least 1"),
                    ));
                }
            }
        }

        Ok(Self {
            location: raw.location,
            format: raw.format,
            object_count,
            versions: raw.versions.map(Arc::new),
            doc: raw.doc,
        })
    }

    /// Relative file location.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Declared format, if any.
    pub fn format(&self) -> Option<FileFormat> {
        self.format
    }

    /// Number of sequentially serialized records at the location.
    pub fn object_count(&self) -> usize {
        self.object_count
    }

    /// Declared versions, if any.
    pub fn versions(&self) -> Option<&BTreeMap<u32, VersionEntry>> {
        self.versions.as_deref()
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Derive the record for a version entry: the location is swapped and
    /// the record count follows the entry when it names one.
    pub(crate) fn derive(&self, entry: &VersionEntry) -> Self {
        Self {
            location: entry.location.clone(),
            object_count: entry.object_count.unwrap_or(self.object_count),
            ..self.clone()
        }
    }
}
