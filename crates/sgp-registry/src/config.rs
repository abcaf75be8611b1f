use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::descriptor::resolve_relative;

/// Where the registry finds its descriptors and files.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Base descriptor.
    pub descriptor: PathBuf,
    /// Optional override descriptor, relative to the base descriptor's
    /// directory unless absolute.
    pub overrides: Option<PathBuf>,
    /// Directory leaf locations are joined onto. Defaults to the base
    /// descriptor's directory.
    pub root: Option<PathBuf>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            descriptor: PathBuf::from("files.yaml"),
            overrides: None,
            root: None,
        }
    }
}

impl RegistryConfig {
    pub fn new(descriptor: impl Into<PathBuf>) -> Self {
        Self {
            descriptor: descriptor.into(),
            ..Default::default()
        }
    }

    pub fn with_overrides(mut self, overrides: impl Into<PathBuf>) -> Self {
        self.overrides = Some(overrides.into());
        self
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// The effective root directory.
    pub fn root_dir(&self) -> PathBuf {
        if let Some(root) = &self.root {
            return root.clone();
        }
        match self.descriptor.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// The override descriptor path, resolved against the base descriptor.
    pub fn overrides_path(&self) -> Option<PathBuf> {
        self.overrides
            .as_deref()
            .map(|path| resolve_relative(&self.descriptor, path))
    }

    pub fn descriptor(&self) -> &Path {
        &self.descriptor
    }
}
