use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use sgp_registry::RegistryConfig;

/// Runner configuration, read from `sgp.toml`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub registry: RegistryConfig,
    /// File whose presence marks the dataset as downloaded.
    pub marker: PathBuf,
    pub commands: Commands,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            registry: RegistryConfig::default(),
            marker: PathBuf::from(".data_ver2"),
            commands: Commands::default(),
        }
    }
}

/// External commands, as argv templates. `{dest}`, `{name}` and `{gpu}`
/// are substituted before running.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Commands {
    pub download: Vec<String>,
    pub train: Vec<String>,
    pub eval: Vec<String>,
}

impl CliConfig {
    /// Read `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no runner config; using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }
}
