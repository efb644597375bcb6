use serde::{Deserialize, Serialize};
pub use seqsync_engine::sync::IdentityPolicy;
use seqsync_syntax::ParticipantKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// Settings shared by every session the CLI opens. Every section is
/// optional in the file; missing keys take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Actor catalog used by `add`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,
    pub format: FormatConfig,
    pub identity: IdentityConfig,
    pub lexing: LexingConfig,
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    pub indent: usize,
    /// Wrap regenerated text in `@startuml` / `@enduml`.
    pub envelope: bool,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            indent: 2,
            envelope: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub policy: IdentityPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexingConfig {
    pub incremental: bool,
}

impl Default for LexingConfig {
    fn default() -> Self {
        Self { incremental: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Undo steps kept; 0 disables undo.
    pub limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { limit: 100 }
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        let Some(content) = read_optional(config_path)? else {
            return Ok(None);
        };

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the catalog path
        config.catalog_path = config
            .catalog_path
            .map(|path| expand_path(&path).unwrap_or(path));

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/seqsync");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// The configured catalog, if there is one.
    pub fn load_catalog(&self) -> Result<Option<Catalog>, ConfigError> {
        match &self.catalog_path {
            Some(path) => Catalog::load_from_path(path),
            None => Ok(None),
        }
    }
}

/// An actor catalog file:
///
/// ```toml
/// [[actor]]
/// id = "pg"
/// name = "Payment Gateway"
/// kind = "boundary"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default, rename = "actor")]
    pub actors: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: ParticipantKind,
}

impl Catalog {
    pub fn load_from_path<P: AsRef<Path>>(catalog_path: P) -> Result<Option<Self>, ConfigError> {
        let catalog_path = catalog_path.as_ref();
        let Some(content) = read_optional(catalog_path)? else {
            return Ok(None);
        };
        let catalog = toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
            config_path: catalog_path.to_path_buf(),
            source,
        })?;
        Ok(Some(catalog))
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    std::fs::read_to_string(path)
        .map(Some)
        .map_err(|source| ConfigError::ConfigReadError {
            config_path: path.to_path_buf(),
            source,
        })
}

fn expand_path(path: &Path) -> Option<PathBuf> {
    let path_str = path.to_string_lossy();
    match shellexpand::full(&path_str) {
        Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
        Err(_) => None,
    }
}
