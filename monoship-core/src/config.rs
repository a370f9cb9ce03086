//! Workspace configuration loaded from `monoship.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::manifest::DEFAULT_MANIFEST;

/// File name looked up when discovering workspace configuration.
pub const CONFIG_FILE: &str = "monoship.toml";

/// Marker whose presence ends upward configuration discovery.
const REPOSITORY_MARKER: &str = ".git";

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    workspace: WorkspaceConfig,
}

/// Workspace-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Exclusion patterns applied during package discovery.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Run execution commands in dependency-level parallel mode by default.
    #[serde(default)]
    pub parallel: bool,
    /// Manifest file name; defaults to `package.json`.
    pub manifest: Option<String>,
    /// Default message for `commit`, with `{name}` and `{version}` placeholders.
    pub commit_message: Option<String>,
    /// Path of the file this configuration was read from.
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl WorkspaceConfig {
    /// Parses configuration from TOML text.
    pub fn parse(content: &str, context: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content).map_err(|error| Error::Toml {
            error,
            context: context.to_string(),
        })?;
        Ok(file.workspace)
    }

    /// Reads configuration from an explicit file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&content, &path.display().to_string())?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Looks for `monoship.toml` in `start` and its ancestors.
    ///
    /// The search stops after the first directory containing a `.git`
    /// marker. Returns the default configuration when nothing is found.
    pub fn discover(start: impl AsRef<Path>) -> Result<Self> {
        let start = start
            .as_ref()
            .canonicalize()
            .unwrap_or_else(|_| start.as_ref().to_path_buf());
        let mut current = Some(start.as_path());

        while let Some(dir) = current {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                return Self::load(candidate);
            }
            if dir.join(REPOSITORY_MARKER).exists() {
                break;
            }
            current = dir.parent();
        }

        Ok(Self::default())
    }

    #[inline]
    pub fn manifest_name(&self) -> &str {
        self.manifest.as_deref().unwrap_or(DEFAULT_MANIFEST)
    }
}
