//! Package data model.

use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Version assigned to manifests that do not declare one.
pub const DEFAULT_VERSION: &str = "0.0.0";

/// A package discovered in the workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageNode {
    pub name: String,
    pub version: String,
    /// Directory containing the manifest.
    pub path: PathBuf,
    /// Every dependency name from all dependency classes.
    pub declared_dependencies: IndexSet<String>,
    /// The subset of `declared_dependencies` naming other workspace packages.
    pub in_workspace_dependencies: Vec<String>,
}

impl PackageNode {
    pub fn new(
        name: impl Into<String>,
        version: Option<String>,
        path: impl Into<PathBuf>,
        declared_dependencies: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.unwrap_or_else(|| DEFAULT_VERSION.to_string()),
            path: path.into(),
            declared_dependencies: declared_dependencies.into_iter().collect(),
            in_workspace_dependencies: Vec::new(),
        }
    }

    /// Final segment of the package directory, used in resume instructions.
    ///
    /// Falls back to the package name when the path has no final segment.
    pub fn dir_name(&self) -> String {
        dir_basename(&self.path).unwrap_or_else(|| self.name.clone())
    }

    #[inline]
    pub fn depends_on(&self, name: &str) -> bool {
        self.in_workspace_dependencies.iter().any(|d| d == name)
    }
}

pub(crate) fn dir_basename(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}
