//! Workspace scanner for discovering package manifests.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::config::WorkspaceConfig;
use crate::error::{Error, Result};
use crate::manifest::{load_manifest, DEFAULT_MANIFEST};
use crate::package::PackageNode;
use crate::pattern::ExclusionSet;

/// Scans the immediate subdirectories of a packages directory.
///
/// Each subdirectory holding a manifest is one package. Directories
/// without a manifest are skipped, as are candidates matched by an
/// exclusion pattern.
pub struct Scanner {
    packages_dir: PathBuf,
    manifest_name: String,
    exclusions: ExclusionSet,
    cwd: PathBuf,
}

impl Scanner {
    pub fn new(packages_dir: impl AsRef<Path>) -> Self {
        Self {
            packages_dir: packages_dir.as_ref().to_path_buf(),
            manifest_name: DEFAULT_MANIFEST.to_string(),
            exclusions: ExclusionSet::default(),
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Builds a scanner from workspace configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if an exclusion pattern cannot be compiled.
    pub fn from_config(packages_dir: impl AsRef<Path>, config: &WorkspaceConfig) -> Result<Self> {
        Ok(Self::new(packages_dir)
            .with_manifest_name(config.manifest_name())
            .with_exclusions(ExclusionSet::new(&config.exclude)?))
    }

    pub fn with_manifest_name(mut self, name: impl Into<String>) -> Self {
        self.manifest_name = name.into();
        self
    }

    pub fn with_exclusions(mut self, exclusions: ExclusionSet) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// Overrides the directory relative exclusion forms are computed from.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    pub fn packages_dir(&self) -> &Path {
        &self.packages_dir
    }

    /// Returns manifest paths found one level below the packages directory,
    /// in directory-name order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Scan`] if the packages directory is missing, is not
    /// a directory, or cannot be read.
    pub fn scan_manifests(&self) -> Result<Vec<PathBuf>> {
        match std::fs::metadata(&self.packages_dir) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(Error::Scan {
                    path: self.packages_dir.clone(),
                    message: "not a directory".to_string(),
                })
            }
            Err(err) => {
                return Err(Error::Scan {
                    path: self.packages_dir.clone(),
                    message: err.to_string(),
                })
            }
        }

        let mut manifests = Vec::new();

        let walker = WalkDir::new(&self.packages_dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if err.depth() == 0 => {
                    return Err(Error::Scan {
                        path: self.packages_dir.clone(),
                        message: err.to_string(),
                    });
                }
                Err(err) => {
                    debug!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };

            if !entry.file_type().is_dir() {
                continue;
            }

            let manifest = entry.path().join(&self.manifest_name);
            if !manifest.is_file() {
                continue;
            }

            if let Some(pattern) = self.exclusions.excluding(&manifest, &self.cwd) {
                debug!(path = %manifest.display(), pattern, "excluded by pattern");
                continue;
            }

            manifests.push(manifest);
        }

        debug!(
            dir = %self.packages_dir.display(),
            count = manifests.len(),
            "scanned manifests"
        );
        Ok(manifests)
    }

    /// Scans and parses every manifest.
    ///
    /// # Errors
    ///
    /// Fails on the first unreadable directory or invalid manifest.
    pub fn scan(&self) -> Result<Vec<PackageNode>> {
        self.scan_manifests()?
            .iter()
            .map(|path| load_manifest(path))
            .collect()
    }
}
