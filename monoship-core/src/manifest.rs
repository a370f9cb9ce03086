//! Package manifest parsing.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{Error, Result};
use crate::package::PackageNode;

/// Default manifest file name looked up in each package directory.
pub const DEFAULT_MANIFEST: &str = "package.json";

/// Dependency classes whose keys are unioned into the declared set.
pub const DEPENDENCY_CLASSES: [&str; 4] = [
    "dependencies",
    "devDependencies",
    "peerDependencies",
    "optionalDependencies",
];

/// Reads and parses the manifest at `path` into a package node.
///
/// The node's directory is the manifest's parent. In-workspace
/// dependencies are left empty; the graph fills them in once every
/// package is known.
pub fn load_manifest(path: &Path) -> Result<PackageNode> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::ManifestParse {
        path: path.to_path_buf(),
        message: format!("cannot read manifest: {}", e),
    })?;
    parse_manifest(&content, path)
}

/// Parses manifest `content`; `path` is used for the package directory and
/// for error reporting.
pub fn parse_manifest(content: &str, path: &Path) -> Result<PackageNode> {
    let json: Value = serde_json::from_str(content).map_err(|e| Error::ManifestParse {
        path: path.to_path_buf(),
        message: format!("invalid JSON: {}", e),
    })?;

    let name = match json.get("name") {
        Some(Value::String(name)) if !name.is_empty() => name.clone(),
        Some(Value::String(_)) => {
            return Err(Error::ManifestParse {
                path: path.to_path_buf(),
                message: "'name' must not be empty".to_string(),
            })
        }
        Some(_) => {
            return Err(Error::ManifestParse {
                path: path.to_path_buf(),
                message: "'name' must be a string".to_string(),
            })
        }
        None => {
            return Err(Error::ManifestParse {
                path: path.to_path_buf(),
                message: "missing required field 'name'".to_string(),
            })
        }
    };

    let version = json
        .get("version")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    let declared = DEPENDENCY_CLASSES
        .iter()
        .filter_map(|class| json.get(*class).and_then(|v| v.as_object()))
        .flat_map(|deps| deps.keys().cloned());

    let dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    Ok(PackageNode::new(name, version, dir, declared))
}
