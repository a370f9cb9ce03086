use std::fs;
use std::path::Path;

use monoship_core::graph::DependencyGraph;
use monoship_core::pattern::ExclusionSet;
use monoship_core::scanner::Scanner;
use monoship_core::{Error, WorkspaceConfig};
use tempfile::TempDir;

fn create_test_package(dir: &Path, dir_name: &str, name: &str, deps: &[&str]) {
    let pkg_dir = dir.join(dir_name);
    fs::create_dir_all(&pkg_dir).unwrap();

    let deps_str = deps
        .iter()
        .map(|d| format!("\"{}\": \"^1.0.0\"", d))
        .collect::<Vec<_>>()
        .join(", ");

    let manifest = format!(
        r#"{{
  "name": "{}",
  "version": "1.2.3",
  "dependencies": {{ {} }},
  "devDependencies": {{ "typescript": "^5.0.0" }}
}}"#,
        name, deps_str
    );

    fs::write(pkg_dir.join("package.json"), manifest).unwrap();
}

fn workspace() -> (TempDir, std::path::PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let packages_dir = temp_dir.path().join("packages");
    fs::create_dir_all(&packages_dir).unwrap();
    (temp_dir, packages_dir)
}

#[test]
fn test_scan_packages() {
    let (_temp, packages_dir) = workspace();

    create_test_package(&packages_dir, "core", "@acme/core", &[]);
    create_test_package(&packages_dir, "web", "@acme/web", &["@acme/core", "react"]);
    fs::create_dir_all(packages_dir.join("no-manifest")).unwrap();
    fs::write(packages_dir.join("README.md"), "not a package").unwrap();

    let packages = Scanner::new(&packages_dir).scan().unwrap();

    assert_eq!(packages.len(), 2);
    assert_eq!(packages[0].name, "@acme/core");
    assert_eq!(packages[0].version, "1.2.3");
    assert_eq!(packages[0].dir_name(), "core");
    assert_eq!(packages[1].name, "@acme/web");
    assert_eq!(packages[1].declared_dependencies.len(), 3);
}

#[test]
fn test_scan_is_one_level_deep() {
    let (_temp, packages_dir) = workspace();

    create_test_package(&packages_dir, "top", "top", &[]);
    create_test_package(&packages_dir.join("top"), "nested", "nested", &[]);

    let manifests = Scanner::new(&packages_dir).scan_manifests().unwrap();
    assert_eq!(manifests.len(), 1);
    assert!(manifests[0].ends_with("top/package.json"));
}

#[test]
fn test_scan_with_exclusions() {
    let (_temp, packages_dir) = workspace();

    create_test_package(&packages_dir, "test-utils", "test-utils", &[]);
    create_test_package(&packages_dir, "mytest-utils", "mytest-utils", &[]);
    create_test_package(&packages_dir, "docs", "docs", &[]);
    create_test_package(&packages_dir, "app", "app", &[]);

    let exclusions = ExclusionSet::new(["test-*", "**/docs/**"]).unwrap();
    let packages = Scanner::new(&packages_dir)
        .with_exclusions(exclusions)
        .scan()
        .unwrap();

    let names: Vec<&str> = packages.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["app", "mytest-utils"]);
}

#[test]
fn test_scan_missing_directory() {
    let (_temp, packages_dir) = workspace();
    let err = Scanner::new(packages_dir.join("missing"))
        .scan_manifests()
        .unwrap_err();
    assert!(matches!(err, Error::Scan { .. }));
}

#[test]
fn test_scan_rejects_regular_file() {
    let (_temp, packages_dir) = workspace();
    let file = packages_dir.join("README.md");
    fs::write(&file, "not a packages directory").unwrap();

    let err = Scanner::new(&file).scan_manifests().unwrap_err();
    match err {
        Error::Scan { path, message } => {
            assert_eq!(path, file);
            assert_eq!(message, "not a directory");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_invalid_manifest_aborts_scan() {
    let (_temp, packages_dir) = workspace();

    create_test_package(&packages_dir, "good", "good", &[]);
    let bad = packages_dir.join("bad");
    fs::create_dir_all(&bad).unwrap();
    fs::write(bad.join("package.json"), r#"{ "version": "1.0.0" }"#).unwrap();

    match Scanner::new(&packages_dir).scan() {
        Err(Error::ManifestParse { path, .. }) => assert!(path.ends_with("bad/package.json")),
        other => panic!("expected manifest error, got {:?}", other),
    }
}

#[test]
fn test_scan_from_config() {
    let (_temp, packages_dir) = workspace();

    let dir = packages_dir.join("lib");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("manifest.json"), r#"{ "name": "lib" }"#).unwrap();
    create_test_package(&packages_dir, "ignored", "ignored", &[]);

    let config = WorkspaceConfig {
        exclude: vec!["ignored".to_string()],
        manifest: Some("manifest.json".to_string()),
        ..WorkspaceConfig::default()
    };
    let packages = Scanner::from_config(&packages_dir, &config)
        .unwrap()
        .scan()
        .unwrap();

    assert_eq!(packages.len(), 1);
    assert_eq!(packages[0].name, "lib");
    assert_eq!(packages[0].version, "0.0.0");
}

#[test]
fn test_scan_to_graph() {
    let (_temp, packages_dir) = workspace();

    create_test_package(&packages_dir, "a", "a", &[]);
    create_test_package(&packages_dir, "b", "b", &["a"]);
    create_test_package(&packages_dir, "c", "c", &["a"]);
    create_test_package(&packages_dir, "d", "d", &["b", "c"]);

    let manifests = Scanner::new(&packages_dir).scan_manifests().unwrap();
    let graph = DependencyGraph::from_manifests(&manifests).unwrap();
    let order = graph.topological_order().unwrap();

    assert_eq!(order.names().first().map(String::as_str), Some("a"));
    assert_eq!(order.names().last().map(String::as_str), Some("d"));
}
