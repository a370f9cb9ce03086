use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn create_test_package(dir: &Path, dir_name: &str, name: &str, deps: &[&str]) {
    let pkg_dir = dir.join(dir_name);
    fs::create_dir_all(&pkg_dir).unwrap();

    let deps = deps
        .iter()
        .map(|d| format!(r#""{}": "workspace:*""#, d))
        .collect::<Vec<_>>()
        .join(", ");
    fs::write(
        pkg_dir.join("package.json"),
        format!(
            r#"{{ "name": "{}", "version": "1.0.0", "dependencies": {{ {} }} }}"#,
            name, deps
        ),
    )
    .unwrap();
}

fn workspace() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let packages_dir = temp_dir.path().join("packages");
    fs::create_dir_all(&packages_dir).unwrap();

    create_test_package(&packages_dir, "core", "@acme/core", &[]);
    create_test_package(&packages_dir, "utils", "@acme/utils", &["@acme/core"]);
    create_test_package(&packages_dir, "web", "@acme/web", &["@acme/utils", "@acme/core"]);
    (temp_dir, packages_dir)
}

fn get_monoship_binary() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.pop();
    path.join("target").join("debug").join("monoship")
}

fn monoship(packages_dir: &Path, args: &[&str]) -> std::process::Output {
    Command::new(get_monoship_binary())
        .arg("--packages-dir")
        .arg(packages_dir)
        .args(args)
        .output()
        .expect("Failed to execute monoship")
}

#[test]
#[ignore]
fn test_order_command() {
    let (_temp, packages_dir) = workspace();

    let output = monoship(&packages_dir, &["order", "--json"]);
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = report["packages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["@acme/core", "@acme/utils", "@acme/web"]);
}

#[test]
#[ignore]
fn test_levels_command_with_exclude() {
    let (_temp, packages_dir) = workspace();
    create_test_package(&packages_dir, "test-fixtures", "fixtures", &[]);

    let output = monoship(&packages_dir, &["--exclude", "test-*", "levels", "--json"]);
    assert!(output.status.success());

    let levels: Vec<Vec<String>> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        levels,
        vec![
            vec!["@acme/core".to_string()],
            vec!["@acme/utils".to_string()],
            vec!["@acme/web".to_string()],
        ]
    );
}

#[test]
#[ignore]
fn test_run_failure_prints_resume_instruction() {
    let (_temp, packages_dir) = workspace();
    fs::write(packages_dir.join("utils").join("FAIL"), "").unwrap();

    let output = monoship(
        &packages_dir,
        &["run", "test ! -e FAIL && touch DONE"],
    );
    assert!(!output.status.success());
    assert!(packages_dir.join("core").join("DONE").exists());
    fs::remove_file(packages_dir.join("core").join("DONE")).unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout);
    let resume = stdout
        .lines()
        .map(str::trim)
        .find(|line| line.contains("--start-from"))
        .expect("no resume instruction printed");
    assert!(resume.starts_with("monoship --packages-dir"));
    assert!(resume.contains("--start-from utils"));

    // paste it into a shell as-is
    fs::remove_file(packages_dir.join("utils").join("FAIL")).unwrap();
    let bin_dir = get_monoship_binary().parent().unwrap().to_path_buf();
    let path = format!(
        "{}:{}",
        bin_dir.display(),
        std::env::var("PATH").unwrap_or_default()
    );
    let output = Command::new("sh")
        .arg("-c")
        .arg(resume)
        .env("PATH", path)
        .output()
        .expect("Failed to run resume instruction");

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(!packages_dir.join("core").join("DONE").exists());
    assert!(packages_dir.join("utils").join("DONE").exists());
    assert!(packages_dir.join("web").join("DONE").exists());
}
