use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

/// Test context that sets up a temporary pybridge home environment
struct TestContext {
    temp_dir: TempDir,
    home: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let home = temp_dir.path().join(".pybridge");
        std::fs::create_dir_all(home.join("bridges")).expect("failed to create bridges dir");
        Self { temp_dir, home }
    }

    fn cmd(&self) -> Command {
        let bin_path = env!("CARGO_BIN_EXE_pybridge");
        let mut cmd = Command::new(bin_path);
        cmd.env("HOME", self.temp_dir.path());
        cmd.env("PYBRIDGE_HOME", &self.home);
        cmd
    }

    fn write_manifest(&self, backend: &str, body: &str) {
        std::fs::write(
            self.home
                .join("bridges")
                .join(format!("{backend}_dependencies.toml")),
            body,
        )
        .expect("failed to write manifest");
    }
}

const LOCAL_MANIFEST: &str = r#"
[[dependency]]
name = "alpha"
version = "1.0"

[[dependency]]
name = "beta"
url = "https://example.com/beta-2.0-py3-none-any.whl"
"#;

#[test]
fn test_help_command() {
    let ctx = TestContext::new();
    let output = ctx
        .cmd()
        .arg("--help")
        .output()
        .expect("failed to run pybridge");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
}

#[test]
fn test_version_command() {
    let ctx = TestContext::new();
    let output = ctx
        .cmd()
        .arg("--version")
        .output()
        .expect("failed to run pybridge");
    assert!(output.status.success());
}

#[test]
fn test_bridges_lists_discovered_manifests() {
    let ctx = TestContext::new();
    ctx.write_manifest("local", LOCAL_MANIFEST);

    let output = ctx
        .cmd()
        .arg("bridges")
        .output()
        .expect("failed to run pybridge bridges");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("local"));
    assert!(stdout.contains('2'));
}

#[test]
fn test_bridges_with_no_manifests() {
    let ctx = TestContext::new();
    let output = ctx
        .cmd()
        .arg("bridges")
        .output()
        .expect("failed to run pybridge bridges");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No backend manifests"));
}

#[test]
fn test_status_reports_all_missing_dependencies() {
    let ctx = TestContext::new();
    ctx.write_manifest("local", LOCAL_MANIFEST);

    let output = ctx
        .cmd()
        .args(["status", "local"])
        .output()
        .expect("failed to run pybridge status");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("alpha"));
    assert!(stdout.contains("beta"));
    assert!(stdout.contains("missing alpha, beta"));
}

#[test]
fn test_status_json_is_parseable() {
    let ctx = TestContext::new();
    ctx.write_manifest("local", LOCAL_MANIFEST);

    let output = ctx
        .cmd()
        .args(["status", "--json"])
        .output()
        .expect("failed to run pybridge status --json");
    assert!(output.status.success());

    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("status --json must emit valid JSON");
    let deps = value["local"].as_array().expect("local backend present");
    assert_eq!(deps.len(), 2);
    assert_eq!(deps[0]["name"], "alpha");
    assert_eq!(deps[0]["state"], "not_installed");
}

#[test]
fn test_broken_manifest_does_not_break_discovery() {
    let ctx = TestContext::new();
    ctx.write_manifest("local", LOCAL_MANIFEST);
    ctx.write_manifest("broken", "[[dependency]\nname = ");

    let output = ctx
        .cmd()
        .arg("bridges")
        .output()
        .expect("failed to run pybridge bridges");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("local"));
    assert!(!stdout.contains("broken"));
}

#[test]
fn test_install_dry_run_prints_resolved_references() {
    let ctx = TestContext::new();
    ctx.write_manifest(
        "local",
        "[[dependency]]\nname = \"alpha\"\nversion = \"1.0\"\n",
    );

    let output = ctx
        .cmd()
        .args(["install", "local", "--dry-run"])
        .output()
        .expect("failed to run pybridge install --dry-run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("alpha -> alpha==1.0"));
}

#[test]
fn test_install_unknown_backend_fails() {
    let ctx = TestContext::new();
    let output = ctx
        .cmd()
        .args(["install", "nope", "--dry-run"])
        .output()
        .expect("failed to run pybridge install");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unknown backend"));
}

#[test]
fn test_reset_on_empty_environment_is_a_noop() {
    let ctx = TestContext::new();
    let output = ctx
        .cmd()
        .args(["reset", "--yes", "--legacy"])
        .output()
        .expect("failed to run pybridge reset");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Dependencies were reset"));
}

#[test]
fn test_clean_removes_wheel_cache() {
    let ctx = TestContext::new();
    let wheels = ctx.home.join("wheels");
    std::fs::create_dir_all(&wheels).unwrap();
    std::fs::write(wheels.join("beta-2.0-py3-none-any.whl"), b"bytes").unwrap();

    let output = ctx
        .cmd()
        .arg("clean")
        .output()
        .expect("failed to run pybridge clean");
    assert!(output.status.success());
    assert!(!wheels.exists());
}
