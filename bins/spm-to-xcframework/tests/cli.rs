use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("spm-to-xcframework").unwrap();
    cmd.current_dir(dir.path()).arg("--no-color");
    cmd
}

#[test]
fn help_lists_options() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--enable-library-evolution"))
        .stdout(predicate::str::contains("--platforms"))
        .stdout(predicate::str::contains("--show-output"));
}

#[test]
fn package_name_is_required() {
    let dir = TempDir::new().unwrap();
    cmd(&dir).arg("--dry-run").assert().failure();
}

#[test]
fn dry_run_prints_every_step() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .args(["MyLib", "--dry-run", "--output", "/tmp/x"])
        .args(["--platforms", "ios simulator"])
        .assert()
        .success()
        .stdout(predicate::str::contains("xcodebuild clean -scheme MyLib"))
        .stdout(predicate::str::contains("-sdk iphoneos"))
        .stdout(predicate::str::contains("-sdk iphonesimulator"))
        .stdout(predicate::str::contains("mkdir -p /tmp/x/simulator"))
        .stdout(predicate::str::contains(
            "rm -rf /tmp/x/.build /tmp/x/ios /tmp/x/simulator",
        ));
}

#[test]
fn platforms_take_one_value() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .args(["--platforms", "ios", "MyLib", "--dry-run", "--output", "/tmp/x"])
        .assert()
        .success()
        .stdout(predicate::str::contains("xcodebuild clean -scheme MyLib"))
        .stdout(predicate::str::contains("-sdk iphoneos"))
        .stdout(predicate::str::contains("rm -rf /tmp/x/.build /tmp/x/ios"));
}

#[test]
fn dry_run_ignores_unknown_platforms() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .args(["MyLib", "--dry-run", "--output", "/tmp/x"])
        .args(["--platforms", "tvos watchos"])
        .assert()
        .success()
        .stdout(predicate::str::contains("-sdk watchos"))
        .stdout(predicate::str::contains("tvos").not())
        .stdout(predicate::str::contains("-sdk iphoneos").not());
}

#[test]
fn dry_run_json_report() {
    let dir = TempDir::new().unwrap();
    let output = cmd(&dir)
        .args(["MyLib", "--dry-run", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["dry_run"], true);
    assert_eq!(json["report"]["package"], "MyLib");
    assert_eq!(json["report"]["platforms"], serde_json::json!(["ios"]));
    assert!(json["commands"].as_array().is_some_and(|c| c.len() == 5));
}

#[test]
fn config_file_supplies_defaults() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(".spm-to-xcframework.toml"),
        "[defaults]\nplatforms = [\"watchos\"]\nenable_library_evolution = true\n",
    )
    .unwrap();

    cmd(&dir)
        .args(["MyLib", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("-sdk watchos"))
        .stdout(predicate::str::contains("BUILD_LIBRARY_FOR_DISTRIBUTION=YES"));
}

#[test]
fn cli_platforms_override_config() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(".spm-to-xcframework.toml"),
        "[defaults]\nplatforms = [\"watchos\"]\n",
    )
    .unwrap();

    cmd(&dir)
        .args(["MyLib", "--dry-run", "--platforms", "simulator"])
        .assert()
        .success()
        .stdout(predicate::str::contains("-sdk iphonesimulator"))
        .stdout(predicate::str::contains("-sdk watchos").not());
}

#[test]
fn missing_explicit_config_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .args(["MyLib", "--dry-run", "--config", "nope.toml"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Configuration file not found"));
}

#[test]
fn malformed_config_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("spm-to-xcframework.toml"), "[defaults\n").unwrap();

    cmd(&dir)
        .args(["MyLib", "--dry-run"])
        .assert()
        .code(3);
}

#[cfg(unix)]
#[test]
fn build_progress_is_not_printed_twice() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let shell = dir.path().join("ok.sh");
    fs::write(&shell, "#!/bin/sh\nexit 0\n").unwrap();
    fs::set_permissions(&shell, fs::Permissions::from_mode(0o755)).unwrap();
    fs::write(
        dir.path().join(".spm-to-xcframework.toml"),
        format!("[build]\nshell = \"{}\"\n", shell.display()),
    )
    .unwrap();

    cmd(&dir)
        .args(["MyLib", "--platforms", "ios"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Start building package 'MyLib'"))
        .stdout(predicate::str::contains("Building 'MyLib' for ios").not())
        .stderr(predicate::str::contains("No modules found"));
}
