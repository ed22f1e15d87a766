use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const BLOB: &[u8] = b"\x7fELF\x02\x01\x00\x00ro.product.model\x00\xff\xfero.build.id\x00";

fn droidtools() -> Command {
    let mut cmd = Command::cargo_bin("droidtools").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

fn write_config(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("droidtools.toml");
    std::fs::write(&path, body).unwrap();
    path
}

fn leftover_workspaces(tmp: &Path) -> Vec<String> {
    std::fs::read_dir(tmp)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("droidtools-"))
        .collect()
}

#[test]
fn help_lists_subcommands() {
    droidtools()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("overlay"))
        .stdout(predicate::str::contains("binary-search"))
        .stdout(predicate::str::contains("binary-edit"))
        .stdout(predicate::str::contains("doctor"));
}

#[test]
fn overlay_without_apktool_exits_127() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "[apktool]\nbinary = \"apktool-missing-9f2c\"\n");

    droidtools()
        .current_dir(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["overlay", "framework-res.apk", "aosp/res"])
        .assert()
        .code(127)
        .stderr(predicate::str::contains("apktool-missing-9f2c"));

    assert!(!dir.path().join("config.xml").exists());
    assert!(!dir.path().join("cleaned_config.xml").exists());
}

#[test]
fn overlay_without_apktool_leaves_no_workspace() {
    let dir = TempDir::new().unwrap();
    let tmp = TempDir::new().unwrap();
    let config = write_config(dir.path(), "[apktool]\nbinary = \"apktool-missing-9f2c\"\n");

    droidtools()
        .current_dir(dir.path())
        .env("TMPDIR", tmp.path())
        .arg("--config")
        .arg(&config)
        .args(["overlay", "framework-res.apk", "aosp/res"])
        .assert()
        .code(127);

    assert!(leftover_workspaces(tmp.path()).is_empty());
}

#[cfg(unix)]
#[test]
fn overlay_with_failing_apktool_removes_workspace() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let tmp = TempDir::new().unwrap();
    let tool = dir.path().join("fake-apktool");
    std::fs::write(&tool, "#!/bin/sh\necho 'brut.androlib.AndrolibException: bad' >&2\nexit 1\n").unwrap();
    std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
    std::fs::write(dir.path().join("framework-res.apk"), b"PK").unwrap();
    std::fs::create_dir_all(dir.path().join("aosp/res/values")).unwrap();
    let config = write_config(
        dir.path(),
        &format!("[apktool]\nbinary = \"{}\"\n", tool.display()),
    );

    droidtools()
        .current_dir(dir.path())
        .env("TMPDIR", tmp.path())
        .arg("--config")
        .arg(&config)
        .args(["overlay", "framework-res.apk", "aosp/res"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("AndrolibException"));

    assert!(leftover_workspaces(tmp.path()).is_empty());
    assert!(!dir.path().join("config.xml").exists());
}

#[test]
fn missing_config_file_exits_3() {
    let dir = TempDir::new().unwrap();
    droidtools()
        .current_dir(dir.path())
        .args(["--config", "nope.toml", "doctor"])
        .assert()
        .code(3);
}

#[test]
fn doctor_json_reports_missing_tool() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "[apktool]\nbinary = \"apktool-missing-9f2c\"\n");

    droidtools()
        .arg("--config")
        .arg(&config)
        .args(["doctor", "--json"])
        .assert()
        .code(127)
        .stdout(predicate::str::contains("\"path\": null"));
}

#[test]
fn piped_status_lines_are_uncolored() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "[apktool]\nbinary = \"apktool-missing-9f2c\"\n");

    droidtools()
        .env_remove("NO_COLOR")
        .env_remove("FORCE_COLOR")
        .env_remove("CLICOLOR_FORCE")
        .arg("--config")
        .arg(&config)
        .arg("doctor")
        .assert()
        .code(127)
        .stderr(predicate::str::contains("apktool-missing-9f2c"))
        .stderr(predicate::str::contains("\u{1b}[").not())
        .stdout(predicate::str::contains("\u{1b}[").not());
}

#[test]
fn binary_search_prints_matches() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("libfoo.so"), BLOB).unwrap();

    droidtools()
        .current_dir(dir.path())
        .args(["--no-color", "binary-search", "ro.product*"])
        .assert()
        .success()
        .stdout(predicate::str::contains("libfoo.so: ro.product.model"))
        .stdout(predicate::str::contains("ro.build.id").not());
}

#[test]
fn binary_edit_with_yes_keeps_file_size() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("libfoo.so");
    std::fs::write(&file, BLOB).unwrap();

    droidtools()
        .args([
            "--no-color",
            "binary-edit",
            "ro.product*",
            dir.path().to_str().unwrap(),
            "ro.vendor.model",
            "--yes",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Done!"));

    let content = std::fs::read(&file).unwrap();
    assert_eq!(content.len(), BLOB.len());
    assert!(content.windows(16).any(|w| w == b"ro.vendor.model\x00"));
}

#[test]
fn binary_edit_rejects_longer_replacement() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("libfoo.so");
    std::fs::write(&file, BLOB).unwrap();

    droidtools()
        .args([
            "binary-edit",
            "build.id",
            dir.path().to_str().unwrap(),
            "build.fingerprint",
            "--yes",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("String too long"));

    assert_eq!(std::fs::read(&file).unwrap(), BLOB);
}

#[test]
fn binary_edit_declined_prompt_leaves_file() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("libfoo.so");
    std::fs::write(&file, BLOB).unwrap();

    droidtools()
        .args(["binary-edit", "ro.product*", dir.path().to_str().unwrap(), "ro.vendor"])
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Ignored."));

    assert_eq!(std::fs::read(&file).unwrap(), BLOB);
}

#[test]
fn binary_edit_accepts_piped_yes() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("libfoo.so");
    std::fs::write(&file, BLOB).unwrap();

    droidtools()
        .args(["binary-edit", "ro.product*", dir.path().to_str().unwrap(), "ro.vendor"])
        .write_stdin("y\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Done!"));

    let content = std::fs::read(&file).unwrap();
    assert_eq!(content.len(), BLOB.len());
    assert_ne!(content, BLOB);
    assert!(content.windows(10).any(|w| w == b"ro.vendor\x00"));
}

#[cfg(unix)]
#[test]
fn binarysearch_alias_dispatches() {
    let bin = assert_cmd::cargo::cargo_bin("droidtools");
    let dir = TempDir::new().unwrap();
    let link = dir.path().join("binarysearch");
    std::os::unix::fs::symlink(&bin, &link).unwrap();
    std::fs::write(dir.path().join("blob.bin"), BLOB).unwrap();

    Command::new(&link)
        .current_dir(dir.path())
        .args(["--no-color", "ro.build*", "."])
        .assert()
        .success()
        .stdout(predicate::str::contains("ro.build.id"));
}
