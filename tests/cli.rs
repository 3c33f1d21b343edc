//! End to end tests of the `parachute` binary

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A command isolated from the user's configuration and temp directory
fn parachute(home: &Path) -> Command {
    let tmp = home.join("tmp");
    fs::create_dir_all(&tmp).unwrap();

    let mut cmd = Command::cargo_bin("parachute").unwrap();
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("TMPDIR", &tmp)
        .env_remove("PARACHUTE_PASSPHRASE")
        .env_remove("PARACHUTE_NO_ENCRYPTION")
        .env_remove("PARACHUTE_OUTPUT")
        .env_remove("PARACHUTE_REMOTE")
        .env_remove("PARACHUTE_ENDPOINT")
        .env_remove("PARACHUTE_ACCESS_KEY")
        .env_remove("PARACHUTE_SECRET_KEY")
        .env_remove("PARACHUTE_LOG_LEVEL")
        .env_remove("PARACHUTE_LOG_FORMAT");
    cmd
}

fn leftover_workspaces(home: &Path) -> usize {
    fs::read_dir(home.join("tmp")).unwrap().count()
}

fn sample_source(home: &Path) -> std::path::PathBuf {
    let source = home.join("archive");
    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("a.txt"), b"hello").unwrap();
    source
}

#[test]
fn test_pack_and_unpack_round_trip() {
    let home = TempDir::new().unwrap();
    let source = sample_source(home.path());
    let packed_dir = home.path().join("D");
    let restored_dir = home.path().join("D2");

    parachute(home.path())
        .arg("pack")
        .arg(&source)
        .args(["-p", "secret", "-o"])
        .arg(&packed_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("archive.zip.enc"));

    let packed = packed_dir.join("archive.zip.enc");
    assert!(packed.is_file());

    parachute(home.path())
        .arg("unpack")
        .arg(&packed)
        .args(["-p", "secret", "-o"])
        .arg(&restored_dir)
        .assert()
        .success();

    assert_eq!(fs::read(restored_dir.join("a.txt")).unwrap(), b"hello");
    assert_eq!(leftover_workspaces(home.path()), 0);
}

#[test]
fn test_pack_without_passphrase_fails() {
    let home = TempDir::new().unwrap();
    let source = sample_source(home.path());

    parachute(home.path())
        .arg("pack")
        .arg(&source)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("provided passphrase is empty"));
}

#[test]
fn test_pack_without_sources_fails() {
    let home = TempDir::new().unwrap();

    parachute(home.path())
        .args(["pack", "-p", "secret"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "source file or directory must be provided",
        ));
}

#[test]
fn test_pack_without_encryption() {
    let home = TempDir::new().unwrap();
    let source = sample_source(home.path());

    parachute(home.path())
        .arg("pack")
        .arg(&source)
        .arg("-E")
        .assert()
        .success();

    // default output is the current directory
    assert!(home.path().join("archive.zip").is_file());
}

#[test]
fn test_unpack_with_wrong_passphrase_fails() {
    let home = TempDir::new().unwrap();
    let source = sample_source(home.path());

    parachute(home.path())
        .arg("pack")
        .arg(&source)
        .args(["-p", "secret"])
        .assert()
        .success();

    parachute(home.path())
        .args(["unpack", "archive.zip.enc", "-p", "not-secret", "-o", "restored"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Decryption error"));

    assert!(!home.path().join("restored/a.txt").exists());
    assert_eq!(leftover_workspaces(home.path()), 0);
}

#[test]
fn test_passphrase_from_config_file() {
    let home = TempDir::new().unwrap();
    let source = sample_source(home.path());
    fs::write(
        home.path().join("parachute.toml"),
        "passphrase = \"from-config\"\n",
    )
    .unwrap();

    parachute(home.path())
        .arg("pack")
        .arg(&source)
        .assert()
        .success();

    parachute(home.path())
        .args(["unpack", "archive.zip.enc", "-o", "restored"])
        .assert()
        .success();

    assert!(home.path().join("restored/a.txt").is_file());
}

#[test]
fn test_missing_explicit_config_fails() {
    let home = TempDir::new().unwrap();

    parachute(home.path())
        .args(["pack", "x", "-p", "secret", "-c", "missing.toml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_backup_rejects_invalid_remote() {
    let home = TempDir::new().unwrap();
    let source = sample_source(home.path());

    parachute(home.path())
        .arg("backup")
        .arg(&source)
        .args(["-p", "secret", "-r", "ftp://bucket/archive.zip.enc"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "remote must be declared in \"s3://bucket/some-path\" format",
        ));
}

#[test]
fn test_backup_requires_remote() {
    let home = TempDir::new().unwrap();
    let source = sample_source(home.path());

    parachute(home.path())
        .arg("backup")
        .arg(&source)
        .args(["-p", "secret"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("remote destination must be provided"));
}

#[test]
fn test_restore_requires_s3_settings() {
    let home = TempDir::new().unwrap();

    parachute(home.path())
        .args(["restore", "out", "-p", "secret", "-r", "s3://bucket/archive.zip.enc"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("endpoint must be provided"));
}

#[test]
fn test_restore_encrypted_object_needs_passphrase() {
    let home = TempDir::new().unwrap();

    parachute(home.path())
        .args(["restore", "out", "-E", "-r", "s3://bucket/archive.zip.enc"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("encryption hint (.enc)"));
}

#[test]
fn test_unknown_log_level_fails() {
    let home = TempDir::new().unwrap();

    parachute(home.path())
        .args(["pack", "x", "-p", "secret", "--log-level", "loud"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown log level"));
}

#[test]
fn test_version() {
    let home = TempDir::new().unwrap();

    parachute(home.path())
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "Version: {}",
            env!("CARGO_PKG_VERSION")
        )))
        .stdout(predicate::str::contains("Revision: "))
        .stdout(predicate::str::contains("Build Date: "));
}
