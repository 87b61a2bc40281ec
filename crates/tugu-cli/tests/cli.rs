use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn tugu() -> Command {
    Command::cargo_bin("tugu").unwrap()
}

/// Write a config file whose cache lives inside `dir`.
fn write_config(dir: &Path, source: serde_json::Value, network: &str) -> PathBuf {
    let path = dir.join("config.json");
    let config = serde_json::json!({
        "model": {
            "source": source,
            "cache_dir": dir.join("cache"),
        },
        "network": { "kind": network },
    });
    fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    path
}

fn write_png(path: &Path) {
    let img = image::RgbImage::from_pixel(32, 32, image::Rgb([200, 120, 40]));
    img.save(path).unwrap();
}

#[test]
fn test_help_lists_subcommands() {
    tugu()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("classify"))
        .stdout(predicate::str::contains("batch"))
        .stdout(predicate::str::contains("models"));
}

#[test]
fn test_config_init_get_set() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.json");
    let path_str = path.to_str().unwrap();

    tugu()
        .args(["-c", path_str, "config", "init"])
        .assert()
        .success();
    assert!(path.exists());

    tugu()
        .args(["-c", path_str, "config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    tugu()
        .args(["-c", path_str, "config", "get", "runtime.use_gpu"])
        .assert()
        .success()
        .stdout(predicate::str::contains("false"));

    tugu()
        .args(["-c", path_str, "config", "set", "network.kind", "metered"])
        .assert()
        .success();

    tugu()
        .args(["-c", path_str, "config", "get", "network.kind"])
        .assert()
        .success()
        .stdout(predicate::str::contains("metered"));

    tugu()
        .args(["-c", path_str, "config", "get", "runtime.nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration key not found"));
}

#[test]
fn test_config_set_rejects_invalid_value() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");

    tugu()
        .args(["-c", path.to_str().unwrap(), "config", "set", "runtime.num_threads", "many"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid value"));
}

#[test]
fn test_classify_missing_input() {
    tugu()
        .args(["classify", "does-not-exist.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_classify_with_missing_model() {
    let dir = TempDir::new().unwrap();
    let image = dir.path().join("monas.png");
    write_png(&image);
    let config = write_config(
        dir.path(),
        serde_json::json!({"kind": "bundled", "path": dir.path().join("absent.onnx")}),
        "unmetered",
    );

    tugu()
        .args(["-c", config.to_str().unwrap(), "classify", image.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("model file not found"));
}

#[test]
fn test_models_status_reports_missing_bundled_model() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        dir.path(),
        serde_json::json!({"kind": "bundled", "path": dir.path().join("absent.onnx")}),
        "unmetered",
    );

    tugu()
        .args(["-c", config.to_str().unwrap(), "models", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Model Status"))
        .stdout(predicate::str::contains("empty"));
}

#[test]
fn test_models_download_needs_remote_source() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        dir.path(),
        serde_json::json!({"kind": "bundled", "path": "model.onnx"}),
        "unmetered",
    );

    tugu()
        .args(["-c", config.to_str().unwrap(), "models", "download"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No remote model configured"));
}

#[test]
fn test_models_download_blocked_on_metered_network() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        dir.path(),
        serde_json::json!({
            "kind": "remote",
            "name": "monuments",
            "version": "1",
            "url": "http://127.0.0.1:9/monuments.onnx",
        }),
        "metered",
    );

    tugu()
        .args(["-c", config.to_str().unwrap(), "models", "download"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unmetered network"));
}

#[test]
fn test_models_download_reuses_cache_then_clean() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("cache")).unwrap();
    fs::write(dir.path().join("cache").join("monuments-1.onnx"), b"onnx").unwrap();
    let config = write_config(
        dir.path(),
        serde_json::json!({
            "kind": "remote",
            "name": "monuments",
            "version": "1",
            "url": "http://127.0.0.1:9/monuments.onnx",
        }),
        "offline",
    );

    tugu()
        .args(["-c", config.to_str().unwrap(), "models", "download"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already cached"));

    tugu()
        .args(["-c", config.to_str().unwrap(), "models", "clean"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 1 files"));
}
