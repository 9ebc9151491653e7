use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn webpacker(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("webpacker").unwrap();
    cmd.current_dir(dir)
        .env("WEBPACKER_ESBUILD", dir.join("no-such-esbuild"))
        .env_remove("RUST_LOG")
        .env_remove("WEBPACKER_CONFIG");
    cmd
}

fn write(dir: &Path, rel: &str, content: &str) {
    let path = dir.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn help_lists_commands() {
    let dir = TempDir::new().unwrap();

    webpacker(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("production"))
        .stdout(predicate::str::contains("server"))
        .stdout(predicate::str::contains("init"));
}

#[test]
fn init_writes_config_once() {
    let dir = TempDir::new().unwrap();

    webpacker(dir.path())
        .args(["init", "-o", "."])
        .assert()
        .success()
        .stderr(predicate::str::contains("created successfully"));

    let content = fs::read_to_string(dir.path().join("webpacker.toml")).unwrap();
    assert!(content.contains("[entries]"));

    webpacker(dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn missing_config_fails() {
    let dir = TempDir::new().unwrap();

    webpacker(dir.path())
        .args(["-c", "missing.toml", "production"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn production_with_unmatched_entries_copies_and_writes_manifest() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "webpacker.toml",
        r#"
output_path = "dist"
public_path = "/static/"

[entries]
"js/app.js" = "src/*.js"

[copies]
"index.html" = "public/index.html"
"#,
    );
    write(dir.path(), "public/index.html", "<html></html>");

    webpacker(dir.path())
        .args(["--json", "prod"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"hash\""))
        .stdout(predicate::str::contains("js/app.js: no entry found"));

    assert!(dir.path().join("dist/index.html").is_file());

    let manifest: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("asset-hash.json")).unwrap(),
    )
    .unwrap();
    assert!(manifest["hash"].is_string());
    assert!(manifest["fullHash"].is_string());
}

#[test]
fn missing_esbuild_is_reported() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "webpacker.toml",
        "output_path = \"dist\"\n\n[entries]\n\"js/[name]\" = \"src/*.js\"\n",
    );
    write(dir.path(), "src/app.js", "console.log('app');");

    webpacker(dir.path())
        .arg("development")
        .assert()
        .failure()
        .stderr(predicate::str::contains("is esbuild installed"));
}
