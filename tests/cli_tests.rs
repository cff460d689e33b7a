use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const MANIFEST: &str = r#"{
    "types": [
        {
            "name": "media::Playable",
            "kind": "capability",
            "members": [{"name": "play", "returns": "static"}]
        },
        {
            "name": "media::Player",
            "capabilities": ["media::Playable"],
            "members": [
                {"name": "play", "returns": "static"},
                {"name": "volume", "returns": "int"},
                {"name": "stop", "returns": "void"},
                {
                    "name": "seek",
                    "params": [{
                        "name": "position",
                        "type": "int",
                        "default": {"kind": "literal", "value": "0"}
                    }],
                    "returns": "?int"
                }
            ]
        },
        {"name": "media::Locked", "is_final": true}
    ],
    "functions": [
        {"name": "media::now", "returns": "int"}
    ]
}"#;

fn write_manifest(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("manifest.json");
    std::fs::write(&path, MANIFEST).unwrap();
    path
}

fn standin(manifest: &Path) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("standin").unwrap();
    cmd.arg("--manifest").arg(manifest);
    cmd
}

#[test]
fn test_list_shows_manifest_and_builtins() {
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(&dir);

    standin(&manifest)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("media::Player"))
        .stdout(predicate::str::contains("media::now"))
        .stdout(predicate::str::contains("Countable"));
}

#[test]
fn test_describe_json() {
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(&dir);

    let output = standin(&manifest)
        .args(["describe", "media::Player", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["target"], "media::Player");
    assert_eq!(json["kind"], "class");
    assert!(json["class_name"]
        .as_str()
        .unwrap()
        .starts_with("Standin_Player_"));
    assert!(json["closure"]
        .as_array()
        .unwrap()
        .iter()
        .any(|name| name == "media::Playable"));

    let members = json["members"].as_array().unwrap();
    let play = members.iter().find(|m| m["name"] == "play").unwrap();
    assert_eq!(play["returns_self"], true);
    let stop = members.iter().find(|m| m["name"] == "stop").unwrap();
    assert_eq!(stop["mappable"], false);
}

#[test]
fn test_describe_human_readable() {
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(&dir);

    standin(&manifest)
        .args(["describe", "media::Player"])
        .assert()
        .success()
        .stdout(predicate::str::contains("proxy type: Standin_Player_"))
        .stdout(predicate::str::contains("play() -> static  [self-returning]"));
}

#[test]
fn test_describe_function() {
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(&dir);

    standin(&manifest)
        .args(["describe", "media::now"])
        .assert()
        .success()
        .stdout(predicate::str::contains("StandinFn_now_"));
}

#[test]
fn test_config_prefix() {
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(&dir);
    let config = dir.path().join("engine.json");
    std::fs::write(&config, r#"{"class_name_prefix": "Fake"}"#).unwrap();

    standin(&manifest)
        .arg("--config")
        .arg(&config)
        .args(["describe", "media::Player"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fake_Player_"));
}

#[test]
fn test_invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(&dir);
    let config = dir.path().join("engine.json");
    std::fs::write(&config, r#"{"class_name_prefix": "9 lives"}"#).unwrap();

    standin(&manifest)
        .arg("--config")
        .arg(&config)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("class_name_prefix"));
}

#[test]
fn test_resolve_member() {
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(&dir);

    standin(&manifest)
        .args(["resolve", "media::Player", "seek"])
        .assert()
        .success()
        .stdout(predicate::str::contains("seek(position: int = 0) -> ?int"));
}

#[test]
fn test_unknown_target_fails() {
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(&dir);

    standin(&manifest)
        .args(["describe", "media::Nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a registered type or function"));
}

#[test]
fn test_final_target_fails() {
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(&dir);

    standin(&manifest)
        .args(["describe", "media::Locked"])
        .assert()
        .failure();
}

#[test]
fn test_missing_manifest_fails() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.json");

    standin(&missing)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.json"));
}
