//! CLI integration tests
//!
//! Nothing here touches the network: commands either need no source, fail in
//! the registry, or are answered from a prefilled store.
use std::path::{Path, PathBuf};

use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;

/// 2100-01-01, in Unix milliseconds.
const FAR_FUTURE: i64 = 4_102_444_800_000;

fn cmd() -> assert_cmd::Command {
    assert_cmd::cargo::cargo_bin_cmd!("panelkit")
}

fn store_path(tmp: &TempDir) -> PathBuf {
    tmp.path().join("store.json")
}

fn cmd_with_store(path: &Path) -> assert_cmd::Command {
    let mut cmd = cmd();
    cmd.arg("--store").arg(path);
    cmd
}

fn cache_entry(kind: &str, params: Value, value: Value, expire_at: i64) -> (String, String) {
    let key = format!("panelkit:cache:{}:{}", kind, params);
    let entry = json!({ "key": key, "value": value, "createdAt": 0, "expireAt": expire_at });
    (key, entry.to_string())
}

fn write_store(path: &Path, entries: &[(String, String)]) {
    let map: serde_json::Map<String, Value> =
        entries.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect();
    std::fs::write(path, Value::Object(map).to_string()).unwrap();
}

fn hot_page() -> Value {
    json!({
        "comics": [{
            "id": "31045",
            "title": "Star Walker",
            "cover": "https://img.mhcdn.net/cover/31045.jpg",
            "latestChapter": "Ch. 58",
            "status": "ongoing",
            "updateTime": "2024-06-02"
        }],
        "hasMore": true,
        "total": 1
    })
}

#[test]
fn test_cli_sources() {
    let tmp = TempDir::new().unwrap();
    cmd_with_store(&store_path(&tmp))
        .arg("sources")
        .assert()
        .success()
        .stdout(predicate::str::contains("mangahaven"))
        .stdout(predicate::str::contains("comicpark"))
        .stdout(predicate::str::contains("toonvault").not());
}

#[test]
fn test_cli_sources_all_json() {
    let tmp = TempDir::new().unwrap();
    let output = cmd_with_store(&store_path(&tmp))
        .args(["sources", "--all", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let sources: Value = serde_json::from_slice(&output.stdout).unwrap();
    let sources = sources.as_array().unwrap();
    assert_eq!(sources.len(), 4);
    assert_eq!(sources[2]["id"], "toonvault");
    assert_eq!(sources[2]["enabled"], false);
    assert!(sources[0].get("baseUrl").is_some());
}

#[test]
fn test_cli_unknown_source_fails() {
    let tmp = TempDir::new().unwrap();
    cmd_with_store(&store_path(&tmp))
        .args(["hot", "--source", "unknown-id"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown source: unknown-id"));
}

#[test]
fn test_cli_disabled_source_fails() {
    let tmp = TempDir::new().unwrap();
    cmd_with_store(&store_path(&tmp))
        .args(["-s", "toonvault", "categories"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("disabled"));
}

#[test]
fn test_cli_unimplemented_source_fails() {
    let tmp = TempDir::new().unwrap();
    cmd_with_store(&store_path(&tmp))
        .args(["detail", "1", "--source", "inkstone"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no adapter"));
}

#[test]
fn test_cli_invalid_format() {
    cmd().args(["sources", "--format", "yaml"]).assert().failure();
}

#[test]
fn test_cli_invalid_proxy() {
    let tmp = TempDir::new().unwrap();
    cmd_with_store(&store_path(&tmp))
        .args(["hot", "--proxy", "ftp://host:21"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported proxy scheme"));
}

#[test]
fn test_cli_empty_cache_stats() {
    let tmp = TempDir::new().unwrap();
    let output = cmd_with_store(&store_path(&tmp))
        .args(["cache", "stats", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stats: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats["total"], 0);
    assert_eq!(stats["sizeBytes"], 0);
}

#[test]
fn test_cli_hot_served_from_cache() {
    let tmp = TempDir::new().unwrap();
    let path = store_path(&tmp);
    let params = json!({ "source": "mangahaven", "page": 1, "limit": 20 });
    write_store(&path, &[cache_entry("hot_comics", params, hot_page(), FAR_FUTURE)]);

    cmd_with_store(&path)
        .arg("hot")
        .assert()
        .success()
        .stdout(predicate::str::contains("Star Walker"))
        .stdout(predicate::str::contains("31045"));

    let output = cmd_with_store(&path).args(["hot", "--format", "json"]).output().unwrap();
    let page: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(page, hot_page());
}

#[test]
fn test_cli_cache_stats_and_clear_expired() {
    let tmp = TempDir::new().unwrap();
    let path = store_path(&tmp);
    write_store(
        &path,
        &[
            cache_entry("hot_comics", json!({ "source": "mangahaven", "page": 1, "limit": 20 }), hot_page(), FAR_FUTURE),
            cache_entry("categories", json!({ "source": "comicpark" }), json!({ "categories": [], "total": 0 }), 1),
            ("panelkit:proxy".to_string(), r#"{"enabled":false}"#.to_string()),
        ],
    );

    let output = cmd_with_store(&path).args(["cache", "stats", "-f", "json"]).output().unwrap();
    let stats: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["active"], 1);
    assert_eq!(stats["expired"], 1);

    cmd_with_store(&path)
        .args(["cache", "clear-expired"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Removed 1 expired entries"));

    let stored: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let keys: Vec<&String> = stored.as_object().unwrap().keys().collect();
    assert_eq!(keys.len(), 2);
    assert!(keys.iter().any(|k| k.as_str() == "panelkit:proxy"));
}

#[test]
fn test_cli_cache_clear_keeps_other_keys() {
    let tmp = TempDir::new().unwrap();
    let path = store_path(&tmp);
    write_store(
        &path,
        &[
            cache_entry("hot_comics", json!({ "source": "mangahaven", "page": 1, "limit": 20 }), hot_page(), FAR_FUTURE),
            cache_entry("hot_comics", json!({ "source": "mangahaven", "page": 2, "limit": 20 }), hot_page(), FAR_FUTURE),
            ("panelkit:proxy".to_string(), r#"{"enabled":false}"#.to_string()),
        ],
    );

    let output = cmd_with_store(&path).args(["cache", "clear", "--format", "json"]).output().unwrap();
    let result: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["removed"], 2);

    let stored: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(stored.as_object().unwrap().len(), 1);
}

#[test]
fn test_cli_malformed_store_fails() {
    let tmp = TempDir::new().unwrap();
    let path = store_path(&tmp);
    std::fs::write(&path, "not json").unwrap();

    cmd_with_store(&path)
        .arg("sources")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open store"));
}

#[test]
fn test_cli_verbose() {
    let tmp = TempDir::new().unwrap();
    cmd_with_store(&store_path(&tmp))
        .args(["-v", "sources"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Panelkit"));
}
