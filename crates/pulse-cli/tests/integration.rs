#![allow(deprecated)]
use assert_cmd::Command;
use chrono::{TimeDelta, Utc};
use mockito::Matcher;
use predicates::prelude::*;
use pulse_core::config::{BackendConfig, Config};
use std::path::PathBuf;
use tempfile::TempDir;

const TOKEN_ENV: &str = "PULSE_IT_TOKEN";

fn pulse(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("pulse").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env_remove("PULSE_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(home: &TempDir, endpoint: &str) -> PathBuf {
    let mut config = Config::new("ws-1");
    config.primary = BackendConfig {
        endpoint: endpoint.to_string(),
        token_env: TOKEN_ENV.to_string(),
    };
    let path = home.path().join("config.yaml");
    config.save(&path).unwrap();
    path
}

// ---------------------------------------------------------------------------
// pulse activity
// ---------------------------------------------------------------------------

#[test]
fn bad_time_expression_is_a_usage_error() {
    let home = TempDir::new().unwrap();
    pulse(&home)
        .args(["activity", "--from", "abc"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid time format 'abc'"));
}

#[test]
fn inverted_window_is_a_usage_error() {
    let home = TempDir::new().unwrap();
    pulse(&home)
        .args(["activity", "--from", "now", "--to", "2d"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid time window"));
}

#[test]
fn activity_without_config_fails() {
    let home = TempDir::new().unwrap();
    pulse(&home)
        .arg("activity")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not configured"));
}

#[test]
fn activity_without_token_fails() {
    let home = TempDir::new().unwrap();
    let config = write_config(&home, "https://tracker.invalid/graphql");
    pulse(&home)
        .env_remove(TOKEN_ENV)
        .arg("--config")
        .arg(&config)
        .arg("activity")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(TOKEN_ENV));
}

/// A tracker with one in-progress issue updated an hour ago.
fn tracker_server() -> mockito::ServerGuard {
    let mut server = mockito::Server::new();
    let updated = (Utc::now() - TimeDelta::hours(1)).to_rfc3339();

    server
        .mock("POST", "/graphql")
        .match_header("authorization", "Bearer it-token")
        .match_body(Matcher::Regex("query WorkspacePipelines".into()))
        .with_body(
            serde_json::json!({"data": {"workspace": {"pipelinesConnection": {
                "nodes": [{"id": "p1", "name": "In Progress"}]
            }}}})
            .to_string(),
        )
        .create();
    server
        .mock("POST", "/graphql")
        .match_body(Matcher::Regex("query PipelineIssues".into()))
        .with_body(
            serde_json::json!({"data": {"searchIssuesByPipeline": {
                "nodes": [{
                    "id": "i1",
                    "number": 42,
                    "title": "Fix login redirect",
                    "createdAt": "2024-01-01T00:00:00Z",
                    "updatedAt": updated,
                    "pullRequest": false,
                    "repository": {"ghId": 1000, "name": "api", "ownerName": "acme"},
                    "assignees": {"nodes": [{"login": "octo"}]},
                    "pipelineIssue": {"pipeline": {"id": "p1", "name": "In Progress"}}
                }],
                "pageInfo": {"hasNextPage": false, "endCursor": null}
            }}})
            .to_string(),
        )
        .create();
    server
        .mock("POST", "/graphql")
        .match_body(Matcher::Regex("query ClosedIssues".into()))
        .with_body(r#"{"data": {"searchClosedIssues": {"nodes": [], "pageInfo": {"hasNextPage": false}}}}"#)
        .create();
    server
}

#[test]
fn activity_renders_items_from_the_tracker() {
    let server = tracker_server();
    let home = TempDir::new().unwrap();
    let config = write_config(&home, &format!("{}/graphql", server.url()));

    pulse(&home)
        .env(TOKEN_ENV, "it-token")
        .arg("--config")
        .arg(&config)
        .args(["activity", "--from", "2d", "--no-cache"])
        .assert()
        .success()
        .stdout(predicate::str::contains("In Progress"))
        .stdout(predicate::str::contains("api#42  Fix login redirect [octo]"))
        .stdout(predicate::str::contains("1 item(s) in 1 group(s)"));

    let out = pulse(&home)
        .env(TOKEN_ENV, "it-token")
        .arg("--config")
        .arg(&config)
        .args(["activity", "--from", "2d", "--no-cache", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(report["summary"]["item_count"], 1);
    assert_eq!(report["items"][0]["ref"], "api#42");
    assert_eq!(report["items"][0]["placement"], "In Progress");
}

#[test]
fn missing_secondary_token_is_reported_as_the_reason() {
    let server = tracker_server();
    let home = TempDir::new().unwrap();
    let mut config = Config::new("ws-1");
    config.primary = BackendConfig {
        endpoint: format!("{}/graphql", server.url()),
        token_env: TOKEN_ENV.to_string(),
    };
    config.secondary = Some(BackendConfig {
        endpoint: format!("{}/host", server.url()),
        token_env: "PULSE_IT_HOST_TOKEN".to_string(),
    });
    let path = home.path().join("config.yaml");
    config.save(&path).unwrap();

    pulse(&home)
        .env(TOKEN_ENV, "it-token")
        .env_remove("PULSE_IT_HOST_TOKEN")
        .arg("--config")
        .arg(&path)
        .args(["activity", "--from", "2d", "--no-cache", "--github"])
        .assert()
        .success()
        .stdout(predicate::str::contains("api#42"))
        .stderr(predicate::str::contains("secondary backend unavailable"))
        .stderr(predicate::str::contains("PULSE_IT_HOST_TOKEN"))
        .stderr(predicate::str::contains("not configured").not());
}

#[test]
fn unknown_pipeline_filter_fails() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/graphql")
        .match_body(Matcher::Regex("query WorkspacePipelines".into()))
        .with_body(r#"{"data": {"workspace": {"pipelinesConnection": {"nodes": [{"id": "p1", "name": "Backlog"}]}}}}"#)
        .create();

    let home = TempDir::new().unwrap();
    let config = write_config(&home, &format!("{}/graphql", server.url()));

    pulse(&home)
        .env(TOKEN_ENV, "it-token")
        .arg("--config")
        .arg(&config)
        .args(["activity", "--pipeline", "Review", "--no-cache"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("pipeline not found: Review"));
}

// ---------------------------------------------------------------------------
// pulse config
// ---------------------------------------------------------------------------

#[test]
fn config_validate_accepts_defaults() {
    let home = TempDir::new().unwrap();
    let config = write_config(&home, "https://api.zenhub.com/public/graphql");
    pulse(&home)
        .arg("--config")
        .arg(&config)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));
}

#[test]
fn config_validate_reports_errors() {
    let home = TempDir::new().unwrap();
    let config = write_config(&home, "");
    pulse(&home)
        .arg("--config")
        .arg(&config)
        .args(["config", "validate"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("[error] primary.endpoint is empty"))
        .stderr(predicate::str::contains("config validation found errors"));
}

#[test]
fn config_show_json_reads_env_path() {
    let home = TempDir::new().unwrap();
    let config = write_config(&home, "https://api.zenhub.com/public/graphql");
    let out = pulse(&home)
        .env("PULSE_CONFIG", &config)
        .args(["config", "show", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(value["workspace"]["id"], "ws-1");
    assert_eq!(value["primary"]["token_env"], TOKEN_ENV);
}

#[test]
fn config_show_defaults_to_home_directory() {
    let home = TempDir::new().unwrap();
    std::fs::create_dir_all(home.path().join(".pulse")).unwrap();
    Config::new("ws-home")
        .save(&home.path().join(".pulse/config.yaml"))
        .unwrap();

    pulse(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ws-home"));
}

// ---------------------------------------------------------------------------
// pulse cache
// ---------------------------------------------------------------------------

#[test]
fn cache_clear_removes_workspace_entries() {
    let home = TempDir::new().unwrap();
    let config = write_config(&home, "https://api.zenhub.com/public/graphql");
    let cache_dir = home.path().join(".pulse/cache/ws-1");
    std::fs::create_dir_all(&cache_dir).unwrap();
    std::fs::write(cache_dir.join("pipelines.json"), "{}").unwrap();
    std::fs::write(cache_dir.join("repositories.json"), "{}").unwrap();

    pulse(&home)
        .arg("--config")
        .arg(&config)
        .args(["cache", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ws-1"));

    assert!(!cache_dir.join("pipelines.json").exists());
    assert!(!cache_dir.join("repositories.json").exists());
}

#[test]
fn help_lists_commands() {
    let home = TempDir::new().unwrap();
    pulse(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("activity"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("cache"));
}
