//! End-to-end tests for the `lectern` binary
//!
//! These cover argument handling, configuration precedence, and the
//! commands that only need the API (no ffprobe, no real storage).

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::{
    matchers::{body_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

/// `lectern` with an isolated config file location and no ambient token
fn lectern(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("lectern").unwrap();
    cmd.env("LECTERN_CONFIG", config_dir.path().join("config.toml"))
        .env_remove("LECTERN_ACCESS_TOKEN")
        .env_remove("LECTERN_SERVER_URL")
        .env_remove("LECTERN_API_PREFIX")
        .env_remove("LOG_LEVEL")
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_no_subcommand_exits_with_usage_code() {
    let dir = TempDir::new().unwrap();
    lectern(&dir)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("A subcommand is required"));
}

#[test]
fn test_markdown_help() {
    let dir = TempDir::new().unwrap();
    lectern(&dir)
        .arg("--markdown-help")
        .assert()
        .success()
        .stdout(predicate::str::contains("lectern upload"));
}

#[test]
fn test_config_get_precedence() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "server_url = \"https://from-file.example\"\ncredential_ttl_secs = 300\n",
    )
    .unwrap();

    lectern(&dir)
        .args(["config", "get", "server_url"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://from-file.example"));

    lectern(&dir)
        .env("LECTERN_SERVER_URL", "https://from-env.example")
        .args(["config", "get", "server_url"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://from-env.example"));

    lectern(&dir)
        .env("LECTERN_SERVER_URL", "https://from-env.example")
        .args(["--server-url", "https://from-flag.example", "config", "get", "server_url"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://from-flag.example"));

    lectern(&dir)
        .args(["config", "get", "credential_ttl_secs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("300"));
}

#[test]
fn test_invalid_log_level_is_reported_and_ignored() {
    let dir = TempDir::new().unwrap();
    lectern(&dir)
        .env("LOG_LEVEL", "loud")
        .args(["config", "path"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Warning: Ignored invalid logging settings"))
        .stderr(predicate::str::contains("LOG_LEVEL"));
}

#[test]
fn test_config_get_unknown_key() {
    let dir = TempDir::new().unwrap();
    lectern(&dir)
        .args(["config", "get", "cache_dir"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown config key"));
}

#[test]
fn test_config_path_points_at_override() {
    let dir = TempDir::new().unwrap();
    lectern(&dir)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"))
        .stdout(predicate::str::contains("not present"));
}

#[test]
fn test_probe_rejects_non_video() {
    let dir = TempDir::new().unwrap();
    let image = dir.path().join("slide.png");
    std::fs::write(&image, b"\x89PNG").unwrap();

    lectern(&dir)
        .arg("probe")
        .arg(&image)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not a video"));
}

#[test]
fn test_probe_missing_file() {
    let dir = TempDir::new().unwrap();
    lectern(&dir)
        .args(["probe", "/nonexistent/lesson.mp4"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn test_upload_rejects_blank_title_before_network() {
    let dir = TempDir::new().unwrap();
    let video = dir.path().join("intro.mp4");
    std::fs::write(&video, [0u8; 16]).unwrap();

    lectern(&dir)
        .arg("upload")
        .arg(&video)
        .args(["--chapter", "3", "--title", "   ", "--token", "t"])
        .args(["--server-url", "http://127.0.0.1:9"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("title must not be empty"));
}

#[tokio::test]
async fn test_lesson_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/lessons/77"))
        .and(header("authorization", "Bearer t0ken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {
                "id": 77,
                "title": "Intro to Ownership",
                "videoStatus": "READY",
                "videoObjectKey": "lessons/77/5f0c2a.mp4",
                "durationSeconds": 125
            }
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    lectern(&dir)
        .args(["lesson", "status", "77", "--token", "t0ken", "--server-url"])
        .arg(server.uri())
        .assert()
        .success()
        .stdout(predicate::str::contains("READY"))
        .stdout(predicate::str::contains("2:05"));
}

#[tokio::test]
async fn test_lesson_status_wait_refuses_lesson_without_video() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/lessons/12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": 12,
            "videoStatus": null
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    lectern(&dir)
        .args(["lesson", "status", "12", "--wait", "--token", "t", "--server-url"])
        .arg(server.uri())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("has no video"));
}

#[tokio::test]
async fn test_missing_token_is_reported() {
    let server = MockServer::start().await;

    let dir = TempDir::new().unwrap();
    lectern(&dir)
        .args(["lesson", "status", "77", "--server-url"])
        .arg(server.uri())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("LECTERN_ACCESS_TOKEN"));

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_token_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/lessons/77"))
        .and(header("authorization", "Bearer from-file"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 77})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let token_path = dir.path().join("token");
    std::fs::write(&token_path, "from-file\n").unwrap();

    lectern(&dir)
        .args(["lesson", "status", "77", "--token-file"])
        .arg(&token_path)
        .arg("--server-url")
        .arg(server.uri())
        .assert()
        .success()
        .stdout(predicate::str::contains("NONE"));
}

#[tokio::test]
async fn test_complete_sends_handoff() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/lessons/77/upload-complete"))
        .and(body_json(serde_json::json!({
            "objectKey": "lessons/77/5f0c2a.mp4",
            "durationSeconds": 125
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": 77,
            "videoStatus": "UPLOADED"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    lectern(&dir)
        .args([
            "complete",
            "--lesson",
            "77",
            "--object-key",
            "lessons/77/5f0c2a.mp4",
            "--duration",
            "125",
            "--token",
            "t",
            "--server-url",
        ])
        .arg(server.uri())
        .assert()
        .success()
        .stdout(predicate::str::contains("UPLOADED"));
}

#[tokio::test]
async fn test_video_delete() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/lessons/77/video"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    lectern(&dir)
        .args(["video", "delete", "77", "--token", "t", "--server-url"])
        .arg(server.uri())
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed the video from lesson 77"));
}

#[tokio::test]
async fn test_video_delete_surfaces_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/lessons/77/video"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(serde_json::json!({"message": "Lesson not found"})),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    lectern(&dir)
        .args(["video", "delete", "77", "--token", "t", "--server-url"])
        .arg(server.uri())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Lesson not found"));
}
