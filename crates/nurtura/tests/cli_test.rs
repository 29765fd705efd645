//! Integration tests for the `nurtura` CLI binary.
//!
//! Argument parsing, help output, completions and error exit codes run
//! without a backend; data commands run against a `wiremock` server.
#![allow(clippy::unwrap_used)]

use std::path::Path;
use std::process::Output;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `nurtura` binary with env isolation.
///
/// Clears all `NURTURA_*` env vars and points the config file at `config`
/// so tests never touch the user's real configuration.
fn nurtura_cmd(config: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("nurtura");
    cmd.env("NURTURA_CONFIG", config)
        .env("HOME", "/tmp/nurtura-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/nurtura-cli-test-nonexistent")
        .env("NO_COLOR", "1")
        .env_remove("NURTURA_PROFILE")
        .env_remove("NURTURA_OUTPUT")
        .env_remove("NURTURA_TOKEN")
        .env_remove("NURTURA_API_URL")
        .env_remove("NURTURA_TIMEOUT_SECS")
        .env_remove("NURTURA_DEFAULT_PROFILE")
        .env_remove("RUST_LOG");
    cmd
}

fn missing_config() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    (dir, path)
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Run the binary off the async runtime so the mock server keeps serving.
async fn run(mut cmd: assert_cmd::Command) -> Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

/// Command pre-wired with `--api-url` and `--token` for `server`.
fn against(server: &MockServer, config: &Path) -> assert_cmd::Command {
    let mut cmd = nurtura_cmd(config);
    cmd.args(["--api-url", &server.uri(), "--token", "test-token"]);
    cmd
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let (_dir, config) = missing_config();
    let output = nurtura_cmd(&config).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let (_dir, config) = missing_config();
    nurtura_cmd(&config).arg("--help").assert().success().stdout(
        predicate::str::contains("childcare")
            .and(predicate::str::contains("team"))
            .and(predicate::str::contains("invoices"))
            .and(predicate::str::contains("analytics")),
    );
}

#[test]
fn test_version_flag() {
    let (_dir, config) = missing_config();
    nurtura_cmd(&config)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("nurtura"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    let (_dir, config) = missing_config();
    nurtura_cmd(&config)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    let (_dir, config) = missing_config();
    nurtura_cmd(&config)
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honors_env() {
    let (_dir, config) = missing_config();
    nurtura_cmd(&config)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(config.display().to_string()));
}

#[test]
fn test_config_show_no_config() {
    let (_dir, config) = missing_config();
    nurtura_cmd(&config)
        .args(["config", "show", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"timeout_secs\": 20"));
}

#[test]
fn test_config_show_masks_token() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(
        &config,
        "[profiles.default]\napi_url = \"https://api.nurtura.app/api\"\ntoken = \"plain-secret\"\n",
    )
    .unwrap();

    nurtura_cmd(&config)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("plain-secret").not());
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let (_dir, config) = missing_config();
    let output = nurtura_cmd(&config).arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_team_list_without_api_url() {
    let (_dir, config) = missing_config();
    nurtura_cmd(&config)
        .args(["--token", "t", "team", "list"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No API URL configured"));
}

#[test]
fn test_invalid_output_format() {
    let (_dir, config) = missing_config();
    nurtura_cmd(&config)
        .args(["--output", "xml", "team", "list"])
        .assert()
        .code(2);
}

#[test]
fn test_bad_date_is_a_usage_error() {
    let (_dir, config) = missing_config();
    nurtura_cmd(&config)
        .args([
            "--api-url",
            "http://127.0.0.1:9/api",
            "--token",
            "t",
            "analytics",
            "revenue",
            "--from",
            "yesterday",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("YYYY-MM-DD"));
}

#[test]
fn test_destructive_command_needs_yes_without_tty() {
    let (_dir, config) = missing_config();
    nurtura_cmd(&config)
        .args([
            "--api-url",
            "http://127.0.0.1:9/api",
            "--token",
            "t",
            "users",
            "suspend",
            "u-1",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--yes"));
}

// ── Against a mock backend ──────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_team_list_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/team"))
        .and(query_param("page", "1"))
        .and(query_param("limit", "10"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "items": [
                    { "id": "m-1", "email": "ada@nurtura.app", "role": "admin", "status": "active" },
                    { "id": "m-2", "email": "bea@nurtura.app", "role": "manager", "status": "invited" }
                ],
                "meta": { "total": 2, "page": 1, "limit": 10 }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, config) = missing_config();
    let mut cmd = against(&server, &config);
    cmd.args(["-o", "json", "team", "list"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let page: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(page["items"][1]["email"], "bea@nurtura.app");
    assert_eq!(page["meta"]["total"], 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_profile_from_config_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/users"))
        .and(header("authorization", "Bearer file-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                { "id": "u-1", "email": "p@example.com", "role": "parent", "status": "active" },
                { "id": "u-2", "email": "q@example.com", "role": "provider", "status": "suspended" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(
        &config,
        format!(
            "default_profile = \"staging\"\n\n[profiles.staging]\napi_url = \"{}\"\ntoken = \"file-token\"\n",
            server.uri()
        ),
    )
    .unwrap();

    let mut cmd = nurtura_cmd(&config);
    cmd.args(["-o", "plain", "users", "list"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "u-1\nu-2\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_review_approve_notifies() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/admin/reviews/r-1/status"))
        .and(body_json(json!({ "status": "approved" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, config) = missing_config();
    let mut cmd = against(&server, &config);
    cmd.args(["reviews", "approve", "r-1"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Review updated"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_mutation_surfaces_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/team/invite"))
        .respond_with(
            ResponseTemplate::new(422)
                .set_body_json(json!({ "message": "Email already belongs to a team member" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, config) = missing_config();
    let mut cmd = against(&server, &config);
    cmd.args(["team", "invite", "ada@nurtura.app", "--role", "manager"]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(1));
    assert!(
        String::from_utf8_lossy(&output.stderr).contains("Email already belongs to a team member")
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_invoice_exits_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/invoices/inv-404"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not found" })))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, config) = missing_config();
    let mut cmd = against(&server, &config);
    cmd.args(["invoices", "show", "inv-404"]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(4));
    assert!(String::from_utf8_lossy(&output.stderr).contains("invoices list"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unauthorized_exits_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/analytics/overview"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, config) = missing_config();
    let mut cmd = against(&server, &config);
    cmd.args(["analytics", "overview"]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("set-token"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_subscription_cancel_with_yes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/subscriptions/sub-1/cancel"))
        .and(body_json(json!({ "atPeriodEnd": false, "reason": "moved away" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, config) = missing_config();
    let mut cmd = against(&server, &config);
    cmd.args([
        "-y",
        "subscriptions",
        "cancel",
        "sub-1",
        "--now",
        "--reason",
        "moved away",
    ]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Subscription cancelled"));
}
