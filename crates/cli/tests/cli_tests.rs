#![allow(deprecated)] // cargo_bin is deprecated but still functional

use assert_cmd::Command;
use httpmock::Method::{GET, POST};
use httpmock::MockServer;
use predicates::str::contains;
use std::fs;
use std::net::TcpListener;
use tempfile::TempDir;

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

fn revalctl() -> Command {
    let mut cmd = Command::cargo_bin("revalctl").unwrap();
    cmd.env_remove("REVALIDATOR_SERVER")
        .env_remove("REVALIDATOR_SECRET")
        .env_remove("REVALIDATOR_CLIENT_CONFIG");
    cmd
}

fn mock_health(server: &MockServer) {
    server.mock(|when, then| {
        when.method(GET).path("/api/health");
        then.status(200).json_body(serde_json::json!({
            "status": "ok",
            "version": "0.1.0",
            "backend": "memory"
        }));
    });
}

#[test]
fn login_writes_profile_and_default() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    mock_health(&server);

    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("client.toml");
    let expected_url = server.base_url().trim_end_matches('/').to_string();

    revalctl()
        .arg("login")
        .arg("prod")
        .arg(server.base_url())
        .arg("--secret-stdin")
        .arg("--client-config")
        .arg(&config_path)
        .write_stdin("s3cret\n")
        .assert()
        .success()
        .stdout(contains("Saved profile 'prod'"));

    let contents = fs::read_to_string(&config_path).unwrap();
    let value: toml::Value = toml::from_str(&contents).unwrap();
    assert_eq!(
        value.get("default_profile").and_then(|v| v.as_str()),
        Some("prod")
    );
    let profile = value
        .get("profiles")
        .and_then(|v| v.get("prod"))
        .and_then(|v| v.as_table())
        .unwrap();
    assert_eq!(
        profile.get("url").and_then(|v| v.as_str()).unwrap(),
        expected_url
    );
    assert_eq!(
        profile.get("secret").and_then(|v| v.as_str()).unwrap(),
        "s3cret"
    );
}

#[test]
fn scope_uses_saved_profile() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    let nuclear = server.mock(|when, then| {
        when.method(POST)
            .path("/api/revalidate/nuclear")
            .json_body(serde_json::json!({ "secret": "s3cret" }));
        then.status(200).json_body(serde_json::json!({
            "success": true,
            "revalidated": true,
            "message": "Nuclear revalidation complete",
            "status": "ok",
            "outcomes": [
                { "target": { "kind": "path", "value": "/" }, "succeeded": true }
            ],
            "now": 1_700_000_000_000i64
        }));
    });

    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("client.toml");
    fs::write(
        &config_path,
        format!(
            "default_profile = \"prod\"\n\n[profiles.prod]\nurl = \"{}\"\nsecret = \"s3cret\"\n",
            server.base_url()
        ),
    )
    .unwrap();

    revalctl()
        .arg("scope")
        .arg("nuclear")
        .arg("--client-config")
        .arg(&config_path)
        .assert()
        .success()
        .stdout(contains("Nuclear revalidation complete"))
        .stdout(contains("path:/"));

    nuclear.assert();
}

#[test]
fn partial_failure_exits_non_zero() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/revalidate");
        then.status(200).json_body(serde_json::json!({
            "success": false,
            "revalidated": false,
            "message": "Revalidation completed with 1 failure(s)",
            "error": "tag:faqs: purge endpoint unreachable",
            "status": "partial_failure",
            "outcomes": [
                {
                    "target": { "kind": "tag", "value": "faqs" },
                    "succeeded": false,
                    "error": "purge endpoint unreachable"
                }
            ],
            "now": 1_700_000_000_000i64
        }));
    });

    revalctl()
        .arg("revalidate")
        .arg("--tag")
        .arg("faqs")
        .arg("--server")
        .arg(server.base_url())
        .arg("--secret")
        .arg("s3cret")
        .assert()
        .failure()
        .stdout(contains("FAIL tag:faqs"))
        .stderr(contains("purge endpoint unreachable"));
}

#[test]
fn use_switches_default_profile() {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("client.toml");
    fs::write(
        &config_path,
        "default_profile = \"prod\"\n\n\
         [profiles.prod]\nurl = \"https://studio.example.com\"\nsecret = \"a\"\n\n\
         [profiles.staging]\nurl = \"https://staging.example.com\"\nsecret = \"b\"\n",
    )
    .unwrap();

    revalctl()
        .arg("use")
        .arg("staging")
        .arg("--client-config")
        .arg(&config_path)
        .assert()
        .success();

    let value: toml::Value = toml::from_str(&fs::read_to_string(&config_path).unwrap()).unwrap();
    assert_eq!(
        value.get("default_profile").and_then(|v| v.as_str()),
        Some("staging")
    );

    revalctl()
        .arg("use")
        .arg("missing")
        .arg("--client-config")
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(contains("profile 'missing' not found"));
}

#[test]
fn server_flag_requires_secret() {
    revalctl()
        .arg("scope")
        .arg("rebuild")
        .arg("--server")
        .arg("https://studio.example.com")
        .assert()
        .failure()
        .stderr(contains("use both --server and --secret"));
}

#[test]
fn unknown_scope_is_rejected_by_parser() {
    revalctl()
        .arg("scope")
        .arg("everything")
        .assert()
        .failure()
        .stderr(contains("unknown scope"));
}

#[test]
fn revalidate_requires_path_or_tag() {
    revalctl()
        .arg("revalidate")
        .arg("--server")
        .arg("https://studio.example.com")
        .arg("--secret")
        .arg("s3cret")
        .assert()
        .failure();
}
