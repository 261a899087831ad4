//! Integration tests for Contour CLI
//!
//! Tests end-to-end command behavior using the CLI binary against throwaway
//! git repositories in temp directories.

use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::process::{Command, Output};
use std::thread;

use serde_json::Value;
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// Get the path to the contour binary (built by cargo)
fn contour_binary() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_contour"));
    cmd.env_remove("CONTOUR_AUDIT_ENDPOINT")
        .env_remove("CONTOUR_AUDIT_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

/// Run contour with the given args in the specified directory
fn run_contour(dir: &Path, args: &[&str]) -> Output {
    contour_binary()
        .current_dir(dir)
        .args(args)
        .output()
        .expect("Failed to execute contour command")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_str(&stdout(output)).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({}):\n{}\nstderr:\n{}",
            e,
            stdout(output),
            stderr(output)
        )
    })
}

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .current_dir(dir)
        .args([
            "-c",
            "user.name=Contour Tests",
            "-c",
            "user.email=tests@contour.invalid",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .output()
        .expect("Failed to execute git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn write(dir: &Path, path: &str, content: &str) {
    let full = dir.join(path);
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent).expect("Failed to create directories");
    }
    fs::write(full, content).expect("Failed to write file");
}

fn commit(dir: &Path, message: &str) -> String {
    git(dir, &["add", "-A"]);
    git(dir, &["commit", "-q", "--allow-empty", "-m", message]);
    git(dir, &["rev-parse", "HEAD"])
}

const TOKEN: &str = r#"pragma solidity ^0.8.20;

contract Token {
    mapping(address => uint256) public balanceOf;

    function transfer(address to, uint256 amount) external returns (bool) {
        balanceOf[msg.sender] -= amount;
        balanceOf[to] += amount;
        return true;
    }
}
"#;

const TOKEN_WITH_APPROVE: &str = r#"pragma solidity ^0.8.20;

contract Token {
    mapping(address => uint256) public balanceOf;

    function transfer(address to, uint256 amount) external returns (bool) {
        balanceOf[msg.sender] -= amount;
        balanceOf[to] += amount;
        return true;
    }

    function approve(address, uint256) external;
}
"#;

/// A repository with two commits tagged `v1` and `v2`: `approve` is added
/// to Token, and a mock changes that the default rules exclude.
fn setup_repo() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    git(dir.path(), &["init", "-q"]);
    write(dir.path(), "contracts/Token.sol", TOKEN);
    write(dir.path(), "mocks/MockToken.sol", "contract MockToken {}\n");
    commit(dir.path(), "base");
    git(dir.path(), &["tag", "v1"]);

    write(dir.path(), "contracts/Token.sol", TOKEN_WITH_APPROVE);
    write(
        dir.path(),
        "mocks/MockToken.sol",
        "contract MockToken { function mint() external {} }\n",
    );
    commit(dir.path(), "head");
    git(dir.path(), &["tag", "v2"]);
    dir
}

/// Serve one HTTP request with `status`, returning the raw request text.
fn serve_once(status: &'static str) -> (String, thread::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let url = format!("http://{}/changes", listener.local_addr().unwrap());

    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("Failed to accept");
        let mut reader = BufReader::new(stream);
        let mut head = String::new();
        let mut content_length = 0;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                content_length = value.trim().parse().unwrap();
            }
            let done = line == "\r\n";
            head.push_str(&line);
            if done {
                break;
            }
        }
        let mut body = vec![0; content_length];
        reader.read_exact(&mut body).unwrap();

        let response = format!(
            "HTTP/1.1 {}\r\ncontent-length: 12\r\nconnection: close\r\n\r\n{{\"id\":\"r-1\"}}",
            status
        );
        reader.get_mut().write_all(response.as_bytes()).unwrap();
        head + &String::from_utf8_lossy(&body)
    });

    (url, handle)
}

// ============================================================================
// Analyze
// ============================================================================

#[test]
fn test_analyze_prints_json_report() {
    let repo = setup_repo();
    let output = run_contour(repo.path(), &["analyze", "v1", "v2"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let report = stdout_json(&output);
    assert_eq!(
        report,
        serde_json::json!([{
            "file": "contracts/Token.sol",
            "status": "M",
            "contracts": [{ "name": "Token", "type": "contract", "methods": ["approve"] }]
        }])
    );
}

#[test]
fn test_analyze_identical_revisions_prints_empty_array() {
    let repo = setup_repo();
    let output = run_contour(repo.path(), &["analyze", "v2", "v2"]);

    assert!(output.status.success());
    assert_eq!(stdout_json(&output), serde_json::json!([]));
}

#[test]
fn test_analyze_with_path_flag() {
    let repo = setup_repo();
    let elsewhere = TempDir::new().unwrap();
    let root = repo.path().to_str().unwrap();

    let output = run_contour(elsewhere.path(), &["analyze", "v1", "v2", "--path", root]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout_json(&output).as_array().unwrap().len(), 1);
}

#[test]
fn test_analyze_unknown_revision_fails() {
    let repo = setup_repo();
    let output = run_contour(repo.path(), &["analyze", "v1", "no-such-branch"]);

    assert!(!output.status.success());
    assert!(stdout(&output).trim().is_empty());
    assert!(stderr(&output).contains("no-such-branch"));
}

#[test]
fn test_analyze_outside_repository_fails() {
    let dir = TempDir::new().unwrap();
    let output = run_contour(dir.path(), &["analyze", "main", "HEAD"]);

    assert!(!output.status.success());
    assert!(stdout(&output).trim().is_empty());
}

#[test]
fn test_analyze_parse_failure_still_succeeds() {
    let repo = setup_repo();
    write(repo.path(), "contracts/Broken.sol", "contract Broken { function f( }\n");
    write(
        repo.path(),
        "contracts/Vault.sol",
        "contract Vault { function deposit() external {} }\n",
    );
    commit(repo.path(), "broken");

    let output = run_contour(repo.path(), &["analyze", "v2", "HEAD"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let report = stdout_json(&output);
    let entries = report.as_array().unwrap();
    assert_eq!(entries.len(), 2);

    let broken = entries
        .iter()
        .find(|e| e["file"] == "contracts/Broken.sol")
        .unwrap();
    assert_eq!(broken["status"], "A");
    assert!(broken["error"].is_string());
    assert!(broken.get("contracts").is_none());

    let vault = entries
        .iter()
        .find(|e| e["file"] == "contracts/Vault.sol")
        .unwrap();
    assert_eq!(vault["contracts"][0]["methods"], serde_json::json!(["deposit"]));
}

#[test]
fn test_analyze_writes_output_file() {
    let repo = setup_repo();
    let output = run_contour(
        repo.path(),
        &["analyze", "v1", "v2", "--output", "changes.json"],
    );

    assert!(output.status.success());
    let written = fs::read_to_string(repo.path().join("changes.json")).unwrap();
    let from_file: Value = serde_json::from_str(&written).unwrap();
    assert_eq!(from_file, stdout_json(&output));
}

#[test]
fn test_analyze_scopeignore_reincludes_mocks() {
    let repo = setup_repo();
    write(repo.path(), "audit.ignore", "!mocks/\n");

    let output = run_contour(
        repo.path(),
        &["analyze", "v1", "v2", "--scopeignore", "audit.ignore"],
    );

    assert!(output.status.success());
    let report = stdout_json(&output);
    let files: Vec<&str> = report
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["file"].as_str().unwrap())
        .collect();
    assert_eq!(files, vec!["contracts/Token.sol", "mocks/MockToken.sol"]);
}

#[test]
fn test_analyze_table_format_from_config() {
    let repo = setup_repo();
    write(repo.path(), ".contour.toml", "[output]\nformat = \"table\"\n");

    let output = run_contour(repo.path(), &["analyze", "v1", "v2"]);

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.starts_with("CHANGES: v1 -> v2"), "got: {}", out);
    assert!(out.contains("contract Token: approve"));
}

#[test]
fn test_format_flag_overrides_config() {
    let repo = setup_repo();
    write(repo.path(), ".contour.toml", "[output]\nformat = \"table\"\n");

    let output = run_contour(repo.path(), &["--format", "json", "analyze", "v1", "v2"]);

    assert!(output.status.success());
    assert!(stdout_json(&output).is_array());
}

#[test]
fn test_unparsable_config_falls_back_to_defaults() {
    let repo = setup_repo();
    write(repo.path(), ".contour.toml", "[output\nformat = ");

    let output = run_contour(repo.path(), &["analyze", "v1", "v2"]);

    assert!(output.status.success());
    assert!(stdout_json(&output).is_array());
    assert!(stderr(&output).contains(".contour.toml"));
}

// ============================================================================
// Submission
// ============================================================================

#[test]
fn test_analyze_dry_run_keeps_stdout_clean() {
    let repo = setup_repo();
    let output = contour_binary()
        .current_dir(repo.path())
        .env("CONTOUR_AUDIT_TOKEN", "tok-super-secret")
        .args([
            "analyze",
            "v1",
            "v2",
            "--dry-run",
            "--endpoint",
            "http://127.0.0.1:9/changes",
        ])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout_json(&output).as_array().unwrap().len(), 1);

    let err = stderr(&output);
    assert!(err.contains("DRY RUN: POST http://127.0.0.1:9/changes"));
    assert!(err.contains("Bearer [REDACTED]"));
    assert!(!err.contains("tok-super-secret"));
}

#[test]
fn test_analyze_submit_without_endpoint_fails() {
    let repo = setup_repo();
    let output = run_contour(repo.path(), &["analyze", "v1", "v2", "--submit"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("no audit endpoint"));
}

#[test]
fn test_analyze_submit_posts_report() {
    let repo = setup_repo();
    let (url, server) = serve_once("201 Created");

    let output = contour_binary()
        .current_dir(repo.path())
        .env("CONTOUR_AUDIT_TOKEN", "tok-1")
        .args(["analyze", "v1", "v2", "--submit", "--endpoint", &url])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let request = server.join().unwrap();
    let lower = request.to_ascii_lowercase();
    assert!(request.starts_with("POST /changes HTTP/1.1"));
    assert!(lower.contains("authorization: bearer tok-1"));
    assert!(lower.contains("x-contour-base: v1"));
    assert!(lower.contains("x-contour-head: v2"));
    assert!(request.ends_with(r#""methods":["approve"]}]}]"#));
    assert!(stderr(&output).contains("SUBMITTED:"));
}

#[test]
fn test_submit_dry_run_reads_report_file() {
    let repo = setup_repo();
    write(
        repo.path(),
        "changes.json",
        r#"[{"file":"contracts/Token.sol","status":"M","contracts":[{"name":"Token","type":"contract","methods":["approve"]}]}]"#,
    );

    let output = run_contour(
        repo.path(),
        &[
            "submit",
            "changes.json",
            "--dry-run",
            "--endpoint",
            "https://audit.invalid/changes",
        ],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let preview = stdout_json(&output);
    assert_eq!(preview["endpoint"], "https://audit.invalid/changes");
    assert_eq!(preview["files"], 1);
}

#[test]
fn test_submit_reads_config_from_path() {
    let repo = setup_repo();
    write(
        repo.path(),
        ".contour.toml",
        "[submit]\nendpoint = \"https://audit.invalid/from-config\"\n",
    );
    write(repo.path(), "changes.json", "[]");
    let elsewhere = TempDir::new().unwrap();
    let report = repo.path().join("changes.json");

    let output = run_contour(
        elsewhere.path(),
        &[
            "submit",
            report.to_str().unwrap(),
            "--path",
            repo.path().to_str().unwrap(),
            "--dry-run",
        ],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(
        stdout_json(&output)["endpoint"],
        "https://audit.invalid/from-config"
    );
}

#[test]
fn test_submit_rejects_non_report_file() {
    let repo = setup_repo();
    write(repo.path(), "notes.json", r#"{"hello": "world"}"#);

    let output = run_contour(
        repo.path(),
        &["submit", "notes.json", "--dry-run", "--endpoint", "https://audit.invalid"],
    );

    assert!(!output.status.success());
    assert!(stderr(&output).contains("not a change report"));
}

// ============================================================================
// Rules and general behavior
// ============================================================================

#[test]
fn test_rules_lists_defaults_then_ignore_file() {
    let repo = setup_repo();
    write(repo.path(), ".scopeignore", "# local\nscript/\n");

    let output = run_contour(repo.path(), &["rules"]);

    assert!(output.status.success());
    let rules = stdout_json(&output);
    assert_eq!(rules["ignore_file_found"], true);
    assert_eq!(rules["extension"], "sol");
    let list = rules["rules"].as_array().unwrap();
    assert_eq!(list[0]["origin"], "default");
    let last = list.last().unwrap();
    assert_eq!(last["pattern"], "script/");
    assert_eq!(last["origin"], "user");
    assert_eq!(last["polarity"], "exclude");
}

#[test]
fn test_no_command_prints_help() {
    let dir = TempDir::new().unwrap();
    let output = run_contour(dir.path(), &[]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("Usage:"));
}

#[test]
fn test_version_flag() {
    let dir = TempDir::new().unwrap();
    let output = run_contour(dir.path(), &["--version"]);

    assert!(output.status.success());
    assert!(stdout(&output).starts_with("contour "));
}
