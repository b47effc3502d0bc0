//! Integration tests for layerkv
//!
//! Drives complete command transcripts through a session

use layerkv::{OutputFormat, Session, SessionConfig, Store, TransactionalStore};
use std::io::Write;
use tempfile::NamedTempFile;
use tokio::io::BufReader;

/// Helper function to run a transcript and collect stdout
async fn run_transcript(input: &str, config: SessionConfig) -> (String, TransactionalStore) {
    let mut session = Session::new(TransactionalStore::new(), config);
    let mut output = Vec::new();
    session
        .run(BufReader::new(input.as_bytes()), &mut output)
        .await
        .unwrap();
    (String::from_utf8(output).unwrap(), session.into_store())
}

async fn run_text(input: &str) -> String {
    run_transcript(input, SessionConfig::default()).await.0
}

#[tokio::test]
async fn test_basic_commands() {
    let input = "SET ex 10\nGET ex\nUNSET ex\nGET ex\nEND\n";
    assert_eq!(run_text(input).await, "10\nNULL\n");
}

#[tokio::test]
async fn test_numequalto() {
    let input = "\
SET a 10
SET b 10
NUMEQUALTO 10
NUMEQUALTO 20
SET b 30
NUMEQUALTO 10
END
";
    assert_eq!(run_text(input).await, "2\n0\n1\n");
}

#[tokio::test]
async fn test_nested_rollback() {
    let input = "\
BEGIN
SET a 10
GET a
BEGIN
SET a 20
GET a
ROLLBACK
GET a
ROLLBACK
GET a
END
";
    assert_eq!(run_text(input).await, "10\n20\n10\nNULL\n");
}

#[tokio::test]
async fn test_commit_closes_every_transaction() {
    let input = "\
BEGIN
SET a 30
BEGIN
SET a 40
COMMIT
GET a
ROLLBACK
END
";
    assert_eq!(run_text(input).await, "40\nNO TRANSACTION\n");
}

#[tokio::test]
async fn test_unset_inside_transaction() {
    let input = "\
SET a 50
BEGIN
GET a
SET a 60
BEGIN
UNSET a
GET a
ROLLBACK
GET a
COMMIT
GET a
END
";
    assert_eq!(run_text(input).await, "50\nNULL\n60\n60\n");
}

#[tokio::test]
async fn test_numequalto_inside_transactions() {
    let input = "\
SET a 10
BEGIN
NUMEQUALTO 10
BEGIN
UNSET a
NUMEQUALTO 10
ROLLBACK
NUMEQUALTO 10
COMMIT
END
";
    assert_eq!(run_text(input).await, "1\n0\n1\n");
}

#[tokio::test]
async fn test_empty_stack_commands() {
    let (output, store) = run_transcript("ROLLBACK\nCOMMIT\n", SessionConfig::default()).await;
    assert_eq!(output, "NO TRANSACTION\nNO TRANSACTION\n");
    assert_eq!(store.depth(), 0);
}

#[tokio::test]
async fn test_unknown_and_incomplete_commands_are_ignored() {
    let input = "\
PING
SET onlykey
set a 1
GET a
GET onlykey
";
    let (output, store) = run_transcript(input, SessionConfig::default()).await;
    assert_eq!(output, "NULL\nNULL\n");
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_session_without_end_keeps_open_transaction() {
    let (output, store) =
        run_transcript("SET a 1\nBEGIN\nSET a 2\n", SessionConfig::default()).await;
    assert_eq!(output, "");
    assert_eq!(store.depth(), 1);
    assert_eq!(store.get("a"), Some("2"));
    assert_eq!(store.committed("a"), Some("1"));
}

#[tokio::test]
async fn test_json_transcript() {
    let config = SessionConfig {
        output_format: OutputFormat::Json,
        ..SessionConfig::default()
    };
    let input = "BEGIN\nGET missing\nNUMEQUALTO x\nCOMMIT\nCOMMIT\n";
    let (output, _) = run_transcript(input, config).await;

    let replies: Vec<serde_json::Value> = output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(
        replies,
        vec![
            serde_json::json!({ "command": "BEGIN" }),
            serde_json::json!({ "command": "GET", "key": "missing", "output": { "kind": "null" } }),
            serde_json::json!({
                "command": "NUMEQUALTO",
                "value": "x",
                "output": { "kind": "count", "value": 0 }
            }),
            serde_json::json!({ "command": "COMMIT" }),
            serde_json::json!({ "command": "COMMIT", "output": { "kind": "no_transaction" } }),
        ]
    );
}

#[tokio::test]
async fn test_config_file_drives_session() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, r#"{{ "output_format": "json", "log_level": "warn" }}"#).unwrap();

    let config = SessionConfig::from_file(file.path()).unwrap();
    assert_eq!(config.log_level, "warn");

    let (output, _) = run_transcript("GET a\n", config).await;
    let reply: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
    assert_eq!(reply["output"]["kind"], "null");
}

#[tokio::test]
async fn test_large_values() {
    let large_value = "x".repeat(1024 * 1024);
    let input = format!("SET large_key {}\nGET large_key\n", large_value);

    let output = run_text(&input).await;
    assert_eq!(output, format!("{}\n", large_value));
}

#[tokio::test]
async fn test_special_characters() {
    let input = "SET ключ_🚀 значение\r\nGET ключ_🚀\r\n";
    assert_eq!(run_text(input).await, "значение\n");
}
