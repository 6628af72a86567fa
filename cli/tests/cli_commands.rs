//! Runs the `console` binary for the commands that need no identity gateway

use std::process::{Command, Output};

fn console(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_console"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("Failed to run console binary")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim_end().to_string()
}

const FIELDS: &str = r#"[
    {"key":"name","name":"Name","dataType":"string"},
    {"key":"age","name":"Age","dataType":"int"}
]"#;

#[test]
fn test_compile_prints_dsl() {
    let output = console(&[
        "compile",
        "--fields",
        FIELDS,
        "--conditions",
        r#"[
            {"id":"1","field":"name","operator":"==","value":"Acme"},
            {"id":"2","field":"age","operator":">","value":30,"logicalOperator":"OR"},
            {"id":"3","field":"ghost","operator":"==","value":"x","logicalOperator":"AND"}
        ]"#,
    ]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), r#"name == "Acme" OR age > 30"#);
}

#[test]
fn test_compile_rejects_malformed_json() {
    let output = console(&["compile", "--fields", FIELDS, "--conditions", "{"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid --conditions"));
}

#[test]
fn test_check_prints_tree() {
    let output = console(&["check", r#"age @between(1, 5)"#]);
    assert!(output.status.success());

    let tree: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(tree["predicate"]["field"], "age");
    assert_eq!(tree["predicate"]["operator"], "@between");
    assert_eq!(tree["predicate"]["args"], serde_json::json!([1, 5]));
}

#[test]
fn test_check_reports_error_position() {
    let output = console(&["check", r#"name == "a" age > 1"#]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Expected AND or OR at position 12"));
}

#[test]
fn test_state_encode_then_decode() {
    let encoded = console(&[
        "state",
        "encode",
        "--conditions",
        r#"[{"id":"x","field":"name","operator":"@contains","value":"a b"}]"#,
    ]);
    assert!(encoded.status.success());
    let param = stdout(&encoded);
    assert!(!param.contains(' '));

    let decoded = console(&["state", "decode", &param]);
    assert!(decoded.status.success());
    let rows: serde_json::Value = serde_json::from_str(&stdout(&decoded)).unwrap();
    assert_eq!(rows[0]["field"], "name");
    assert_eq!(rows[0]["operator"], "@contains");
    assert_eq!(rows[0]["value"], "a b");
    assert!(rows[0]["id"].as_str().unwrap().starts_with("filter_"));
}

#[test]
fn test_state_share_link_decodes() {
    let encoded = console(&[
        "state",
        "encode",
        "--conditions",
        r#"[{"field":"age","operator":">","value":3}]"#,
        "--url",
        "https://console.example.com/partners?page=2",
    ]);
    assert!(encoded.status.success());
    let link = stdout(&encoded);
    assert!(link.starts_with("https://console.example.com/partners?page=2&filter="));

    let decoded = console(&["state", "decode", &link]);
    assert!(decoded.status.success());
    let rows: serde_json::Value = serde_json::from_str(&stdout(&decoded)).unwrap();
    assert_eq!(rows[0]["field"], "age");
    assert_eq!(rows[0]["value"], 3);
}

#[test]
fn test_operators_rejects_unknown_type() {
    let output = console(&["operators", "--type", "uuid"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown data type"));
}
