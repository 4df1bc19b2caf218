#![allow(missing_docs)]

use std::fs;
use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use tempfile::TempDir;

const CONFIG: &str = r#"
[query]
results_page_size = 20

[labels.Account]
constraint_attribute = "name"
return_attributes = ["name", "industry"]
children = ["Customer"]

[labels.Contact]
constraint_attribute = "email"
searchable = false
predefined_constraints = ["$identifier.active = true"]
"#;

const SCHEMA: &str = r#"
label = "Account"

[[rel]]
label = "OWNS"
node = { label = "Contact", value = { email = "ada@example.com" } }
"#;

fn workspace() -> (TempDir, PathBuf, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let config = dir.path().join("config.toml");
    let schema = dir.path().join("schema.toml");
    fs::write(&config, CONFIG).expect("write config");
    fs::write(&schema, SCHEMA).expect("write schema");
    (dir, config, schema)
}

fn json_output(args: &[&str], config: &PathBuf) -> Value {
    let output = cargo_bin_cmd!("sombra-pattern")
        .arg("--config")
        .arg(config)
        .args(["--format", "json"])
        .args(args)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    serde_json::from_slice(&output).expect("valid json")
}

#[test]
fn compile_result_query_as_json() {
    let (_dir, config, schema) = workspace();
    let schema = schema.to_str().expect("utf8 path");
    let json = json_output(&["compile", schema], &config);
    assert_eq!(json["kind"], "result");
    let query = &json["queries"][0];
    assert_eq!(query["node"], "account");
    assert_eq!(
        query["statement"],
        "MATCH (account:`Account`), \
         (account:`Account`)-[r0:`OWNS`]->(contact:`Contact`{`email`:{`contact_email`}}) \
         WHERE contact.active = true \
         RETURN DISTINCT account.name AS name, COLLECT(DISTINCT account.industry) AS industry \
         LIMIT 20"
    );
    assert_eq!(query["parameters"]["contact_email"], "ada@example.com");
}

#[test]
fn compile_counts_every_node_without_target() {
    let (_dir, config, schema) = workspace();
    let schema = schema.to_str().expect("utf8 path");
    let json = json_output(&["compile", schema, "--kind", "count"], &config);
    let queries = json["queries"].as_array().expect("queries");
    let nodes: Vec<&str> = queries
        .iter()
        .map(|q| q["node"].as_str().expect("node"))
        .collect();
    assert_eq!(nodes, vec!["account", "contact"]);
}

#[test]
fn compile_relations_for_named_node() {
    let (_dir, config, schema) = workspace();
    let schema = schema.to_str().expect("utf8 path");
    let json = json_output(
        &["compile", schema, "--kind", "relations", "--node", "contact"],
        &config,
    );
    let statement = json["queries"][0]["statement"].as_str().expect("statement");
    assert!(statement.contains("(contact:`Contact`)-[r]->(x)"));
    assert!(statement.ends_with("ORDER BY count(r) DESC"));
}

#[test]
fn compile_rejects_unknown_node() {
    let (_dir, config, schema) = workspace();
    cargo_bin_cmd!("sombra-pattern")
        .arg("--config")
        .arg(&config)
        .arg("compile")
        .arg(&schema)
        .args(["--kind", "values", "--node", "missing"])
        .assert()
        .failure();
}

#[test]
fn taxonomy_lists_searchable_labels() {
    let (_dir, config, _schema) = workspace();
    let json = json_output(&["taxonomy"], &config);
    let labels: Vec<&str> = json
        .as_array()
        .expect("array")
        .iter()
        .map(|q| q["label"].as_str().expect("label"))
        .collect();
    assert_eq!(labels, vec!["Account", "Customer"]);
    assert_eq!(
        json[0]["statement"],
        "MATCH (n:`Account`) RETURN count(DISTINCT n.name) AS count"
    );
}

#[test]
fn labels_report_inherited_metadata() {
    let (_dir, config, _schema) = workspace();
    let json = json_output(&["labels"], &config);
    let customer = json
        .as_array()
        .expect("array")
        .iter()
        .find(|l| l["label"] == "Customer")
        .expect("customer");
    assert_eq!(customer["parent"], "Account");
    assert_eq!(customer["constraint_attribute"], "name");
}

#[test]
fn text_output_prints_statement() {
    let (_dir, config, schema) = workspace();
    let output = cargo_bin_cmd!("sombra-pattern")
        .arg("--config")
        .arg(&config)
        .args(["--theme", "plain", "compile"])
        .arg(&schema)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).expect("utf8");
    assert!(text.contains("result query for account (Account)"));
    assert!(text.contains("contact_email: ada@example.com"));
    assert!(text.contains("\n  WHERE contact.active = true\n"));
    assert!(text.contains("\n  LIMIT 20\n"));
}

#[test]
fn missing_config_file_fails() {
    let dir = TempDir::new().expect("tempdir");
    cargo_bin_cmd!("sombra-pattern")
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg("labels")
        .assert()
        .failure();
}
