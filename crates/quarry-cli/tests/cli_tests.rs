//! Tests for the `quarry` binary
//!
//! Each command is driven through the real executable with the shop catalog
//! fixtures; query and config files are written to temp directories.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Shop catalog fixtures live with the catalog crate.
fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../quarry-catalog/tests/fixtures")
        .join(name)
}

fn quarry() -> Command {
    let mut cmd = Command::cargo_bin("quarry").unwrap();
    cmd.env_remove("QUARRY_CONFIG").env_remove("RUST_LOG");
    cmd
}

fn with_catalog(cmd: &mut Command) -> &mut Command {
    cmd.arg("--schema")
        .arg(fixture("shop_schema.json"))
        .arg("--links")
        .arg(fixture("shop_links.json"))
}

fn query_file(dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, text).unwrap();
    path
}

// ============================================================================
// sql
// ============================================================================

#[test]
fn test_sql_from_file() {
    let temp = TempDir::new().unwrap();
    let file = query_file(
        &temp,
        "join.iql",
        "SELECT orders o OUT o.id JOIN placed customers c OWNER ALL FILTER c.country = 'DE'",
    );

    let mut cmd = quarry();
    with_catalog(&mut cmd).arg("sql").arg(&file);
    cmd.assert().success().stdout(
        "SELECT o.id\n\
         FROM orders o\n\
         INNER JOIN customers c ON o.customer_id = c.id\n\
         WHERE c.country = 'DE'\n",
    );
}

#[test]
fn test_sql_from_stdin() {
    let mut cmd = quarry();
    with_catalog(&mut cmd)
        .arg("sql")
        .arg("-")
        .write_stdin("FIND orders o, o-placed->customers c RETURN o.id");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("INNER JOIN customers c ON o.customer_id = c.id"));
}

#[test]
fn test_sql_jdbc_literals() {
    let mut cmd = quarry();
    with_catalog(&mut cmd)
        .args(["sql", "-", "--jdbc"])
        .write_stdin("FIND orders o WHERE o.ordered_at >= TIMESTAMP '2024-01-01 08:00:00'");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("{ts '2024-01-01 08:00:00'}"));
}

#[test]
fn test_sql_raw_skips_rewrite() {
    let mut cmd = quarry();
    with_catalog(&mut cmd)
        .args(["sql", "-", "--raw"])
        .write_stdin("SELECT orders o OUT count(o) n");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("never resolved"));

    let mut cmd = quarry();
    with_catalog(&mut cmd)
        .args(["sql", "-"])
        .write_stdin("SELECT orders o OUT count(o) n");
    cmd.assert()
        .success()
        .stdout("SELECT count(o.id) AS n\nFROM orders o\n");
}

#[test]
fn test_sql_explicit_syntax_mismatch_fails() {
    let mut cmd = quarry();
    with_catalog(&mut cmd)
        .args(["sql", "-", "--syntax", "kql"])
        .write_stdin("SELECT orders o");
    cmd.assert().failure().stderr(predicate::str::contains("KQL"));
}

#[test]
fn test_sql_without_schema_fails() {
    quarry()
        .args(["sql", "-"])
        .write_stdin("SELECT orders o")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No schema given"));
}

#[test]
fn test_sql_reports_resolution_errors() {
    let mut cmd = quarry();
    with_catalog(&mut cmd)
        .args(["sql", "-"])
        .write_stdin("SELECT categories k JOIN ANY employees e OWNER");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("No relation"));
}

// ============================================================================
// config
// ============================================================================

#[test]
fn test_config_file_supplies_catalog_and_dialect() {
    let temp = TempDir::new().unwrap();
    fs::copy(fixture("shop_schema.json"), temp.path().join("schema.json")).unwrap();
    let config = temp.path().join("quarry.toml");
    fs::write(
        &config,
        "[catalog]\nschema = \"schema.json\"\n\n[sql]\ndialect = \"jdbc\"\nidentifiers = \"quoted\"\n",
    )
    .unwrap();

    quarry()
        .arg("--config")
        .arg(&config)
        .args(["sql", "-"])
        .write_stdin("SELECT orders o FILTER o.ordered_at < DATE '2024-02-29'")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "WHERE \"o\".\"ordered_at\" < {d '2024-02-29'}",
        ));
}

#[test]
fn test_invalid_config_fails() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("quarry.toml");
    fs::write(&config, "[sql]\ndialect = \"oracle\"\n").unwrap();

    quarry()
        .arg("--config")
        .arg(&config)
        .args(["check", "-"])
        .write_stdin("SELECT orders o")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

// ============================================================================
// format, ast, check
// ============================================================================

#[test]
fn test_format_kql_as_iql() {
    quarry()
        .args(["format", "-", "--to", "iql"])
        .write_stdin("FIND orders o, o-placed->customers c RETURN o.id")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("SELECT orders o\n  OUT o.id 1\nJOIN placed customers c"));
}

#[test]
fn test_format_unsupported_in_kql() {
    quarry()
        .args(["format", "-", "--to", "kql"])
        .write_stdin("SELECT orders o JOIN placed customers c OUT c.name OWNER")
        .assert()
        .failure()
        .stderr(predicate::str::contains("KQL cannot express"));
}

#[test]
fn test_ast_dumps_json() {
    quarry()
        .args(["ast", "-"])
        .write_stdin("SELECT orders o OUT o.id")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"orders\""))
        .stdout(predicate::str::contains("\"alias\": \"o\""));
}

#[test]
fn test_check_reports_ok() {
    let temp = TempDir::new().unwrap();
    let file = query_file(&temp, "ok.kql", "FIND orders o RETURN o.id");

    let mut cmd = quarry();
    with_catalog(&mut cmd).arg("check").arg(&file);
    cmd.assert().success().stdout(predicate::str::contains("OK:"));
}

#[test]
fn test_check_reports_parse_errors_with_position() {
    let mut cmd = quarry();
    with_catalog(&mut cmd)
        .args(["check", "-"])
        .write_stdin("SELECT orders o\nFILTER o.amount >");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Line 2"));
}

#[test]
fn test_missing_query_file() {
    let mut cmd = quarry();
    with_catalog(&mut cmd).args(["check", "/no/such/query.iql"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read query"));
}
