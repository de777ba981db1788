use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

fn erp_audit(data_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("erp-audit").unwrap();
    cmd.env("ERP_AUDIT_DATA_DIR", data_dir.path())
        .env_remove("ERP_AUDIT_USER_ID")
        .env_remove("ERP_AUDIT_USERNAME")
        .env_remove("RUST_LOG");
    cmd
}

fn record_update(data_dir: &TempDir, resource_id: &str) -> Value {
    let output = erp_audit(data_dir)
        .args([
            "audit",
            "record",
            "--user-id",
            "7",
            "--username",
            "alice",
            "update",
            "customer",
            resource_id,
            "--before",
            r#"{"name":"Acme","limit":1000}"#,
            "--after",
            r#"{"name":"Acme","limit":5000}"#,
            "--path",
            "/api/customers",
            "--json",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_record_then_show() {
    let data_dir = TempDir::new().unwrap();
    let record = record_update(&data_dir, "42");

    assert_eq!(record["action"], "UPDATE");
    assert_eq!(record["status"], "success");
    let changes: Value = serde_json::from_str(record["changes"].as_str().unwrap()).unwrap();
    assert_eq!(changes["limit"]["old"], 1000);
    assert_eq!(changes["limit"]["new"], 5000);

    let id = record["id"].as_str().unwrap();
    erp_audit(&data_dir)
        .args(["audit", "show", id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Resource:    customer/42"))
        .stdout(predicate::str::contains("limit: 1000 -> 5000"));
}

#[test]
fn test_actor_from_environment() {
    let data_dir = TempDir::new().unwrap();

    erp_audit(&data_dir)
        .env("ERP_AUDIT_USER_ID", "9")
        .env("ERP_AUDIT_USERNAME", "svc-payroll")
        .args(["audit", "record", "create", "payslip", "P-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Recorded audit record: aud-"));

    erp_audit(&data_dir)
        .args(["audit", "by-actor", "9"])
        .assert()
        .success()
        .stdout(predicate::str::contains("svc-payroll"));
}

#[test]
fn test_list_json_envelope_with_filters() {
    let data_dir = TempDir::new().unwrap();
    record_update(&data_dir, "1");
    record_update(&data_dir, "2");

    erp_audit(&data_dir)
        .args([
            "audit",
            "fail",
            "--user-id",
            "8",
            "--username",
            "bob",
            "delete",
            "customer",
            "3",
            "--error",
            "customer has open invoices",
            "--duration-ms",
            "45",
        ])
        .assert()
        .success();

    let output = erp_audit(&data_dir)
        .args(["audit", "list", "--action", "update", "--page-size", "1", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let page: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(page["total"], 2);
    assert_eq!(page["page_size"], 1);
    assert_eq!(page["total_pages"], 2);
    assert_eq!(page["data"][0]["resource_id"], "2");

    let output = erp_audit(&data_dir)
        .args(["audit", "list", "--status", "failed", "--json"])
        .output()
        .unwrap();
    let page: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["data"][0]["error_message"], "customer has open invoices");
    assert_eq!(page["data"][0]["duration_ms"], 45);
}

#[test]
fn test_by_resource_history() {
    let data_dir = TempDir::new().unwrap();
    record_update(&data_dir, "42");
    record_update(&data_dir, "43");

    erp_audit(&data_dir)
        .args(["audit", "by-resource", "customer", "42"])
        .assert()
        .success()
        .stdout(predicate::str::contains("History of customer/42"))
        .stdout(predicate::str::contains("Page 1 of 1 (1 records"));
}

#[test]
fn test_show_unknown_record() {
    let data_dir = TempDir::new().unwrap();

    erp_audit(&data_dir)
        .args(["audit", "show", "aud-00000000-0000-0000-0000-000000000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Audit record not found"));
}

#[test]
fn test_cleanup_rejects_non_positive_days() {
    let data_dir = TempDir::new().unwrap();
    record_update(&data_dir, "42");

    erp_audit(&data_dir)
        .args(["audit", "cleanup", "--days", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Retention days must be positive"));

    erp_audit(&data_dir)
        .args(["audit", "cleanup", "--days", "-3"])
        .assert()
        .failure();

    erp_audit(&data_dir)
        .args(["audit", "cleanup", "--days", "30"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted 0 audit record(s)"));
}

#[test]
fn test_cleanup_removes_old_lines() {
    let data_dir = TempDir::new().unwrap();
    let fresh = record_update(&data_dir, "42");

    let mut old = fresh.clone();
    old["id"] = Value::String("11111111-1111-4111-8111-111111111111".into());
    old["created_at"] = Value::String("2001-01-01T00:00:00Z".into());

    let log = data_dir.path().join("data").join("audit.jsonl");
    let mut contents = std::fs::read_to_string(&log).unwrap();
    contents.push_str(&serde_json::to_string(&old).unwrap());
    contents.push('\n');
    std::fs::write(&log, contents).unwrap();

    let output = erp_audit(&data_dir)
        .args(["audit", "cleanup", "--days", "30", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["deleted"], 1);
    assert_eq!(report["retention_days"], 30);

    let remaining = std::fs::read_to_string(&log).unwrap();
    assert_eq!(remaining.lines().count(), 1);
    assert!(remaining.contains(fresh["id"].as_str().unwrap()));
}

#[test]
fn test_diff_command() {
    let data_dir = TempDir::new().unwrap();

    erp_audit(&data_dir)
        .args(["audit", "diff", r#"{"x":1}"#, r#"{"x":1,"y":2}"#])
        .assert()
        .success()
        .stdout(predicate::str::diff("  y: null -> 2\n"));

    erp_audit(&data_dir)
        .args([
            "audit",
            "diff",
            "--deep",
            r#"{"address":{"city":"Oslo"}}"#,
            r#"{"address":{"city":"Bergen"}}"#,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("address.city: \"Oslo\" -> \"Bergen\""));

    erp_audit(&data_dir)
        .args(["audit", "diff", "1", r#""one""#])
        .assert()
        .success()
        .stdout(predicate::str::contains("(no changes)"));

    erp_audit(&data_dir)
        .args(["audit", "diff", "{broken", "{}"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid JSON document"));
}

#[test]
fn test_export_formats() {
    let data_dir = TempDir::new().unwrap();
    record_update(&data_dir, "42");

    let output = erp_audit(&data_dir)
        .args(["audit", "export", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let export: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(export["record_count"], 1);
    assert_eq!(export["records"][0]["resource_id"], "42");

    let csv_path = data_dir.path().join("audit.csv");
    erp_audit(&data_dir)
        .args(["audit", "export", "--format", "csv", "--output"])
        .arg(&csv_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 1 audit record(s)"));
    let csv = std::fs::read_to_string(&csv_path).unwrap();
    assert!(csv.starts_with("id,created_at,user_id"));
    assert_eq!(csv.lines().count(), 2);

    erp_audit(&data_dir)
        .args(["audit", "export", "--format", "yaml", "--output"])
        .arg(data_dir.path().join("trail"))
        .assert()
        .success()
        .stdout(predicate::str::contains("(verified)"));
    let yaml = std::fs::read_to_string(data_dir.path().join("trail.yaml")).unwrap();
    assert!(yaml.contains("resource_id: '42'") || yaml.contains("resource_id: \"42\""));

    erp_audit(&data_dir)
        .args(["audit", "export", "--format", "xml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid export format"));
}

#[test]
fn test_init_and_config() {
    let data_dir = TempDir::new().unwrap();

    erp_audit(&data_dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialization complete!"));
    assert!(data_dir.path().join("config.json").exists());

    erp_audit(&data_dir)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Retention:        90 days"))
        .stdout(predicate::str::contains("Initialized:    true"));
}
