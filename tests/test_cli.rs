use std::process::Command;

const CATALOG: &str = r#"{
    "project": "proj",
    "datasets": {
        "shop": {
            "orders": {
                "kind": "table",
                "schema": [
                    {"name": "id", "type": "INTEGER"},
                    {"name": "tags", "type": "STRING", "mode": "REPEATED"}
                ]
            },
            "customers": {
                "kind": "table",
                "schema": [{"name": "id", "type": "INTEGER"}]
            },
            "customers_flatten": {"kind": "view", "query": "SELECT 1"}
        }
    }
}"#;

fn bqflatten(catalog: &std::path::Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_bqflatten"))
        .arg("--catalog")
        .arg(catalog)
        .args(args)
        .output()
        .expect("Cannot run bqflatten")
}

fn write_catalog() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.json");
    std::fs::write(&path, CATALOG).unwrap();
    (dir, path)
}

#[test]
fn test_usage_errors() {
    let (_dir, path) = write_catalog();
    assert_eq!(bqflatten(&path, &[]).status.code(), Some(1));
    assert_eq!(
        bqflatten(&path, &["shop", "orders", "extra"]).status.code(),
        Some(1)
    );
}

#[test]
fn test_flatten_dataset_reports_conflict() {
    let (_dir, path) = write_catalog();
    let output = bqflatten(&path, &["shop", "--skip-views"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(output.status.code(), Some(0));
    assert!(stdout.contains("Query results loaded to the table proj.shop.orders_flatten"));
    assert!(stdout.contains("Failed to create view for table proj.shop.customers_flatten"));
    assert!(stdout.contains("Skipped, table is a view"));
    assert!(stdout.contains("All done!"));

    let catalog = std::fs::read_to_string(&path).unwrap();
    assert!(catalog.contains("orders_flatten"));
}

#[test]
fn test_flatten_single_table_dry_run() {
    let (_dir, path) = write_catalog();
    let output = bqflatten(&path, &["shop", "orders", "--dry-run"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(output.status.code(), Some(0));
    assert!(stdout.contains("CREATE VIEW shop.orders_flatten AS"));
    assert!(stdout.contains("t.tags AS tags"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), CATALOG);
}

#[test]
fn test_missing_table_fails() {
    let (_dir, path) = write_catalog();
    let output = bqflatten(&path, &["shop", "missing"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_verbose_logs_statement_before_creating_view() {
    let (_dir, path) = write_catalog();
    let output = Command::new(env!("CARGO_BIN_EXE_bqflatten"))
        .env_remove("RUST_LOG")
        .arg("--catalog")
        .arg(&path)
        .args(["shop", "orders", "--verbose"])
        .output()
        .expect("Cannot run bqflatten");
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(0));
    let statement_at = stderr
        .find("CREATE VIEW shop.orders_flatten AS")
        .expect("statement not logged");
    let create_at = stderr
        .find("Create view proj.shop.orders_flatten")
        .expect("view creation not logged");
    assert!(statement_at < create_at);
}
