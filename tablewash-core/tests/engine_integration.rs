//! Integration tests for the local engine: loading, writing and actions.

use pretty_assertions::assert_eq;
use std::path::Path;
use tablewash_core::config::EngineConfig;
use tablewash_core::data::{ColumnType, Field, Schema, Value};
use tablewash_core::engine::persistence::MANIFEST_FILE;
use tablewash_core::engine::{Engine, LocalEngine, OutputFormat, SaveMode, SourceDescriptor};
use tablewash_core::error::{ErrorKind, WashError};
use tablewash_core::pipeline::Pipeline;
use tempfile::TempDir;

const EMPLOYEES: &str = "\
name,dept,salary,rating
Ann, it ,50000,4.5
Bo,IT,,3.0
Cy,hr,45000,
Di,HR,38000,4.0
";

fn write_employees(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("employees.csv");
    std::fs::write(&path, EMPLOYEES).unwrap();
    path
}

#[test]
fn test_load_csv_infers_schema_and_view_name() {
    let dir = TempDir::new().unwrap();
    let engine = LocalEngine::default();
    let ds = engine
        .load(&SourceDescriptor::new(write_employees(dir.path())))
        .unwrap();

    assert_eq!(ds.name(), Some("employees"));
    let types: Vec<_> = ds.schema().fields().iter().map(|f| f.dtype).collect();
    assert_eq!(
        types,
        vec![
            ColumnType::String,
            ColumnType::String,
            ColumnType::Integer,
            ColumnType::Float,
        ]
    );
    assert_eq!(engine.count(&ds).unwrap(), 4);
    assert_eq!(ds.rows()[1][2], Value::Null);
}

#[test]
fn test_schema_hint_overrides_inference() {
    let dir = TempDir::new().unwrap();
    let schema = Schema::new(vec![
        Field::new("name", ColumnType::String),
        Field::new("dept", ColumnType::String),
        Field::new("salary", ColumnType::Float),
        Field::new("rating", ColumnType::Float),
    ])
    .unwrap();
    let source = SourceDescriptor::csv(write_employees(dir.path()))
        .with_schema(schema)
        .with_name("staff");
    let ds = LocalEngine::default().load(&source).unwrap();
    assert_eq!(ds.name(), Some("staff"));
    assert_eq!(ds.rows()[0][2], Value::Float(50000.0));
}

#[test]
fn test_csv_write_then_reload_directory() {
    let dir = TempDir::new().unwrap();
    let engine = LocalEngine::default();
    let ds = engine
        .load(&SourceDescriptor::new(write_employees(dir.path())))
        .unwrap();
    let out = dir.path().join("out");

    let summary = engine
        .write(&ds, &out, OutputFormat::Csv, SaveMode::ErrorIfExists)
        .unwrap();
    assert!(summary.part.ends_with("part-00000.csv"));
    assert!(out.join(MANIFEST_FILE).exists());

    let back = engine.load(&SourceDescriptor::new(&out)).unwrap();
    assert_eq!(back.name(), Some("out"));
    assert_eq!(back, ds);
}

#[test]
fn test_parquet_write_append_and_reload() {
    let dir = TempDir::new().unwrap();
    let engine = LocalEngine::default();
    let ds = engine
        .load(&SourceDescriptor::new(write_employees(dir.path())))
        .unwrap();
    let out = dir.path().join("warehouse");

    engine
        .write(&ds, &out, OutputFormat::Parquet, SaveMode::Overwrite)
        .unwrap();
    let second = engine
        .write(&ds, &out, OutputFormat::Parquet, SaveMode::Append)
        .unwrap();
    assert!(second.part.ends_with("part-00001.parquet"));

    let back = engine.load(&SourceDescriptor::new(&out)).unwrap();
    assert_eq!(back.len(), 8);
    assert_eq!(back.schema(), ds.schema());
    assert_eq!(&back.rows()[4..], ds.rows());
}

#[test]
fn test_write_mode_conflicts() {
    let dir = TempDir::new().unwrap();
    let engine = LocalEngine::default();
    let ds = engine
        .load(&SourceDescriptor::new(write_employees(dir.path())))
        .unwrap();
    let out = dir.path().join("out");
    engine
        .write(&ds, &out, OutputFormat::Csv, SaveMode::ErrorIfExists)
        .unwrap();

    let exists = engine
        .write(&ds, &out, OutputFormat::Csv, SaveMode::ErrorIfExists)
        .unwrap_err();
    assert_eq!(exists.kind(), ErrorKind::Write);

    let wrong_format = engine
        .write(&ds, &out, OutputFormat::Parquet, SaveMode::Append)
        .unwrap_err();
    assert_eq!(wrong_format.kind(), ErrorKind::Write);

    let narrower = Pipeline::from_toml_str(
        r#"
[[steps]]
type = "drop_columns"
columns = ["rating"]
"#,
    )
    .unwrap()
    .run(&ds)
    .unwrap();
    let wrong_schema = engine
        .write(&narrower, &out, OutputFormat::Csv, SaveMode::Append)
        .unwrap_err();
    assert!(matches!(wrong_schema, WashError::Write(_)));

    let file_dest = engine
        .write(&ds, &dir.path().join("employees.csv"), OutputFormat::Csv, SaveMode::Overwrite)
        .unwrap_err();
    assert_eq!(file_dest.kind(), ErrorKind::Write);

    // Overwrite replaces the parts
    engine
        .write(&narrower, &out, OutputFormat::Csv, SaveMode::Overwrite)
        .unwrap();
    let back = engine.load(&SourceDescriptor::new(&out)).unwrap();
    assert_eq!(back.schema().len(), 3);
    assert_eq!(back.len(), 4);
}

#[test]
fn test_collect_respects_row_ceiling() {
    let dir = TempDir::new().unwrap();
    let engine = LocalEngine::new(EngineConfig {
        max_collect_rows: 3,
        ..EngineConfig::default()
    });
    let ds = engine
        .load(&SourceDescriptor::new(write_employees(dir.path())))
        .unwrap();

    let err = engine.collect(&ds).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceExhausted);

    let top = engine
        .query(&ds, "SELECT name, salary FROM employees ORDER BY salary DESC LIMIT 2")
        .unwrap();
    let records = engine.collect(&top).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].get("name"), Some(&Value::from("Ann")));
    assert_eq!(
        serde_json::to_value(&records[1]).unwrap(),
        serde_json::json!({"name": "Cy", "salary": 45000})
    );
}

#[test]
fn test_custom_delimiter_and_missing_source() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scores.txt");
    std::fs::write(&path, "a;b\n1;x\n2;y\n").unwrap();
    let engine = LocalEngine::default();
    let ds = engine
        .load(&SourceDescriptor::csv(&path).with_delimiter(';'))
        .unwrap();
    assert_eq!(ds.column_values("a").unwrap(), vec![Value::Int(1), Value::Int(2)]);

    let missing = engine
        .load(&SourceDescriptor::new(dir.path().join("nope.csv")))
        .unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::Load);
}
