//! CLI subcommand handlers.

use crate::{Commands, ConfigAction, SourceOptions};
use std::path::Path;
use tablewash_core::config::{WashConfig, load_config, workspace_config_path};
use tablewash_core::data::{DataLineage, profile};
use tablewash_core::engine::columnar::render_table;
use tablewash_core::{Engine, LocalEngine, Pipeline, SourceDescriptor, SourceFormat, query};

const PREVIEW_ROWS: usize = 20;

/// Handle a CLI subcommand.
pub fn handle_command(
    command: Commands,
    workspace: &Path,
    options: &SourceOptions,
) -> anyhow::Result<()> {
    if let Commands::Config { action } = command {
        return handle_config(action, workspace);
    }

    let config = load_config(Some(workspace), None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    let engine = LocalEngine::new(config.engine.clone());

    match command {
        Commands::Inspect { source, rows } => {
            let dataset = engine.load(&source_descriptor(&source, options))?;
            println!("Schema of {}:", dataset.name().unwrap_or("dataset"));
            print!("{}", dataset.schema());
            println!();
            print!("{}", profile(&dataset));
            if rows > 0 && !dataset.is_empty() {
                println!();
                println!("{}", render_table(&dataset, rows)?);
            }
            Ok(())
        }
        Commands::Plan { source, pipeline } => {
            let pipeline = Pipeline::from_path(&pipeline)?;
            let dataset = engine.load(&source_descriptor(&source, options))?;
            let schema = pipeline.plan(dataset.schema())?;
            println!("Pipeline is valid ({} steps). Output schema:", pipeline.len());
            print!("{schema}");
            Ok(())
        }
        Commands::Run {
            source,
            pipeline,
            output,
            format,
            mode,
            report,
        } => {
            let pipeline = Pipeline::from_path(&pipeline)?;
            let descriptor = source_descriptor(&source, options);
            let dataset = engine.load(&descriptor)?;

            let source_format = descriptor
                .format
                .unwrap_or_else(|| SourceFormat::from_path(&source));
            let lineage = DataLineage::new(
                dataset.name().unwrap_or("dataset"),
                source_format.as_str(),
                &source.display().to_string(),
            );
            let (result, run_report) = pipeline.run_with_report(&dataset, lineage)?;

            match output {
                Some(destination) => {
                    let format = format.unwrap_or(config.output.format);
                    let mode = mode.unwrap_or(config.output.mode);
                    let summary = engine.write(&result, &destination, format, mode)?;
                    println!(
                        "Wrote {} rows to {}",
                        summary.rows,
                        summary.part.display()
                    );
                }
                None => println!("{}", render_table(&result, PREVIEW_ROWS)?),
            }

            if report {
                println!("{}", serde_json::to_string_pretty(&run_report)?);
            }
            Ok(())
        }
        Commands::Query {
            source,
            sql,
            view,
            json,
        } => {
            let dataset = engine.load(&source_descriptor(&source, options))?;
            let result = match view {
                Some(view) => query::run_as(&dataset, &view, &sql)?,
                None => engine.query(&dataset, &sql)?,
            };
            if json {
                for record in engine.collect(&result)? {
                    println!("{}", serde_json::to_string(&record)?);
                }
            } else {
                println!("{}", render_table(&result, result.len())?);
                println!("({} rows)", engine.count(&result)?);
            }
            Ok(())
        }
        Commands::Config { .. } => Ok(()),
    }
}

fn source_descriptor(path: &Path, options: &SourceOptions) -> SourceDescriptor {
    let mut descriptor = SourceDescriptor::new(path);
    if let Some(delimiter) = options.delimiter {
        descriptor = descriptor.with_delimiter(delimiter);
    }
    if let Some(has_header) = options.has_header {
        descriptor = descriptor.with_header(has_header);
    }
    descriptor
}

fn handle_config(action: ConfigAction, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = workspace_config_path(workspace);
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }
            if let Some(dir) = config_path.parent() {
                std::fs::create_dir_all(dir)?;
            }

            let toml_str = toml::to_string_pretty(&WashConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_config(Some(workspace), None)
                .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use tablewash_core::engine::persistence::MANIFEST_FILE;
    use tablewash_core::{OutputFormat, SaveMode};
    use tempfile::TempDir;

    const EMPLOYEES: &str = "dept,salary\n it ,\nIT,60000\nhr,40000\n";

    const CLEAN: &str = r#"
name = "clean"

[[steps]]
type = "normalize"
column = "dept"
rules = ["trim", "uppercase"]

[[steps]]
type = "impute"

[steps.columns.salary]
strategy = "median"

[[steps]]
type = "aggregate"
keys = ["dept"]
aggregations = [{ column = "salary", func = "avg", output = "avg_salary" }]
order_by = [{ column = "dept" }]
"#;

    fn fixture(dir: &Path) -> (PathBuf, PathBuf) {
        let source = dir.join("employees.csv");
        std::fs::write(&source, EMPLOYEES).unwrap();
        let pipeline = dir.join("clean.toml");
        std::fs::write(&pipeline, CLEAN).unwrap();
        (source, pipeline)
    }

    #[test]
    fn test_config_init_creates_file() {
        let dir = TempDir::new().unwrap();
        let workspace = dir.path();

        let command = Commands::Config {
            action: ConfigAction::Init,
        };
        handle_command(command, workspace, &SourceOptions::default()).unwrap();

        let config_path = workspace.join(".tablewash").join("config.toml");
        let content = std::fs::read_to_string(&config_path).unwrap();
        let parsed: WashConfig = toml::from_str(&content).unwrap();
        assert_eq!(parsed, WashConfig::default());
    }

    #[test]
    fn test_plan_checks_pipeline() {
        let dir = TempDir::new().unwrap();
        let (source, pipeline) = fixture(dir.path());
        let command = Commands::Plan { source, pipeline };
        handle_command(command, dir.path(), &SourceOptions::default()).unwrap();
    }

    #[test]
    fn test_run_writes_output() {
        let dir = TempDir::new().unwrap();
        let (source, pipeline) = fixture(dir.path());
        let output = dir.path().join("summary");

        let command = Commands::Run {
            source,
            pipeline,
            output: Some(output.clone()),
            format: Some(OutputFormat::Csv),
            mode: Some(SaveMode::ErrorIfExists),
            report: true,
        };
        handle_command(command, dir.path(), &SourceOptions::default()).unwrap();

        assert!(output.join(MANIFEST_FILE).exists());
        let part = std::fs::read_to_string(output.join("part-00000.csv")).unwrap();
        assert_eq!(part, "dept,avg_salary\nHR,40000.0\nIT,55000.0\n");
    }

    #[test]
    fn test_run_reports_failing_step() {
        let dir = TempDir::new().unwrap();
        let (source, _) = fixture(dir.path());
        let pipeline = dir.path().join("bad.json");
        std::fs::write(
            &pipeline,
            r#"{"steps": [{"type": "bucketize", "column": "dept",
                "thresholds": [1.0], "labels": ["lo", "hi"], "output_column": "band"}]}"#,
        )
        .unwrap();

        let command = Commands::Run {
            source,
            pipeline,
            output: None,
            format: None,
            mode: None,
            report: false,
        };
        let err = handle_command(command, dir.path(), &SourceOptions::default()).unwrap_err();
        assert!(err.to_string().starts_with("Step 0 (bucketize) failed:"));
    }

    #[test]
    fn test_query_with_custom_delimiter() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("scores.txt");
        std::fs::write(&source, "1|a\n2|b\n").unwrap();

        let options = SourceOptions {
            delimiter: Some('|'),
            has_header: Some(false),
        };
        let command = Commands::Query {
            source,
            sql: "SELECT _c1 FROM t WHERE _c0 > 1".into(),
            view: Some("t".into()),
            json: true,
        };
        handle_command(command, dir.path(), &options).unwrap();
    }
}
