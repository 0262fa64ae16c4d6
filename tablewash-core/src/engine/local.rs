//! In-process engine over local files.

use crate::config::EngineConfig;
use crate::data::{Dataset, Field, Record, Schema};
use crate::engine::delimited::{self, DelimitedOptions};
use crate::engine::persistence::{self, MANIFEST_FILE, Manifest};
use crate::engine::{
    Engine, OutputFormat, SaveMode, SourceDescriptor, SourceFormat, WriteSummary, columnar,
};
use crate::error::WashError;
use crate::query;
use std::path::{Path, PathBuf};

/// Reads and writes delimited text and Parquet on the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct LocalEngine {
    config: EngineConfig,
}

impl LocalEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Files to read for `source`, and the manifest if it is an output directory.
    fn resolve_files(
        &self,
        source: &SourceDescriptor,
    ) -> Result<(Vec<PathBuf>, SourceFormat, Option<Manifest>), WashError> {
        let path = &source.path;
        if !path.exists() {
            return Err(WashError::load(format!("{} does not exist", path.display())));
        }
        if path.is_file() {
            let format = source.format.unwrap_or_else(|| SourceFormat::from_path(path));
            return Ok((vec![path.clone()], format, None));
        }

        let manifest = persistence::read_manifest(path)?;
        let format = match (&manifest, source.format) {
            (_, Some(f)) => f,
            (Some(m), None) => match m.format {
                OutputFormat::Csv => SourceFormat::Delimited,
                OutputFormat::Parquet => SourceFormat::Parquet,
            },
            (None, None) => {
                let has_parquet =
                    !persistence::list_data_files(path, &["parquet", "pq"])?.is_empty();
                if has_parquet {
                    SourceFormat::Parquet
                } else {
                    SourceFormat::Delimited
                }
            }
        };
        let files = match format {
            SourceFormat::Parquet => persistence::list_data_files(path, &["parquet", "pq"])?,
            SourceFormat::Delimited => {
                persistence::list_data_files(path, &["csv", "tsv", "txt", "psv"])?
            }
        };
        if files.is_empty() && manifest.is_none() {
            return Err(WashError::load(format!(
                "{} contains no data files",
                path.display()
            )));
        }
        Ok((files, format, manifest))
    }

    fn load_delimited(
        &self,
        source: &SourceDescriptor,
        files: &[PathBuf],
        manifest: Option<&Manifest>,
    ) -> Result<Dataset, WashError> {
        // Part files we wrote always carry a header and a comma delimiter
        let (delimiter, has_header) = match manifest {
            Some(_) => (Some(','), Some(true)),
            None => (source.delimiter, source.has_header),
        };
        let options = DelimitedOptions::from_config(&self.config, delimiter, has_header)?;
        let tables = files
            .iter()
            .map(|f| delimited::read_raw(f, &options))
            .collect::<Result<Vec<_>, _>>()?;
        let hint = source.schema.as_ref().or(manifest.map(|m| &m.schema));
        let schema = delimited::resolve_schema(&tables, hint, &options)?;
        delimited::to_dataset(schema, tables, &options)
    }

    fn load_parquet(
        &self,
        source: &SourceDescriptor,
        files: &[PathBuf],
        manifest: Option<&Manifest>,
    ) -> Result<Dataset, WashError> {
        let hint = source.schema.as_ref().or(manifest.map(|m| &m.schema));
        let mut schema = hint.cloned();
        let mut rows = Vec::new();
        for file in files {
            let (file_schema, file_rows) = columnar::read_parquet(file, schema.as_ref())?;
            if schema.is_none() {
                schema = Some(file_schema);
            }
            rows.extend(file_rows);
        }
        let schema = schema.ok_or_else(|| WashError::load("no parquet files to read"))?;
        Dataset::new(schema, rows)
    }

    /// Check the destination against `mode` and prepare the directory.
    fn prepare_destination(
        &self,
        dataset: &Dataset,
        destination: &Path,
        format: OutputFormat,
        mode: SaveMode,
    ) -> Result<Option<Manifest>, WashError> {
        if destination.is_file() {
            return Err(WashError::write(format!(
                "{} is a file, expected a directory",
                destination.display()
            )));
        }
        let exists = destination.exists();
        let mut existing = None;

        match mode {
            SaveMode::ErrorIfExists if exists => {
                return Err(WashError::write(format!(
                    "{} already exists",
                    destination.display()
                )));
            }
            SaveMode::Overwrite if exists => {
                tracing::info!(path = %destination.display(), "overwriting output");
                std::fs::remove_dir_all(destination)?;
            }
            SaveMode::Append if exists => match persistence::read_manifest(destination)? {
                Some(manifest) => {
                    if manifest.format != format {
                        return Err(WashError::write(format!(
                            "cannot append {format} to {} data in {}",
                            manifest.format,
                            destination.display()
                        )));
                    }
                    if !manifest.schema.is_compatible(dataset.schema()) {
                        return Err(WashError::write(format!(
                            "schema mismatch appending to {}:\nexisting:\n{}incoming:\n{}",
                            destination.display(),
                            manifest.schema,
                            dataset.schema()
                        )));
                    }
                    existing = Some(manifest);
                }
                None => {
                    if std::fs::read_dir(destination)?.next().is_some() {
                        return Err(WashError::write(format!(
                            "{} is not empty and has no {MANIFEST_FILE}",
                            destination.display()
                        )));
                    }
                }
            },
            _ => {}
        }
        std::fs::create_dir_all(destination)?;
        Ok(existing)
    }
}

/// `existing` with every column nullable that is nullable in either schema.
fn widen_nullability(existing: &Schema, incoming: &Schema) -> Result<Schema, WashError> {
    Schema::new(
        existing
            .fields()
            .iter()
            .zip(incoming.fields())
            .map(|(a, b)| Field {
                nullable: a.nullable || b.nullable,
                ..a.clone()
            })
            .collect(),
    )
}

impl Engine for LocalEngine {
    fn load(&self, source: &SourceDescriptor) -> Result<Dataset, WashError> {
        let (files, format, manifest) = self.resolve_files(source)?;
        let dataset = match format {
            SourceFormat::Delimited => self.load_delimited(source, &files, manifest.as_ref())?,
            SourceFormat::Parquet => self.load_parquet(source, &files, manifest.as_ref())?,
        };
        let view = source.view_name();
        tracing::debug!(
            path = %source.path.display(),
            view = %view,
            files = files.len(),
            rows = dataset.len(),
            columns = dataset.schema().len(),
            "loaded dataset"
        );
        Ok(dataset.with_name(view))
    }

    fn write(
        &self,
        dataset: &Dataset,
        destination: &Path,
        format: OutputFormat,
        mode: SaveMode,
    ) -> Result<WriteSummary, WashError> {
        let existing = self.prepare_destination(dataset, destination, format, mode)?;

        let bytes = match format {
            OutputFormat::Csv => delimited::to_bytes(dataset, b',')?,
            OutputFormat::Parquet => columnar::to_parquet_bytes(dataset)?,
        };
        let part = persistence::next_part_path(destination, format)?;
        persistence::atomic_write(&part, &bytes)
            .map_err(|e| WashError::write(format!("{}: {e}", part.display())))?;

        let manifest = Manifest {
            format,
            schema: match &existing {
                Some(m) => widen_nullability(&m.schema, dataset.schema())?,
                None => dataset.schema().clone(),
            },
        };
        if existing.as_ref() != Some(&manifest) {
            persistence::write_manifest(destination, &manifest)?;
        }

        tracing::info!(
            path = %part.display(),
            %format,
            %mode,
            rows = dataset.len(),
            "wrote part file"
        );
        Ok(WriteSummary {
            destination: destination.to_path_buf(),
            part,
            rows: dataset.len(),
        })
    }

    fn collect(&self, dataset: &Dataset) -> Result<Vec<Record>, WashError> {
        let limit = self.config.max_collect_rows;
        if dataset.len() > limit {
            return Err(WashError::ResourceExhausted(format!(
                "collect of {} rows exceeds the limit of {limit}",
                dataset.len()
            )));
        }
        Ok(dataset.records().collect())
    }

    fn count(&self, dataset: &Dataset) -> Result<usize, WashError> {
        Ok(dataset.len())
    }

    fn query(&self, dataset: &Dataset, sql: &str) -> Result<Dataset, WashError> {
        query::run(dataset, sql)
    }
}
