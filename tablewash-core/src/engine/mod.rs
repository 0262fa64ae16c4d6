//! The data-processing engine contract and its local implementation.
//!
//! Everything that touches storage goes through [`Engine`]: loading sources,
//! materializing actions (`write`, `collect`, `count`) and queries. The
//! pipeline itself never does I/O.

pub mod columnar;
pub mod delimited;
pub mod local;
pub mod persistence;

pub use local::LocalEngine;

use crate::data::{Dataset, Record, Schema};
use crate::error::WashError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// On-disk format of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// Delimited text (CSV, TSV, ...).
    Delimited,
    Parquet,
}

impl SourceFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceFormat::Delimited => "delimited",
            SourceFormat::Parquet => "parquet",
        }
    }

    /// Guess from a file extension: `.parquet`/`.pq` are Parquet, anything else is text.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("parquet" | "pq") => SourceFormat::Parquet,
            _ => SourceFormat::Delimited,
        }
    }
}

/// Where and how to read a dataset.
///
/// `path` may be a single file or a directory of part files as produced by
/// [`Engine::write`]. Unset options fall back to the engine's configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDescriptor {
    pub path: PathBuf,
    pub format: Option<SourceFormat>,
    /// View name; defaults to the file or directory stem.
    pub name: Option<String>,
    pub delimiter: Option<char>,
    pub has_header: Option<bool>,
    /// Declared schema, used instead of inference.
    pub schema: Option<Schema>,
}

impl SourceDescriptor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            format: None,
            name: None,
            delimiter: None,
            has_header: None,
            schema: None,
        }
    }

    pub fn csv(path: impl Into<PathBuf>) -> Self {
        Self::new(path).with_format(SourceFormat::Delimited)
    }

    pub fn parquet(path: impl Into<PathBuf>) -> Self {
        Self::new(path).with_format(SourceFormat::Parquet)
    }

    pub fn with_format(mut self, format: SourceFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = Some(has_header);
        self
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// The view name queries will use.
    pub fn view_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("dataset")
            .to_string()
    }
}

/// Format for materialized output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Csv,
    Parquet,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
        }
    }

    /// Extension of part files.
    pub fn extension(self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = WashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "parquet" => Ok(OutputFormat::Parquet),
            other => Err(WashError::config(format!("unknown output format '{other}'"))),
        }
    }
}

/// What to do when the destination already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveMode {
    /// Replace whatever is there.
    Overwrite,
    /// Add a new part file; format and schema must match the existing data.
    Append,
    #[default]
    ErrorIfExists,
}

impl SaveMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SaveMode::Overwrite => "overwrite",
            SaveMode::Append => "append",
            SaveMode::ErrorIfExists => "error_if_exists",
        }
    }
}

impl fmt::Display for SaveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SaveMode {
    type Err = WashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "overwrite" => Ok(SaveMode::Overwrite),
            "append" => Ok(SaveMode::Append),
            "error_if_exists" | "errorifexists" | "error" => Ok(SaveMode::ErrorIfExists),
            other => Err(WashError::config(format!("unknown save mode '{other}'"))),
        }
    }
}

/// Result of a successful [`Engine::write`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    pub destination: PathBuf,
    pub part: PathBuf,
    pub rows: usize,
}

/// The collaborator that owns storage and materialization.
pub trait Engine {
    /// Read a dataset, inferring a schema unless the source declares one.
    fn load(&self, source: &SourceDescriptor) -> Result<Dataset, WashError>;

    /// Materialize `dataset` under `destination`.
    fn write(
        &self,
        dataset: &Dataset,
        destination: &Path,
        format: OutputFormat,
        mode: SaveMode,
    ) -> Result<WriteSummary, WashError>;

    /// All records, in order. Fails above the engine's row ceiling.
    fn collect(&self, dataset: &Dataset) -> Result<Vec<Record>, WashError>;

    fn count(&self, dataset: &Dataset) -> Result<usize, WashError>;

    /// Run SQL whose `FROM` names the dataset's view.
    fn query(&self, dataset: &Dataset, sql: &str) -> Result<Dataset, WashError>;
}
