//! Error types for the tablewash-core crate.
//!
//! Configuration-class errors (`Config`, `UnknownColumn`, `TypeMismatch`) are
//! raised while planning, before any row is read. `StepFailed` is only ever
//! produced by the pipeline orchestrator.

use thiserror::Error;

/// Top-level error type for pipeline and engine operations.
#[derive(Debug, Error)]
pub enum WashError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown column '{name}' (available: {available})")]
    UnknownColumn { name: String, available: String },

    #[error("Type mismatch on column '{column}': expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        expected: String,
        found: String,
    },

    #[error("Data quality error: {0}")]
    DataQuality(String),

    #[error("Write error: {0}")]
    Write(String),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Load error: {0}")]
    Load(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Step {index} ({name}) failed: {source}")]
    StepFailed {
        index: usize,
        name: String,
        #[source]
        source: Box<WashError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Coarse classification of a [`WashError`], with step context removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    DataQuality,
    Write,
    ResourceExhausted,
    Load,
    Query,
    Io,
}

impl WashError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn data_quality(msg: impl Into<String>) -> Self {
        Self::DataQuality(msg.into())
    }

    pub fn write(msg: impl Into<String>) -> Self {
        Self::Write(msg.into())
    }

    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load(msg.into())
    }

    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    pub fn type_mismatch(
        column: impl Into<String>,
        expected: impl std::fmt::Display,
        found: impl std::fmt::Display,
    ) -> Self {
        Self::TypeMismatch {
            column: column.into(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Attach positional context from the orchestrator.
    pub fn in_step(self, index: usize, name: impl Into<String>) -> Self {
        Self::StepFailed {
            index,
            name: name.into(),
            source: Box::new(self),
        }
    }

    /// The originating error, with any step context peeled off.
    pub fn root_cause(&self) -> &WashError {
        match self {
            Self::StepFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Index and name of the failing step, if the error came out of a pipeline.
    pub fn failed_step(&self) -> Option<(usize, &str)> {
        match self {
            Self::StepFailed { index, name, .. } => Some((*index, name.as_str())),
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self.root_cause() {
            Self::Config(_) | Self::UnknownColumn { .. } | Self::TypeMismatch { .. } => {
                ErrorKind::Config
            }
            Self::Toml(_) => ErrorKind::Config,
            Self::DataQuality(_) => ErrorKind::DataQuality,
            Self::Write(_) => ErrorKind::Write,
            Self::ResourceExhausted(_) => ErrorKind::ResourceExhausted,
            Self::Load(_) | Self::Csv(_) | Self::Arrow(_) | Self::Parquet(_) => ErrorKind::Load,
            Self::Query(_) => ErrorKind::Query,
            Self::Io(_) | Self::Serde(_) => ErrorKind::Io,
            Self::StepFailed { source, .. } => source.kind(),
        }
    }
}
