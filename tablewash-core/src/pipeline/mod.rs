//! Pipeline orchestrator: ordered, fail-fast application of steps.
//!
//! A pipeline is planned in full before any data is read: every step checks
//! its configuration and the schema is threaded through the whole chain.
//! Execution then applies steps strictly in order and stops at the first
//! failure, reporting it as [`WashError::StepFailed`] with the step's
//! zero-based index and name.

pub mod step;

pub use step::{QueryStep, TransformStep};

use crate::data::{DataLineage, Dataset, Schema};
use crate::error::WashError;
use crate::transform::Transform;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// A step plus an optional display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub step: TransformStep,
}

impl Stage {
    /// Explicit name, or the step kind.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.step.kind())
    }
}

/// What one executed step did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformRecord {
    pub name: String,
    pub step: TransformStep,
    pub applied_at: DateTime<Utc>,
    pub rows_before: usize,
    pub rows_after: usize,
}

/// Outcome of [`Pipeline::run_with_report`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub pipeline: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub rows_in: usize,
    pub rows_out: usize,
    pub lineage: DataLineage,
}

/// An ordered list of steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub steps: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_steps(steps: impl IntoIterator<Item = TransformStep>) -> Self {
        steps.into_iter().fold(Self::new(), Self::add_step)
    }

    pub fn add_step(mut self, step: impl Into<TransformStep>) -> Self {
        self.steps.push(Stage {
            name: None,
            step: step.into(),
        });
        self
    }

    pub fn add_named_step(mut self, name: impl Into<String>, step: impl Into<TransformStep>) -> Self {
        self.steps.push(Stage {
            name: Some(name.into()),
            step: step.into(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Thread `input` through every step's plan and return the final schema.
    pub fn plan(&self, input: &Schema) -> Result<Schema, WashError> {
        let mut schema = input.clone();
        for (index, stage) in self.steps.iter().enumerate() {
            schema = stage
                .step
                .plan(&schema)
                .map_err(|e| e.in_step(index, stage.name()))?;
        }
        Ok(schema)
    }

    /// Plan, then apply every step in order.
    pub fn run(&self, dataset: &Dataset) -> Result<Dataset, WashError> {
        self.execute(dataset, |_| {})
    }

    /// Like [`run`](Self::run), also recording per-step lineage on top of
    /// `lineage`, which describes where `dataset` came from.
    pub fn run_with_report(
        &self,
        dataset: &Dataset,
        mut lineage: DataLineage,
    ) -> Result<(Dataset, RunReport), WashError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        tracing::info!(%run_id, steps = self.len(), rows = dataset.len(), "pipeline started");

        let output = self.execute(dataset, |record| lineage.add_transform(record))?;

        let report = RunReport {
            run_id,
            pipeline: self.name.clone(),
            started_at,
            finished_at: Utc::now(),
            rows_in: dataset.len(),
            rows_out: output.len(),
            lineage,
        };
        tracing::info!(%run_id, rows = output.len(), "pipeline finished");
        Ok((output, report))
    }

    fn execute(
        &self,
        dataset: &Dataset,
        mut on_step: impl FnMut(TransformRecord),
    ) -> Result<Dataset, WashError> {
        self.plan(dataset.schema())?;

        let mut current = dataset.clone();
        for (index, stage) in self.steps.iter().enumerate() {
            let name = stage.name();
            let span = tracing::info_span!("step", index, name);
            let _guard = span.enter();

            let rows_before = current.len();
            current = stage.step.apply(&current).map_err(|e| {
                tracing::warn!(error = %e, "step failed");
                e.in_step(index, name)
            })?;
            tracing::debug!(rows_before, rows_after = current.len(), "step applied");

            on_step(TransformRecord {
                name: name.to_string(),
                step: stage.step.clone(),
                applied_at: Utc::now(),
                rows_before,
                rows_after: current.len(),
            });
        }
        Ok(current)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, WashError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self, WashError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a pipeline file; `.json` files are JSON, anything else TOML.
    pub fn from_path(path: &Path) -> Result<Self, WashError> {
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_toml_str(&text)
        }
    }

    pub fn to_toml_string(&self) -> Result<String, WashError> {
        toml::to_string_pretty(self).map_err(|e| WashError::config(e.to_string()))
    }
}

/// Apply `steps` in order to `dataset`, failing fast.
pub fn run(dataset: &Dataset, steps: &[TransformStep]) -> Result<Dataset, WashError> {
    Pipeline::from_steps(steps.iter().cloned()).run(dataset)
}
