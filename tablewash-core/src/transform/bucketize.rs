//! Bucketizer: map a numeric column onto ordered categorical labels.

use crate::data::{ColumnType, Dataset, Field, Schema, Value};
use crate::error::WashError;
use crate::transform::Transform;
use serde::{Deserialize, Serialize};

/// Label given to null (and NaN) inputs.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// `value < thresholds[i]` selects `labels[i]` for the first such `i`;
/// anything at or above the last threshold gets the last label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucketize {
    pub column: String,
    pub thresholds: Vec<f64>,
    pub labels: Vec<String>,
    pub output_column: String,
}

impl Bucketize {
    pub fn new<S: Into<String>>(
        column: impl Into<String>,
        thresholds: impl Into<Vec<f64>>,
        labels: impl IntoIterator<Item = S>,
        output_column: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            thresholds: thresholds.into(),
            labels: labels.into_iter().map(Into::into).collect(),
            output_column: output_column.into(),
        }
    }

    /// Static checks on thresholds and labels; needs no data.
    pub fn validate(&self) -> Result<(), WashError> {
        if self.labels.len() != self.thresholds.len() + 1 {
            return Err(WashError::config(format!(
                "bucketize '{}': {} thresholds need {} labels, got {}",
                self.column,
                self.thresholds.len(),
                self.thresholds.len() + 1,
                self.labels.len()
            )));
        }
        if let Some(bad) = self.thresholds.iter().find(|t| !t.is_finite()) {
            return Err(WashError::config(format!(
                "bucketize '{}': threshold {bad} is not finite",
                self.column
            )));
        }
        if let Some(pair) = self.thresholds.windows(2).find(|w| w[0] >= w[1]) {
            return Err(WashError::config(format!(
                "bucketize '{}': thresholds must be strictly ascending ({} >= {})",
                self.column, pair[0], pair[1]
            )));
        }
        if self.output_column.is_empty() {
            return Err(WashError::config("bucketize output column name is empty"));
        }
        Ok(())
    }

    /// The label for one value.
    pub fn label_for(&self, value: &Value) -> &str {
        match value.as_f64() {
            Some(x) if !x.is_nan() => {
                let bucket = self.thresholds.partition_point(|t| *t <= x);
                &self.labels[bucket]
            }
            _ => UNKNOWN_LABEL,
        }
    }
}

impl Transform for Bucketize {
    fn plan(&self, input: &Schema) -> Result<Schema, WashError> {
        self.validate()?;
        input.resolve(&self.column)?.require_numeric()?;
        let field = Field {
            name: self.output_column.clone(),
            dtype: ColumnType::String,
            nullable: false,
        };
        input.with_field(input.index_of(&self.output_column), field)
    }

    fn apply(&self, input: &Dataset) -> Result<Dataset, WashError> {
        let schema = self.plan(input.schema())?;
        let source = input.column_ref(&self.column)?;
        let target = input.schema().index_of(&self.output_column);

        let rows = input
            .rows()
            .iter()
            .map(|row| {
                let label = Value::from(self.label_for(&row[source.index]));
                let mut row = row.clone();
                match target {
                    Some(i) => row[i] = label,
                    None => row.push(label),
                }
                row
            })
            .collect();
        Ok(input.derive(schema, rows))
    }
}

/// Add (or replace) `output_column` with the label of each `column` value.
pub fn bucketize(
    dataset: &Dataset,
    column: &str,
    thresholds: &[f64],
    labels: &[&str],
    output_column: &str,
) -> Result<Dataset, WashError> {
    Bucketize::new(column, thresholds, labels.iter().copied(), output_column).apply(dataset)
}
