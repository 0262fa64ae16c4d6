//! Per-column summary statistics, in the spirit of `describe()`.

use crate::data::{ColumnType, Dataset, Value, ValueKey};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Statistics for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub name: String,
    pub dtype: ColumnType,
    pub null_count: usize,
    pub null_percentage: f64,
    pub distinct_count: usize,
    pub min: Option<Value>,
    pub max: Option<Value>,
    /// Numeric columns only.
    pub mean: Option<f64>,
    /// Population standard deviation; numeric columns only.
    pub std_dev: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetProfile {
    pub total_rows: usize,
    pub columns: Vec<ColumnStats>,
}

impl DatasetProfile {
    pub fn column(&self, name: &str) -> Option<&ColumnStats> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Columns with at least one null, with their counts.
    pub fn null_counts(&self) -> impl Iterator<Item = (&str, usize)> {
        self.columns
            .iter()
            .filter(|c| c.null_count > 0)
            .map(|c| (c.name.as_str(), c.null_count))
    }
}

/// Compute statistics for every column of `dataset`.
pub fn profile(dataset: &Dataset) -> DatasetProfile {
    let total_rows = dataset.len();
    let columns = dataset
        .schema()
        .fields()
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let values: Vec<&Value> = dataset
                .rows()
                .iter()
                .map(|row| &row[i])
                .filter(|v| !v.is_null())
                .collect();
            let null_count = total_rows - values.len();
            let distinct: HashSet<ValueKey> = values.iter().map(|v| v.key()).collect();

            let (mean, std_dev) = if field.dtype.is_numeric() && !values.is_empty() {
                let xs: Vec<f64> = values.iter().filter_map(|v| v.as_f64()).collect();
                let n = xs.len() as f64;
                let mean = xs.iter().sum::<f64>() / n;
                let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
                (Some(mean), Some(var.sqrt()))
            } else {
                (None, None)
            };

            ColumnStats {
                name: field.name.clone(),
                dtype: field.dtype,
                null_count,
                null_percentage: if total_rows > 0 {
                    null_count as f64 / total_rows as f64 * 100.0
                } else {
                    0.0
                },
                distinct_count: distinct.len(),
                min: values.iter().copied().min_by(|a, b| a.total_cmp(b)).cloned(),
                max: values.iter().copied().max_by(|a, b| a.total_cmp(b)).cloned(),
                mean,
                std_dev,
            }
        })
        .collect();

    DatasetProfile {
        total_rows,
        columns,
    }
}

impl fmt::Display for DatasetProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} rows", self.total_rows)?;
        for c in &self.columns {
            let opt = |v: &Option<Value>| v.as_ref().map_or("-".to_string(), Value::to_string);
            let num = |v: Option<f64>| v.map_or("-".to_string(), |x| format!("{x:.2}"));
            writeln!(
                f,
                "  {:<20} {:<8} nulls {:>6} ({:>5.1}%)  distinct {:>6}  min {}  max {}  mean {}  std {}",
                c.name,
                c.dtype,
                c.null_count,
                c.null_percentage,
                c.distinct_count,
                opt(&c.min),
                opt(&c.max),
                num(c.mean),
                num(c.std_dev),
            )?;
        }
        Ok(())
    }
}
