//! Null imputer: replace missing values per column policy.

use crate::data::{ColumnRef, ColumnType, Dataset, Schema, Value, ValueKey};
use crate::error::WashError;
use crate::transform::Transform;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Statistic used to fill nulls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputeStrategy {
    Mean,
    Median,
    Mode,
    Zero,
}

impl ImputeStrategy {
    fn as_str(self) -> &'static str {
        match self {
            ImputeStrategy::Mean => "mean",
            ImputeStrategy::Median => "median",
            ImputeStrategy::Mode => "mode",
            ImputeStrategy::Zero => "zero",
        }
    }
}

/// What to put in place of a null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fill {
    Literal(Value),
    Strategy(ImputeStrategy),
}

/// Column name → fill. Columns not listed keep their nulls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImputePolicy {
    pub columns: BTreeMap<String, Fill>,
}

impl ImputePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn literal(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.columns
            .insert(column.into(), Fill::Literal(value.into()));
        self
    }

    pub fn strategy(mut self, column: impl Into<String>, strategy: ImputeStrategy) -> Self {
        self.columns
            .insert(column.into(), Fill::Strategy(strategy));
        self
    }

    /// Check one column's fill against its type. Returns the coerced literal, if any.
    fn check(&self, col: &ColumnRef, fill: &Fill) -> Result<Option<Value>, WashError> {
        match fill {
            Fill::Literal(Value::Null) => Err(WashError::config(format!(
                "impute literal for '{}' is null",
                col.name
            ))),
            Fill::Literal(value) => match value.coerce_to(col.dtype) {
                Some(v) => Ok(Some(v)),
                None => Err(WashError::type_mismatch(
                    &col.name,
                    col.dtype,
                    format!("literal {value}"),
                )),
            },
            Fill::Strategy(ImputeStrategy::Mode) => Ok(None),
            Fill::Strategy(_) => col.require_numeric().map(|_| None),
        }
    }
}

impl Transform for ImputePolicy {
    fn plan(&self, input: &Schema) -> Result<Schema, WashError> {
        for (name, fill) in &self.columns {
            let col = input.resolve(name)?;
            self.check(&col, fill)?;
        }
        Ok(input.clone())
    }

    fn apply(&self, input: &Dataset) -> Result<Dataset, WashError> {
        let mut substitutes = Vec::with_capacity(self.columns.len());
        for (name, fill) in &self.columns {
            let col = input.column_ref(name)?;
            let literal = self.check(&col, fill)?;
            let substitute = match fill {
                Fill::Literal(_) => literal.unwrap_or_default(),
                Fill::Strategy(strategy) => statistic(input, &col, *strategy)?,
            };
            tracing::debug!(column = %col.name, substitute = %substitute, "imputing nulls");
            substitutes.push((col.index, substitute));
        }

        let rows = input
            .rows()
            .iter()
            .map(|row| {
                let mut row = row.clone();
                for (index, substitute) in &substitutes {
                    if row[*index].is_null() {
                        row[*index] = substitute.clone();
                    }
                }
                row
            })
            .collect();
        Ok(input.with_rows(rows))
    }
}

/// Compute a fill value over the non-null values of `col`.
fn statistic(
    input: &Dataset,
    col: &ColumnRef,
    strategy: ImputeStrategy,
) -> Result<Value, WashError> {
    let numeric = |x: f64| match col.dtype {
        ColumnType::Integer => Value::Int(x.round() as i64),
        _ => Value::Float(x),
    };

    match strategy {
        ImputeStrategy::Zero => Ok(numeric(0.0)),
        ImputeStrategy::Mean => {
            let present = non_null(input, col, strategy)?;
            let sum: f64 = present.iter().filter_map(|v| v.as_f64()).sum();
            Ok(numeric(sum / present.len() as f64))
        }
        ImputeStrategy::Median => {
            let present = non_null(input, col, strategy)?;
            let mut xs: Vec<f64> = present.iter().filter_map(|v| v.as_f64()).collect();
            xs.sort_by(f64::total_cmp);
            let mid = xs.len() / 2;
            let median = if xs.len() % 2 == 0 {
                (xs[mid - 1] + xs[mid]) / 2.0
            } else {
                xs[mid]
            };
            Ok(numeric(median))
        }
        ImputeStrategy::Mode => Ok(mode(&non_null(input, col, strategy)?)),
    }
}

/// Non-null values of `col`; a statistic over none of them is a data quality failure.
fn non_null<'a>(
    input: &'a Dataset,
    col: &ColumnRef,
    strategy: ImputeStrategy,
) -> Result<Vec<&'a Value>, WashError> {
    let present: Vec<&Value> = input.column(col).filter(|v| !v.is_null()).collect();
    if present.is_empty() {
        return Err(WashError::data_quality(format!(
            "cannot impute '{}' with {}: column has no non-null values",
            col.name,
            strategy.as_str()
        )));
    }
    Ok(present)
}

/// Most frequent value; ties go to the smallest.
fn mode(values: &[&Value]) -> Value {
    let mut counts: HashMap<ValueKey, (&Value, usize)> = HashMap::new();
    for value in values {
        counts.entry(value.key()).or_insert((*value, 0)).1 += 1;
    }
    counts
        .into_values()
        .max_by(|(a, ca), (b, cb)| ca.cmp(cb).then_with(|| b.total_cmp(a)))
        .map(|(v, _)| v.clone())
        .unwrap_or_default()
}

/// Replace nulls according to `policy`. Columns absent from the policy keep their nulls.
pub fn impute(dataset: &Dataset, policy: &ImputePolicy) -> Result<Dataset, WashError> {
    policy.apply(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn salaries() -> Dataset {
        Dataset::from_columns(
            &[
                ("dept", ColumnType::String),
                ("salary", ColumnType::Integer),
                ("bonus", ColumnType::Float),
            ],
            vec![
                vec!["IT".into(), Value::Null, Value::Null],
                vec!["IT".into(), Value::Int(60000), Value::Float(1.5)],
                vec![Value::Null, Value::Int(40000), Value::Float(2.0)],
                vec!["HR".into(), Value::Int(45000), Value::Null],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_literal_fills_only_nulls() {
        let out = impute(&salaries(), &ImputePolicy::new().literal("salary", 50000i64)).unwrap();
        assert_eq!(
            out.column_values("salary").unwrap(),
            vec![
                Value::Int(50000),
                Value::Int(60000),
                Value::Int(40000),
                Value::Int(45000)
            ]
        );
        // Columns outside the policy keep their nulls
        assert_eq!(out.column_values("dept").unwrap()[2], Value::Null);
    }

    #[test]
    fn test_literal_is_coerced_to_column_type() {
        let out = impute(&salaries(), &ImputePolicy::new().literal("bonus", 0i64)).unwrap();
        assert_eq!(out.column_values("bonus").unwrap()[0], Value::Float(0.0));
    }

    #[test]
    fn test_incompatible_literal_is_config_error() {
        let policy = ImputePolicy::new().literal("salary", "unknown");
        let err = policy.plan(salaries().schema()).unwrap_err();
        assert!(matches!(err, WashError::TypeMismatch { .. }));
    }

    #[test]
    fn test_mean_rounds_for_integer_columns() {
        let out = impute(
            &salaries(),
            &ImputePolicy::new().strategy("salary", ImputeStrategy::Mean),
        )
        .unwrap();
        // (60000 + 40000 + 45000) / 3 = 48333.33
        assert_eq!(out.column_values("salary").unwrap()[0], Value::Int(48333));
    }

    #[test]
    fn test_median_of_even_count() {
        let out = impute(
            &salaries(),
            &ImputePolicy::new().strategy("bonus", ImputeStrategy::Median),
        )
        .unwrap();
        assert_eq!(out.column_values("bonus").unwrap()[0], Value::Float(1.75));
    }

    #[test]
    fn test_mode_ties_pick_smallest() {
        let out = impute(
            &salaries(),
            &ImputePolicy::new().strategy("dept", ImputeStrategy::Mode),
        )
        .unwrap();
        assert_eq!(out.column_values("dept").unwrap()[2], Value::from("IT"));

        let ds = Dataset::from_columns(
            &[("x", ColumnType::Integer)],
            vec![vec![Value::Int(3)], vec![Value::Int(1)], vec![Value::Null]],
        )
        .unwrap();
        let out = impute(&ds, &ImputePolicy::new().strategy("x", ImputeStrategy::Mode)).unwrap();
        assert_eq!(out.column_values("x").unwrap()[2], Value::Int(1));
    }

    #[test]
    fn test_statistic_on_all_null_column_is_data_quality_error() {
        let ds = Dataset::from_columns(
            &[("x", ColumnType::Float)],
            vec![vec![Value::Null], vec![Value::Null]],
        )
        .unwrap();
        let err = impute(&ds, &ImputePolicy::new().strategy("x", ImputeStrategy::Median))
            .unwrap_err();
        assert!(matches!(err, WashError::DataQuality(_)));

        // zero needs no statistic
        let out = impute(&ds, &ImputePolicy::new().strategy("x", ImputeStrategy::Zero)).unwrap();
        assert_eq!(out.column_values("x").unwrap(), vec![Value::Float(0.0); 2]);
    }

    #[test]
    fn test_mean_on_string_column_is_rejected_at_plan() {
        let policy = ImputePolicy::new().strategy("dept", ImputeStrategy::Mean);
        assert!(policy.plan(salaries().schema()).is_err());
    }

    #[test]
    fn test_policy_deserializes_from_toml() {
        let policy: ImputePolicy = toml::from_str(
            r#"
            salary = { literal = 50000 }
            bonus = { strategy = "median" }
            "#,
        )
        .unwrap();
        assert_eq!(
            policy,
            ImputePolicy::new()
                .literal("salary", 50000i64)
                .strategy("bonus", ImputeStrategy::Median)
        );
    }
}
