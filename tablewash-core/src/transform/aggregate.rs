//! Aggregator: group by key columns and summarize.

use crate::data::{ColumnRef, ColumnType, Dataset, Field, Row, Schema, Value, ValueKey};
use crate::error::WashError;
use crate::transform::Transform;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Source name that lets `count` count rows without naming a column.
pub const ALL_ROWS: &str = "*";

/// Aggregation function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggFunc {
    Count,
    Sum,
    #[serde(alias = "average", alias = "mean")]
    Avg,
    Min,
    Max,
}

impl AggFunc {
    pub fn as_str(self) -> &'static str {
        match self {
            AggFunc::Count => "count",
            AggFunc::Sum => "sum",
            AggFunc::Avg => "avg",
            AggFunc::Min => "min",
            AggFunc::Max => "max",
        }
    }

    /// Case-insensitive lookup by SQL name.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "count" => Some(AggFunc::Count),
            "sum" => Some(AggFunc::Sum),
            "avg" | "average" | "mean" => Some(AggFunc::Avg),
            "min" => Some(AggFunc::Min),
            "max" => Some(AggFunc::Max),
            _ => None,
        }
    }

    fn output_type(self, input: Option<ColumnType>) -> ColumnType {
        match (self, input) {
            (AggFunc::Count, _) => ColumnType::Integer,
            (AggFunc::Avg, _) => ColumnType::Float,
            (_, Some(t)) => t,
            (_, None) => ColumnType::Integer,
        }
    }
}

impl fmt::Display for AggFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One requested statistic: `func(column) AS output`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggExpr {
    pub column: String,
    pub func: AggFunc,
    pub output: String,
}

impl AggExpr {
    pub fn new(column: impl Into<String>, func: AggFunc, output: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            func,
            output: output.into(),
        }
    }
}

/// Explicit ordering on an output column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: String,
    #[serde(default)]
    pub descending: bool,
}

/// Grouping keys, statistics and optional output ordering.
///
/// Without `order_by` the order of groups is unspecified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationSpec {
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub aggregations: Vec<AggExpr>,
    #[serde(default)]
    pub order_by: Vec<OrderBy>,
}

impl AggregationSpec {
    pub fn group_by<S: Into<String>>(keys: impl IntoIterator<Item = S>) -> Self {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn agg(mut self, column: impl Into<String>, func: AggFunc, output: impl Into<String>) -> Self {
        self.aggregations.push(AggExpr::new(column, func, output));
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, descending: bool) -> Self {
        self.order_by.push(OrderBy {
            column: column.into(),
            descending,
        });
        self
    }

    /// Resolve keys and sources against `input`.
    fn resolve(&self, input: &Schema) -> Result<ResolvedSpec, WashError> {
        let keys = self
            .keys
            .iter()
            .map(|k| input.resolve(k))
            .collect::<Result<Vec<_>, _>>()?;

        let mut sources = Vec::with_capacity(self.aggregations.len());
        let mut fields: Vec<Field> = keys
            .iter()
            .map(|k| input.fields()[k.index].clone())
            .collect();

        for agg in &self.aggregations {
            let source = if agg.column == ALL_ROWS {
                if agg.func != AggFunc::Count {
                    return Err(WashError::config(format!(
                        "'{}' only accepts '*' for count, not {}",
                        agg.output, agg.func
                    )));
                }
                None
            } else {
                let col = input.resolve(&agg.column)?;
                if matches!(agg.func, AggFunc::Sum | AggFunc::Avg) {
                    col.require_numeric()?;
                }
                Some(col)
            };
            fields.push(Field {
                name: agg.output.clone(),
                dtype: agg.func.output_type(source.as_ref().map(|c| c.dtype)),
                nullable: agg.func != AggFunc::Count,
            });
            sources.push((source, agg.func));
        }

        let schema = Schema::new(fields)?;
        let order = self
            .order_by
            .iter()
            .map(|o| schema.resolve(&o.column).map(|c| (c.index, o.descending)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ResolvedSpec {
            keys,
            sources,
            schema,
            order,
        })
    }
}

struct ResolvedSpec {
    keys: Vec<ColumnRef>,
    sources: Vec<(Option<ColumnRef>, AggFunc)>,
    schema: Schema,
    order: Vec<(usize, bool)>,
}

/// Running state for one statistic of one group.
enum Accumulator {
    Count(i64),
    SumInt(Option<i64>),
    SumFloat(Option<f64>),
    Avg { sum: f64, n: usize },
    Min(Option<Value>),
    Max(Option<Value>),
}

impl Accumulator {
    fn new(func: AggFunc, dtype: Option<ColumnType>) -> Self {
        match func {
            AggFunc::Count => Accumulator::Count(0),
            AggFunc::Sum if dtype == Some(ColumnType::Integer) => Accumulator::SumInt(None),
            AggFunc::Sum => Accumulator::SumFloat(None),
            AggFunc::Avg => Accumulator::Avg { sum: 0.0, n: 0 },
            AggFunc::Min => Accumulator::Min(None),
            AggFunc::Max => Accumulator::Max(None),
        }
    }

    fn update(&mut self, value: Option<&Value>) -> Result<(), WashError> {
        if let Accumulator::Count(n) = self {
            *n += 1;
            return Ok(());
        }
        let Some(value) = value.filter(|v| !v.is_null()) else {
            return Ok(());
        };
        match self {
            Accumulator::Count(_) => {}
            Accumulator::SumInt(total) => {
                if let Value::Int(i) = value {
                    let next = total.unwrap_or(0).checked_add(*i).ok_or_else(|| {
                        WashError::data_quality("integer overflow while computing sum")
                    })?;
                    *total = Some(next);
                }
            }
            Accumulator::SumFloat(total) => {
                if let Some(x) = value.as_f64() {
                    *total = Some(total.unwrap_or(0.0) + x);
                }
            }
            Accumulator::Avg { sum, n } => {
                if let Some(x) = value.as_f64() {
                    *sum += x;
                    *n += 1;
                }
            }
            Accumulator::Min(best) => {
                if best.as_ref().is_none_or(|b| value.total_cmp(b).is_lt()) {
                    *best = Some(value.clone());
                }
            }
            Accumulator::Max(best) => {
                if best.as_ref().is_none_or(|b| value.total_cmp(b).is_gt()) {
                    *best = Some(value.clone());
                }
            }
        }
        Ok(())
    }

    fn finish(self) -> Value {
        match self {
            Accumulator::Count(n) => Value::Int(n),
            Accumulator::SumInt(total) => total.into(),
            Accumulator::SumFloat(total) => total.into(),
            Accumulator::Avg { n: 0, .. } => Value::Null,
            Accumulator::Avg { sum, n } => Value::Float(sum / n as f64),
            Accumulator::Min(v) | Accumulator::Max(v) => v.unwrap_or_default(),
        }
    }
}

impl Transform for AggregationSpec {
    fn plan(&self, input: &Schema) -> Result<Schema, WashError> {
        Ok(self.resolve(input)?.schema)
    }

    fn apply(&self, input: &Dataset) -> Result<Dataset, WashError> {
        let spec = self.resolve(input.schema())?;
        let fresh = || -> Vec<Accumulator> {
            spec.sources
                .iter()
                .map(|(col, func)| Accumulator::new(*func, col.as_ref().map(|c| c.dtype)))
                .collect()
        };

        let mut index: HashMap<Vec<ValueKey>, usize> = HashMap::new();
        let mut groups: Vec<(Row, Vec<Accumulator>)> = Vec::new();

        for row in input.rows() {
            let key: Vec<ValueKey> = spec.keys.iter().map(|k| row[k.index].key()).collect();
            let slot = *index.entry(key).or_insert_with(|| {
                let key_values = spec.keys.iter().map(|k| row[k.index].clone()).collect();
                groups.push((key_values, fresh()));
                groups.len() - 1
            });
            let accumulators = &mut groups[slot].1;
            for (acc, (col, _)) in accumulators.iter_mut().zip(&spec.sources) {
                acc.update(col.as_ref().map(|c| &row[c.index]))?;
            }
        }

        // A global aggregate over no rows still yields one row
        if spec.keys.is_empty() && groups.is_empty() {
            groups.push((Vec::new(), fresh()));
        }

        let mut rows: Vec<Row> = groups
            .into_iter()
            .map(|(mut row, accumulators)| {
                row.extend(accumulators.into_iter().map(Accumulator::finish));
                row
            })
            .collect();

        if !spec.order.is_empty() {
            sort_rows(&mut rows, &spec.order);
        }

        tracing::debug!(
            rows_in = input.len(),
            groups = rows.len(),
            "aggregated"
        );
        Ok(input.derive(spec.schema, rows))
    }
}

/// Stable sort on `(column index, descending)` pairs; nulls first when ascending.
pub(crate) fn sort_rows(rows: &mut [Row], order: &[(usize, bool)]) {
    rows.sort_by(|a, b| {
        order
            .iter()
            .map(|&(i, descending)| {
                let ord = a[i].total_cmp(&b[i]);
                if descending { ord.reverse() } else { ord }
            })
            .find(|o| o.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Group `dataset` by `spec.keys` and compute `spec.aggregations` per group.
pub fn aggregate(dataset: &Dataset, spec: &AggregationSpec) -> Result<Dataset, WashError> {
    spec.apply(dataset)
}
