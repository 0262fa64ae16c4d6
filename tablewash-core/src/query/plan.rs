//! Compilation of a parsed query into filter, aggregation and projection.

use crate::data::{Dataset, Field, Row, Schema};
use crate::error::WashError;
use crate::query::expr::BoundExpr;
use crate::query::parser::{Query, SelectItem, default_agg_name};
use crate::transform::Transform;
use crate::transform::aggregate::{AggregationSpec, sort_rows};

/// An executable query, checked against one input schema.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    filter: Option<BoundExpr>,
    aggregation: Option<AggregationSpec>,
    projection: Vec<usize>,
    schema: Schema,
    order: Vec<(usize, bool)>,
    limit: Option<usize>,
}

impl QueryPlan {
    pub fn compile(query: &Query, input: &Schema) -> Result<Self, WashError> {
        let filter = query.filter.as_ref().map(|e| e.bind(input)).transpose()?;

        let aggregating = !query.group_by.is_empty()
            || query
                .items
                .iter()
                .any(|i| matches!(i, SelectItem::Aggregate { .. }));

        let (aggregation, source, picks) = if aggregating {
            let (spec, picks) = aggregation_for(query)?;
            let schema = spec.plan(input).map_err(|e| match e {
                WashError::Config(msg) => WashError::query(msg),
                other => other,
            })?;
            (Some(spec), schema, picks)
        } else {
            let mut picks = Vec::new();
            for item in &query.items {
                match item {
                    SelectItem::Wildcard => {
                        picks.extend(input.names().enumerate().map(|(i, n)| (i, n.to_string())));
                    }
                    SelectItem::Column { name, alias } => {
                        let col = input.resolve(name)?;
                        picks.push((col.index, alias.clone().unwrap_or(col.name)));
                    }
                    SelectItem::Aggregate { .. } => {}
                }
            }
            (None, input.clone(), picks)
        };

        let fields = picks
            .iter()
            .map(|(i, name)| Field {
                name: name.clone(),
                ..source.fields()[*i].clone()
            })
            .collect();
        let schema = Schema::new(fields).map_err(|e| WashError::query(e.to_string()))?;

        let order = query
            .order_by
            .iter()
            .map(|o| schema.resolve(&o.column).map(|c| (c.index, o.descending)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            filter,
            aggregation,
            projection: picks.into_iter().map(|(i, _)| i).collect(),
            schema,
            order,
            limit: query.limit,
        })
    }

    /// Output schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn execute(&self, input: &Dataset) -> Result<Dataset, WashError> {
        let mut current = match &self.filter {
            Some(predicate) => input.with_rows(
                input
                    .rows()
                    .iter()
                    .filter(|row| predicate.matches(row))
                    .cloned()
                    .collect(),
            ),
            None => input.clone(),
        };
        if let Some(spec) = &self.aggregation {
            current = spec.apply(&current)?;
        }

        let mut rows: Vec<Row> = current
            .rows()
            .iter()
            .map(|row| self.projection.iter().map(|&i| row[i].clone()).collect())
            .collect();
        if !self.order.is_empty() {
            sort_rows(&mut rows, &self.order);
        }
        if let Some(limit) = self.limit {
            rows.truncate(limit);
        }
        Ok(input.derive(self.schema.clone(), rows))
    }
}

/// Turn the select list into an aggregation plus, for each select item, its
/// position and output name in the aggregation's output.
fn aggregation_for(query: &Query) -> Result<(AggregationSpec, Vec<(usize, String)>), WashError> {
    let mut spec = AggregationSpec::group_by(query.group_by.iter().cloned());
    let mut picks = Vec::with_capacity(query.items.len());

    for item in &query.items {
        match item {
            SelectItem::Wildcard => {
                return Err(WashError::query("'*' cannot be selected in an aggregate query"));
            }
            SelectItem::Column { name, alias } => {
                let position = query.group_by.iter().position(|k| k == name).ok_or_else(|| {
                    WashError::query(format!(
                        "column '{name}' must appear in GROUP BY or inside an aggregate"
                    ))
                })?;
                picks.push((position, alias.clone().unwrap_or_else(|| name.clone())));
            }
            SelectItem::Aggregate {
                func,
                column,
                alias,
            } => {
                let output = alias
                    .clone()
                    .unwrap_or_else(|| default_agg_name(*func, column));
                picks.push((query.group_by.len() + spec.aggregations.len(), output.clone()));
                spec = spec.agg(column.clone(), *func, output);
            }
        }
    }
    Ok((spec, picks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ColumnType, Value};
    use crate::query::parse_query;
    use pretty_assertions::assert_eq;

    fn staff() -> Dataset {
        Dataset::from_columns(
            &[
                ("name", ColumnType::String),
                ("dept", ColumnType::String),
                ("salary", ColumnType::Integer),
            ],
            vec![
                vec!["Ann".into(), "IT".into(), Value::Int(50000)],
                vec!["Bo".into(), "IT".into(), Value::Int(60000)],
                vec!["Cy".into(), "HR".into(), Value::Int(45000)],
                vec!["Di".into(), "HR".into(), Value::Null],
            ],
        )
        .unwrap()
        .with_name("staff")
    }

    fn exec(sql: &str) -> Result<Dataset, WashError> {
        let ds = staff();
        QueryPlan::compile(&parse_query(sql)?, ds.schema())?.execute(&ds)
    }

    #[test]
    fn test_group_by_with_default_names() {
        let out = exec("SELECT dept, AVG(salary), count(*) FROM staff GROUP BY dept ORDER BY dept")
            .unwrap();
        assert_eq!(
            out.schema().names().collect::<Vec<_>>(),
            vec!["dept", "avg(salary)", "count(*)"]
        );
        assert_eq!(
            out.rows(),
            &[
                vec![Value::from("HR"), Value::Float(45000.0), Value::Int(2)],
                vec![Value::from("IT"), Value::Float(55000.0), Value::Int(2)],
            ]
        );
    }

    #[test]
    fn test_projection_filter_order_limit() {
        let out = exec(
            "SELECT name AS who, salary FROM staff WHERE salary IS NOT NULL \
             ORDER BY salary DESC LIMIT 2",
        )
        .unwrap();
        assert_eq!(out.schema().names().collect::<Vec<_>>(), vec!["who", "salary"]);
        assert_eq!(
            out.column_values("who").unwrap(),
            vec![Value::from("Bo"), Value::from("Ann")]
        );
        assert_eq!(out.name(), Some("staff"));
    }

    #[test]
    fn test_aggregate_select_must_be_grouped() {
        assert!(matches!(
            exec("SELECT name, count(*) FROM staff GROUP BY dept"),
            Err(WashError::Query(_))
        ));
        assert!(matches!(
            exec("SELECT *, count(*) FROM staff"),
            Err(WashError::Query(_))
        ));
        assert!(matches!(
            exec("SELECT name, name FROM staff"),
            Err(WashError::Query(_))
        ));
        assert!(matches!(
            exec("SELECT count(*), count(*) FROM staff"),
            Err(WashError::Query(_))
        ));
    }

    #[test]
    fn test_global_aggregate_with_where() {
        let out = exec("SELECT max(salary) AS top FROM staff WHERE dept = 'HR'").unwrap();
        assert_eq!(out.rows(), &[vec![Value::Int(45000)]]);
    }
}
