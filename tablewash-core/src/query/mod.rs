//! A small SQL dialect over one named dataset.
//!
//! ```text
//! SELECT dept, avg(salary) AS mean_salary FROM employees
//! WHERE salary IS NOT NULL GROUP BY dept ORDER BY mean_salary DESC LIMIT 5
//! ```

pub mod expr;
pub mod lexer;
pub mod parser;
pub mod plan;

pub use expr::{BoundExpr, Operand};
pub use parser::{CmpOp, Expr, Query, SelectItem, parse_predicate, parse_query};
pub use plan::QueryPlan;

use crate::data::Dataset;
use crate::error::WashError;

/// Run `sql` against `dataset`, which must carry the view name used in `FROM`.
pub fn run(dataset: &Dataset, sql: &str) -> Result<Dataset, WashError> {
    let view = dataset
        .name()
        .ok_or_else(|| WashError::query("dataset has no view name to query"))?;
    run_as(dataset, view, sql)
}

/// Run `sql` treating `dataset` as the view `view`.
pub fn run_as(dataset: &Dataset, view: &str, sql: &str) -> Result<Dataset, WashError> {
    let query = parse_query(sql)?;
    check_view(&query, view)?;
    let plan = QueryPlan::compile(&query, dataset.schema())?;
    tracing::debug!(view, rows_in = dataset.len(), "executing query");
    plan.execute(dataset)
}

pub(crate) fn check_view(query: &Query, view: &str) -> Result<(), WashError> {
    if query.from.eq_ignore_ascii_case(view) {
        Ok(())
    } else {
        Err(WashError::query(format!(
            "unknown view '{}' (available: {view})",
            query.from
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ColumnType, Value};

    #[test]
    fn test_view_name_is_case_insensitive() {
        let ds = Dataset::from_columns(&[("x", ColumnType::Integer)], vec![vec![Value::Int(1)]])
            .unwrap()
            .with_name("Numbers");
        assert_eq!(run(&ds, "select x from NUMBERS").unwrap().len(), 1);
        assert!(matches!(run(&ds, "select x from other"), Err(WashError::Query(_))));
    }

    #[test]
    fn test_unnamed_dataset_cannot_be_queried() {
        let ds = Dataset::from_columns(&[("x", ColumnType::Integer)], vec![]).unwrap();
        assert!(matches!(run(&ds, "select x from t"), Err(WashError::Query(_))));
        assert!(run_as(&ds, "t", "select x from t").unwrap().is_empty());
    }
}
