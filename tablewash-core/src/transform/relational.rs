//! Column and row housekeeping transforms.

use crate::data::{Dataset, Field, Schema, ValueKey};
use crate::error::WashError;
use crate::query;
use crate::transform::Transform;
use crate::transform::aggregate::{OrderBy, sort_rows};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Keep only the named columns, in the given order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Select {
    pub columns: Vec<String>,
}

impl Select {
    fn indices(&self, input: &Schema) -> Result<Vec<usize>, WashError> {
        self.columns
            .iter()
            .map(|c| input.resolve(c).map(|r| r.index))
            .collect()
    }
}

impl Transform for Select {
    fn plan(&self, input: &Schema) -> Result<Schema, WashError> {
        input.project(&self.indices(input)?)
    }

    fn apply(&self, input: &Dataset) -> Result<Dataset, WashError> {
        let indices = self.indices(input.schema())?;
        let schema = input.schema().project(&indices)?;
        let rows = input
            .rows()
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Ok(input.derive(schema, rows))
    }
}

/// Remove the named columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropColumns {
    pub columns: Vec<String>,
}

impl DropColumns {
    fn as_select(&self, input: &Schema) -> Result<Select, WashError> {
        for c in &self.columns {
            input.resolve(c)?;
        }
        Ok(Select {
            columns: input
                .names()
                .filter(|n| !self.columns.iter().any(|c| c == n))
                .map(str::to_string)
                .collect(),
        })
    }
}

impl Transform for DropColumns {
    fn plan(&self, input: &Schema) -> Result<Schema, WashError> {
        self.as_select(input)?.plan(input)
    }

    fn apply(&self, input: &Dataset) -> Result<Dataset, WashError> {
        self.as_select(input.schema())?.apply(input)
    }
}

/// Rename one column. Values are untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameColumn {
    pub from: String,
    pub to: String,
}

impl Transform for RenameColumn {
    fn plan(&self, input: &Schema) -> Result<Schema, WashError> {
        let col = input.resolve(&self.from)?;
        let field = Field {
            name: self.to.clone(),
            ..input.fields()[col.index].clone()
        };
        input.with_field(Some(col.index), field)
    }

    fn apply(&self, input: &Dataset) -> Result<Dataset, WashError> {
        let schema = self.plan(input.schema())?;
        Ok(input.derive(schema, input.rows().to_vec()))
    }
}

/// Keep rows for which a predicate, written in the query language, holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub predicate: String,
}

impl Transform for Filter {
    fn plan(&self, input: &Schema) -> Result<Schema, WashError> {
        query::parse_predicate(&self.predicate)?.bind(input)?;
        Ok(input.clone())
    }

    fn apply(&self, input: &Dataset) -> Result<Dataset, WashError> {
        let predicate = query::parse_predicate(&self.predicate)?.bind(input.schema())?;
        let rows = input
            .rows()
            .iter()
            .filter(|row| predicate.matches(row))
            .cloned()
            .collect();
        Ok(input.with_rows(rows))
    }
}

/// Stable sort on one or more columns. Nulls sort first ascending, last descending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub by: Vec<OrderBy>,
}

impl Sort {
    fn order(&self, input: &Schema) -> Result<Vec<(usize, bool)>, WashError> {
        if self.by.is_empty() {
            return Err(WashError::config("sort needs at least one column"));
        }
        self.by
            .iter()
            .map(|o| input.resolve(&o.column).map(|c| (c.index, o.descending)))
            .collect()
    }
}

impl Transform for Sort {
    fn plan(&self, input: &Schema) -> Result<Schema, WashError> {
        self.order(input)?;
        Ok(input.clone())
    }

    fn apply(&self, input: &Dataset) -> Result<Dataset, WashError> {
        let order = self.order(input.schema())?;
        let mut rows = input.rows().to_vec();
        sort_rows(&mut rows, &order);
        Ok(input.with_rows(rows))
    }
}

/// Drop repeated rows, keeping the first occurrence.
///
/// With `columns` set, rows are compared on those columns only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deduplicate {
    #[serde(default)]
    pub columns: Option<Vec<String>>,
}

impl Deduplicate {
    fn indices(&self, input: &Schema) -> Result<Vec<usize>, WashError> {
        match &self.columns {
            Some(cols) => cols
                .iter()
                .map(|c| input.resolve(c).map(|r| r.index))
                .collect(),
            None => Ok((0..input.len()).collect()),
        }
    }
}

impl Transform for Deduplicate {
    fn plan(&self, input: &Schema) -> Result<Schema, WashError> {
        self.indices(input)?;
        Ok(input.clone())
    }

    fn apply(&self, input: &Dataset) -> Result<Dataset, WashError> {
        let indices = self.indices(input.schema())?;
        let mut seen: HashSet<Vec<ValueKey>> = HashSet::new();
        let rows = input
            .rows()
            .iter()
            .filter(|row| seen.insert(indices.iter().map(|&i| row[i].key()).collect()))
            .cloned()
            .collect();
        Ok(input.with_rows(rows))
    }
}

/// Keep the first `count` rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limit {
    pub count: usize,
}

impl Transform for Limit {
    fn plan(&self, input: &Schema) -> Result<Schema, WashError> {
        Ok(input.clone())
    }

    fn apply(&self, input: &Dataset) -> Result<Dataset, WashError> {
        if input.len() <= self.count {
            return Ok(input.clone());
        }
        Ok(input.with_rows(input.rows()[..self.count].to_vec()))
    }
}
