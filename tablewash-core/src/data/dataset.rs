//! Immutable, schema-conforming tables.
//!
//! A [`Dataset`] shares its schema and row storage behind `Arc`s, so cloning
//! one is cheap and every transformation produces a fresh dataset without
//! touching its input.

use crate::data::schema::{ColumnRef, ColumnType, Field, Schema};
use crate::data::value::Value;
use crate::error::WashError;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::sync::Arc;

/// A row of values, positionally aligned with the schema.
pub type Row = Vec<Value>;

#[derive(Debug, Clone)]
pub struct Dataset {
    schema: Arc<Schema>,
    rows: Arc<Vec<Row>>,
    name: Option<String>,
}

impl Dataset {
    /// Build a dataset, checking every row against the schema.
    ///
    /// Integer values in float columns are widened; any other type
    /// disagreement is an error.
    pub fn new(schema: Schema, rows: Vec<Row>) -> Result<Self, WashError> {
        let mut rows = rows;
        for (r, row) in rows.iter_mut().enumerate() {
            if row.len() != schema.len() {
                return Err(WashError::load(format!(
                    "row {r} has {} values, schema has {} columns",
                    row.len(),
                    schema.len()
                )));
            }
            for (value, field) in row.iter_mut().zip(schema.fields()) {
                if value.is_null() {
                    if !field.nullable {
                        return Err(WashError::data_quality(format!(
                            "row {r}: null in non-nullable column '{}'",
                            field.name
                        )));
                    }
                    continue;
                }
                if value.dtype() == Some(field.dtype) {
                    continue;
                }
                let widened = match (&*value, field.dtype) {
                    (Value::Int(i), ColumnType::Float) => Some(Value::Float(*i as f64)),
                    _ => None,
                };
                match widened {
                    Some(v) => *value = v,
                    None => {
                        return Err(WashError::type_mismatch(
                            &field.name,
                            field.dtype,
                            value.dtype().map_or("null".to_string(), |t| t.to_string()),
                        ));
                    }
                }
            }
        }
        Ok(Self::from_parts(Arc::new(schema), rows))
    }

    /// Convenience constructor from `(name, type)` pairs.
    pub fn from_columns(columns: &[(&str, ColumnType)], rows: Vec<Row>) -> Result<Self, WashError> {
        let schema = Schema::new(
            columns
                .iter()
                .map(|(name, dtype)| Field::new(*name, *dtype))
                .collect(),
        )?;
        Self::new(schema, rows)
    }

    /// Assemble from rows already known to conform to `schema`.
    pub(crate) fn from_parts(schema: Arc<Schema>, rows: Vec<Row>) -> Self {
        Self {
            schema,
            rows: Arc::new(rows),
            name: None,
        }
    }

    pub fn empty(schema: Schema) -> Self {
        Self::from_parts(Arc::new(schema), Vec::new())
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub(crate) fn schema_arc(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// View name used by queries, if one has been assigned.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Resolve a column against this dataset's schema.
    pub fn column_ref(&self, name: &str) -> Result<ColumnRef, WashError> {
        self.schema.resolve(name)
    }

    /// All values of one column, in row order.
    pub fn column<'a>(&'a self, col: &ColumnRef) -> impl Iterator<Item = &'a Value> + 'a {
        let index = col.index;
        self.rows.iter().map(move |row| &row[index])
    }

    /// Values of a column by name, for tests and inspection.
    pub fn column_values(&self, name: &str) -> Result<Vec<Value>, WashError> {
        let col = self.column_ref(name)?;
        Ok(self.column(&col).cloned().collect())
    }

    /// A new dataset with the same schema and name but different rows.
    pub(crate) fn with_rows(&self, rows: Vec<Row>) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            rows: Arc::new(rows),
            name: self.name.clone(),
        }
    }

    /// A new dataset with a different schema, keeping the view name.
    pub(crate) fn derive(&self, schema: Schema, rows: Vec<Row>) -> Self {
        Self {
            schema: Arc::new(schema),
            rows: Arc::new(rows),
            name: self.name.clone(),
        }
    }

    /// Rewrite every value of one column. Other columns are shared by clone.
    pub(crate) fn map_column(&self, col: &ColumnRef, mut f: impl FnMut(&Value) -> Value) -> Self {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut row = row.clone();
                row[col.index] = f(&row[col.index]);
                row
            })
            .collect();
        self.with_rows(rows)
    }

    /// Owned records in row order.
    pub fn records(&self) -> impl Iterator<Item = Record> + '_ {
        self.rows.iter().map(|row| Record {
            schema: Arc::clone(&self.schema),
            values: row.clone(),
        })
    }
}

impl PartialEq for Dataset {
    /// Content equality: schema and rows, in order. The view name is ignored.
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema && self.rows == other.rows
    }
}

/// An ordered mapping from column name to value.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: Arc<Schema>,
    values: Vec<Value>,
}

impl Record {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.schema.index_of(column).map(|i| &self.values[i])
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.schema.names().zip(self.values.iter())
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
