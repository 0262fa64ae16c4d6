//! Schema definition, typed column handles and type inference.

use crate::error::WashError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Float,
    String,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::String => "string",
        };
        f.write_str(name)
    }
}

/// Schema for a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub dtype: ColumnType,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl Field {
    pub fn new(name: impl Into<String>, dtype: ColumnType) -> Self {
        Self {
            name: name.into(),
            dtype,
            nullable: true,
        }
    }
}

/// Ordered, immutable list of fields with unique names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Field>", into = "Vec<Field>")]
pub struct Schema {
    fields: Vec<Field>,
}

/// A column resolved against a schema. Holding one means the name exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub index: usize,
    pub name: String,
    pub dtype: ColumnType,
}

impl ColumnRef {
    pub fn require_numeric(&self) -> Result<(), WashError> {
        if self.dtype.is_numeric() {
            Ok(())
        } else {
            Err(WashError::type_mismatch(&self.name, "numeric", self.dtype))
        }
    }

    pub fn require_type(&self, dtype: ColumnType) -> Result<(), WashError> {
        if self.dtype == dtype {
            Ok(())
        } else {
            Err(WashError::type_mismatch(&self.name, dtype, self.dtype))
        }
    }
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Result<Self, WashError> {
        for (i, field) in fields.iter().enumerate() {
            if field.name.is_empty() {
                return Err(WashError::config(format!("column {i} has an empty name")));
            }
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(WashError::config(format!(
                    "duplicate column name '{}'",
                    field.name
                )));
            }
        }
        Ok(Self { fields })
    }

    pub fn empty() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Resolve a column name into a typed handle, failing fast on typos.
    pub fn resolve(&self, name: &str) -> Result<ColumnRef, WashError> {
        match self.index_of(name) {
            Some(index) => Ok(ColumnRef {
                index,
                name: name.to_string(),
                dtype: self.fields[index].dtype,
            }),
            None => Err(WashError::UnknownColumn {
                name: name.to_string(),
                available: self.names().collect::<Vec<_>>().join(", "),
            }),
        }
    }

    /// Same column names and types, ignoring nullability.
    pub fn is_compatible(&self, other: &Schema) -> bool {
        self.len() == other.len()
            && self
                .fields
                .iter()
                .zip(&other.fields)
                .all(|(a, b)| a.name == b.name && a.dtype == b.dtype)
    }

    /// Schema with `field` placed at `index`, or appended when `index` is `None`.
    pub fn with_field(&self, index: Option<usize>, field: Field) -> Result<Schema, WashError> {
        let mut fields = self.fields.clone();
        match index {
            Some(i) if i < fields.len() => fields[i] = field,
            _ => fields.push(field),
        }
        Schema::new(fields)
    }

    /// Schema restricted to the given column positions, in that order.
    pub fn project(&self, indices: &[usize]) -> Result<Schema, WashError> {
        Schema::new(indices.iter().map(|&i| self.fields[i].clone()).collect())
    }
}

impl TryFrom<Vec<Field>> for Schema {
    type Error = WashError;

    fn try_from(fields: Vec<Field>) -> Result<Self, Self::Error> {
        Schema::new(fields)
    }
}

impl From<Schema> for Vec<Field> {
    fn from(schema: Schema) -> Self {
        schema.fields
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for field in &self.fields {
            let null = if field.nullable { "" } else { " not null" };
            writeln!(f, "  - {}: {}{}", field.name, field.dtype, null)?;
        }
        Ok(())
    }
}

/// Infer a column type from raw text samples. Null tokens must already be removed.
pub fn infer_column_type<'a>(values: impl IntoIterator<Item = &'a str>) -> ColumnType {
    let mut saw_value = false;
    let mut all_int = true;
    let mut all_float = true;

    for v in values {
        saw_value = true;
        let v = v.trim();
        if all_int && v.parse::<i64>().is_err() {
            all_int = false;
        }
        if all_float && v.parse::<f64>().is_err() {
            all_float = false;
        }
        if !all_int && !all_float {
            return ColumnType::String;
        }
    }

    if !saw_value {
        // All-null columns have nothing to go on
        return ColumnType::String;
    }
    if all_int {
        ColumnType::Integer
    } else {
        ColumnType::Float
    }
}

/// Infer a schema from a header and raw text rows.
pub fn infer_schema(
    columns: &[String],
    rows: &[Vec<String>],
    is_null: impl Fn(&str) -> bool,
) -> Result<Schema, WashError> {
    let mut fields = Vec::with_capacity(columns.len());

    for (i, name) in columns.iter().enumerate() {
        let cells = rows.iter().filter_map(|row| row.get(i).map(String::as_str));
        let nullable = cells.clone().any(&is_null) || rows.iter().any(|r| r.get(i).is_none());
        let dtype = infer_column_type(cells.filter(|c| !is_null(*c)));
        fields.push(Field {
            name: name.clone(),
            dtype,
            nullable,
        });
    }

    Schema::new(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_infer_column_type_int() {
        assert_eq!(infer_column_type(["1", "2", " 3"]), ColumnType::Integer);
    }

    #[test]
    fn test_infer_column_type_mixed_numeric_is_float() {
        assert_eq!(infer_column_type(["1", "2.5"]), ColumnType::Float);
    }

    #[test]
    fn test_infer_column_type_string() {
        assert_eq!(infer_column_type(["a", "1"]), ColumnType::String);
        assert_eq!(infer_column_type(std::iter::empty()), ColumnType::String);
    }

    #[test]
    fn test_infer_schema() {
        let columns = strings(&["name", "age", "salary"]);
        let rows = vec![
            strings(&["Alice", "30", ""]),
            strings(&["Bob", "25", "60000.5"]),
        ];
        let schema = infer_schema(&columns, &rows, |s| s.is_empty()).unwrap();
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.fields()[0].dtype, ColumnType::String);
        assert_eq!(schema.fields()[1].dtype, ColumnType::Integer);
        assert!(!schema.fields()[1].nullable);
        assert_eq!(schema.fields()[2].dtype, ColumnType::Float);
        assert!(schema.fields()[2].nullable);
    }

    #[test]
    fn test_resolve_unknown_column_lists_available() {
        let schema = Schema::new(vec![
            Field::new("dept", ColumnType::String),
            Field::new("salary", ColumnType::Integer),
        ])
        .unwrap();
        assert_eq!(schema.resolve("salary").unwrap().index, 1);
        let err = schema.resolve("salry").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown column 'salry' (available: dept, salary)"
        );
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = Schema::new(vec![
            Field::new("a", ColumnType::String),
            Field::new("a", ColumnType::Integer),
        ]);
        assert!(result.is_err());
    }
}
