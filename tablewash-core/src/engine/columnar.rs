//! Conversion between datasets and Arrow record batches, and Parquet I/O.

use crate::data::{ColumnType, Dataset, Field, Row, Schema, Value};
use crate::error::WashError;
use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::compute::{can_cast_types, cast};
use arrow::datatypes::{DataType, Field as ArrowField, Schema as ArrowSchema, SchemaRef};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs;
use std::path::Path;
use std::sync::Arc;

fn arrow_type(dtype: ColumnType) -> DataType {
    match dtype {
        ColumnType::Integer => DataType::Int64,
        ColumnType::Float => DataType::Float64,
        ColumnType::String => DataType::Utf8,
    }
}

/// The column type a foreign Arrow type is read as.
fn column_type(data_type: &DataType) -> ColumnType {
    match data_type {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => ColumnType::Integer,
        DataType::Float16
        | DataType::Float32
        | DataType::Float64
        | DataType::Decimal128(_, _)
        | DataType::Decimal256(_, _) => ColumnType::Float,
        _ => ColumnType::String,
    }
}

pub fn arrow_schema(schema: &Schema) -> SchemaRef {
    Arc::new(ArrowSchema::new(
        schema
            .fields()
            .iter()
            .map(|f| ArrowField::new(&f.name, arrow_type(f.dtype), f.nullable))
            .collect::<Vec<_>>(),
    ))
}

/// Map an Arrow schema onto ours. Unknown types are read as strings.
pub fn from_arrow_schema(schema: &ArrowSchema) -> Result<Schema, WashError> {
    Schema::new(
        schema
            .fields()
            .iter()
            .map(|f| Field {
                name: f.name().clone(),
                dtype: column_type(f.data_type()),
                nullable: f.is_nullable(),
            })
            .collect(),
    )
}

pub fn to_record_batch(dataset: &Dataset) -> Result<RecordBatch, WashError> {
    let schema = arrow_schema(dataset.schema());
    let rows = dataset.rows();
    let columns: Vec<ArrayRef> = dataset
        .schema()
        .fields()
        .iter()
        .enumerate()
        .map(|(i, field)| -> ArrayRef {
            match field.dtype {
                ColumnType::Integer => Arc::new(Int64Array::from(
                    rows.iter()
                        .map(|r| match r[i] {
                            Value::Int(x) => Some(x),
                            _ => None,
                        })
                        .collect::<Vec<_>>(),
                )),
                ColumnType::Float => Arc::new(Float64Array::from(
                    rows.iter().map(|r| r[i].as_f64()).collect::<Vec<_>>(),
                )),
                ColumnType::String => Arc::new(StringArray::from(
                    rows.iter().map(|r| r[i].as_str()).collect::<Vec<_>>(),
                )),
            }
        })
        .collect();

    let options = RecordBatchOptions::new().with_row_count(Some(rows.len()));
    Ok(RecordBatch::try_new_with_options(schema, columns, &options)?)
}

/// Rows of a batch whose columns are laid out as `schema` describes.
fn batch_rows(batch: &RecordBatch, schema: &Schema) -> Result<Vec<Row>, WashError> {
    let mut rows: Vec<Row> = vec![Vec::with_capacity(schema.len()); batch.num_rows()];

    for (i, field) in schema.fields().iter().enumerate() {
        let source = batch.column(i);
        let target = arrow_type(field.dtype);
        let array = if source.data_type() == &target {
            Arc::clone(source)
        } else if can_cast_types(source.data_type(), &target) {
            cast(source, &target)?
        } else {
            return Err(WashError::load(format!(
                "column '{}' of type {} cannot be read as {}",
                field.name,
                source.data_type(),
                field.dtype
            )));
        };

        match field.dtype {
            ColumnType::Integer => {
                let values = downcast::<Int64Array>(&array, &field.name)?;
                for (row, j) in rows.iter_mut().zip(0..) {
                    row.push(if values.is_null(j) {
                        Value::Null
                    } else {
                        Value::Int(values.value(j))
                    });
                }
            }
            ColumnType::Float => {
                let values = downcast::<Float64Array>(&array, &field.name)?;
                for (row, j) in rows.iter_mut().zip(0..) {
                    row.push(if values.is_null(j) {
                        Value::Null
                    } else {
                        Value::Float(values.value(j))
                    });
                }
            }
            ColumnType::String => {
                let values = downcast::<StringArray>(&array, &field.name)?;
                for (row, j) in rows.iter_mut().zip(0..) {
                    row.push(if values.is_null(j) {
                        Value::Null
                    } else {
                        Value::Str(values.value(j).to_string())
                    });
                }
            }
        }
    }
    Ok(rows)
}

fn downcast<'a, T: 'static>(array: &'a ArrayRef, column: &str) -> Result<&'a T, WashError> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| WashError::load(format!("unexpected array type for column '{column}'")))
}

/// Read every batch of a Parquet file.
///
/// With `hint`, columns are cast to the declared types; names must match.
pub fn read_parquet(path: &Path, hint: Option<&Schema>) -> Result<(Schema, Vec<Row>), WashError> {
    let file = fs::File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let file_schema = from_arrow_schema(builder.schema())?;

    let schema = match hint {
        Some(hint) => {
            let declared: Vec<&str> = hint.names().collect();
            let found: Vec<&str> = file_schema.names().collect();
            if declared != found {
                return Err(WashError::load(format!(
                    "{}: declared columns [{}] do not match file columns [{}]",
                    path.display(),
                    declared.join(", "),
                    found.join(", ")
                )));
            }
            hint.clone()
        }
        None => file_schema,
    };

    let reader = builder.with_batch_size(8192).build()?;
    let mut rows = Vec::new();
    for batch in reader {
        rows.extend(batch_rows(&batch?, &schema)?);
    }
    Ok((schema, rows))
}

/// Encode `dataset` as a Snappy-compressed Parquet file in memory.
pub fn to_parquet_bytes(dataset: &Dataset) -> Result<Vec<u8>, WashError> {
    let batch = to_record_batch(dataset)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut buffer = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buffer, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(buffer)
}

/// Render up to `limit` rows as an ASCII table.
pub fn render_table(dataset: &Dataset, limit: usize) -> Result<String, WashError> {
    let head = if dataset.len() > limit {
        dataset.with_rows(dataset.rows()[..limit].to_vec())
    } else {
        dataset.clone()
    };
    let batch = to_record_batch(&head)?;
    Ok(arrow::util::pretty::pretty_format_batches(&[batch])?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Int32Array;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn staff() -> Dataset {
        Dataset::from_columns(
            &[
                ("dept", ColumnType::String),
                ("salary", ColumnType::Integer),
                ("rating", ColumnType::Float),
            ],
            vec![
                vec!["IT".into(), Value::Int(50000), Value::Float(4.5)],
                vec![Value::Null, Value::Null, Value::Null],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_parquet_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("staff.parquet");
        fs::write(&path, to_parquet_bytes(&staff()).unwrap()).unwrap();

        let (schema, rows) = read_parquet(&path, None).unwrap();
        assert_eq!(&schema, staff().schema());
        assert_eq!(rows, staff().rows());
    }

    #[test]
    fn test_foreign_types_are_cast() {
        let schema = Arc::new(ArrowSchema::new(vec![ArrowField::new(
            "n",
            DataType::Int32,
            true,
        )]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![Arc::new(Int32Array::from(vec![Some(7), None]))],
        )
        .unwrap();
        let ours = from_arrow_schema(&schema).unwrap();
        assert_eq!(ours.fields()[0].dtype, ColumnType::Integer);
        assert_eq!(
            batch_rows(&batch, &ours).unwrap(),
            vec![vec![Value::Int(7)], vec![Value::Null]]
        );
    }

    #[test]
    fn test_render_table_limits_rows() {
        let text = render_table(&staff(), 1).unwrap();
        assert!(text.contains("| dept | salary | rating |"));
        assert!(text.contains("| IT   | 50000  | 4.5    |"));
        assert_eq!(text.lines().count(), 5);
    }
}
