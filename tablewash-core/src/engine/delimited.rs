//! Delimited text (CSV and friends) via the `csv` crate.

use crate::config::EngineConfig;
use crate::data::{Dataset, Field, Row, Schema, Value, infer_schema};
use crate::error::WashError;
use std::path::Path;

/// Reader/writer options resolved from a source and the engine config.
#[derive(Debug, Clone)]
pub struct DelimitedOptions {
    pub delimiter: u8,
    pub has_header: bool,
    pub infer_sample_rows: usize,
    pub null_values: Vec<String>,
}

impl DelimitedOptions {
    pub fn from_config(
        config: &EngineConfig,
        delimiter: Option<char>,
        has_header: Option<bool>,
    ) -> Result<Self, WashError> {
        Ok(Self {
            delimiter: delimiter_byte(delimiter.unwrap_or(config.delimiter))?,
            has_header: has_header.unwrap_or(config.has_header),
            infer_sample_rows: config.infer_sample_rows,
            null_values: config.null_values.clone(),
        })
    }

    fn is_null(&self, field: &str) -> bool {
        let field = field.trim();
        self.null_values.iter().any(|n| n == field)
    }
}

pub fn delimiter_byte(c: char) -> Result<u8, WashError> {
    if c.is_ascii() {
        Ok(c as u8)
    } else {
        Err(WashError::config(format!(
            "delimiter '{c}' is not a single ASCII character"
        )))
    }
}

/// Raw header and text rows of one file.
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub fn read_raw(path: &Path, options: &DelimitedOptions) -> Result<RawTable, WashError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(options.has_header)
        .from_path(path)?;

    let mut columns: Vec<String> = if options.has_header {
        reader.headers()?.iter().map(|h| h.trim().to_string()).collect()
    } else {
        Vec::new()
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }

    if !options.has_header {
        let width = rows.first().map_or(0, Vec::len);
        columns = (0..width).map(|i| format!("_c{i}")).collect();
    }
    Ok(RawTable { columns, rows })
}

/// Infer (or check) a schema for raw tables that share a header.
pub fn resolve_schema(
    tables: &[RawTable],
    hint: Option<&Schema>,
    options: &DelimitedOptions,
) -> Result<Schema, WashError> {
    let columns = tables.first().map(|t| t.columns.clone()).unwrap_or_default();
    for (i, table) in tables.iter().enumerate().skip(1) {
        if table.columns != columns {
            return Err(WashError::load(format!(
                "part {i} header [{}] differs from [{}]",
                table.columns.join(", "),
                columns.join(", ")
            )));
        }
    }

    if let Some(hint) = hint {
        if options.has_header && !tables.is_empty() {
            let names: Vec<&str> = hint.names().collect();
            if names != columns.iter().map(String::as_str).collect::<Vec<_>>() {
                return Err(WashError::load(format!(
                    "declared columns [{}] do not match header [{}]",
                    names.join(", "),
                    columns.join(", ")
                )));
            }
        }
        return Ok(hint.clone());
    }

    let total: usize = tables.iter().map(|t| t.rows.len()).sum();
    let limit = match options.infer_sample_rows {
        0 => total,
        n => n.min(total),
    };
    let sample: Vec<Vec<String>> = tables
        .iter()
        .flat_map(|t| t.rows.iter())
        .take(limit)
        .cloned()
        .collect();
    let inferred = infer_schema(&columns, &sample, |s| options.is_null(s))?;

    if limit < total {
        // Rows outside the sample may hold nulls
        let fields = inferred
            .fields()
            .iter()
            .map(|f| Field {
                nullable: true,
                ..f.clone()
            })
            .collect();
        return Schema::new(fields);
    }
    Ok(inferred)
}

/// Parse raw rows into a dataset of `schema`.
pub fn to_dataset(
    schema: Schema,
    tables: Vec<RawTable>,
    options: &DelimitedOptions,
) -> Result<Dataset, WashError> {
    let mut rows = Vec::new();
    for (t, table) in tables.into_iter().enumerate() {
        for (r, raw) in table.rows.into_iter().enumerate() {
            if raw.len() != schema.len() {
                return Err(WashError::load(format!(
                    "part {t} row {r}: {} fields, expected {}",
                    raw.len(),
                    schema.len()
                )));
            }
            let row = raw
                .iter()
                .zip(schema.fields())
                .map(|(text, field)| {
                    if options.is_null(text) {
                        return Ok(Value::Null);
                    }
                    Value::parse_as(text, field.dtype).ok_or_else(|| {
                        WashError::load(format!(
                            "part {t} row {r}: '{text}' is not a valid {} for column '{}'",
                            field.dtype, field.name
                        ))
                    })
                })
                .collect::<Result<Row, WashError>>()?;
            rows.push(row);
        }
    }
    Dataset::new(schema, rows)
}

/// Render `dataset` as delimited text with a header line.
pub fn to_bytes(dataset: &Dataset, delimiter: u8) -> Result<Vec<u8>, WashError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());
    writer.write_record(dataset.schema().names())?;
    for row in dataset.rows() {
        writer.write_record(row.iter().map(Value::to_field))?;
    }
    writer
        .into_inner()
        .map_err(|e| WashError::write(e.to_string()))
}
