//! Data model: values, schemas, datasets, profiling and lineage.

pub mod dataset;
pub mod lineage;
pub mod profile;
pub mod schema;
pub mod value;

pub use dataset::{Dataset, Record, Row};
pub use lineage::DataLineage;
pub use profile::{ColumnStats, DatasetProfile, profile};
pub use schema::{ColumnRef, ColumnType, Field, Schema, infer_column_type, infer_schema};
pub use value::{Value, ValueKey};
