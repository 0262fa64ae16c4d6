//! # tablewash-core: tabular cleaning and aggregation pipelines
//!
//! Datasets are loaded through an [`Engine`], passed through an ordered
//! [`Pipeline`] of pure steps and materialized again by the engine.
//!
//! ## Components
//!
//! - **Field normalizer**: canonical text in one column ([`transform::normalize`])
//! - **Null imputer**: literal or statistical fills ([`transform::impute`])
//! - **Bucketizer**: thresholds to ordered labels ([`transform::bucketize`])
//! - **Aggregator**: group-by statistics ([`transform::aggregate`])
//! - **Orchestrator**: planned, fail-fast step execution ([`pipeline`])
//!
//! ```no_run
//! use tablewash_core::{Engine, LocalEngine, Pipeline, SourceDescriptor};
//! use tablewash_core::transform::{AggFunc, AggregationSpec, ImputePolicy, Normalize, NormalizeRule};
//!
//! # fn main() -> Result<(), tablewash_core::WashError> {
//! let engine = LocalEngine::default();
//! let employees = engine.load(&SourceDescriptor::csv("employees.csv"))?;
//! let summary = Pipeline::new()
//!     .add_step(Normalize::new("dept", [NormalizeRule::Trim, NormalizeRule::Uppercase]))
//!     .add_step(ImputePolicy::new().literal("salary", 50000i64))
//!     .add_step(AggregationSpec::group_by(["dept"]).agg("salary", AggFunc::Avg, "avg_salary"))
//!     .run(&employees)?;
//! println!("{} departments", engine.count(&summary)?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod query;
pub mod transform;

pub use config::{EngineConfig, OutputConfig, WashConfig, load_config};
pub use data::{ColumnType, Dataset, Field, Record, Schema, Value};
pub use engine::{Engine, LocalEngine, OutputFormat, SaveMode, SourceDescriptor, SourceFormat};
pub use error::{ErrorKind, WashError};
pub use pipeline::{Pipeline, RunReport, TransformStep};
