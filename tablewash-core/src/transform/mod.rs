//! Dataset transformations: normalize, impute, bucketize, aggregate and the
//! relational helpers (select, filter, sort, ...).

pub mod aggregate;
pub mod bucketize;
pub mod impute;
pub mod normalize;
pub mod relational;

pub use aggregate::{AggExpr, AggFunc, AggregationSpec, OrderBy, aggregate};
pub use bucketize::{Bucketize, UNKNOWN_LABEL, bucketize};
pub use impute::{Fill, ImputePolicy, ImputeStrategy, impute};
pub use normalize::{Normalize, NormalizeRule, normalize};
pub use relational::{Deduplicate, DropColumns, Filter, Limit, RenameColumn, Select, Sort};

use crate::data::{Dataset, Schema};
use crate::error::WashError;

/// A pure Dataset → Dataset function with a schema-level dry run.
pub trait Transform {
    /// Output schema for `input`, checked without touching any rows.
    ///
    /// Every configuration problem a transform can detect statically must
    /// surface here, so a pipeline can reject it before reading data.
    fn plan(&self, input: &Schema) -> Result<Schema, WashError>;

    /// Produce a new dataset. `input` is never modified.
    fn apply(&self, input: &Dataset) -> Result<Dataset, WashError>;
}
