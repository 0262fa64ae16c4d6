//! The closed set of pipeline steps.

use crate::data::{Dataset, Schema};
use crate::error::WashError;
use crate::query::{self, QueryPlan};
use crate::transform::{
    AggregationSpec, Bucketize, Deduplicate, DropColumns, Filter, ImputePolicy, Limit, Normalize,
    RenameColumn, Select, Sort, Transform,
};
use serde::{Deserialize, Serialize};

/// A transformation step. Serialized with a `type` tag:
///
/// ```toml
/// type = "bucketize"
/// column = "salary"
/// thresholds = [40000, 70000]
/// labels = ["Junior", "Mid-Level", "Senior"]
/// output_column = "salary_band"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformStep {
    Normalize(Normalize),
    Impute { columns: ImputePolicy },
    Bucketize(Bucketize),
    Aggregate(AggregationSpec),
    Select(Select),
    DropColumns(DropColumns),
    RenameColumn(RenameColumn),
    Filter(Filter),
    Sort(Sort),
    Deduplicate(Deduplicate),
    Limit(Limit),
    Query(QueryStep),
}

/// Run a query against the current dataset.
///
/// `view` names the dataset for the `FROM` clause; without it the dataset's
/// own view name is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryStep {
    pub sql: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
}

impl TransformStep {
    /// The serialized `type` tag, used as the default step name.
    pub fn kind(&self) -> &'static str {
        match self {
            TransformStep::Normalize(_) => "normalize",
            TransformStep::Impute { .. } => "impute",
            TransformStep::Bucketize(_) => "bucketize",
            TransformStep::Aggregate(_) => "aggregate",
            TransformStep::Select(_) => "select",
            TransformStep::DropColumns(_) => "drop_columns",
            TransformStep::RenameColumn(_) => "rename_column",
            TransformStep::Filter(_) => "filter",
            TransformStep::Sort(_) => "sort",
            TransformStep::Deduplicate(_) => "deduplicate",
            TransformStep::Limit(_) => "limit",
            TransformStep::Query(_) => "query",
        }
    }

    fn as_transform(&self) -> &dyn Transform {
        match self {
            TransformStep::Normalize(t) => t,
            TransformStep::Impute { columns } => columns,
            TransformStep::Bucketize(t) => t,
            TransformStep::Aggregate(t) => t,
            TransformStep::Select(t) => t,
            TransformStep::DropColumns(t) => t,
            TransformStep::RenameColumn(t) => t,
            TransformStep::Filter(t) => t,
            TransformStep::Sort(t) => t,
            TransformStep::Deduplicate(t) => t,
            TransformStep::Limit(t) => t,
            TransformStep::Query(t) => t,
        }
    }
}

impl Transform for TransformStep {
    fn plan(&self, input: &Schema) -> Result<Schema, WashError> {
        self.as_transform().plan(input)
    }

    fn apply(&self, input: &Dataset) -> Result<Dataset, WashError> {
        self.as_transform().apply(input)
    }
}

impl Transform for QueryStep {
    fn plan(&self, input: &Schema) -> Result<Schema, WashError> {
        let parsed = query::parse_query(&self.sql)?;
        if let Some(view) = &self.view {
            query::check_view(&parsed, view)?;
        }
        Ok(QueryPlan::compile(&parsed, input)?.schema().clone())
    }

    fn apply(&self, input: &Dataset) -> Result<Dataset, WashError> {
        match &self.view {
            Some(view) => query::run_as(input, view, &self.sql),
            None => query::run(input, &self.sql),
        }
    }
}

impl From<Normalize> for TransformStep {
    fn from(step: Normalize) -> Self {
        TransformStep::Normalize(step)
    }
}

impl From<ImputePolicy> for TransformStep {
    fn from(columns: ImputePolicy) -> Self {
        TransformStep::Impute { columns }
    }
}

impl From<Bucketize> for TransformStep {
    fn from(step: Bucketize) -> Self {
        TransformStep::Bucketize(step)
    }
}

impl From<AggregationSpec> for TransformStep {
    fn from(spec: AggregationSpec) -> Self {
        TransformStep::Aggregate(spec)
    }
}
