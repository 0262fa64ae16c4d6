//! Data lineage: which steps produced a dataset, chained by SHA-256.

use crate::pipeline::TransformRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Lineage record for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataLineage {
    pub dataset: String,
    pub source_format: String,
    pub source_location: String,
    pub transforms_applied: Vec<TransformRecord>,
    pub created_at: DateTime<Utc>,
    pub hash_chain: Vec<String>,
}

impl DataLineage {
    pub fn new(dataset: &str, source_format: &str, source_location: &str) -> Self {
        Self {
            dataset: dataset.to_string(),
            source_format: source_format.to_string(),
            source_location: source_location.to_string(),
            transforms_applied: Vec::new(),
            created_at: Utc::now(),
            hash_chain: vec![origin_hash(dataset, source_format, source_location)],
        }
    }

    /// Record an executed step and extend the hash chain.
    pub fn add_transform(&mut self, record: TransformRecord) {
        let prev = self.hash_chain.last().cloned().unwrap_or_default();
        self.hash_chain.push(link_hash(&prev, &record));
        self.transforms_applied.push(record);
    }

    /// Latest link of the chain.
    pub fn head(&self) -> Option<&str> {
        self.hash_chain.last().map(String::as_str)
    }

    /// Recompute the chain and compare it with the stored one.
    pub fn verify_integrity(&self) -> bool {
        if self.hash_chain.len() != self.transforms_applied.len() + 1 {
            return false;
        }
        let origin = origin_hash(&self.dataset, &self.source_format, &self.source_location);
        if self.hash_chain[0] != origin {
            return false;
        }
        self.transforms_applied
            .iter()
            .zip(self.hash_chain.windows(2))
            .all(|(record, pair)| link_hash(&pair[0], record) == pair[1])
    }
}

fn origin_hash(dataset: &str, source_format: &str, source_location: &str) -> String {
    compute_hash(&format!("{dataset}:{source_format}:{source_location}"))
}

fn link_hash(prev: &str, record: &TransformRecord) -> String {
    let step_json = serde_json::to_string(&record.step).unwrap_or_default();
    compute_hash(&format!(
        "{prev}:{}:{step_json}:{}:{}",
        record.name, record.rows_before, record.rows_after
    ))
}

fn compute_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::TransformStep;
    use crate::transform::Limit;

    fn record(rows_after: usize) -> TransformRecord {
        TransformRecord {
            name: "limit".into(),
            step: TransformStep::Limit(Limit { count: 10 }),
            applied_at: Utc::now(),
            rows_before: 100,
            rows_after,
        }
    }

    #[test]
    fn test_lineage_creation() {
        let lineage = DataLineage::new("employees", "csv", "data/employees.csv");
        assert_eq!(lineage.hash_chain.len(), 1);
        assert!(lineage.verify_integrity());
    }

    #[test]
    fn test_lineage_with_transforms() {
        let mut lineage = DataLineage::new("employees", "csv", "data/employees.csv");
        lineage.add_transform(record(10));
        lineage.add_transform(record(10));
        assert_eq!(lineage.hash_chain.len(), 3);
        assert_ne!(lineage.hash_chain[1], lineage.hash_chain[2]);
        assert!(lineage.verify_integrity());
    }

    #[test]
    fn test_tampering_breaks_chain() {
        let mut lineage = DataLineage::new("employees", "csv", "data/employees.csv");
        lineage.add_transform(record(10));
        lineage.transforms_applied[0].rows_after = 99;
        assert!(!lineage.verify_integrity());

        let mut renamed = DataLineage::new("employees", "csv", "data/employees.csv");
        renamed.add_transform(record(10));
        renamed.source_location = "elsewhere.csv".into();
        assert!(!renamed.verify_integrity());
    }
}
