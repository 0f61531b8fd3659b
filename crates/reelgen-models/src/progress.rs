//! Progress snapshots and the final aggregate.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::job::{JobRecord, JobState};

/// Point-in-time progress summary. Superseded by the next snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProgressSnapshot {
    pub completed: usize,
    pub total: usize,
    pub message: String,
}

impl ProgressSnapshot {
    /// Build a snapshot from the current records.
    pub fn from_records(records: &[JobRecord]) -> Self {
        let completed = records.iter().filter(|r| r.is_terminal()).count();
        let total = records.len();
        Self {
            completed,
            total,
            message: format!("Generated {}/{} images", completed, total),
        }
    }
}

/// Final result of one orchestration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AggregateResult {
    /// URLs of successful items, in origin order
    pub images: Vec<String>,
    pub succeeded: usize,
    /// Items in the `fail` state. Items abandoned while pending are not counted.
    pub failed: usize,
    /// Items still pending when polling stopped
    pub pending: usize,
}

impl AggregateResult {
    /// Collect the aggregate, ordering by origin index rather than by
    /// completion order.
    pub fn from_records(records: &[JobRecord]) -> Self {
        let mut ordered: Vec<&JobRecord> = records.iter().collect();
        ordered.sort_by_key(|r| r.origin_index);

        let images: Vec<String> = ordered
            .iter()
            .filter(|r| r.state == JobState::Success)
            .filter_map(|r| r.output_url.clone())
            .collect();

        let failed = ordered.iter().filter(|r| r.state == JobState::Fail).count();
        let pending = ordered.iter().filter(|r| r.is_pending()).count();

        Self {
            succeeded: images.len(),
            images,
            failed,
            pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobHandle;
    use crate::prompt::NormalizedItem;

    fn record(origin_index: usize) -> JobRecord {
        let item = NormalizedItem {
            origin_index,
            prompt: format!("prompt {}", origin_index),
            filename: format!("image_{}.png", origin_index + 1),
        };
        JobRecord::launched(&item, JobHandle::new(format!("job-{}", origin_index)))
    }

    #[test]
    fn test_aggregate_orders_by_origin_index() {
        let mut records = vec![record(2), record(0), record(1)];
        records[0].succeed("url-2");
        records[1].succeed("url-0");
        records[2].fail("nope");

        let result = AggregateResult::from_records(&records);
        assert_eq!(result.images, vec!["url-0".to_string(), "url-2".to_string()]);
        assert_eq!(result.succeeded, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.pending, 0);
    }

    #[test]
    fn test_pending_items_are_not_failures() {
        let mut records = vec![record(0), record(1), record(2)];
        records[1].fail("nope");

        let result = AggregateResult::from_records(&records);
        assert!(result.images.is_empty());
        assert_eq!(result.failed, 1);
        assert_eq!(result.pending, 2);
    }

    #[test]
    fn test_snapshot_counts_terminal_records() {
        let mut records = vec![record(0), record(1), record(2)];
        records[0].succeed("url-0");
        records[2].fail("nope");

        let snapshot = ProgressSnapshot::from_records(&records);
        assert_eq!(snapshot.completed, 2);
        assert_eq!(snapshot.total, 3);
        assert_eq!(snapshot.message, "Generated 2/3 images");
    }
}
