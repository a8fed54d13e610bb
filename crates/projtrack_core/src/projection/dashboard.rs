//! Dashboard aggregate projection.
//!
//! # Invariants
//! - `status_counts` always carries all four canonical statuses.
//! - `priority_counts` always carries exactly `Low|Medium|High|Urgent`;
//!   off-vocabulary priorities are counted only in `total`.
//! - `per_month` keys are `YYYY-MM`, sorted; unparseable dates are skipped.

use crate::model::project::{ProjectRecord, Status};
use crate::normalize::{dashboard_priority_bucket, parse_lenient_date, PriorityBucket};
use serde::Serialize;
use std::collections::BTreeMap;

/// Record counts per canonical status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    #[serde(rename = "New")]
    pub new: usize,
    #[serde(rename = "In Progress")]
    pub in_progress: usize,
    #[serde(rename = "Pending")]
    pub pending: usize,
    #[serde(rename = "Completed")]
    pub completed: usize,
}

impl StatusCounts {
    fn bump(&mut self, status: Status) {
        match status {
            Status::New => self.new += 1,
            Status::InProgress => self.in_progress += 1,
            Status::Pending => self.pending += 1,
            Status::Completed => self.completed += 1,
        }
    }

    pub fn get(&self, status: Status) -> usize {
        match status {
            Status::New => self.new,
            Status::InProgress => self.in_progress,
            Status::Pending => self.pending,
            Status::Completed => self.completed,
        }
    }
}

/// Record counts per dashboard priority bucket, in fixed order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PriorityCounts {
    #[serde(rename = "Low")]
    pub low: usize,
    #[serde(rename = "Medium")]
    pub medium: usize,
    #[serde(rename = "High")]
    pub high: usize,
    #[serde(rename = "Urgent")]
    pub urgent: usize,
}

impl PriorityCounts {
    fn bump(&mut self, bucket: PriorityBucket) {
        match bucket {
            PriorityBucket::Low => self.low += 1,
            PriorityBucket::Medium => self.medium += 1,
            PriorityBucket::High => self.high += 1,
            PriorityBucket::Urgent => self.urgent += 1,
        }
    }

    pub fn get(&self, bucket: PriorityBucket) -> usize {
        match bucket {
            PriorityBucket::Low => self.low,
            PriorityBucket::Medium => self.medium,
            PriorityBucket::High => self.high,
            PriorityBucket::Urgent => self.urgent,
        }
    }
}

/// Dashboard summary over the whole collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub total: usize,
    pub status_counts: StatusCounts,
    pub priority_counts: PriorityCounts,
    pub completed: usize,
    pub per_month: BTreeMap<String, usize>,
}

/// Aggregates `records` into a dashboard summary.
pub fn dashboard_summary(records: &[ProjectRecord]) -> DashboardSummary {
    let mut summary = DashboardSummary {
        total: records.len(),
        ..DashboardSummary::default()
    };

    for record in records {
        summary.status_counts.bump(record.status);
        if let Some(bucket) = dashboard_priority_bucket(&record.priority) {
            summary.priority_counts.bump(bucket);
        }
        if record.status.label().to_lowercase().contains("completed") {
            summary.completed += 1;
        }
        if let Some(date) = parse_lenient_date(&record.submitted_on) {
            *summary
                .per_month
                .entry(date.format("%Y-%m").to_string())
                .or_default() += 1;
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: Status, priority: &str, submitted_on: &str) -> ProjectRecord {
        let mut record = ProjectRecord::new();
        record.status = status;
        record.priority = priority.to_string();
        record.submitted_on = submitted_on.to_string();
        record
    }

    #[test]
    fn empty_collection_yields_zero_filled_summary() {
        let summary = dashboard_summary(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.status_counts, StatusCounts::default());
        assert_eq!(summary.priority_counts, PriorityCounts::default());
        assert!(summary.per_month.is_empty());
    }

    #[test]
    fn off_vocabulary_priority_counts_only_in_total() {
        let records = vec![
            record(Status::New, "Critical", ""),
            record(Status::Completed, "High", "2024-01-10"),
            record(Status::Pending, "urgent", "2024-01-31"),
            record(Status::InProgress, "", "not a date"),
        ];
        let summary = dashboard_summary(&records);

        assert_eq!(summary.total, 4);
        assert_eq!(summary.priority_counts.get(PriorityBucket::High), 1);
        assert_eq!(summary.priority_counts.get(PriorityBucket::Urgent), 1);
        assert_eq!(summary.priority_counts.get(PriorityBucket::Low), 0);
        assert_eq!(summary.priority_counts.get(PriorityBucket::Medium), 0);
        for status in Status::ALL {
            assert_eq!(summary.status_counts.get(status), 1);
        }
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.per_month.len(), 1);
        assert_eq!(summary.per_month.get("2024-01"), Some(&2));
    }

    #[test]
    fn summary_serializes_with_fixed_keys() {
        let summary = dashboard_summary(&[record(Status::New, "Medium", "2023-12-01")]);
        let json = serde_json::to_value(&summary).expect("summary should serialize");

        let priorities = json["priority_counts"]
            .as_object()
            .expect("priority_counts is an object");
        let mut keys: Vec<&str> = priorities.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["High", "Low", "Medium", "Urgent"]);
        assert_eq!(json["status_counts"]["In Progress"], 0);
        assert_eq!(json["per_month"]["2023-12"], 1);
    }
}
