//! Harvest run bookkeeping and the externally visible report

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::provider::DataProviderDescriptor;

/// Count reported for datasets maintained outside the harvest
pub const NOT_COUNTED: i64 = -1;

/// Lifecycle of a harvest run
///
/// `Running` is the only non-terminal state. `CanceledNoChange` is a
/// successful no-op and must not be treated as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Running,
    Success,
    Failed,
    Canceled,
    CanceledNoChange,
}

impl RunStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Running => "Running",
            RunStatus::Success => "Success",
            RunStatus::Failed => "Failed",
            RunStatus::Canceled => "Canceled",
            RunStatus::CanceledNoChange => "CanceledNoChange",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RunStatus::Failed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome for one dataset of a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetReport {
    pub dataset_id: String,
    pub status: RunStatus,
    pub count: i64,
}

/// One row of the harvest report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestReport {
    pub provider_id: String,
    pub dataset_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: RunStatus,
    pub count: i64,
}

/// A single orchestration of one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestRun {
    #[serde(rename = "_id")]
    pub id: String,
    pub provider_id: i32,
    pub provider_identifier: String,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub count: i64,
    pub datasets: Vec<DatasetReport>,
}

impl HarvestRun {
    pub fn start(provider: &DataProviderDescriptor) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            provider_id: provider.id,
            provider_identifier: provider.identifier.clone(),
            start: Utc::now(),
            end: None,
            status: RunStatus::Running,
            count: 0,
            datasets: Vec::new(),
        }
    }

    /// Record a dataset outcome and refresh the run total
    pub fn push_dataset(&mut self, dataset_id: &str, status: RunStatus, count: i64) {
        match self.datasets.iter_mut().find(|d| d.dataset_id == dataset_id) {
            Some(existing) => {
                existing.status = status;
                existing.count = count;
            }
            None => self.datasets.push(DatasetReport {
                dataset_id: dataset_id.to_string(),
                status,
                count,
            }),
        }
        self.count = Self::total(&self.datasets);
    }

    /// Sum of counted datasets; [`NOT_COUNTED`] when nothing was counted
    fn total(datasets: &[DatasetReport]) -> i64 {
        let counted: Vec<i64> = datasets
            .iter()
            .map(|d| d.count)
            .filter(|c| *c != NOT_COUNTED)
            .collect();

        if counted.is_empty() && !datasets.is_empty() {
            NOT_COUNTED
        } else {
            counted.iter().sum()
        }
    }

    /// Set the terminal status. A run that is already terminal keeps its status.
    pub fn finish(mut self, status: RunStatus) -> Self {
        if !self.status.is_terminal() {
            self.status = status;
        }
        self.end = Some(Utc::now());
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, RunStatus::Success | RunStatus::CanceledNoChange)
    }

    /// Rows of the externally visible report, one per dataset
    pub fn report(&self) -> Vec<HarvestReport> {
        let end = self.end.unwrap_or(self.start);
        self.datasets
            .iter()
            .map(|d| HarvestReport {
                provider_id: self.provider_identifier.clone(),
                dataset_id: d.dataset_id.clone(),
                start: self.start,
                end,
                status: d.status,
                count: d.count,
            })
            .collect()
    }
}

/// Human summary of several runs, used by the CLI
pub fn summarize_runs(runs: &[HarvestRun]) -> String {
    let by_status = |status: RunStatus| runs.iter().filter(|r| r.status == status).count();
    let total_records: i64 = runs
        .iter()
        .filter(|r| r.status == RunStatus::Success && r.count != NOT_COUNTED)
        .map(|r| r.count)
        .sum();

    format!(
        "Harvest Summary:\n\
         - Providers processed: {}\n\
         - Successful: {}\n\
         - Unchanged (skipped): {}\n\
         - Failed: {}\n\
         - Canceled: {}\n\
         - Records harvested: {}",
        runs.len(),
        by_status(RunStatus::Success),
        by_status(RunStatus::CanceledNoChange),
        by_status(RunStatus::Failed),
        by_status(RunStatus::Canceled),
        total_records
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn provider() -> DataProviderDescriptor {
        DataProviderDescriptor {
            id: 3,
            identifier: "kul".to_string(),
            name: "KUL".to_string(),
            datasets: vec![],
        }
    }

    #[test]
    fn test_count_ignores_not_counted_datasets() {
        let mut run = HarvestRun::start(&provider());
        run.push_dataset("manual", RunStatus::Success, NOT_COUNTED);
        assert_eq!(run.count, NOT_COUNTED);

        run.push_dataset("a", RunStatus::Success, 40);
        run.push_dataset("b", RunStatus::Success, 2);
        assert_eq!(run.count, 42);

        run.push_dataset("b", RunStatus::Success, 10);
        assert_eq!(run.count, 50);
        assert_eq!(run.datasets.len(), 3);
    }

    #[test]
    fn test_finish_is_terminal_once() {
        let run = HarvestRun::start(&provider()).finish(RunStatus::Canceled);
        assert_eq!(run.status, RunStatus::Canceled);
        assert!(run.end.is_some());

        let run = run.finish(RunStatus::Success);
        assert_eq!(run.status, RunStatus::Canceled);
    }

    #[test]
    fn test_no_change_is_not_an_error() {
        assert!(!RunStatus::CanceledNoChange.is_error());
        assert!(RunStatus::Failed.is_error());

        let run = HarvestRun::start(&provider()).finish(RunStatus::CanceledNoChange);
        assert!(run.is_success());
    }

    #[test]
    fn test_report_rows() {
        let mut run = HarvestRun::start(&provider());
        run.push_dataset("kul-dwca", RunStatus::Success, 12);
        let run = run.finish(RunStatus::Success);

        let rows = run.report();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].provider_id, "kul");
        assert_eq!(rows[0].dataset_id, "kul-dwca");
        assert_eq!(rows[0].count, 12);

        let json = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(json["status"], "Success");
        assert!(json.get("providerId").is_some());
    }

    #[test]
    fn test_summarize_runs() {
        let mut ok = HarvestRun::start(&provider());
        ok.push_dataset("a", RunStatus::Success, 100);
        let ok = ok.finish(RunStatus::Success);
        let unchanged = HarvestRun::start(&provider()).finish(RunStatus::CanceledNoChange);
        let failed = HarvestRun::start(&provider()).finish(RunStatus::Failed);

        let summary = summarize_runs(&[ok, unchanged, failed]);
        assert!(summary.contains("Providers processed: 3"));
        assert!(summary.contains("Successful: 1"));
        assert!(summary.contains("Unchanged (skipped): 1"));
        assert!(summary.contains("Failed: 1"));
        assert!(summary.contains("Records harvested: 100"));
    }
}
