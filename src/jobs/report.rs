use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::jobs::types::JobName;

/// Reason recorded for jobs removed by the execution policy
pub const SKIP_FILTERED: &str = "filtered";

/// Outcome of a single job within a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobOutcome {
    Succeeded,
    Failed { error: String },
    Skipped { reason: String },
}

impl JobOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, JobOutcome::Failed { .. })
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobOutcome::Succeeded => write!(f, "succeeded"),
            JobOutcome::Failed { error } => write!(f, "failed: {}", error),
            JobOutcome::Skipped { reason } => write!(f, "skipped ({})", reason),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobReportEntry {
    pub name: JobName,
    #[serde(flatten)]
    pub outcome: JobOutcome,
    pub duration_ms: u64,
}

/// Totals over a run report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Per-job outcomes of one run, in registration order
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: jiff::Timestamp,
    pub finished_at: Option<jiff::Timestamp>,
    pub entries: Vec<JobReportEntry>,
}

impl RunReport {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            started_at: jiff::Timestamp::now(),
            finished_at: None,
            entries: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, name: JobName, outcome: JobOutcome, duration_ms: u64) {
        self.entries.push(JobReportEntry {
            name,
            outcome,
            duration_ms,
        });
    }

    pub(crate) fn finish(&mut self) {
        self.finished_at = Some(jiff::Timestamp::now());
    }

    pub fn outcome_of(&self, name: &str) -> Option<&JobOutcome> {
        self.entries
            .iter()
            .find(|entry| entry.name.as_str() == name)
            .map(|entry| &entry.outcome)
    }

    pub fn summary(&self) -> RunSummary {
        self.entries
            .iter()
            .fold(RunSummary::default(), |mut summary, entry| {
                summary.total += 1;
                match entry.outcome {
                    JobOutcome::Succeeded => summary.succeeded += 1,
                    JobOutcome::Failed { .. } => summary.failed += 1,
                    JobOutcome::Skipped { .. } => summary.skipped += 1,
                }
                summary
            })
    }

    pub fn has_failures(&self) -> bool {
        self.entries.iter().any(|entry| entry.outcome.is_failed())
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Maintenance run {}", self.run_id)?;
        for entry in &self.entries {
            writeln!(
                f,
                "  {:<24} {} ({} ms)",
                entry.name.as_str(),
                entry.outcome,
                entry.duration_ms
            )?;
        }
        let summary = self.summary();
        write!(
            f,
            "total={} succeeded={} failed={} skipped={}",
            summary.total, summary.succeeded, summary.failed, summary.skipped
        )
    }
}
