//! Maintenance run orchestration
//!
//! A run walks `Idle -> Locking -> Notifying -> Running -> Unlocking -> Done`.
//! `Aborted` is reached when the lock cannot be taken (nothing ran, nothing to
//! release) or when the pre-run hook fails (after the lock is released).
//! Individual job failures, including panics, are recorded in the report and
//! never end the run.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::time::Instant;

use futures::FutureExt;
use tracing::Instrument;
use uuid::Uuid;

use crate::jobs::error::{JobError, JobResult, RunError};
use crate::jobs::hook::{PreRunHook, RunView};
use crate::jobs::lock::{LockHandle, StaleLockPolicy};
use crate::jobs::policy::ExecutionPolicy;
use crate::jobs::registry::JobRegistry;
use crate::jobs::report::{JobOutcome, RunReport, SKIP_FILTERED};
use crate::jobs::types::{JobContext, JobDescriptor};

/// Phase of a maintenance run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Locking,
    Notifying,
    Running,
    Unlocking,
    Done,
    Aborted,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Locking => "locking",
            RunState::Notifying => "notifying",
            RunState::Running => "running",
            RunState::Unlocking => "unlocking",
            RunState::Done => "done",
            RunState::Aborted => "aborted",
        }
    }
}

/// Owns the job registry and runs it under the process lock
pub struct Manager {
    lock_path: PathBuf,
    stale_lock_policy: StaleLockPolicy,
    registry: JobRegistry,
    policy: ExecutionPolicy,
    hook: Option<Box<dyn PreRunHook>>,
}

impl Manager {
    pub fn new(lock_path: impl Into<PathBuf>, policy: ExecutionPolicy) -> Self {
        Self {
            lock_path: lock_path.into(),
            stale_lock_policy: StaleLockPolicy::default(),
            registry: JobRegistry::new(),
            policy,
            hook: None,
        }
    }

    pub fn with_registry(mut self, registry: JobRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_stale_lock_policy(mut self, policy: StaleLockPolicy) -> Self {
        self.stale_lock_policy = policy;
        self
    }

    /// Set the single pre-run hook, replacing any previous one
    pub fn with_hook<H>(mut self, hook: H) -> Self
    where
        H: PreRunHook + 'static,
    {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn register_job(&mut self, descriptor: JobDescriptor) -> JobResult<()> {
        self.registry.register(descriptor).map(|_| ())
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn policy(&self) -> &ExecutionPolicy {
        &self.policy
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Execute one maintenance run
    ///
    /// Returns the report when the run reaches `Done`, even if some jobs
    /// failed. Only lock contention, lock I/O errors and hook failures are
    /// returned as errors.
    pub async fn run(&self) -> Result<RunReport, RunError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("maintenance_run", %run_id);
        self.run_inner(run_id).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid) -> Result<RunReport, RunError> {
        let mut state = RunState::Idle;

        let mut lock = if self.policy.force() {
            tracing::warn!(
                lock = %self.lock_path.display(),
                "Force flag set, running without the maintenance lock"
            );
            None
        } else {
            transition(&mut state, RunState::Locking);
            match LockHandle::try_acquire(&self.lock_path, self.stale_lock_policy) {
                Ok(handle) => Some(handle),
                Err(e) => {
                    transition(&mut state, RunState::Aborted);
                    tracing::warn!(error = %e, "Maintenance run aborted, lock not acquired");
                    return Err(e.into());
                }
            }
        };

        for unknown in self.policy.unknown_names(&self.registry) {
            tracing::warn!(job = unknown, "Job filter names no registered job");
        }
        let plan = self.registry.plan(&self.policy);

        transition(&mut state, RunState::Notifying);
        if let Some(hook) = &self.hook {
            let view = RunView {
                run_id,
                policy: &self.policy,
                plan: &plan,
            };
            if let Err(source) = invoke_hook(hook.as_ref(), &view).await {
                transition(&mut state, RunState::Unlocking);
                release_lock(&mut lock);
                transition(&mut state, RunState::Aborted);
                tracing::error!(hook = hook.name(), error = %source, "Pre-run hook failed, aborting maintenance run");
                return Err(RunError::HookFailed {
                    hook: hook.name().to_string(),
                    source,
                });
            }
        }

        transition(&mut state, RunState::Running);
        let mut report = RunReport::new(run_id);
        for planned in &plan {
            let name = planned.name().clone();
            if !planned.selected {
                tracing::info!(job = %name, reason = SKIP_FILTERED, "Skipping maintenance job");
                report.record(
                    name,
                    JobOutcome::Skipped {
                        reason: SKIP_FILTERED.to_string(),
                    },
                    0,
                );
                continue;
            }

            let (outcome, duration_ms) = execute_job(run_id, planned.descriptor).await;
            report.record(name, outcome, duration_ms);
        }

        transition(&mut state, RunState::Unlocking);
        release_lock(&mut lock);

        report.finish();
        transition(&mut state, RunState::Done);

        let summary = report.summary();
        tracing::info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            "All maintenance jobs finished"
        );

        Ok(report)
    }
}

fn transition(state: &mut RunState, next: RunState) {
    tracing::trace!(from = state.as_str(), to = next.as_str(), "Run state change");
    *state = next;
}

async fn invoke_hook(hook: &dyn PreRunHook, view: &RunView<'_>) -> anyhow::Result<()> {
    match AssertUnwindSafe(hook.before_run(view)).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(anyhow::anyhow!(
            "hook panicked: {}",
            panic_message(payload.as_ref())
        )),
    }
}

/// Run one job, containing errors and panics at this boundary
async fn execute_job(run_id: Uuid, descriptor: &JobDescriptor) -> (JobOutcome, u64) {
    let ctx = JobContext::new(run_id, descriptor.name().clone());

    tracing::info!(job = %ctx.job_name, "Starting maintenance job");
    let start_time = Instant::now();
    let result = AssertUnwindSafe(descriptor.task().execute(&ctx))
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(JobError::Panicked(panic_message(payload.as_ref()))));
    let duration_ms = start_time.elapsed().as_millis() as u64;

    let outcome = match result {
        Ok(()) => {
            tracing::info!(job = %ctx.job_name, duration_ms, "Maintenance job succeeded");
            JobOutcome::Succeeded
        }
        Err(e) => {
            tracing::error!(job = %ctx.job_name, duration_ms, error = %e, "Maintenance job failed");
            JobOutcome::Failed {
                error: e.to_string(),
            }
        }
    };

    (outcome, duration_ms)
}

fn release_lock(lock: &mut Option<LockHandle>) {
    if let Some(handle) = lock.as_mut()
        && let Err(e) = handle.release()
    {
        tracing::warn!(error = %e, "Failed to release maintenance lock");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
