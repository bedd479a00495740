use std::borrow::Borrow;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::jobs::error::{JobError, JobResult};

/// Unique, non-empty name of a maintenance job
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JobName(String);

impl JobName {
    pub fn new(name: impl Into<String>) -> JobResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(JobError::InvalidJobName {
                name,
                reason: "name cannot be empty",
            });
        }
        // Names travel through comma-separated CLI filters
        if name.contains(',') {
            return Err(JobError::InvalidJobName {
                name,
                reason: "name cannot contain ','",
            });
        }
        if name.chars().any(char::is_whitespace) {
            return Err(JobError::InvalidJobName {
                name,
                reason: "name cannot contain whitespace",
            });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for JobName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for JobName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl FromStr for JobName {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for JobName {
    type Error = JobError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<JobName> for String {
    fn from(name: JobName) -> Self {
        name.0
    }
}

/// Per-job execution context handed to tasks
#[derive(Debug, Clone)]
pub struct JobContext {
    pub run_id: Uuid,
    pub job_name: JobName,
    pub started_at: jiff::Timestamp,
}

impl JobContext {
    pub fn new(run_id: Uuid, job_name: JobName) -> Self {
        Self {
            run_id,
            job_name,
            started_at: jiff::Timestamp::now(),
        }
    }
}

/// Trait that all maintenance tasks must implement
///
/// The manager treats a task as an opaque zero-argument unit of work: it only
/// awaits `execute` and records whether it succeeded.
#[async_trait]
pub trait MaintenanceTask: Send + Sync {
    /// Execute the task
    async fn execute(&self, ctx: &JobContext) -> JobResult<()>;

    /// Optional description
    fn description(&self) -> Option<String> {
        None
    }
}

/// Adapter turning an async closure into a [`MaintenanceTask`]
pub struct FnTask<F> {
    f: F,
}

impl<F> FnTask<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> fmt::Debug for FnTask<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTask").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> MaintenanceTask for FnTask<F>
where
    F: Fn(JobContext) -> Fut + Send + Sync,
    Fut: Future<Output = JobResult<()>> + Send + 'static,
{
    async fn execute(&self, ctx: &JobContext) -> JobResult<()> {
        (self.f)(ctx.clone()).await
    }
}

/// Immutable pairing of a job name with its callable target
#[derive(Clone)]
pub struct JobDescriptor {
    name: JobName,
    task: Arc<dyn MaintenanceTask>,
}

impl JobDescriptor {
    pub fn new<T>(name: impl Into<String>, task: T) -> JobResult<Self>
    where
        T: MaintenanceTask + 'static,
    {
        Ok(Self {
            name: JobName::new(name)?,
            task: Arc::new(task),
        })
    }

    /// Build a descriptor around a free async function
    pub fn from_fn<F, Fut>(name: impl Into<String>, f: F) -> JobResult<Self>
    where
        F: Fn(JobContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = JobResult<()>> + Send + 'static,
    {
        Self::new(name, FnTask::new(f))
    }

    pub fn name(&self) -> &JobName {
        &self.name
    }

    pub fn description(&self) -> Option<String> {
        self.task.description()
    }

    pub(crate) fn task(&self) -> &Arc<dyn MaintenanceTask> {
        &self.task
    }
}

impl fmt::Debug for JobDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobDescriptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
