pub mod error;
pub mod hook;
pub mod lock;
pub mod manager;
pub mod policy;
pub mod registry;
pub mod report;
pub mod tasks;
pub mod types;

pub use error::{JobError, JobResult, LockError, RunError};
pub use hook::{LoggingHook, PreRunHook, RunView};
pub use lock::{LockHandle, StaleLockPolicy};
pub use manager::{Manager, RunState};
pub use policy::{ExecutionPolicy, parse_job_list};
pub use registry::{JobRegistry, PlannedJob};
pub use report::{JobOutcome, JobReportEntry, RunReport, RunSummary};
pub use tasks::builtin_registry;
pub use types::{FnTask, JobContext, JobDescriptor, JobName, MaintenanceTask};
