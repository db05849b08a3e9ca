use thiserror::Error;

use crate::domain::utils::id::{FileId, ResourceName, TaskId};

#[derive(Debug, Error)]
pub enum Error {
    #[error("File not found or could not be read: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse JSON input: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Failed to write execution trace: {0}")]
    TraceError(#[from] csv::Error),

    #[error("Invalid configuration: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Workflow execution aborted: {0}")]
    Scheduling(#[from] SchedulingError),
}

/// Errors raised while turning input DTOs into validated domain objects.
///
/// All of these are detected before the first task is dispatched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    #[error("Unimplemented compute_service_scheme: {0}")]
    UnknownComputeServiceScheme(String),

    #[error("Unimplemented storage_service_scheme: {0}")]
    UnknownStorageServiceScheme(String),

    #[error("Unknown failure_policy '{0}', expected 'abort' or 'continue'")]
    UnknownFailurePolicy(String),

    #[error("Unknown task_ordering '{0}', expected 'descending' or 'ascending'")]
    UnknownTaskOrdering(String),

    #[error("Invalid quantity '{value}': {reason}")]
    InvalidQuantity { value: String, reason: String },

    #[error("scheduling_overhead must be non-negative, got {0}")]
    NegativeSchedulingOverhead(f64),

    #[error("The platform defines no compute hosts")]
    NoComputeHosts,

    #[error("Compute host '{0}' is declared more than once")]
    DuplicateHost(String),

    #[error("Task '{0}' is declared more than once")]
    DuplicateTask(TaskId),

    #[error("Task '{task}' names unknown parent '{parent}'")]
    UnknownParent { task: TaskId, parent: TaskId },

    #[error("File '{file}' is produced by both '{first}' and '{second}'")]
    MultipleProducers { file: FileId, first: TaskId, second: TaskId },

    #[error("File '{file}' is declared with sizes {first} and {second}")]
    InconsistentFileSize { file: FileId, first: u64, second: u64 },

    #[error("Unknown file link '{link}' on task '{task}'")]
    UnknownFileLink { task: TaskId, link: String },

    #[error("The workflow contains a dependency cycle through task '{0}'")]
    DependencyCycle(TaskId),
}

/// Errors that end a scheduling run after it has started.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchedulingError {
    #[error("Task '{task}' failed ({cause}); failures are not expected under the abort policy")]
    TaskFailed { task: TaskId, cause: String },

    #[error("Compute resource '{0}' has no associated storage service")]
    MissingStoragePartner(ResourceName),

    #[error("Job for task '{task}' has no location for file '{file}'")]
    IncompleteFileLocations { task: TaskId, file: FileId },

    #[error("Task '{0}' was submitted while not ready")]
    TaskNotReady(TaskId),

    #[error("Received a notification for unknown job {0}")]
    UnknownJob(String),

    #[error("Compute resource '{0}' would exceed its total core count")]
    CoreOverRelease(ResourceName),

    #[error("Compute resource '{0}' is not part of the platform")]
    UnknownComputeResource(String),

    #[error("No further events can arrive but {unfinished} task(s) are unfinished")]
    Stalled { unfinished: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
