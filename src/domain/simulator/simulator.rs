use std::fmt;

use crate::domain::platform::compute_resource::ComputeResourceId;
use crate::domain::scheduling::job::{FileLocation, Job, JobId};
use crate::domain::workflow::task::{Task, TaskState};
use crate::domain::workflow::workflow::Workflow;
use crate::error::SchedulingError;

/// Read-only view of the workflow graph the dispatch loop works on.
pub trait WorkflowGraph {
    /// Tasks whose dependencies are satisfied and that were not submitted yet, unordered.
    fn ready_tasks(&self) -> Vec<Task>;
    fn is_done(&self) -> bool;
    fn get_num_unfinished_tasks(&self) -> usize;
}

/// Accepts jobs and later reports exactly one completion or failure per job.
pub trait JobManager {
    fn submit_job(&mut self, job: Job, target: ComputeResourceId) -> Result<JobId, SchedulingError>;
}

/// The simulated clock and its event stream.
pub trait SystemSimulator {
    fn get_current_time_in_s(&self) -> f64;

    /// Advances simulated time without doing work.
    fn sleep(&mut self, duration_in_s: f64);

    /// Blocks until the next job notification. `None` once no further
    /// notification can ever arrive.
    fn wait_for_next_event(&mut self) -> Option<ExecutionEvent>;
}

/// Everything the dispatch loop needs from its host environment.
pub trait ExecutionEnvironment: WorkflowGraph + JobManager + SystemSimulator {}

impl<T: WorkflowGraph + JobManager + SystemSimulator> ExecutionEnvironment for T {}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionEvent {
    JobCompleted { job: JobId },
    JobFailed { job: JobId, cause: FailureCause },
}

impl ExecutionEvent {
    pub fn get_job(&self) -> JobId {
        match self {
            ExecutionEvent::JobCompleted { job } | ExecutionEvent::JobFailed { job, .. } => *job,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FailureCause {
    /// A file the job had to read was absent at its source location.
    FileNotFound { location: FileLocation },
    Other(String),
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::FileNotFound { location } => write!(f, "file not found at {}", location),
            FailureCause::Other(reason) => write!(f, "{}", reason),
        }
    }
}

impl WorkflowGraph for Workflow {
    fn ready_tasks(&self) -> Vec<Task> {
        Workflow::ready_tasks(self)
    }

    fn is_done(&self) -> bool {
        Workflow::is_done(self)
    }

    fn get_num_unfinished_tasks(&self) -> usize {
        self.get_num_of_tasks() - self.get_num_in_state(TaskState::Completed)
    }
}
