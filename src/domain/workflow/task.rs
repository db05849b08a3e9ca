use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use crate::domain::utils::id::TaskId;
use crate::domain::workflow::data_file::DataFile;

new_key_type! {
    /// Stable arena key of a task inside its workflow. Used as the identity
    /// tie-break whenever two tasks carry the same id.
    pub struct TaskKey;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    /// At least one parent has not completed.
    NotReady,
    /// All parents completed, not yet submitted.
    Ready,
    /// Submitted as part of a job, no notification yet.
    Pending,
    Completed,
    Failed,
}

/// A node of the workflow DAG as seen by the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub key: TaskKey,
    pub id: TaskId,
    /// Amount of work in flops.
    pub flops: f64,
    pub input_files: Vec<DataFile>,
    pub output_files: Vec<DataFile>,
}

impl Task {
    /// Inputs followed by outputs, in declaration order.
    pub fn files(&self) -> impl Iterator<Item = &DataFile> {
        self.input_files.iter().chain(self.output_files.iter())
    }
}
