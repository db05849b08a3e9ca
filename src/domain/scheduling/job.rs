use std::collections::BTreeMap;
use std::fmt;

use slotmap::new_key_type;

use crate::domain::platform::storage_service::StorageServiceId;
use crate::domain::utils::id::FileId;
use crate::domain::workflow::task::Task;
use crate::error::SchedulingError;

new_key_type! {
    /// Handle the executor hands back for every submitted job.
    pub struct JobId;
}

/// Service-specific key/value arguments passed along with a job submission.
pub type ServiceArguments = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StorageTarget {
    /// A named storage service of the platform.
    Service(StorageServiceId),
    /// Scratch space local to whichever host executes the job.
    Scratch,
}

/// Where one instance of a file lives: `(storage, optional directory, file)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileLocation {
    pub target: StorageTarget,
    pub directory: Option<String>,
    pub file: FileId,
}

impl FileLocation {
    pub fn location(storage: StorageServiceId, file: FileId) -> Self {
        Self { target: StorageTarget::Service(storage), directory: None, file }
    }

    pub fn scratch(file: FileId) -> Self {
        Self { target: StorageTarget::Scratch, directory: None, file }
    }

    pub fn is_scratch(&self) -> bool {
        self.target == StorageTarget::Scratch
    }
}

impl fmt::Display for FileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let directory = self.directory.as_deref().unwrap_or("/");
        match self.target {
            StorageTarget::Service(id) => write!(f, "{:?}:{}{}", id, directory, self.file),
            StorageTarget::Scratch => write!(f, "scratch:{}{}", directory, self.file),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCopy {
    pub source: FileLocation,
    pub destination: FileLocation,
}

/// File placement and data movements around one task execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataPlacement {
    pub file_locations: BTreeMap<FileId, FileLocation>,
    pub pre_file_copies: Vec<FileCopy>,
    pub post_file_copies: Vec<FileCopy>,
    pub cleanup_file_deletions: Vec<FileLocation>,
}

/// A single task plus its complete data placement, ready for submission.
///
/// Immutable once built; the constructor refuses placements that leave any of
/// the task's files without a location.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    task: Task,
    placement: DataPlacement,
    service_arguments: ServiceArguments,
}

impl Job {
    pub fn new(task: Task, placement: DataPlacement, service_arguments: ServiceArguments) -> Result<Self, SchedulingError> {
        if let Some(missing) = task.files().find(|file| !placement.file_locations.contains_key(&file.id)) {
            return Err(SchedulingError::IncompleteFileLocations { task: task.id.clone(), file: missing.id.clone() });
        }

        Ok(Self { task, placement, service_arguments })
    }

    pub fn get_task(&self) -> &Task {
        &self.task
    }

    pub fn get_placement(&self) -> &DataPlacement {
        &self.placement
    }

    pub fn get_service_arguments(&self) -> &ServiceArguments {
        &self.service_arguments
    }

    pub fn get_file_location(&self, file: &FileId) -> Option<&FileLocation> {
        self.placement.file_locations.get(file)
    }
}
