use std::fmt;
use std::str::FromStr;

use crate::domain::platform::compute_resource::ComputeResourceId;
use crate::domain::platform::resource_store::ResourceStore;
use crate::domain::platform::storage_service::StorageServiceId;
use crate::domain::scheduling::job::{DataPlacement, FileCopy, FileLocation};
use crate::domain::utils::id::{FileId, ResourceName};
use crate::domain::workflow::task::Task;
use crate::error::{ConversionError, SchedulingError};

/// Data placement policies accepted in `storage_service_scheme`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageServiceScheme {
    /// All files stay on the submit host's storage.
    SubmitOnly,
    /// Files are staged into the executing host's scratch and back.
    SubmitAndComputeHosts,
    /// Files are staged onto the storage service co-located with the chosen resource.
    ComputeHostStorage,
}

impl FromStr for StorageServiceScheme {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submit_only" => Ok(StorageServiceScheme::SubmitOnly),
            "submit_and_compute_hosts" => Ok(StorageServiceScheme::SubmitAndComputeHosts),
            "compute_host_storage" => Ok(StorageServiceScheme::ComputeHostStorage),
            _ => Err(ConversionError::UnknownStorageServiceScheme(s.to_string())),
        }
    }
}

impl fmt::Display for StorageServiceScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageServiceScheme::SubmitOnly => "submit_only",
            StorageServiceScheme::SubmitAndComputeHosts => "submit_and_compute_hosts",
            StorageServiceScheme::ComputeHostStorage => "compute_host_storage",
        };
        write!(f, "{}", name)
    }
}

impl StorageServiceScheme {
    pub fn get_instance(&self, store: &ResourceStore) -> DataPlacementPlanner {
        let submit = store.get_submit_storage();
        match self {
            StorageServiceScheme::SubmitOnly => DataPlacementPlanner::SubmitFixed { submit },
            StorageServiceScheme::SubmitAndComputeHosts => DataPlacementPlanner::ScratchRoundTrip { submit },
            StorageServiceScheme::ComputeHostStorage => DataPlacementPlanner::RemoteStreaming { submit },
        }
    }
}

/// Computes file locations and surrounding transfers for one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataPlacementPlanner {
    SubmitFixed { submit: StorageServiceId },
    ScratchRoundTrip { submit: StorageServiceId },
    RemoteStreaming { submit: StorageServiceId },
}

impl DataPlacementPlanner {
    /// Builds the placement of `task` executing on `target`.
    ///
    /// Inputs are staged in declaration order, then outputs are staged back in
    /// declaration order. No cleanup deletions are scheduled.
    pub fn plan(&self, task: &Task, target: ComputeResourceId, store: &ResourceStore) -> Result<DataPlacement, SchedulingError> {
        let mut placement = DataPlacement::default();

        match *self {
            DataPlacementPlanner::SubmitFixed { submit } => {
                for file in task.files() {
                    placement.file_locations.insert(file.id.clone(), FileLocation::location(submit, file.id.clone()));
                }
            }
            DataPlacementPlanner::ScratchRoundTrip { submit } => {
                Self::stage_through(task, &mut placement, submit, FileLocation::scratch);
            }
            DataPlacementPlanner::RemoteStreaming { submit } => {
                let partner = store.get_storage_partner(target).ok_or_else(|| {
                    let name = store.get_compute_resource_name(target).cloned().unwrap_or_else(|| ResourceName::new(format!("{:?}", target)));
                    SchedulingError::MissingStoragePartner(name)
                })?;
                Self::stage_through(task, &mut placement, submit, |file| FileLocation::location(partner, file));
            }
        }

        Ok(placement)
    }

    /// Places every file at `local` and adds the copies between `local` and the submit storage.
    fn stage_through(
        task: &Task,
        placement: &mut DataPlacement,
        submit: StorageServiceId,
        local: impl Fn(FileId) -> FileLocation,
    ) {
        for file in &task.input_files {
            placement.file_locations.insert(file.id.clone(), local(file.id.clone()));
            placement.pre_file_copies.push(FileCopy { source: FileLocation::location(submit, file.id.clone()), destination: local(file.id.clone()) });
        }
        for file in &task.output_files {
            placement.file_locations.insert(file.id.clone(), local(file.id.clone()));
            placement.post_file_copies.push(FileCopy { source: local(file.id.clone()), destination: FileLocation::location(submit, file.id.clone()) });
        }
    }
}
