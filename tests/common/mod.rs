#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;

use wf_sim_scheduler::api::platform_dto::PlatformDto;
use wf_sim_scheduler::domain::platform::compute_resource::ComputeResourceId;
use wf_sim_scheduler::domain::platform::resource_store::ResourceStore;
use wf_sim_scheduler::domain::scheduling::compute_service_scheme::ComputeServiceScheme;
use wf_sim_scheduler::domain::scheduling::controller::Controller;
use wf_sim_scheduler::domain::scheduling::scheduler_config::SchedulerConfig;
use wf_sim_scheduler::domain::scheduling::storage_service_scheme::StorageServiceScheme;
use wf_sim_scheduler::domain::workflow::data_file::DataFile;
use wf_sim_scheduler::domain::workflow::workflow::Workflow;

pub fn data_path(file: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("data").join(file)
}

/// Compute hosts given as `(name, cores)`, all at 1 Gflop/s.
pub fn platform_dto(hosts: &[(&str, u32)]) -> PlatformDto {
    let compute_hosts: Vec<_> = hosts.iter().map(|(name, cores)| json!({ "name": name, "num_cores": cores, "speed": "1Gf" })).collect();

    serde_json::from_value(json!({
        "submit_host": { "name": "submit", "num_cores": 1, "speed": "1Gf" },
        "compute_hosts": compute_hosts,
        "storage": {
            "bandwidth_submit_disk_read": "100MBps",
            "bandwidth_submit_disk_write": "100MBps",
            "bandwidth_compute_host_disk_read": "100MBps",
            "bandwidth_compute_host_disk_write": "100MBps"
        },
        "network": { "bandwidth": "1GBps", "latency": "10us" }
    }))
    .unwrap()
}

pub fn store(hosts: &[(&str, u32)], scheme: ComputeServiceScheme) -> Arc<ResourceStore> {
    Arc::new(ResourceStore::create_from_dto(&platform_dto(hosts), scheme.layout()).unwrap())
}

pub fn resource(store: &ResourceStore, name: &str) -> ComputeResourceId {
    store.find_compute_resource(name).unwrap()
}

/// Tasks given as `(id, inputs, outputs)`; files as `(name, size)`.
pub fn workflow(tasks: &[(&str, &[(&str, u64)], &[(&str, u64)])]) -> Workflow {
    let to_files = |files: &[(&str, u64)]| -> Vec<DataFile> { files.iter().map(|(name, size)| DataFile::new(*name, *size)).collect() };

    let mut workflow = Workflow::new("scenario");
    for (id, inputs, outputs) in tasks {
        workflow.add_task(*id, 1e9, to_files(*inputs), to_files(*outputs)).unwrap();
    }
    workflow.seal().unwrap();
    workflow
}

pub fn independent_tasks(ids: &[&str]) -> Workflow {
    let tasks: Vec<(&str, &[(&str, u64)], &[(&str, u64)])> = ids.iter().map(|id| (*id, &[][..], &[][..])).collect();
    workflow(&tasks)
}

pub fn config(compute: ComputeServiceScheme, storage: StorageServiceScheme) -> SchedulerConfig {
    SchedulerConfig::new(compute, storage, 0.5).unwrap()
}

pub fn controller(config: SchedulerConfig, store: &Arc<ResourceStore>) -> Controller {
    Controller::new(config, store.clone()).unwrap()
}
