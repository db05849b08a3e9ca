use serde::{Deserialize, Serialize};

use crate::api::config_dto::QuantityDto;

/// Description of the simulated platform: one submit host, a set of
/// homogeneous or heterogeneous compute hosts, their disks and the network
/// between the submit host and the compute hosts.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub struct PlatformDto {
    pub submit_host: HostDto,

    /// Explicitly listed compute hosts.
    #[serde(default)]
    pub compute_hosts: Vec<HostDto>,

    /// Number of additional compute hosts generated from `compute_host_template`.
    #[serde(default)]
    pub num_compute_hosts: u32,

    #[serde(default)]
    pub compute_host_template: Option<HostDto>,

    pub storage: StorageDto,
    pub network: NetworkDto,

    #[serde(default)]
    pub overheads: ComputeServiceOverheadsDto,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub struct HostDto {
    #[serde(default)]
    pub name: Option<String>,
    pub num_cores: QuantityDto,
    /// Per-core speed, e.g. `"1Gf"`.
    pub speed: QuantityDto,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub struct StorageDto {
    pub bandwidth_submit_disk_read: QuantityDto,
    pub bandwidth_submit_disk_write: QuantityDto,
    pub bandwidth_compute_host_disk_read: QuantityDto,
    pub bandwidth_compute_host_disk_write: QuantityDto,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub struct NetworkDto {
    /// Bandwidth of the path between the submit host and any compute host.
    pub bandwidth: QuantityDto,
    pub latency: QuantityDto,
}

/// Fixed delays charged by the compute services around every job.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "snake_case")]
pub struct ComputeServiceOverheadsDto {
    /// Bare-metal thread start-up overhead.
    #[serde(default)]
    pub thread_startup_overhead: Option<QuantityDto>,

    /// HTCondor negotiator cycle.
    #[serde(default)]
    pub negotiator_overhead: Option<QuantityDto>,

    #[serde(default)]
    pub grid_pre_execution_delay: Option<QuantityDto>,

    #[serde(default)]
    pub grid_post_execution_delay: Option<QuantityDto>,
}
