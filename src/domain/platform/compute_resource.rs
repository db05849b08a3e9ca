use serde::Serialize;
use slotmap::new_key_type;

use crate::domain::utils::id::{HostName, ResourceName};

new_key_type! {
    pub struct ComputeResourceId;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Host {
    pub name: HostName,
    pub num_cores: u32,
    /// Per-core speed in flop/s.
    pub speed: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ComputeResourceKind {
    /// Runs jobs directly on the cores of a single host.
    BareMetal,
    /// A batch pool dispatching jobs onto any of its hosts.
    HtCondorPool,
}

/// A unit of compute capacity, possibly aggregating several hosts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComputeResource {
    pub name: ResourceName,
    pub kind: ComputeResourceKind,
    pub hosts: Vec<Host>,
    /// Fixed delay charged around every job run on this resource, in seconds.
    pub startup_overhead: f64,
    /// Disk bandwidths of the scratch space local to the executing host, in bytes/s.
    pub scratch_read_bandwidth: f64,
    pub scratch_write_bandwidth: f64,
}

impl ComputeResource {
    /// Sum of cores across all constituent hosts.
    pub fn get_total_cores(&self) -> u32 {
        self.hosts.iter().map(|host| host.num_cores).sum()
    }

    /// Speed of the slowest core; jobs are not pinned to a particular host.
    pub fn get_core_speed(&self) -> f64 {
        self.hosts.iter().map(|host| host.speed).fold(f64::INFINITY, f64::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregates_cores_and_speed_over_hosts() {
        let pool = ComputeResource {
            name: ResourceName::new("htcondor"),
            kind: ComputeResourceKind::HtCondorPool,
            hosts: vec![
                Host { name: HostName::new("c1"), num_cores: 16, speed: 2e9 },
                Host { name: HostName::new("c2"), num_cores: 8, speed: 1e9 },
            ],
            startup_overhead: 0.0,
            scratch_read_bandwidth: 1e9,
            scratch_write_bandwidth: 1e9,
        };

        assert_eq!(pool.get_total_cores(), 24);
        assert_eq!(pool.get_core_speed(), 1e9);
    }
}
