use serde::Serialize;
use slotmap::new_key_type;

use crate::domain::utils::id::{HostName, ResourceName};

new_key_type! {
    pub struct StorageServiceId;
}

/// A storage service attached to one host's disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageService {
    pub name: ResourceName,
    pub host: HostName,
    /// Mount point files are stored under.
    pub mount_point: String,
    /// Disk bandwidths in bytes/s.
    pub read_bandwidth: f64,
    pub write_bandwidth: f64,
}
