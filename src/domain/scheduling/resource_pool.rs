use std::collections::BTreeMap;

use crate::domain::platform::compute_resource::ComputeResourceId;
use crate::domain::platform::resource_store::ResourceStore;
use crate::domain::utils::id::ResourceName;
use crate::error::SchedulingError;

#[derive(Debug, Clone, PartialEq)]
struct PoolEntry {
    name: ResourceName,
    total: u32,
    remaining: u32,
}

/// Remaining core count per compute resource.
///
/// Every counter stays within `[0, total]`: reserving an exhausted resource is
/// refused and releasing a full one is an error.
#[derive(Debug, Clone, Default)]
pub struct ResourcePool {
    entries: BTreeMap<ComputeResourceId, PoolEntry>,
}

impl ResourcePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queries the core count of every compute resource once.
    pub fn from_resources(store: &ResourceStore) -> Self {
        let mut pool = Self::new();
        for id in store.compute_resource_ids() {
            if let Some(resource) = store.get_compute_resource(id) {
                pool.register(id, resource.name.clone(), resource.get_total_cores());
            }
        }
        pool
    }

    pub fn register(&mut self, id: ComputeResourceId, name: ResourceName, total_cores: u32) {
        self.entries.insert(id, PoolEntry { name, total: total_cores, remaining: total_cores });
    }

    pub fn get_remaining(&self, id: ComputeResourceId) -> Option<u32> {
        self.entries.get(&id).map(|entry| entry.remaining)
    }

    pub fn get_total(&self, id: ComputeResourceId) -> Option<u32> {
        self.entries.get(&id).map(|entry| entry.total)
    }

    pub fn get_name(&self, id: ComputeResourceId) -> Option<&ResourceName> {
        self.entries.get(&id).map(|entry| &entry.name)
    }

    /// Resources with at least one free core, in key order.
    pub fn available(&self) -> Vec<ComputeResourceId> {
        self.entries.iter().filter(|(_, entry)| entry.remaining > 0).map(|(id, _)| *id).collect()
    }

    /// Takes one core. Returns `false` if the resource is unknown or exhausted.
    pub fn reserve(&mut self, id: ComputeResourceId) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) if entry.remaining > 0 => {
                entry.remaining -= 1;
                true
            }
            _ => false,
        }
    }

    /// Gives one core back.
    pub fn release(&mut self, id: ComputeResourceId) -> Result<(), SchedulingError> {
        let entry = self.entries.get_mut(&id).ok_or_else(|| SchedulingError::UnknownComputeResource(format!("{:?}", id)))?;

        if entry.remaining >= entry.total {
            return Err(SchedulingError::CoreOverRelease(entry.name.clone()));
        }

        entry.remaining += 1;
        Ok(())
    }

    pub fn get_num_of_resources(&self) -> usize {
        self.entries.len()
    }
}
