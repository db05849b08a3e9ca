use std::collections::HashSet;

use bimap::BiMap;
use slotmap::SlotMap;

use crate::api::platform_dto::{HostDto, PlatformDto};
use crate::domain::platform::compute_resource::{ComputeResource, ComputeResourceId, ComputeResourceKind, Host};
use crate::domain::platform::storage_service::{StorageService, StorageServiceId};
use crate::domain::utils::id::{HostName, ResourceName};
use crate::error::ConversionError;

/// How the compute hosts are exposed as compute resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeServiceLayout {
    /// One bare-metal resource per compute host, each paired with the host's storage.
    BareMetalPerHost,
    /// A single pool spanning all compute hosts, without a storage partner.
    HtCondorPool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkLink {
    /// Bytes/s between the submit host and any compute host.
    pub bandwidth: f64,
    /// Seconds.
    pub latency: f64,
}

/// Arena of every compute and storage resource of the platform.
///
/// Components never hold resources directly; they keep `ComputeResourceId` and
/// `StorageServiceId` keys and look resources up here.
#[derive(Debug, Clone)]
pub struct ResourceStore {
    compute_resources: SlotMap<ComputeResourceId, ComputeResource>,
    storage_services: SlotMap<StorageServiceId, StorageService>,

    /// Compute resource ↔ storage service co-located with it.
    storage_partners: BiMap<ComputeResourceId, StorageServiceId>,

    submit_host: Host,
    submit_storage: StorageServiceId,
    pub network: NetworkLink,
}

impl ResourceStore {
    pub fn new(submit_host: Host, submit_storage: StorageService, network: NetworkLink) -> Self {
        let mut storage_services = SlotMap::with_key();
        let submit_storage = storage_services.insert(submit_storage);

        Self { compute_resources: SlotMap::with_key(), storage_services, storage_partners: BiMap::new(), submit_host, submit_storage, network }
    }

    /// Builds the platform the way the calibration simulator lays it out: one
    /// submit host with its storage service, and one storage service on every
    /// compute host.
    pub fn create_from_dto(dto: &PlatformDto, layout: ComputeServiceLayout) -> Result<Self, ConversionError> {
        let overheads = &dto.overheads;
        let optional_seconds = |quantity: &Option<crate::api::config_dto::QuantityDto>| -> Result<f64, ConversionError> {
            quantity.as_ref().map(|q| q.non_negative_seconds()).transpose().map(|value| value.unwrap_or(0.0))
        };

        // Phase 1: Submit host, its storage and the network
        let submit_host = Self::host_from_dto(&dto.submit_host, "submit")?;
        let submit_storage = StorageService {
            name: ResourceName::new(format!("{}_storage", submit_host.name)),
            host: submit_host.name.clone(),
            mount_point: "/".to_string(),
            read_bandwidth: dto.storage.bandwidth_submit_disk_read.positive_bytes_per_second()?,
            write_bandwidth: dto.storage.bandwidth_submit_disk_write.positive_bytes_per_second()?,
        };
        let network = NetworkLink { bandwidth: dto.network.bandwidth.positive_bytes_per_second()?, latency: dto.network.latency.non_negative_seconds()? };

        let mut store = ResourceStore::new(submit_host, submit_storage, network);

        // Phase 2: Compute hosts, listed explicitly and/or generated from the template
        let compute_hosts = Self::compute_hosts_from_dto(dto, &store.submit_host.name)?;
        if compute_hosts.is_empty() {
            return Err(ConversionError::NoComputeHosts);
        }

        let disk_read = dto.storage.bandwidth_compute_host_disk_read.positive_bytes_per_second()?;
        let disk_write = dto.storage.bandwidth_compute_host_disk_write.positive_bytes_per_second()?;
        let thread_startup = optional_seconds(&overheads.thread_startup_overhead)?;

        // Phase 3: Compute resources according to the layout
        match layout {
            ComputeServiceLayout::BareMetalPerHost => {
                for host in compute_hosts {
                    let storage = store.add_storage_service(StorageService {
                        name: ResourceName::new(format!("{}_storage", host.name)),
                        host: host.name.clone(),
                        mount_point: "/".to_string(),
                        read_bandwidth: disk_read,
                        write_bandwidth: disk_write,
                    });
                    let compute = store.add_compute_resource(ComputeResource {
                        name: ResourceName::new(host.name.to_string()),
                        kind: ComputeResourceKind::BareMetal,
                        hosts: vec![host],
                        startup_overhead: thread_startup,
                        scratch_read_bandwidth: disk_read,
                        scratch_write_bandwidth: disk_write,
                    });
                    store.set_storage_partner(compute, storage);
                }
            }
            ComputeServiceLayout::HtCondorPool => {
                let grid_overhead = optional_seconds(&overheads.negotiator_overhead)?
                    + optional_seconds(&overheads.grid_pre_execution_delay)?
                    + optional_seconds(&overheads.grid_post_execution_delay)?;

                store.add_compute_resource(ComputeResource {
                    name: ResourceName::new("htcondor_pool"),
                    kind: ComputeResourceKind::HtCondorPool,
                    hosts: compute_hosts,
                    startup_overhead: thread_startup + grid_overhead,
                    scratch_read_bandwidth: disk_read,
                    scratch_write_bandwidth: disk_write,
                });
            }
        }

        log::info!(
            "Platform built: {} compute resource(s), {} storage service(s), submit host '{}'.",
            store.get_num_of_compute_resources(),
            store.storage_services.len(),
            store.submit_host.name
        );

        Ok(store)
    }

    fn host_from_dto(dto: &HostDto, default_name: &str) -> Result<Host, ConversionError> {
        Ok(Host {
            name: HostName::new(dto.name.clone().unwrap_or_else(|| default_name.to_string())),
            num_cores: dto.num_cores.count()?,
            speed: dto.speed.positive_flops()?,
        })
    }

    fn compute_hosts_from_dto(dto: &PlatformDto, submit_host: &HostName) -> Result<Vec<Host>, ConversionError> {
        let mut hosts = Vec::new();
        let mut seen: HashSet<HostName> = HashSet::from([submit_host.clone()]);

        let generated = dto.compute_host_template.iter().flat_map(|template| std::iter::repeat_n(template, dto.num_compute_hosts as usize));

        for (index, host_dto) in dto.compute_hosts.iter().chain(generated).enumerate() {
            let mut host = Self::host_from_dto(host_dto, &format!("compute_host_{}", index + 1))?;
            if host_dto.name.is_some() && dto.compute_hosts.len() <= index {
                // Template names get a running suffix.
                host.name = HostName::new(format!("{}_{}", host.name, index + 1));
            }
            if !seen.insert(host.name.clone()) {
                return Err(ConversionError::DuplicateHost(host.name.to_string()));
            }
            hosts.push(host);
        }

        Ok(hosts)
    }

    //---------------------------
    // --- Compute resources ---
    //---------------------------
    pub fn add_compute_resource(&mut self, resource: ComputeResource) -> ComputeResourceId {
        self.compute_resources.insert(resource)
    }

    pub fn get_compute_resource(&self, id: ComputeResourceId) -> Option<&ComputeResource> {
        self.compute_resources.get(id)
    }

    /// Keys of all compute resources in arena order.
    pub fn compute_resource_ids(&self) -> Vec<ComputeResourceId> {
        self.compute_resources.keys().collect()
    }

    pub fn get_num_of_compute_resources(&self) -> usize {
        self.compute_resources.len()
    }

    pub fn get_compute_resource_name(&self, id: ComputeResourceId) -> Option<&ResourceName> {
        self.compute_resources.get(id).map(|resource| &resource.name)
    }

    pub fn find_compute_resource(&self, name: &str) -> Option<ComputeResourceId> {
        self.compute_resources.iter().find(|(_, resource)| resource.name.as_str() == name).map(|(id, _)| id)
    }

    //--------------------------
    // --- Storage services ---
    //--------------------------
    pub fn add_storage_service(&mut self, service: StorageService) -> StorageServiceId {
        self.storage_services.insert(service)
    }

    pub fn get_storage_service(&self, id: StorageServiceId) -> Option<&StorageService> {
        self.storage_services.get(id)
    }

    pub fn get_submit_storage(&self) -> StorageServiceId {
        self.submit_storage
    }

    /// Pairs a compute resource with the storage service on the same host.
    pub fn set_storage_partner(&mut self, compute: ComputeResourceId, storage: StorageServiceId) {
        self.storage_partners.insert(compute, storage);
    }

    pub fn get_storage_partner(&self, compute: ComputeResourceId) -> Option<StorageServiceId> {
        self.storage_partners.get_by_left(&compute).copied()
    }

    pub fn get_compute_partner(&self, storage: StorageServiceId) -> Option<ComputeResourceId> {
        self.storage_partners.get_by_right(&storage).copied()
    }
}
