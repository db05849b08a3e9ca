use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

use crate::domain::platform::compute_resource::ComputeResourceId;
use crate::domain::platform::resource_store::{ComputeServiceLayout, ResourceStore};
use crate::domain::scheduling::job::ServiceArguments;
use crate::domain::scheduling::resource_pool::ResourcePool;
use crate::domain::workflow::task::Task;
use crate::error::ConversionError;

/// Resource allocation policies accepted in `compute_service_scheme`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeServiceScheme {
    /// One bare-metal service per compute host with core counting. Every
    /// resource scanned as available loses a core on each allocation attempt,
    /// and only the chosen one gets it back on completion.
    AllBareMetal,
    /// Like [`ComputeServiceScheme::AllBareMetal`], but only the chosen resource is reserved.
    AllBareMetalExact,
    /// A single HTCondor pool receiving every job, without core accounting.
    HtCondorBareMetal,
}

impl FromStr for ComputeServiceScheme {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all_bare_metal" => Ok(ComputeServiceScheme::AllBareMetal),
            "all_bare_metal_exact" => Ok(ComputeServiceScheme::AllBareMetalExact),
            "htcondor_bare_metal" => Ok(ComputeServiceScheme::HtCondorBareMetal),
            _ => Err(ConversionError::UnknownComputeServiceScheme(s.to_string())),
        }
    }
}

impl fmt::Display for ComputeServiceScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComputeServiceScheme::AllBareMetal => "all_bare_metal",
            ComputeServiceScheme::AllBareMetalExact => "all_bare_metal_exact",
            ComputeServiceScheme::HtCondorBareMetal => "htcondor_bare_metal",
        };
        write!(f, "{}", name)
    }
}

impl ComputeServiceScheme {
    /// How the platform has to expose its compute hosts for this scheme.
    pub fn layout(&self) -> ComputeServiceLayout {
        match self {
            ComputeServiceScheme::AllBareMetal | ComputeServiceScheme::AllBareMetalExact => ComputeServiceLayout::BareMetalPerHost,
            ComputeServiceScheme::HtCondorBareMetal => ComputeServiceLayout::HtCondorPool,
        }
    }

    pub fn is_core_counted(&self) -> bool {
        !matches!(self, ComputeServiceScheme::HtCondorBareMetal)
    }

    /// Factory method resolving the scheme into an allocator for the given platform.
    pub fn get_instance(&self, store: &ResourceStore) -> Result<ResourceAllocator, ConversionError> {
        match self {
            ComputeServiceScheme::AllBareMetal => Ok(ResourceAllocator::CoreCounted { reservation: ReservationMode::AllScanned }),
            ComputeServiceScheme::AllBareMetalExact => Ok(ResourceAllocator::CoreCounted { reservation: ReservationMode::ChosenOnly }),
            ComputeServiceScheme::HtCondorBareMetal => {
                let target = store.compute_resource_ids().into_iter().next().ok_or(ConversionError::NoComputeHosts)?;
                Ok(ResourceAllocator::Passthrough { target })
            }
        }
    }
}

/// Which resources lose a core during one core-counted allocation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationMode {
    /// Every resource with a free core, chosen or not.
    AllScanned,
    /// Only the resource that receives the task.
    ChosenOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub target: ComputeResourceId,
    pub service_arguments: ServiceArguments,
}

/// Picks the compute resource for one task at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceAllocator {
    CoreCounted { reservation: ReservationMode },
    Passthrough { target: ComputeResourceId },
}

impl ResourceAllocator {
    /// Returns `None` when no resource has a free core. That is not an error:
    /// the caller ends the current dispatch pass.
    pub fn allocate(&self, task: &Task, pool: &mut ResourcePool, store: &ResourceStore) -> Option<Allocation> {
        match self {
            ResourceAllocator::Passthrough { target } => Some(Allocation { target: *target, service_arguments: ServiceArguments::new() }),
            ResourceAllocator::CoreCounted { reservation } => {
                let mut candidates = pool.available();

                if *reservation == ReservationMode::AllScanned {
                    candidates.retain(|id| pool.reserve(*id));
                }

                // Name descending, then key descending
                candidates.sort_by_key(|id| (Reverse(store.get_compute_resource_name(*id).cloned()), Reverse(*id)));

                let target = *candidates.first()?;
                if *reservation == ReservationMode::ChosenOnly && !pool.reserve(target) {
                    return None;
                }

                // Force single-core execution
                let mut service_arguments = ServiceArguments::new();
                service_arguments.insert(task.id.to_string(), "1".to_string());

                Some(Allocation { target, service_arguments })
            }
        }
    }

    pub fn is_core_counted(&self) -> bool {
        matches!(self, ResourceAllocator::CoreCounted { .. })
    }
}
