use std::fmt;
use std::str::FromStr;

use crate::api::config_dto::SimulatorConfigDto;
use crate::domain::scheduling::compute_service_scheme::ComputeServiceScheme;
use crate::domain::scheduling::storage_service_scheme::StorageServiceScheme;
use crate::domain::scheduling::task_selector::SortDirection;
use crate::error::ConversionError;

/// What the dispatch loop does when a job reports failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop processing events and end the run with an error.
    #[default]
    Abort,
    /// Log the failure, forget the job and keep scheduling.
    Continue,
}

impl FromStr for FailurePolicy {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "abort" => Ok(FailurePolicy::Abort),
            "continue" => Ok(FailurePolicy::Continue),
            _ => Err(ConversionError::UnknownFailurePolicy(s.to_string())),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Abort => write!(f, "abort"),
            FailurePolicy::Continue => write!(f, "continue"),
        }
    }
}

/// Validated scheduling settings, resolved once before the run starts.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    pub compute_service_scheme: ComputeServiceScheme,
    pub storage_service_scheme: StorageServiceScheme,
    /// Seconds of simulated time charged before each task dispatch.
    pub scheduling_overhead: f64,
    pub failure_policy: FailurePolicy,
    pub task_ordering: SortDirection,
}

impl SchedulerConfig {
    pub fn new(
        compute_service_scheme: ComputeServiceScheme,
        storage_service_scheme: StorageServiceScheme,
        scheduling_overhead: f64,
    ) -> Result<Self, ConversionError> {
        if scheduling_overhead.is_nan() || scheduling_overhead < 0.0 {
            return Err(ConversionError::NegativeSchedulingOverhead(scheduling_overhead));
        }

        Ok(Self {
            compute_service_scheme,
            storage_service_scheme,
            scheduling_overhead,
            failure_policy: FailurePolicy::default(),
            task_ordering: SortDirection::default(),
        })
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    pub fn with_task_ordering(mut self, task_ordering: SortDirection) -> Self {
        self.task_ordering = task_ordering;
        self
    }
}

impl TryFrom<&SimulatorConfigDto> for SchedulerConfig {
    type Error = ConversionError;

    fn try_from(dto: &SimulatorConfigDto) -> Result<Self, Self::Error> {
        let compute_service_scheme = dto.compute_service_scheme.parse::<ComputeServiceScheme>()?;
        let storage_service_scheme = dto.storage_service_scheme.parse::<StorageServiceScheme>()?;
        let failure_policy = dto.failure_policy.as_deref().map(str::parse::<FailurePolicy>).transpose()?.unwrap_or_default();
        let task_ordering = dto.task_ordering.as_deref().map(str::parse::<SortDirection>).transpose()?.unwrap_or_default();

        let config = SchedulerConfig::new(compute_service_scheme, storage_service_scheme, dto.scheduling_overhead.seconds()?)?
            .with_failure_policy(failure_policy)
            .with_task_ordering(task_ordering);

        log::debug!(
            "Scheduler configured: compute={}, storage={}, overhead={}s, on_failure={}, ordering={}.",
            config.compute_service_scheme,
            config.storage_service_scheme,
            config.scheduling_overhead,
            config.failure_policy,
            config.task_ordering
        );

        Ok(config)
    }
}
