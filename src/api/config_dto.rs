use serde::{Deserialize, Serialize};

use crate::api::platform_dto::PlatformDto;
use crate::error::ConversionError;
use crate::loader::units;

/// A numeric setting given either as a bare number or as a unit-suffixed string.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum QuantityDto {
    Number(f64),
    Text(String),
}

impl QuantityDto {
    pub fn seconds(&self) -> Result<f64, ConversionError> {
        match self {
            QuantityDto::Number(value) => Ok(*value),
            QuantityDto::Text(text) => units::parse_duration(text),
        }
    }

    pub fn flops(&self) -> Result<f64, ConversionError> {
        match self {
            QuantityDto::Number(value) => Ok(*value),
            QuantityDto::Text(text) => units::parse_flops(text),
        }
    }

    pub fn bytes_per_second(&self) -> Result<f64, ConversionError> {
        match self {
            QuantityDto::Number(value) => Ok(*value),
            QuantityDto::Text(text) => units::parse_bandwidth(text),
        }
    }

    /// A duration that must not be negative, such as a latency or an overhead.
    pub fn non_negative_seconds(&self) -> Result<f64, ConversionError> {
        let value = self.seconds()?;
        if value < 0.0 {
            return Err(out_of_range(value, "expected a non-negative duration"));
        }
        Ok(value)
    }

    /// A flop rate that must be strictly positive, such as a core speed.
    pub fn positive_flops(&self) -> Result<f64, ConversionError> {
        let value = self.flops()?;
        if value <= 0.0 || !value.is_finite() {
            return Err(out_of_range(value, "expected a positive flop rate"));
        }
        Ok(value)
    }

    /// A bandwidth that must be strictly positive.
    pub fn positive_bytes_per_second(&self) -> Result<f64, ConversionError> {
        let value = self.bytes_per_second()?;
        if value <= 0.0 || !value.is_finite() {
            return Err(out_of_range(value, "expected a positive bandwidth"));
        }
        Ok(value)
    }

    /// A data size in whole bytes.
    pub fn bytes(&self) -> Result<u64, ConversionError> {
        let value = match self {
            QuantityDto::Number(value) => *value,
            QuantityDto::Text(text) => units::parse_size(text)?,
        };
        if value < 0.0 || !value.is_finite() || value > u64::MAX as f64 {
            return Err(out_of_range(value, "expected a non-negative size"));
        }
        Ok(value.round() as u64)
    }

    /// A non-negative whole number such as a core count.
    pub fn count(&self) -> Result<u32, ConversionError> {
        let value = match self {
            QuantityDto::Number(value) => *value,
            QuantityDto::Text(text) => text.trim().parse::<f64>().map_err(|e| ConversionError::InvalidQuantity {
                value: text.clone(),
                reason: e.to_string(),
            })?,
        };

        if value < 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
            return Err(ConversionError::InvalidQuantity { value: value.to_string(), reason: "expected a non-negative integer".to_string() });
        }

        Ok(value as u32)
    }
}

fn out_of_range(value: f64, reason: &str) -> ConversionError {
    ConversionError::InvalidQuantity { value: value.to_string(), reason: reason.to_string() }
}

impl From<f64> for QuantityDto {
    fn from(value: f64) -> Self {
        QuantityDto::Number(value)
    }
}

impl From<&str> for QuantityDto {
    fn from(value: &str) -> Self {
        QuantityDto::Text(value.to_string())
    }
}

/// Root of the JSON input accepted by the simulator.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub struct SimulatorConfigDto {
    pub workflow: WorkflowSourceDto,

    /// Delay charged before every task dispatch.
    pub scheduling_overhead: QuantityDto,

    pub compute_service_scheme: String,
    pub storage_service_scheme: String,

    /// `abort` (default) or `continue`.
    #[serde(default)]
    pub failure_policy: Option<String>,

    /// `descending` (default) or `ascending`.
    #[serde(default)]
    pub task_ordering: Option<String>,

    #[serde(default)]
    pub runtime_noise: Option<RuntimeNoiseDto>,

    pub platform: PlatformDto,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub struct WorkflowSourceDto {
    /// Path of the WfCommons workflow description, relative to the config file.
    pub file: String,

    /// Speed of the machine the task runtimes were measured on.
    pub reference_flops: QuantityDto,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct RuntimeNoiseDto {
    /// Maximum relative deviation applied to each task's compute time.
    pub amplitude: f64,
    #[serde(default)]
    pub seed: u64,
}
