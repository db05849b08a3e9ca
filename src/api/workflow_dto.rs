use serde::{Deserialize, Serialize};

use crate::api::config_dto::QuantityDto;

/// A workflow instance in the WfCommons JSON format.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowInstanceDto {
    #[serde(default)]
    pub name: String,
    pub workflow: WorkflowSpecDto,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSpecDto {
    pub tasks: Vec<TaskDto>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TaskDto {
    pub name: String,

    /// Measured runtime in seconds on the reference machine.
    #[serde(alias = "runtimeInSeconds")]
    pub runtime: f64,

    #[serde(default)]
    pub parents: Vec<String>,

    #[serde(default)]
    pub files: Vec<FileDto>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FileDto {
    /// `input` or `output`.
    pub link: String,
    pub name: String,
    /// Bytes, as a number or with a unit such as `"42MB"`.
    #[serde(alias = "sizeInBytes")]
    pub size: QuantityDto,
}
