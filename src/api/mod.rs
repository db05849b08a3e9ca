pub mod config_dto;
pub mod platform_dto;
pub mod workflow_dto;
