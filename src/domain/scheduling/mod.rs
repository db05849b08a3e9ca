pub mod compute_service_scheme;
pub mod controller;
pub mod job;
pub mod resource_pool;
pub mod scheduler_config;
pub mod storage_service_scheme;
pub mod task_selector;
