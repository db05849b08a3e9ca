pub mod compute_resource;
pub mod resource_store;
pub mod storage_service;
