pub mod data_file;
pub mod task;
pub mod workflow;
