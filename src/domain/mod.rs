pub mod platform;
pub mod scheduling;
pub mod simulator;
pub mod utils;
pub mod workflow;
