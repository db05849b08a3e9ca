pub mod engine;
pub mod simulator;
pub mod simulator_mock;
