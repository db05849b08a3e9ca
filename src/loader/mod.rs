pub mod parser;
pub mod units;
