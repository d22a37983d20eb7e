//! CLI command implementations

pub mod config;
pub mod generate;
pub mod review;
pub mod run;
pub mod stats;
