//! tweetsmith domain crate
//!
//! This crate contains the core domain logic following hexagonal architecture:
//! - `model`: Domain entities and value objects
//! - `ports`: Trait definitions for external dependencies (adapters)
//! - `usecases`: Example selection, output sanitizing, generation, dispatch

pub mod model;
pub mod ports;
pub mod usecases;

pub use model::*;
pub use ports::*;
