//! Environment coordinator: discovery + агрегация concealment / exposure

pub mod coordinator;
pub mod sample;

pub use coordinator::{DiscoveryReport, EnvironmentCoordinator};
pub use sample::{AggregationPolicy, EnvironmentSample};
