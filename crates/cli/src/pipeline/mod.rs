//! Simulation orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::{Simulation, SimulationConfig, SourcePlan};
pub use stats::SimulationStats;
