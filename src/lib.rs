//! # maze_runners
//!
//! A turn-based simulation of runners crossing walled mazes.
//! Runners lay pheromone trails toward a key and then the exit, enemies hunt them,
//! and key collectors keep moving the key around. Levels are played one after the other.

pub mod agents;
pub mod behaviors;
pub mod config;
pub mod entities;
pub mod error;
pub mod maze;
pub mod navigation;
pub mod pheromones;
pub mod replay;
pub mod simulation;
pub mod world;

#[cfg(feature = "python")]
mod python;

pub use agents::{reposition_key, Agent, AgentFactory, TickContext};
pub use config::{BehaviorConfig, SimulationConfig};
pub use entities::{AgentId, Cell, Direction, Role};
pub use error::{SimulationError, SimulationResult};
pub use maze::MazeDescriptor;
pub use pheromones::{Evaporation, PheromoneField};
pub use simulation::{FailureReason, Level, LevelStatus, Outcome, Simulation, SimulationState};
pub use world::GridWorld;
