use crate::error::{SimulationError, SimulationResult};
use crate::pheromones::Evaporation;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Tuning for the default agent behaviours.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BehaviorConfig {
    /// Probability that a runner takes a random step instead of following the trail.
    pub runner_exploration: f64,
    /// Manhattan distance within which an enemy hunts a runner.
    pub enemy_hunt_radius: usize,
    /// Whether enemies keep out of the start and exit cells.
    pub enemy_avoids_sanctuaries: bool,
}

impl Default for BehaviorConfig {
    fn default() -> BehaviorConfig {
        BehaviorConfig {
            runner_exploration: 0.1,
            enemy_hunt_radius: 3,
            enemy_avoids_sanctuaries: true,
        }
    }
}

/// Everything needed to build a [`crate::Simulation`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Maze files, one per level, in the order they are played.
    pub levels: Vec<PathBuf>,
    /// Runners spawned on the start cell of every level.
    pub runners: usize,
    /// Key collectors spawned on the start cell of every level.
    pub collectors: usize,
    /// Seed for placement, behaviour and key draws. Seeded from entropy when absent.
    pub seed: Option<u64>,
    /// Fails a level that is still running after this many ticks.
    pub max_ticks: Option<usize>,
    /// Random draws `reposition_key` makes before giving up.
    pub reposition_attempts: usize,
    pub evaporation: Evaporation,
    /// Where to write the JSON replay, if anywhere.
    pub replay_file: Option<PathBuf>,
    pub behavior: BehaviorConfig,
}

impl Default for SimulationConfig {
    fn default() -> SimulationConfig {
        SimulationConfig {
            levels: Vec::new(),
            runners: 10,
            collectors: 2,
            seed: None,
            max_ticks: None,
            reposition_attempts: 10_000,
            evaporation: Evaporation::None,
            replay_file: None,
            behavior: BehaviorConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn from_json(contents: &str) -> SimulationResult<SimulationConfig> {
        let config: SimulationConfig = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> SimulationResult<SimulationConfig> {
        SimulationConfig::from_json(&fs::read_to_string(path)?)
    }

    /// Checks the values that would otherwise only fail in the middle of a run.
    pub fn validate(&self) -> SimulationResult<()> {
        if self.runners == 0 {
            return Err(SimulationError::Config(
                "at least one runner is required".to_string(),
            ));
        }

        if self.reposition_attempts == 0 {
            return Err(SimulationError::Config(
                "reposition_attempts must be positive".to_string(),
            ));
        }

        if self.max_ticks == Some(0) {
            return Err(SimulationError::Config(
                "max_ticks must be positive".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.behavior.runner_exploration) {
            return Err(SimulationError::Config(format!(
                "runner_exploration must be within [0, 1], got {}",
                self.behavior.runner_exploration
            )));
        }

        if let Evaporation::Exponential { rate } = self.evaporation {
            if !(0.0..=1.0).contains(&rate) {
                return Err(SimulationError::Config(format!(
                    "evaporation rate must be within [0, 1], got {}",
                    rate
                )));
            }
        }

        Ok(())
    }
}
