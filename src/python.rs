use crate::config::SimulationConfig;
use crate::entities::Cell;
use crate::error::SimulationError;
use crate::simulation::{Outcome, Simulation};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use std::path::PathBuf;

impl From<SimulationError> for PyErr {
    fn from(error: SimulationError) -> PyErr {
        PyValueError::new_err(error.to_string())
    }
}

/// A maze run driven from Python.
#[pyclass(name = "Simulation", module = "maze_runners")]
pub struct PySimulation {
    inner: Simulation,
}

/// How a run ended.
#[pyclass(name = "Outcome", module = "maze_runners", get_all)]
pub struct PyOutcome {
    /// The final state, e.g. `AllLevelsComplete` or `LevelFailed(RunnersLost)`.
    pub state: String,
    /// The number of levels that were cleared.
    pub levels_cleared: usize,
    /// Ticks played across every level.
    pub ticks: usize,
}

impl From<Outcome> for PyOutcome {
    fn from(outcome: Outcome) -> PyOutcome {
        PyOutcome {
            state: outcome.state.to_string(),
            levels_cleared: outcome.levels_cleared,
            ticks: outcome.ticks,
        }
    }
}

#[pymethods]
impl PySimulation {
    /// Creates a new simulation.
    ///
    /// # Arguments
    /// * `levels` - Paths to the maze files, played in order.
    /// * `runners` - The number of runners spawned on every level.
    /// * `seed` - The seed for the random number generator. If `None`, the run is not reproducible.
    /// * `max_ticks` - Fails a level still running after this many ticks. If `None`, there is no limit.
    /// * `replay_filename` - The filename to save the replay to. If `None`, no replay will be saved.
    #[new]
    #[pyo3(signature = (levels, runners=10, seed=None, max_ticks=None, replay_filename=None))]
    pub fn new(
        levels: Vec<String>,
        runners: usize,
        seed: Option<u64>,
        max_ticks: Option<usize>,
        replay_filename: Option<String>,
    ) -> PyResult<PySimulation> {
        let config = SimulationConfig {
            levels: levels.into_iter().map(PathBuf::from).collect(),
            runners,
            seed,
            max_ticks,
            replay_file: replay_filename.map(PathBuf::from),
            ..SimulationConfig::default()
        };

        Ok(PySimulation {
            inner: Simulation::from_config(config)?,
        })
    }

    /// Plays one tick and returns the resulting state.
    pub fn step(&mut self) -> PyResult<String> {
        Ok(self.inner.step()?.to_string())
    }

    /// Plays until a level fails or every level is complete.
    pub fn run(&mut self) -> PyResult<PyOutcome> {
        Ok(self.inner.run()?.into())
    }

    /// The pheromone intensity at column `x`, row `y` of the current level.
    pub fn pheromone_at(&self, x: usize, y: usize) -> f64 {
        self.inner.level().pheromones().intensity_at(Cell::new(x, y))
    }

    #[getter]
    pub fn level(&self) -> usize {
        self.inner.level_index()
    }

    #[getter]
    pub fn tick(&self) -> usize {
        self.inner.level().tick()
    }

    #[getter]
    pub fn exited_count(&self) -> usize {
        self.inner.level().exited_count()
    }

    #[getter]
    pub fn total_runners(&self) -> usize {
        self.inner.level().total_runners()
    }

    #[getter]
    pub fn running(&self) -> bool {
        self.inner.is_running()
    }

    #[getter]
    pub fn state(&self) -> String {
        self.inner.state().to_string()
    }
}

#[pymodule]
fn maze_runners(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PySimulation>()?;
    m.add_class::<PyOutcome>()?;
    Ok(())
}
