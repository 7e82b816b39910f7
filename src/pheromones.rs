use crate::entities::Cell;
use crate::error::{SimulationError, SimulationResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Intensities below this are dropped when evaporating.
const EVAPORATION_CUTOFF: f64 = 1e-6;

/// How trails age between ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Evaporation {
    /// Trails persist for the life of the level.
    #[default]
    None,
    /// Every tick each intensity is multiplied by `1 - rate`.
    Exponential { rate: f64 },
}

/// A sparse map of trail intensity per cell.
#[derive(Clone, Debug, Default)]
pub struct PheromoneField {
    intensities: HashMap<Cell, f64>,
    evaporation: Evaporation,
}

impl PheromoneField {
    pub fn new(evaporation: Evaporation) -> PheromoneField {
        PheromoneField {
            intensities: HashMap::new(),
            evaporation,
        }
    }

    /// Marks a cell with the given strength, keeping the strongest release seen so far.
    ///
    /// Returns the intensity stored for the cell afterwards.
    pub fn release(&mut self, cell: Cell, strength: f64) -> SimulationResult<f64> {
        if !strength.is_finite() || strength < 0.0 {
            return Err(SimulationError::InvalidStrength(strength));
        }

        let intensity = self.intensities.entry(cell).or_insert(0.0);
        *intensity = intensity.max(strength);

        Ok(*intensity)
    }

    /// The intensity at a cell, or 0 if nothing was ever released there.
    pub fn intensity_at(&self, cell: Cell) -> f64 {
        self.intensities.get(&cell).copied().unwrap_or(0.0)
    }

    /// The candidate with the highest intensity. The first candidate wins ties.
    pub fn strongest(&self, cells: &[Cell]) -> Option<Cell> {
        cells.iter().copied().fold(None, |best, cell| match best {
            Some(best) if self.intensity_at(best) >= self.intensity_at(cell) => Some(best),
            _ => Some(cell),
        })
    }

    /// Applies the configured evaporation policy once.
    pub fn evaporate(&mut self) {
        if let Evaporation::Exponential { rate } = self.evaporation {
            let retained = 1.0 - rate;
            self.intensities.retain(|_, intensity| {
                *intensity *= retained;
                *intensity > EVAPORATION_CUTOFF
            });
        }
    }

    /// Number of cells that carry a trail.
    pub fn len(&self) -> usize {
        self.intensities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intensities.is_empty()
    }
}
