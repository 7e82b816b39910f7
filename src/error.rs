use crate::entities::{AgentId, Cell, Role};
use thiserror::Error;

/// Everything that can go wrong while building or running a simulation.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("cell {cell} is outside the {width}x{height} grid")]
    OutOfBounds {
        cell: Cell,
        width: usize,
        height: usize,
    },

    #[error("cannot place {role:?} {agent} on {cell}: {reason}")]
    InvalidPlacement {
        agent: AgentId,
        role: Role,
        cell: Cell,
        reason: &'static str,
    },

    #[error("agent {0} is not on the grid")]
    UnknownAgent(AgentId),

    #[error("no vacant cell found after {0} attempts")]
    NoVacantCell(usize),

    #[error("pheromone strength must be finite and non-negative, got {0}")]
    InvalidStrength(f64),

    #[error("runner {agent} reported an exit from {cell}, which is not the exit")]
    InvalidExit { agent: AgentId, cell: Cell },

    #[error("malformed maze descriptor: {0}")]
    MalformedDescriptor(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SimulationResult<T> = Result<T, SimulationError>;
