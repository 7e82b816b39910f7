use crate::error::{SimulationError, SimulationResult};
use rand::distributions::{Distribution, Standard};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::{Builder, Uuid};

/// Unique identifier of an agent placed on the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(Uuid);

impl AgentId {
    /// Creates a random (v4) identifier from the given source of randomness.
    ///
    /// Drawing the bytes from the simulation RNG keeps identifiers reproducible for a seeded run.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> AgentId {
        AgentId(Builder::from_random_bytes(rng.gen()).into_uuid())
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A cell of the maze. `x` is the column and `y` the row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: usize,
    pub y: usize,
}

impl Cell {
    pub fn new(x: usize, y: usize) -> Cell {
        Cell { x, y }
    }

    pub fn manhattan(&self, other: Cell) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// The neighbouring cell in the given direction, if it does not underflow the grid origin.
    pub fn step(&self, direction: Direction) -> Option<Cell> {
        match direction {
            Direction::North => self.y.checked_sub(1).map(|y| Cell::new(self.x, y)),
            Direction::East => Some(Cell::new(self.x + 1, self.y)),
            Direction::South => Some(Cell::new(self.x, self.y + 1)),
            Direction::West => self.x.checked_sub(1).map(|x| Cell::new(x, self.y)),
        }
    }
}

impl From<(usize, usize)> for Cell {
    fn from((x, y): (usize, usize)) -> Cell {
        Cell::new(x, y)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Represents the direction an agent can move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];
}

impl Distribution<Direction> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Direction {
        match rng.gen_range(0..4) {
            0 => Direction::North,
            1 => Direction::East,
            2 => Direction::South,
            _ => Direction::West,
        }
    }
}

/// The role an agent plays in the maze.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Runner,
    Enemy,
    KeyCollector,
    Key,
    Wall,
    Start,
    Exit,
    Food,
}

impl Role {
    /// Mobile roles may be relocated; static roles are markers placed once.
    pub fn is_mobile(&self) -> bool {
        matches!(
            self,
            Role::Runner | Role::Enemy | Role::KeyCollector | Role::Key
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Role::Runner => "Runner",
            Role::Enemy => "Enemy",
            Role::KeyCollector => "KeyCollector",
            Role::Key => "Key",
            Role::Wall => "Wall",
            Role::Start => "Start",
            Role::Exit => "Exit",
            Role::Food => "Food",
        }
    }
}

/// Maps a maze file character to the role it spawns. Open cells spawn nothing.
pub fn from_char(value: char) -> SimulationResult<Option<Role>> {
    match value {
        '.' => Ok(None),
        '%' => Ok(Some(Role::Wall)),
        '*' => Ok(Some(Role::Food)),
        'E' => Ok(Some(Role::Enemy)),
        'S' => Ok(Some(Role::Start)),
        'X' => Ok(Some(Role::Exit)),
        'K' => Ok(Some(Role::Key)),
        _ => Err(SimulationError::MalformedDescriptor(format!(
            "invalid character value: {value:?}"
        ))),
    }
}
