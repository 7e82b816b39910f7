use crate::entities::{from_char, Cell, Role};
use crate::error::{SimulationError, SimulationResult};
use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

static DIMENSIONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"rows (\d+)\s+cols (\d+)").expect("dimensions pattern is valid"));
static ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*m (.*)$").expect("row pattern is valid"));

/// The immutable description of one maze level.
#[derive(Clone, Debug, PartialEq)]
pub struct MazeDescriptor {
    pub width: usize,
    pub height: usize,
    pub walls: BTreeSet<Cell>,
    pub food: BTreeSet<Cell>,
    pub enemies: BTreeSet<Cell>,
    pub start: Cell,
    pub exit: Cell,
    pub key: Cell,
}

impl MazeDescriptor {
    /// Creates a maze without walls, food or enemies.
    pub fn open(width: usize, height: usize, start: Cell, exit: Cell, key: Cell) -> MazeDescriptor {
        MazeDescriptor {
            width,
            height,
            walls: BTreeSet::new(),
            food: BTreeSet::new(),
            enemies: BTreeSet::new(),
            start,
            exit,
            key,
        }
    }

    /// Reads and parses a maze file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> SimulationResult<MazeDescriptor> {
        let contents = fs::read_to_string(path.as_ref()).map_err(|e| {
            SimulationError::MalformedDescriptor(format!(
                "could not read maze file {} due to {}",
                path.as_ref().display(),
                e
            ))
        })?;
        MazeDescriptor::parse(&contents)
    }

    /// Parses the text representation of a maze.
    ///
    /// ```text
    /// rows 3
    /// cols 4
    /// m S.%X
    /// m .K%.
    /// m ..E.
    /// ```
    pub fn parse(contents: &str) -> SimulationResult<MazeDescriptor> {
        let metadata = DIMENSIONS.captures(contents).ok_or_else(|| {
            SimulationError::MalformedDescriptor("missing `rows` and `cols` header".to_string())
        })?;

        let height: usize = parse_dimension(&metadata[1])?;
        let width: usize = parse_dimension(&metadata[2])?;

        let rows: Vec<&str> = ROW
            .captures_iter(contents)
            .filter_map(|captures| captures.get(1))
            .map(|line| line.as_str().trim())
            .collect();

        if rows.len() != height {
            return Err(SimulationError::MalformedDescriptor(format!(
                "expected {} rows but found {}",
                height,
                rows.len()
            )));
        }

        let mut walls = BTreeSet::new();
        let mut food = BTreeSet::new();
        let mut enemies = BTreeSet::new();
        let mut start = Vec::new();
        let mut exit = Vec::new();
        let mut key = Vec::new();

        for (y, line) in rows.iter().enumerate() {
            let length = line.chars().count();
            if length != width {
                return Err(SimulationError::MalformedDescriptor(format!(
                    "row {} has {} cells but the maze is {} wide",
                    y, length, width
                )));
            }

            for (x, value) in line.chars().enumerate() {
                let cell = Cell::new(x, y);
                match from_char(value)? {
                    Some(Role::Wall) => {
                        walls.insert(cell);
                    }
                    Some(Role::Food) => {
                        food.insert(cell);
                    }
                    Some(Role::Enemy) => {
                        enemies.insert(cell);
                    }
                    Some(Role::Start) => start.push(cell),
                    Some(Role::Exit) => exit.push(cell),
                    Some(Role::Key) => key.push(cell),
                    _ => {}
                }
            }
        }

        Ok(MazeDescriptor {
            width,
            height,
            walls,
            food,
            enemies,
            start: exactly_one(start, "start")?,
            exit: exactly_one(exit, "exit")?,
            key: exactly_one(key, "key")?,
        })
    }
}

fn parse_dimension(value: &str) -> SimulationResult<usize> {
    match value.parse() {
        Ok(0) | Err(_) => Err(SimulationError::MalformedDescriptor(format!(
            "invalid maze dimension {value:?}"
        ))),
        Ok(dimension) => Ok(dimension),
    }
}

fn exactly_one(cells: Vec<Cell>, what: &str) -> SimulationResult<Cell> {
    match cells.as_slice() {
        [cell] => Ok(*cell),
        _ => Err(SimulationError::MalformedDescriptor(format!(
            "expected exactly one {} cell but found {}",
            what,
            cells.len()
        ))),
    }
}
