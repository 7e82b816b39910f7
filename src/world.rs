use crate::entities::{AgentId, Cell, Direction, Role};
use crate::error::{SimulationError, SimulationResult};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug)]
struct Occupant {
    cell: Cell,
    role: Role,
}

/// A bounded, multi-occupancy grid.
///
/// Every placed agent is recorded in exactly one cell. Walls are markers that block mobile agents.
#[derive(Clone, Debug)]
pub struct GridWorld {
    width: usize,
    height: usize,
    cells: Vec<Vec<AgentId>>,
    walls: Vec<bool>,
    agents: HashMap<AgentId, Occupant>,
}

impl GridWorld {
    pub fn new(width: usize, height: usize) -> GridWorld {
        GridWorld {
            width,
            height,
            cells: vec![Vec::new(); width * height],
            walls: vec![false; width * height],
            agents: HashMap::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn contains_cell(&self, cell: Cell) -> bool {
        cell.x < self.width && cell.y < self.height
    }

    /// Inserts an agent into a cell.
    ///
    /// # Arguments
    /// * `agent` - The agent to place. It must not be on the grid yet.
    /// * `role` - The role of the agent. Walls need an empty cell and mobile roles cannot stand on a wall.
    /// * `cell` - The cell to place the agent in.
    pub fn place(&mut self, agent: AgentId, role: Role, cell: Cell) -> SimulationResult<()> {
        let index = self.index(cell)?;

        if self.agents.contains_key(&agent) {
            return Err(invalid_placement(agent, role, cell, "agent is already placed"));
        }

        if role == Role::Wall && !self.cells[index].is_empty() {
            return Err(invalid_placement(agent, role, cell, "walls need an empty cell"));
        }

        if role.is_mobile() && self.walls[index] {
            return Err(invalid_placement(agent, role, cell, "cell is a wall"));
        }

        self.cells[index].push(agent);
        self.walls[index] |= role == Role::Wall;
        self.agents.insert(agent, Occupant { cell, role });

        Ok(())
    }

    /// Atomically moves an agent from its current cell to `to`.
    ///
    /// Adjacency is not checked and mobile agents may share a cell.
    pub fn move_agent(&mut self, agent: AgentId, to: Cell) -> SimulationResult<()> {
        let index = self.index(to)?;
        let occupant = *self
            .agents
            .get(&agent)
            .ok_or(SimulationError::UnknownAgent(agent))?;

        if !occupant.role.is_mobile() {
            return Err(invalid_placement(agent, occupant.role, to, "static markers never move"));
        }

        if self.walls[index] {
            return Err(invalid_placement(agent, occupant.role, to, "cell is a wall"));
        }

        if occupant.cell == to {
            return Ok(());
        }

        let from = self.cell_index(occupant.cell);
        self.cells[from].retain(|id| *id != agent);
        self.cells[index].push(agent);
        self.agents.insert(agent, Occupant { cell: to, ..occupant });

        Ok(())
    }

    /// Takes an agent off the grid, returning the cell it occupied.
    pub fn remove(&mut self, agent: AgentId) -> SimulationResult<Cell> {
        let occupant = self
            .agents
            .remove(&agent)
            .ok_or(SimulationError::UnknownAgent(agent))?;

        let index = self.cell_index(occupant.cell);
        self.cells[index].retain(|id| *id != agent);
        if occupant.role == Role::Wall {
            self.walls[index] = false;
        }

        Ok(occupant.cell)
    }

    /// Cells outside the grid are never empty.
    pub fn is_cell_empty(&self, cell: Cell) -> bool {
        self.contains_cell(cell) && self.cells[self.cell_index(cell)].is_empty()
    }

    pub fn agents_at(&self, cell: Cell) -> &[AgentId] {
        if !self.contains_cell(cell) {
            return &[];
        }
        &self.cells[self.cell_index(cell)]
    }

    pub fn position_of(&self, agent: AgentId) -> Option<Cell> {
        self.agents.get(&agent).map(|occupant| occupant.cell)
    }

    pub fn role_of(&self, agent: AgentId) -> Option<Role> {
        self.agents.get(&agent).map(|occupant| occupant.role)
    }

    pub fn is_wall(&self, cell: Cell) -> bool {
        self.contains_cell(cell) && self.walls[self.cell_index(cell)]
    }

    /// In bounds and not a wall, i.e. a cell a mobile agent may stand on.
    pub fn is_open(&self, cell: Cell) -> bool {
        self.contains_cell(cell) && !self.walls[self.cell_index(cell)]
    }

    pub fn has_role_at(&self, cell: Cell, role: Role) -> bool {
        self.agents_at(cell)
            .iter()
            .any(|agent| self.role_of(*agent) == Some(role))
    }

    /// The open cells reachable in one step, in North, East, South, West order.
    pub fn open_neighbors(&self, cell: Cell) -> Vec<Cell> {
        Direction::ALL
            .iter()
            .filter_map(|direction| cell.step(*direction))
            .filter(|neighbor| self.is_open(*neighbor))
            .collect()
    }

    /// All cells without any occupant, in row-major order.
    pub fn empty_cells(&self) -> Vec<Cell> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, agents)| agents.is_empty())
            .map(|(index, _)| Cell::new(index % self.width, index / self.width))
            .collect()
    }

    /// Every agent with the given role and its cell, in row-major order.
    pub fn agents_with_role(&self, role: Role) -> Vec<(AgentId, Cell)> {
        // Linear in the number of cells, which is fine for the maze sizes we run
        self.cells
            .iter()
            .flatten()
            .filter_map(|agent| {
                let occupant = self.agents.get(agent)?;
                (occupant.role == role).then_some((*agent, occupant.cell))
            })
            .collect()
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    fn index(&self, cell: Cell) -> SimulationResult<usize> {
        if !self.contains_cell(cell) {
            return Err(SimulationError::OutOfBounds {
                cell,
                width: self.width,
                height: self.height,
            });
        }
        Ok(self.cell_index(cell))
    }

    fn cell_index(&self, cell: Cell) -> usize {
        cell.y * self.width + cell.x
    }
}

fn invalid_placement(agent: AgentId, role: Role, cell: Cell, reason: &'static str) -> SimulationError {
    SimulationError::InvalidPlacement {
        agent,
        role,
        cell,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ids(count: usize) -> Vec<AgentId> {
        let mut rng = StdRng::seed_from_u64(0);
        (0..count).map(|_| AgentId::random(&mut rng)).collect()
    }

    fn occurrences(world: &GridWorld, agent: AgentId) -> usize {
        (0..world.height())
            .flat_map(|y| (0..world.width()).map(move |x| Cell::new(x, y)))
            .map(|cell| world.agents_at(cell).iter().filter(|id| **id == agent).count())
            .sum()
    }

    #[test]
    fn when_placing_an_agent_it_occupies_the_cell() {
        let ids = ids(1);
        let mut world = GridWorld::new(3, 3);

        world.place(ids[0], Role::Runner, Cell::new(1, 2)).unwrap();

        assert_eq!(world.agents_at(Cell::new(1, 2)), &[ids[0]]);
        assert_eq!(world.position_of(ids[0]), Some(Cell::new(1, 2)));
        assert_eq!(world.role_of(ids[0]), Some(Role::Runner));
        assert!(!world.is_cell_empty(Cell::new(1, 2)));
        assert!(world.is_cell_empty(Cell::new(0, 0)));
    }

    #[test]
    fn when_placing_an_agent_outside_the_grid_it_is_out_of_bounds() {
        let ids = ids(2);
        let mut world = GridWorld::new(3, 3);

        assert!(matches!(
            world.place(ids[0], Role::Runner, Cell::new(3, 0)),
            Err(SimulationError::OutOfBounds { .. })
        ));
        assert!(matches!(
            world.place(ids[1], Role::Runner, Cell::new(0, 3)),
            Err(SimulationError::OutOfBounds { .. })
        ));
        assert_eq!(world.agent_count(), 0);
    }

    #[test]
    fn when_placing_a_mobile_agent_on_a_wall_the_placement_is_invalid() {
        let ids = ids(2);
        let mut world = GridWorld::new(3, 3);
        world.place(ids[0], Role::Wall, Cell::new(1, 1)).unwrap();

        assert!(matches!(
            world.place(ids[1], Role::Enemy, Cell::new(1, 1)),
            Err(SimulationError::InvalidPlacement { .. })
        ));
        assert_eq!(world.agents_at(Cell::new(1, 1)), &[ids[0]]);
    }

    #[test]
    fn when_placing_a_second_wall_on_a_cell_the_placement_is_invalid() {
        let ids = ids(2);
        let mut world = GridWorld::new(3, 3);
        world.place(ids[0], Role::Wall, Cell::new(1, 1)).unwrap();

        assert!(matches!(
            world.place(ids[1], Role::Wall, Cell::new(1, 1)),
            Err(SimulationError::InvalidPlacement { .. })
        ));
    }

    #[test]
    fn when_placing_the_same_agent_twice_the_placement_is_invalid() {
        let ids = ids(1);
        let mut world = GridWorld::new(3, 3);
        world.place(ids[0], Role::Runner, Cell::new(0, 0)).unwrap();

        assert!(matches!(
            world.place(ids[0], Role::Runner, Cell::new(1, 0)),
            Err(SimulationError::InvalidPlacement { .. })
        ));
        assert_eq!(occurrences(&world, ids[0]), 1);
    }

    #[test]
    fn when_mobile_agents_share_a_cell_both_are_listed() {
        let ids = ids(3);
        let mut world = GridWorld::new(3, 3);
        world.place(ids[0], Role::Start, Cell::new(0, 0)).unwrap();
        world.place(ids[1], Role::Runner, Cell::new(0, 0)).unwrap();
        world.place(ids[2], Role::Runner, Cell::new(0, 0)).unwrap();

        assert_eq!(world.agents_at(Cell::new(0, 0)), &[ids[0], ids[1], ids[2]]);
        assert!(world.has_role_at(Cell::new(0, 0), Role::Start));
        assert!(!world.has_role_at(Cell::new(0, 0), Role::Exit));
    }

    #[test]
    fn when_moving_an_agent_it_appears_in_exactly_one_cell() {
        let ids = ids(2);
        let mut world = GridWorld::new(4, 4);
        world.place(ids[0], Role::Runner, Cell::new(0, 0)).unwrap();
        world.place(ids[1], Role::Enemy, Cell::new(2, 2)).unwrap();

        for cell in [Cell::new(1, 0), Cell::new(2, 2), Cell::new(3, 3), Cell::new(3, 3)] {
            world.move_agent(ids[0], cell).unwrap();

            assert_eq!(occurrences(&world, ids[0]), 1);
            assert_eq!(world.position_of(ids[0]), Some(cell));
        }

        assert!(world.is_cell_empty(Cell::new(0, 0)));
        assert_eq!(world.agents_at(Cell::new(2, 2)), &[ids[1]]);
    }

    #[test]
    fn when_moving_an_agent_onto_a_wall_the_move_is_rejected() {
        let ids = ids(2);
        let mut world = GridWorld::new(3, 3);
        world.place(ids[0], Role::Wall, Cell::new(1, 0)).unwrap();
        world.place(ids[1], Role::Runner, Cell::new(0, 0)).unwrap();

        assert!(matches!(
            world.move_agent(ids[1], Cell::new(1, 0)),
            Err(SimulationError::InvalidPlacement { .. })
        ));
        assert_eq!(world.position_of(ids[1]), Some(Cell::new(0, 0)));
    }

    #[test]
    fn when_moving_an_agent_outside_the_grid_the_move_is_rejected() {
        let ids = ids(1);
        let mut world = GridWorld::new(3, 3);
        world.place(ids[0], Role::Runner, Cell::new(2, 2)).unwrap();

        assert!(matches!(
            world.move_agent(ids[0], Cell::new(2, 3)),
            Err(SimulationError::OutOfBounds { .. })
        ));
        assert_eq!(world.position_of(ids[0]), Some(Cell::new(2, 2)));
    }

    #[test]
    fn when_moving_a_static_marker_the_move_is_rejected() {
        let ids = ids(1);
        let mut world = GridWorld::new(3, 3);
        world.place(ids[0], Role::Exit, Cell::new(2, 2)).unwrap();

        assert!(matches!(
            world.move_agent(ids[0], Cell::new(1, 1)),
            Err(SimulationError::InvalidPlacement { .. })
        ));
    }

    #[test]
    fn when_moving_an_unplaced_agent_it_is_unknown() {
        let ids = ids(1);
        let mut world = GridWorld::new(3, 3);

        assert!(matches!(
            world.move_agent(ids[0], Cell::new(1, 1)),
            Err(SimulationError::UnknownAgent(_))
        ));
    }

    #[test]
    fn when_removing_an_agent_the_cell_becomes_empty() {
        let ids = ids(1);
        let mut world = GridWorld::new(3, 3);
        world.place(ids[0], Role::Runner, Cell::new(1, 1)).unwrap();

        assert_eq!(world.remove(ids[0]).unwrap(), Cell::new(1, 1));
        assert!(world.is_cell_empty(Cell::new(1, 1)));
        assert!(world.position_of(ids[0]).is_none());
        assert!(matches!(
            world.remove(ids[0]),
            Err(SimulationError::UnknownAgent(_))
        ));
    }

    #[test]
    fn when_getting_open_neighbors_of_a_corner_walls_and_edges_are_skipped() {
        let ids = ids(1);
        let mut world = GridWorld::new(3, 3);
        world.place(ids[0], Role::Wall, Cell::new(1, 0)).unwrap();

        assert_eq!(world.open_neighbors(Cell::new(0, 0)), vec![Cell::new(0, 1)]);
        assert_eq!(
            world.open_neighbors(Cell::new(1, 1)),
            vec![Cell::new(2, 1), Cell::new(1, 2), Cell::new(0, 1)]
        );
    }

    #[test]
    fn when_getting_all_empty_cells_the_correct_cells_are_returned() {
        let ids = ids(3);
        let mut world = GridWorld::new(2, 2);
        world.place(ids[0], Role::Wall, Cell::new(0, 0)).unwrap();
        world.place(ids[1], Role::Food, Cell::new(1, 1)).unwrap();
        world.place(ids[2], Role::Runner, Cell::new(1, 0)).unwrap();

        assert_eq!(world.empty_cells(), vec![Cell::new(0, 1)]);
    }

    #[test]
    fn when_getting_agents_by_role_only_that_role_is_returned() {
        let ids = ids(3);
        let mut world = GridWorld::new(3, 3);
        world.place(ids[0], Role::Runner, Cell::new(2, 2)).unwrap();
        world.place(ids[1], Role::Enemy, Cell::new(1, 1)).unwrap();
        world.place(ids[2], Role::Runner, Cell::new(0, 0)).unwrap();

        assert_eq!(
            world.agents_with_role(Role::Runner),
            vec![(ids[2], Cell::new(0, 0)), (ids[0], Cell::new(2, 2))]
        );
        assert_eq!(
            world.agents_with_role(Role::Enemy),
            vec![(ids[1], Cell::new(1, 1))]
        );
    }
}
