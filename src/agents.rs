use crate::entities::{AgentId, Cell, Role};
use crate::error::{SimulationError, SimulationResult};
use crate::maze::MazeDescriptor;
use crate::pheromones::PheromoneField;
use crate::replay::ReplayLogger;
use crate::world::GridWorld;
use rand::rngs::StdRng;
use rand::Rng;

/// The per-tick behaviour every mobile role implements.
///
/// An agent finds its own position through the context; the grid is the only place positions live.
pub trait Agent: Send + Sync {
    fn id(&self) -> AgentId;

    fn tick(&mut self, ctx: &mut TickContext<'_>) -> SimulationResult<()>;
}

/// Builds the agents of a level. The default heuristics live in [`crate::behaviors`].
pub trait AgentFactory: Send + Sync {
    fn runner(&mut self, id: AgentId) -> Box<dyn Agent>;

    fn enemy(&mut self, id: AgentId) -> Box<dyn Agent>;

    fn key_collector(&mut self, id: AgentId) -> Box<dyn Agent>;
}

/// The mobile role groups, in the order they are stepped each tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Group {
    Enemies,
    Runners,
    KeyCollectors,
}

impl Group {
    pub const ORDER: [Group; 3] = [Group::Enemies, Group::Runners, Group::KeyCollectors];
}

/// Requests an agent raises during its tick, applied by the controller once the tick returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Request {
    Capture(AgentId),
    Exit(AgentId),
}

/// The live agents of a level, partitioned by role.
#[derive(Default)]
pub struct Roster {
    enemies: Vec<Box<dyn Agent>>,
    runners: Vec<Box<dyn Agent>>,
    collectors: Vec<Box<dyn Agent>>,
    exited: Vec<AgentId>,
    captured: Vec<AgentId>,
}

impl Roster {
    pub fn add(&mut self, group: Group, agent: Box<dyn Agent>) {
        self.group_mut(group).push(agent);
    }

    pub fn group(&self, group: Group) -> &[Box<dyn Agent>] {
        match group {
            Group::Enemies => &self.enemies,
            Group::Runners => &self.runners,
            Group::KeyCollectors => &self.collectors,
        }
    }

    pub(crate) fn group_mut(&mut self, group: Group) -> &mut Vec<Box<dyn Agent>> {
        match group {
            Group::Enemies => &mut self.enemies,
            Group::Runners => &mut self.runners,
            Group::KeyCollectors => &mut self.collectors,
        }
    }

    pub fn ids(&self, group: Group) -> Vec<AgentId> {
        self.group(group).iter().map(|agent| agent.id()).collect()
    }

    pub fn runner_ids(&self) -> Vec<AgentId> {
        self.ids(Group::Runners)
    }

    pub fn collector_ids(&self) -> Vec<AgentId> {
        self.ids(Group::KeyCollectors)
    }

    pub fn enemy_ids(&self) -> Vec<AgentId> {
        self.ids(Group::Enemies)
    }

    /// Runners that were not captured, including the ones that already exited.
    pub fn total_runners(&self) -> usize {
        self.runners.len() + self.exited.len()
    }

    /// Runners still inside the maze and being stepped.
    pub fn active_runners(&self) -> usize {
        self.runners.len()
    }

    pub fn exited_count(&self) -> usize {
        self.exited.len()
    }

    pub fn captured(&self) -> &[AgentId] {
        &self.captured
    }

    pub(crate) fn record_exit(&mut self, runner: AgentId) {
        self.exited.push(runner);
    }

    pub(crate) fn record_capture(&mut self, runner: AgentId) {
        self.captured.push(runner);
    }

    /// Drops agents of the group that are no longer on the grid.
    pub(crate) fn retain_placed(&mut self, group: Group, world: &GridWorld) {
        self.group_mut(group)
            .retain(|agent| world.position_of(agent.id()).is_some());
    }
}

/// Everything an agent may touch while it ticks.
pub struct TickContext<'a> {
    pub world: &'a mut GridWorld,
    pub pheromones: &'a mut PheromoneField,
    pub rng: &'a mut StdRng,
    maze: &'a MazeDescriptor,
    replay: &'a mut dyn ReplayLogger,
    key: AgentId,
    tick: usize,
    reposition_attempts: usize,
    requests: Vec<Request>,
}

impl<'a> TickContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        world: &'a mut GridWorld,
        pheromones: &'a mut PheromoneField,
        rng: &'a mut StdRng,
        maze: &'a MazeDescriptor,
        replay: &'a mut dyn ReplayLogger,
        key: AgentId,
        tick: usize,
        reposition_attempts: usize,
    ) -> TickContext<'a> {
        TickContext {
            world,
            pheromones,
            rng,
            maze,
            replay,
            key,
            tick,
            reposition_attempts,
            requests: Vec::new(),
        }
    }

    pub fn maze(&self) -> &MazeDescriptor {
        self.maze
    }

    pub fn tick(&self) -> usize {
        self.tick
    }

    pub fn exit(&self) -> Cell {
        self.maze.exit
    }

    pub fn key(&self) -> AgentId {
        self.key
    }

    pub fn key_position(&self) -> Option<Cell> {
        self.world.position_of(self.key)
    }

    pub fn position_of(&self, agent: AgentId) -> SimulationResult<Cell> {
        self.world
            .position_of(agent)
            .ok_or(SimulationError::UnknownAgent(agent))
    }

    /// Moves an agent and records the move in the replay.
    pub fn move_agent(&mut self, agent: AgentId, to: Cell) -> SimulationResult<()> {
        let from = self.position_of(agent)?;
        self.world.move_agent(agent, to)?;

        if from != to {
            let role = self.world.role_of(agent).unwrap_or(Role::Runner);
            self.replay.log_move(self.tick, agent, role, from, to);
        }

        Ok(())
    }

    /// Lays a trail at `cell`, returning the intensity stored there.
    pub fn release(&mut self, cell: Cell, strength: f64) -> SimulationResult<f64> {
        let intensity = self.pheromones.release(cell, strength)?;

        tracing::debug!(tick = self.tick, %cell, strength, "released pheromone");
        self.replay.log_release(self.tick, cell, strength);

        Ok(intensity)
    }

    /// Asks the controller to take a runner out of play.
    pub fn capture(&mut self, runner: AgentId) {
        self.requests.push(Request::Capture(runner));
    }

    /// Reports that a runner reached the exit.
    pub fn report_exit(&mut self, runner: AgentId) {
        self.requests.push(Request::Exit(runner));
    }

    /// Moves the key to a random empty cell.
    pub fn reposition_key(&mut self) -> SimulationResult<Cell> {
        let from = self.position_of(self.key)?;
        let to = reposition_key(self.world, self.key, self.rng, self.reposition_attempts)?;

        tracing::info!(tick = self.tick, from = %from, to = %to, "key repositioned");
        self.replay.log_key_reposition(self.tick, self.key, from, to);

        Ok(to)
    }

    pub(crate) fn into_requests(self) -> Vec<Request> {
        self.requests
    }
}

/// Draws uniformly random cells until one is empty and moves the key there.
///
/// Gives up with [`SimulationError::NoVacantCell`] after `max_attempts` draws.
///
/// # Arguments
/// * `world` - The grid the key is placed on.
/// * `key` - The id of the key.
/// * `rng` - The source of the random cells.
/// * `max_attempts` - How many cells to draw before giving up.
pub fn reposition_key<R: Rng + ?Sized>(
    world: &mut GridWorld,
    key: AgentId,
    rng: &mut R,
    max_attempts: usize,
) -> SimulationResult<Cell> {
    for _ in 0..max_attempts {
        let cell = Cell::new(
            rng.gen_range(0..world.width()),
            rng.gen_range(0..world.height()),
        );

        if world.is_cell_empty(cell) {
            world.move_agent(key, cell)?;
            return Ok(cell);
        }
    }

    Err(SimulationError::NoVacantCell(max_attempts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    struct Idle(AgentId);

    impl Agent for Idle {
        fn id(&self) -> AgentId {
            self.0
        }

        fn tick(&mut self, _ctx: &mut TickContext<'_>) -> SimulationResult<()> {
            Ok(())
        }
    }

    #[test]
    fn when_repositioning_the_key_it_lands_alone_on_a_previously_empty_cell() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut world = GridWorld::new(4, 4);
        let key = AgentId::random(&mut rng);
        world.place(key, Role::Key, Cell::new(1, 1)).unwrap();
        world
            .place(AgentId::random(&mut rng), Role::Runner, Cell::new(2, 2))
            .unwrap();

        for _ in 0..20 {
            let before = world.position_of(key).unwrap();
            let empty = world.empty_cells();

            let cell = reposition_key(&mut world, key, &mut rng, 1000).unwrap();

            assert!(empty.contains(&cell));
            assert_ne!(cell, before);
            assert_eq!(world.agents_at(cell), &[key]);
            assert!(world.is_cell_empty(before));
        }
    }

    #[test]
    fn when_only_one_cell_is_empty_the_key_is_moved_there() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut world = GridWorld::new(2, 2);
        let key = AgentId::random(&mut rng);
        world.place(key, Role::Key, Cell::new(0, 0)).unwrap();
        world
            .place(AgentId::random(&mut rng), Role::Wall, Cell::new(1, 0))
            .unwrap();
        world
            .place(AgentId::random(&mut rng), Role::Food, Cell::new(0, 1))
            .unwrap();

        let cell = reposition_key(&mut world, key, &mut rng, 10_000).unwrap();

        assert_eq!(cell, Cell::new(1, 1));
        assert_eq!(world.position_of(key), Some(Cell::new(1, 1)));
    }

    #[test]
    fn when_the_grid_is_full_repositioning_fails_with_no_vacant_cell() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut world = GridWorld::new(2, 1);
        let key = AgentId::random(&mut rng);
        world.place(key, Role::Key, Cell::new(0, 0)).unwrap();
        world
            .place(AgentId::random(&mut rng), Role::Wall, Cell::new(1, 0))
            .unwrap();

        assert!(matches!(
            reposition_key(&mut world, key, &mut rng, 50),
            Err(SimulationError::NoVacantCell(50))
        ));
        assert_eq!(world.position_of(key), Some(Cell::new(0, 0)));
    }

    #[test]
    fn when_tracking_runners_exited_ones_still_count_towards_the_total() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut world = GridWorld::new(3, 3);
        let mut roster = Roster::default();
        let ids: Vec<AgentId> = (0..3).map(|_| AgentId::random(&mut rng)).collect();
        for id in &ids {
            world.place(*id, Role::Runner, Cell::new(0, 0)).unwrap();
            roster.add(Group::Runners, Box::new(Idle(*id)));
        }

        world.remove(ids[0]).unwrap();
        roster.record_exit(ids[0]);
        world.remove(ids[1]).unwrap();
        roster.record_capture(ids[1]);
        roster.retain_placed(Group::Runners, &world);

        assert_eq!(roster.runner_ids(), vec![ids[2]]);
        assert_eq!(roster.active_runners(), 1);
        assert_eq!(roster.exited_count(), 1);
        assert_eq!(roster.total_runners(), 2);
        assert_eq!(roster.captured(), &[ids[1]]);
    }

    #[test]
    fn when_adding_several_collectors_all_of_them_are_tracked() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut roster = Roster::default();
        let ids: Vec<AgentId> = (0..3).map(|_| AgentId::random(&mut rng)).collect();

        for id in &ids {
            roster.add(Group::KeyCollectors, Box::new(Idle(*id)));
        }

        assert_eq!(roster.collector_ids(), ids);
        assert!(roster.enemy_ids().is_empty());
    }
}
