//! Default movement heuristics for the mobile roles.
//!
//! The controller only relies on the [`Agent`] contract; these are one way of honouring it.

use crate::agents::{Agent, AgentFactory, TickContext};
use crate::config::BehaviorConfig;
use crate::entities::{AgentId, Cell, Direction, Role};
use crate::error::SimulationResult;
use crate::navigation::DistanceMap;
use crate::world::GridWorld;
use rand::seq::SliceRandom;
use rand::Rng;

/// Builds runners, enemies and key collectors with the default heuristics.
pub struct DefaultAgents {
    config: BehaviorConfig,
}

impl DefaultAgents {
    pub fn new(config: BehaviorConfig) -> DefaultAgents {
        DefaultAgents { config }
    }
}

impl AgentFactory for DefaultAgents {
    fn runner(&mut self, id: AgentId) -> Box<dyn Agent> {
        Box::new(RunnerAgent::new(id, self.config.runner_exploration))
    }

    fn enemy(&mut self, id: AgentId) -> Box<dyn Agent> {
        Box::new(EnemyAgent::new(
            id,
            self.config.enemy_hunt_radius,
            self.config.enemy_avoids_sanctuaries,
        ))
    }

    fn key_collector(&mut self, id: AgentId) -> Box<dyn Agent> {
        Box::new(KeyCollectorAgent::new(id))
    }
}

/// Heads for the key until it has stood on it, then for the exit, leaving a trail behind.
pub struct RunnerAgent {
    id: AgentId,
    exploration: f64,
    has_key: bool,
}

impl RunnerAgent {
    pub fn new(id: AgentId, exploration: f64) -> RunnerAgent {
        RunnerAgent {
            id,
            exploration,
            has_key: false,
        }
    }

    pub fn has_key(&self) -> bool {
        self.has_key
    }

    fn target(&self, ctx: &TickContext<'_>) -> Cell {
        match (self.has_key, ctx.key_position()) {
            (false, Some(key)) => key,
            _ => ctx.exit(),
        }
    }

    fn visit(&mut self, ctx: &mut TickContext<'_>, cell: Cell) {
        if !self.has_key && ctx.key_position() == Some(cell) {
            self.has_key = true;
            tracing::debug!(runner = %self.id, %cell, "runner reached the key");
        }

        if self.has_key && cell == ctx.exit() {
            ctx.report_exit(self.id);
        }
    }

    fn choose_step(
        &self,
        ctx: &mut TickContext<'_>,
        distances: &DistanceMap,
        from: Cell,
    ) -> Option<Cell> {
        let neighbors = ctx.world.open_neighbors(from);
        if neighbors.is_empty() {
            return None;
        }

        if ctx.rng.gen_bool(self.exploration) {
            return neighbors.choose(ctx.rng).copied();
        }

        // Follow the shortest path, letting the trail decide between equally short steps
        let mut candidates = distances.downhill(ctx.world, from);
        if candidates.is_empty() {
            candidates = neighbors;
        }
        candidates.shuffle(ctx.rng);

        ctx.pheromones.strongest(&candidates)
    }
}

impl Agent for RunnerAgent {
    fn id(&self) -> AgentId {
        self.id
    }

    fn tick(&mut self, ctx: &mut TickContext<'_>) -> SimulationResult<()> {
        let position = ctx.position_of(self.id)?;

        if self.has_key && position == ctx.exit() {
            ctx.report_exit(self.id);
            return Ok(());
        }

        let target = self.target(ctx);
        let distances = DistanceMap::from_target(ctx.world, target);
        let Some(next) = self.choose_step(ctx, &distances, position) else {
            return Ok(());
        };

        ctx.move_agent(self.id, next)?;

        let distance = distances
            .distance(next)
            .unwrap_or_else(|| next.manhattan(target));
        ctx.release(next, 1.0 / (1.0 + distance as f64))?;

        self.visit(ctx, next);

        Ok(())
    }
}

/// Wanders the maze and chases runners that come close, capturing them on contact.
pub struct EnemyAgent {
    id: AgentId,
    hunt_radius: usize,
    avoids_sanctuaries: bool,
}

impl EnemyAgent {
    pub fn new(id: AgentId, hunt_radius: usize, avoids_sanctuaries: bool) -> EnemyAgent {
        EnemyAgent {
            id,
            hunt_radius,
            avoids_sanctuaries,
        }
    }

    fn allowed(&self, world: &GridWorld, cell: Cell) -> bool {
        !self.avoids_sanctuaries || !is_sanctuary(world, cell)
    }

    fn choose_step(&self, ctx: &mut TickContext<'_>, from: Cell) -> Option<Cell> {
        let prey = ctx
            .world
            .agents_with_role(Role::Runner)
            .into_iter()
            .map(|(_, cell)| cell)
            .filter(|cell| cell.manhattan(from) <= self.hunt_radius)
            .min_by_key(|cell| cell.manhattan(from));

        if let Some(prey) = prey {
            if prey == from {
                return None;
            }

            let distances = DistanceMap::from_target(ctx.world, prey);
            let steps: Vec<Cell> = distances
                .downhill(ctx.world, from)
                .into_iter()
                .filter(|cell| self.allowed(ctx.world, *cell))
                .collect();

            if let Some(step) = steps.choose(ctx.rng) {
                return Some(*step);
            }
        }

        // Patrol: try one random direction and stay put if it is blocked
        let direction: Direction = ctx.rng.gen();
        from.step(direction)
            .filter(|cell| ctx.world.is_open(*cell) && self.allowed(ctx.world, *cell))
    }
}

impl Agent for EnemyAgent {
    fn id(&self) -> AgentId {
        self.id
    }

    fn tick(&mut self, ctx: &mut TickContext<'_>) -> SimulationResult<()> {
        let position = ctx.position_of(self.id)?;

        if let Some(next) = self.choose_step(ctx, position) {
            ctx.move_agent(self.id, next)?;
        }

        let here = ctx.position_of(self.id)?;
        let prey: Vec<AgentId> = ctx
            .world
            .agents_at(here)
            .iter()
            .copied()
            .filter(|agent| ctx.world.role_of(*agent) == Some(Role::Runner))
            .collect();

        for runner in prey {
            ctx.capture(runner);
        }

        Ok(())
    }
}

/// Chases the key and sends it somewhere else on contact.
pub struct KeyCollectorAgent {
    id: AgentId,
}

impl KeyCollectorAgent {
    pub fn new(id: AgentId) -> KeyCollectorAgent {
        KeyCollectorAgent { id }
    }
}

impl Agent for KeyCollectorAgent {
    fn id(&self) -> AgentId {
        self.id
    }

    fn tick(&mut self, ctx: &mut TickContext<'_>) -> SimulationResult<()> {
        let position = ctx.position_of(self.id)?;
        let Some(key) = ctx.key_position() else {
            return Ok(());
        };

        if position != key {
            let distances = DistanceMap::from_target(ctx.world, key);
            let steps = distances.downhill(ctx.world, position);
            let step = match steps.choose(ctx.rng) {
                Some(step) => Some(*step),
                None => ctx.world.open_neighbors(position).choose(ctx.rng).copied(),
            };

            if let Some(step) = step {
                ctx.move_agent(self.id, step)?;
            }
        }

        if ctx.position_of(self.id)? == key {
            ctx.reposition_key()?;
        }

        Ok(())
    }
}

/// Start and exit cells, where enemies may be told not to go.
fn is_sanctuary(world: &GridWorld, cell: Cell) -> bool {
    world.has_role_at(cell, Role::Start) || world.has_role_at(cell, Role::Exit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::Request;
    use crate::maze::MazeDescriptor;
    use crate::pheromones::PheromoneField;
    use crate::replay::create_replay_logger;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Fixture {
        maze: MazeDescriptor,
        world: GridWorld,
        pheromones: PheromoneField,
        rng: StdRng,
        key: AgentId,
    }

    impl Fixture {
        fn new(maze: MazeDescriptor) -> Fixture {
            let mut rng = StdRng::seed_from_u64(21);
            let mut world = GridWorld::new(maze.width, maze.height);
            for wall in &maze.walls {
                world
                    .place(AgentId::random(&mut rng), Role::Wall, *wall)
                    .unwrap();
            }
            world
                .place(AgentId::random(&mut rng), Role::Start, maze.start)
                .unwrap();
            world
                .place(AgentId::random(&mut rng), Role::Exit, maze.exit)
                .unwrap();
            let key = AgentId::random(&mut rng);
            world.place(key, Role::Key, maze.key).unwrap();

            Fixture {
                maze,
                world,
                pheromones: PheromoneField::default(),
                rng,
                key,
            }
        }

        fn spawn(&mut self, role: Role, cell: Cell) -> AgentId {
            let id = AgentId::random(&mut self.rng);
            self.world.place(id, role, cell).unwrap();
            id
        }

        fn tick(&mut self, agent: &mut dyn Agent) -> SimulationResult<Vec<Request>> {
            let mut replay = create_replay_logger(None, 1);
            let mut ctx = TickContext::new(
                &mut self.world,
                &mut self.pheromones,
                &mut self.rng,
                &self.maze,
                replay.as_mut(),
                self.key,
                1,
                1000,
            );
            agent.tick(&mut ctx)?;
            Ok(ctx.into_requests())
        }
    }

    fn corridor() -> MazeDescriptor {
        // S.K.X
        MazeDescriptor::open(5, 1, Cell::new(0, 0), Cell::new(4, 0), Cell::new(2, 0))
    }

    #[test]
    fn when_a_runner_ticks_it_moves_towards_the_key_and_leaves_a_trail() {
        let mut fixture = Fixture::new(corridor());
        let id = fixture.spawn(Role::Runner, Cell::new(0, 0));
        let mut runner = RunnerAgent::new(id, 0.0);

        let requests = fixture.tick(&mut runner).unwrap();

        assert!(requests.is_empty());
        assert_eq!(fixture.world.position_of(id), Some(Cell::new(1, 0)));
        assert_eq!(fixture.pheromones.intensity_at(Cell::new(1, 0)), 0.5);
        assert!(!runner.has_key());
    }

    #[test]
    fn when_a_runner_visits_the_key_and_then_the_exit_it_reports_its_exit_once() {
        let mut fixture = Fixture::new(corridor());
        let id = fixture.spawn(Role::Runner, Cell::new(0, 0));
        let mut runner = RunnerAgent::new(id, 0.0);

        let mut requests = Vec::new();
        for _ in 0..4 {
            requests.extend(fixture.tick(&mut runner).unwrap());
        }

        assert!(runner.has_key());
        assert_eq!(fixture.world.position_of(id), Some(Cell::new(4, 0)));
        assert_eq!(requests, vec![Request::Exit(id)]);
        // Reaching the key cell is the strongest release
        assert_eq!(fixture.pheromones.intensity_at(Cell::new(2, 0)), 1.0);
    }

    #[test]
    fn when_a_runner_reaches_the_exit_without_the_key_it_does_not_exit() {
        let maze = MazeDescriptor::open(3, 1, Cell::new(0, 0), Cell::new(1, 0), Cell::new(2, 0));
        let mut fixture = Fixture::new(maze);
        let id = fixture.spawn(Role::Runner, Cell::new(0, 0));
        let mut runner = RunnerAgent::new(id, 0.0);

        let requests = fixture.tick(&mut runner).unwrap();

        assert_eq!(fixture.world.position_of(id), Some(Cell::new(1, 0)));
        assert!(requests.is_empty());
    }

    #[test]
    fn when_a_runner_is_boxed_in_by_walls_it_stays_put() {
        let mut maze = MazeDescriptor::open(3, 1, Cell::new(0, 0), Cell::new(2, 0), Cell::new(2, 0));
        maze.walls.insert(Cell::new(1, 0));
        let mut fixture = Fixture::new(maze);
        let id = fixture.spawn(Role::Runner, Cell::new(0, 0));
        let mut runner = RunnerAgent::new(id, 0.0);

        fixture.tick(&mut runner).unwrap();

        assert_eq!(fixture.world.position_of(id), Some(Cell::new(0, 0)));
        assert!(fixture.pheromones.is_empty());
    }

    #[test]
    fn when_a_runner_is_in_range_the_enemy_hunts_and_captures_it() {
        let maze = MazeDescriptor::open(5, 5, Cell::new(0, 0), Cell::new(4, 4), Cell::new(4, 0));
        let mut fixture = Fixture::new(maze);
        let enemy_id = fixture.spawn(Role::Enemy, Cell::new(2, 2));
        let runner = fixture.spawn(Role::Runner, Cell::new(2, 4));
        let mut enemy = EnemyAgent::new(enemy_id, 3, true);

        let first = fixture.tick(&mut enemy).unwrap();
        let second = fixture.tick(&mut enemy).unwrap();

        assert!(first.is_empty());
        assert_eq!(fixture.world.position_of(enemy_id), Some(Cell::new(2, 4)));
        assert_eq!(second, vec![Request::Capture(runner)]);
    }

    #[test]
    fn when_a_runner_shares_the_enemy_cell_it_is_captured_without_moving() {
        let maze = MazeDescriptor::open(3, 3, Cell::new(0, 0), Cell::new(2, 2), Cell::new(2, 0));
        let mut fixture = Fixture::new(maze);
        let enemy_id = fixture.spawn(Role::Enemy, Cell::new(1, 1));
        let first = fixture.spawn(Role::Runner, Cell::new(1, 1));
        let second = fixture.spawn(Role::Runner, Cell::new(1, 1));
        let mut enemy = EnemyAgent::new(enemy_id, 3, true);

        let requests = fixture.tick(&mut enemy).unwrap();

        assert_eq!(fixture.world.position_of(enemy_id), Some(Cell::new(1, 1)));
        assert_eq!(
            requests,
            vec![Request::Capture(first), Request::Capture(second)]
        );
    }

    #[test]
    fn when_enemies_avoid_sanctuaries_they_never_enter_the_start_cell() {
        // S E X
        let maze = MazeDescriptor::open(3, 1, Cell::new(0, 0), Cell::new(2, 0), Cell::new(2, 0));
        let mut fixture = Fixture::new(maze);
        let enemy_id = fixture.spawn(Role::Enemy, Cell::new(1, 0));
        fixture.spawn(Role::Runner, Cell::new(0, 0));
        let mut enemy = EnemyAgent::new(enemy_id, 5, true);

        for _ in 0..50 {
            let requests = fixture.tick(&mut enemy).unwrap();
            assert!(requests.is_empty());
            assert_eq!(fixture.world.position_of(enemy_id), Some(Cell::new(1, 0)));
        }
    }

    #[test]
    fn when_a_collector_reaches_the_key_the_key_is_repositioned() {
        let maze = MazeDescriptor::open(4, 4, Cell::new(0, 0), Cell::new(3, 3), Cell::new(1, 0));
        let mut fixture = Fixture::new(maze);
        let id = fixture.spawn(Role::KeyCollector, Cell::new(0, 0));
        let mut collector = KeyCollectorAgent::new(id);

        fixture.tick(&mut collector).unwrap();

        let key = fixture.world.position_of(fixture.key).unwrap();
        assert_eq!(fixture.world.position_of(id), Some(Cell::new(1, 0)));
        assert_ne!(key, Cell::new(1, 0));
        assert_eq!(fixture.world.agents_at(key), &[fixture.key]);
    }

    #[test]
    fn when_the_default_factory_builds_agents_they_keep_their_ids() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut factory = DefaultAgents::new(BehaviorConfig::default());
        let id = AgentId::random(&mut rng);

        assert_eq!(factory.runner(id).id(), id);
        assert_eq!(factory.enemy(id).id(), id);
        assert_eq!(factory.key_collector(id).id(), id);
    }
}
