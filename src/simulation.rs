use crate::agents::{Agent, AgentFactory, Group, Request, Roster, TickContext};
use crate::behaviors::DefaultAgents;
use crate::config::SimulationConfig;
use crate::entities::{AgentId, Cell, Role};
use crate::error::{SimulationError, SimulationResult};
use crate::maze::MazeDescriptor;
use crate::pheromones::PheromoneField;
use crate::replay::{create_replay_logger, ReplayLogger};
use crate::world::GridWorld;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;

/// Why a level was lost.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FailureReason {
    /// Half or more of the configured runners were captured.
    RunnersLost,
    /// The key could not be repositioned because the grid had no vacant cell.
    NoVacantCell,
    /// The level was still running when the configured tick limit was reached.
    TurnLimitReached,
    /// An agent broke the grid rules and the tick was abandoned with an error.
    Aborted,
}

/// The state of a single level after a tick.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LevelStatus {
    Running,
    Cleared,
    Failed(FailureReason),
}

/// The state of the whole run after a step.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SimulationState {
    Running,
    /// A level was just cleared and the next one is ready to run.
    LevelCleared,
    LevelFailed(FailureReason),
    AllLevelsComplete,
}

impl SimulationState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SimulationState::LevelFailed(_) | SimulationState::AllLevelsComplete
        )
    }
}

impl fmt::Display for SimulationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationState::Running => write!(f, "Running"),
            SimulationState::LevelCleared => write!(f, "LevelCleared"),
            SimulationState::LevelFailed(reason) => write!(f, "LevelFailed({:?})", reason),
            SimulationState::AllLevelsComplete => write!(f, "AllLevelsComplete"),
        }
    }
}

/// Summary of a finished run.
#[derive(Clone, Debug, PartialEq)]
pub struct Outcome {
    pub state: SimulationState,
    pub levels_cleared: usize,
    pub ticks: usize,
}

/// One maze instance: its grid, trails, agents and termination state.
pub struct Level {
    index: usize,
    maze: MazeDescriptor,
    world: GridWorld,
    pheromones: PheromoneField,
    roster: Roster,
    key: AgentId,
    configured_runners: usize,
    reposition_attempts: usize,
    max_ticks: Option<usize>,
    tick: usize,
    running: bool,
    status: LevelStatus,
    rng: StdRng,
    replay: Box<dyn ReplayLogger>,
}

impl Level {
    /// Builds the grid from a maze and places every role on it.
    ///
    /// # Arguments
    /// * `index` - The position of the level in the run, starting at 0.
    /// * `maze` - The maze to build the grid from.
    /// * `config` - Runner and collector counts, tick limit, evaporation and key reposition attempts.
    /// * `factory` - Builds the agent for each enemy, runner and key collector.
    /// * `rng` - The random number generator of this level.
    /// * `replay` - Where spawns, moves and the outcome of the level are recorded.
    pub fn new(
        index: usize,
        maze: MazeDescriptor,
        config: &SimulationConfig,
        factory: &mut dyn AgentFactory,
        mut rng: StdRng,
        mut replay: Box<dyn ReplayLogger>,
    ) -> SimulationResult<Level> {
        let mut world = GridWorld::new(maze.width, maze.height);
        let mut roster = Roster::default();
        replay.log_level_start(index, maze.width, maze.height);

        let mut spawn = |world: &mut GridWorld, role: Role, cell: Cell| -> SimulationResult<AgentId> {
            let id = AgentId::random(&mut rng);
            world.place(id, role, cell)?;
            if role != Role::Wall {
                replay.log_spawn(0, id, role, cell);
            }
            Ok(id)
        };

        // Walls go first so that nothing mobile can be placed on one
        for wall in &maze.walls {
            spawn(&mut world, Role::Wall, *wall)?;
        }

        for food in &maze.food {
            spawn(&mut world, Role::Food, *food)?;
        }

        spawn(&mut world, Role::Start, maze.start)?;
        spawn(&mut world, Role::Exit, maze.exit)?;

        for enemy in &maze.enemies {
            let id = spawn(&mut world, Role::Enemy, *enemy)?;
            roster.add(Group::Enemies, factory.enemy(id));
        }

        for _ in 0..config.runners {
            let id = spawn(&mut world, Role::Runner, maze.start)?;
            roster.add(Group::Runners, factory.runner(id));
        }

        let key = spawn(&mut world, Role::Key, maze.key)?;

        for _ in 0..config.collectors {
            let id = spawn(&mut world, Role::KeyCollector, maze.start)?;
            roster.add(Group::KeyCollectors, factory.key_collector(id));
        }

        tracing::info!(
            level = index,
            width = maze.width,
            height = maze.height,
            runners = config.runners,
            enemies = maze.enemies.len(),
            food = maze.food.len(),
            "level started"
        );

        Ok(Level {
            index,
            pheromones: PheromoneField::new(config.evaporation),
            maze,
            world,
            roster,
            key,
            configured_runners: config.runners,
            reposition_attempts: config.reposition_attempts,
            max_ticks: config.max_ticks,
            tick: 0,
            running: true,
            status: LevelStatus::Running,
            rng,
            replay,
        })
    }

    /// Runs one tick: enemies, then runners, then key collectors, then the termination rules.
    ///
    /// A finished level is never ticked again; its terminal status is returned as is.
    pub fn step(&mut self) -> SimulationResult<LevelStatus> {
        if !self.running {
            return Ok(self.status);
        }

        self.tick += 1;

        let mut failure = None;
        for group in Group::ORDER {
            match self.step_group(group) {
                Ok(()) => {}
                Err(SimulationError::NoVacantCell(attempts)) => {
                    tracing::warn!(
                        level = self.index,
                        tick = self.tick,
                        attempts,
                        "no vacant cell left for the key"
                    );
                    failure = Some(FailureReason::NoVacantCell);
                    break;
                }
                Err(error) => {
                    tracing::error!(
                        level = self.index,
                        tick = self.tick,
                        %error,
                        "tick aborted"
                    );
                    self.finish(LevelStatus::Failed(FailureReason::Aborted));
                    return Err(error);
                }
            }
        }

        for group in Group::ORDER {
            self.roster.retain_placed(group, &self.world);
        }
        self.pheromones.evaporate();

        let total_runners = self.roster.total_runners();
        let exited = self.roster.exited_count();
        self.replay.log_tick(self.tick, total_runners, exited);

        // Losing is checked before winning
        let status = if let Some(reason) = failure {
            LevelStatus::Failed(reason)
        } else if total_runners * 2 <= self.configured_runners {
            LevelStatus::Failed(FailureReason::RunnersLost)
        } else if exited == total_runners {
            LevelStatus::Cleared
        } else if self.max_ticks.is_some_and(|max| self.tick >= max) {
            LevelStatus::Failed(FailureReason::TurnLimitReached)
        } else {
            LevelStatus::Running
        };

        if status == LevelStatus::Running {
            tracing::debug!(
                level = self.index,
                tick = self.tick,
                runners = total_runners,
                exited,
                "tick complete"
            );
            return Ok(status);
        }

        Ok(self.finish(status))
    }

    /// Ticks until the level reaches a terminal status.
    pub fn run(&mut self) -> SimulationResult<LevelStatus> {
        loop {
            let status = self.step()?;
            if status != LevelStatus::Running {
                return Ok(status);
            }
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn tick(&self) -> usize {
        self.tick
    }

    pub fn status(&self) -> LevelStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn exited_count(&self) -> usize {
        self.roster.exited_count()
    }

    pub fn total_runners(&self) -> usize {
        self.roster.total_runners()
    }

    pub fn configured_runners(&self) -> usize {
        self.configured_runners
    }

    pub fn maze(&self) -> &MazeDescriptor {
        &self.maze
    }

    pub fn world(&self) -> &GridWorld {
        &self.world
    }

    pub fn pheromones(&self) -> &PheromoneField {
        &self.pheromones
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn key(&self) -> AgentId {
        self.key
    }

    fn step_group(&mut self, group: Group) -> SimulationResult<()> {
        // Take the group out so each agent can borrow the rest of the level while it ticks
        let mut agents = std::mem::take(self.roster.group_mut(group));
        let result = self.tick_agents(&mut agents);
        *self.roster.group_mut(group) = agents;
        result
    }

    fn tick_agents(&mut self, agents: &mut [Box<dyn Agent>]) -> SimulationResult<()> {
        for agent in agents.iter_mut() {
            // Captured or exited earlier in this tick
            if self.world.position_of(agent.id()).is_none() {
                continue;
            }

            let mut ctx = TickContext::new(
                &mut self.world,
                &mut self.pheromones,
                &mut self.rng,
                &self.maze,
                self.replay.as_mut(),
                self.key,
                self.tick,
                self.reposition_attempts,
            );
            agent.tick(&mut ctx)?;

            for request in ctx.into_requests() {
                self.apply(request)?;
            }
        }

        Ok(())
    }

    fn apply(&mut self, request: Request) -> SimulationResult<()> {
        match request {
            Request::Capture(runner) => {
                if self.world.role_of(runner) != Some(Role::Runner) {
                    tracing::debug!(runner = %runner, "ignoring capture of a runner no longer in play");
                    return Ok(());
                }

                let cell = self.world.remove(runner)?;
                self.roster.record_capture(runner);
                tracing::info!(
                    level = self.index,
                    tick = self.tick,
                    runner = %runner,
                    %cell,
                    "runner captured"
                );
                self.replay.log_capture(self.tick, runner, cell);
            }
            Request::Exit(runner) => {
                if self.world.role_of(runner) != Some(Role::Runner) {
                    tracing::debug!(runner = %runner, "ignoring exit of a runner no longer in play");
                    return Ok(());
                }

                let cell = self
                    .world
                    .position_of(runner)
                    .ok_or(SimulationError::UnknownAgent(runner))?;
                if cell != self.maze.exit {
                    return Err(SimulationError::InvalidExit {
                        agent: runner,
                        cell,
                    });
                }

                self.world.remove(runner)?;
                self.roster.record_exit(runner);
                tracing::info!(
                    level = self.index,
                    tick = self.tick,
                    runner = %runner,
                    exited = self.roster.exited_count(),
                    "runner left the maze"
                );
                self.replay.log_exit(self.tick, runner, cell);
            }
        }

        Ok(())
    }

    fn finish(&mut self, status: LevelStatus) -> LevelStatus {
        self.running = false;
        self.status = status;

        match status {
            LevelStatus::Cleared => tracing::info!(
                level = self.index,
                tick = self.tick,
                exited = self.roster.exited_count(),
                "all runners left the maze"
            ),
            LevelStatus::Failed(reason) => tracing::info!(
                level = self.index,
                tick = self.tick,
                runners = self.roster.total_runners(),
                ?reason,
                "level failed"
            ),
            LevelStatus::Running => {}
        }

        self.replay.log_level_end(format!("{:?}", status));
        status
    }

    fn take_replay(&mut self) -> Box<dyn ReplayLogger> {
        std::mem::replace(&mut self.replay, create_replay_logger(None, 0))
    }
}

/// Plays the configured levels in order, one after the other.
pub struct Simulation {
    config: SimulationConfig,
    levels: Vec<MazeDescriptor>,
    current: Level,
    state: SimulationState,
    rng: StdRng,
    factory: Box<dyn AgentFactory>,
    levels_cleared: usize,
    ticks: usize,
}

impl Simulation {
    /// Reads every level file up front so a malformed maze fails before anything runs.
    pub fn from_config(config: SimulationConfig) -> SimulationResult<Simulation> {
        config.validate()?;

        let levels = config
            .levels
            .iter()
            .map(MazeDescriptor::from_file)
            .collect::<SimulationResult<Vec<_>>>()?;

        Simulation::new(levels, config)
    }

    /// Creates a simulation over the given mazes using the default behaviours.
    pub fn new(
        levels: Vec<MazeDescriptor>,
        config: SimulationConfig,
    ) -> SimulationResult<Simulation> {
        let factory = Box::new(DefaultAgents::new(config.behavior.clone()));
        Simulation::with_factory(levels, config, factory)
    }

    /// Creates a simulation whose agents are built by `factory`.
    pub fn with_factory(
        levels: Vec<MazeDescriptor>,
        config: SimulationConfig,
        mut factory: Box<dyn AgentFactory>,
    ) -> SimulationResult<Simulation> {
        config.validate()?;

        let first = levels.first().cloned().ok_or_else(|| {
            SimulationError::Config("at least one level is required".to_string())
        })?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let replay = create_replay_logger(config.replay_file.clone(), config.runners);
        let level_rng = StdRng::seed_from_u64(rng.gen());
        let current = Level::new(0, first, &config, factory.as_mut(), level_rng, replay)?;

        Ok(Simulation {
            config,
            levels,
            current,
            state: SimulationState::Running,
            rng,
            factory,
            levels_cleared: 0,
            ticks: 0,
        })
    }

    /// Ticks the current level once, moving on to the next level when it is cleared.
    pub fn step(&mut self) -> SimulationResult<SimulationState> {
        if self.state.is_terminal() {
            return Ok(self.state);
        }

        let result = self.current.step();
        self.ticks += 1;
        let status = result.map_err(|error| self.abort(error))?;
        self.state = self.advance(status)?;

        Ok(self.state)
    }

    /// Plays level after level until one fails or all are complete.
    ///
    /// An error aborts the run for good: the state becomes `LevelFailed(Aborted)`.
    pub fn run(&mut self) -> SimulationResult<Outcome> {
        while !self.state.is_terminal() {
            let before = self.current.tick();
            let result = self.current.run();
            self.ticks += self.current.tick() - before;
            let status = result.map_err(|error| self.abort(error))?;
            self.state = self.advance(status)?;
        }

        Ok(self.outcome())
    }

    pub fn outcome(&self) -> Outcome {
        Outcome {
            state: self.state,
            levels_cleared: self.levels_cleared,
            ticks: self.ticks,
        }
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        !self.state.is_terminal()
    }

    pub fn level(&self) -> &Level {
        &self.current
    }

    pub fn level_index(&self) -> usize {
        self.current.index()
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    fn advance(&mut self, status: LevelStatus) -> SimulationResult<SimulationState> {
        let state = match status {
            LevelStatus::Running => return Ok(SimulationState::Running),
            LevelStatus::Failed(reason) => SimulationState::LevelFailed(reason),
            LevelStatus::Cleared => {
                self.levels_cleared += 1;
                let next = self.current.index() + 1;

                match self.levels.get(next).cloned() {
                    Some(maze) => {
                        tracing::info!(level = next, "advancing to the next level");
                        self.start_level(next, maze)?;
                        return Ok(SimulationState::LevelCleared);
                    }
                    None => {
                        tracing::info!(levels = self.levels.len(), "all mazes completed");
                        SimulationState::AllLevelsComplete
                    }
                }
            }
        };

        self.current.replay.save()?;
        Ok(state)
    }

    fn abort(&mut self, error: SimulationError) -> SimulationError {
        self.state = SimulationState::LevelFailed(FailureReason::Aborted);

        // The tick error is what the caller needs to see
        if let Err(save_error) = self.current.replay.save() {
            tracing::warn!(%save_error, "could not save the replay of an aborted run");
        }

        error
    }

    fn start_level(&mut self, index: usize, maze: MazeDescriptor) -> SimulationResult<()> {
        let replay = self.current.take_replay();
        let rng = StdRng::seed_from_u64(self.rng.gen());
        self.current = Level::new(index, maze, &self.config, self.factory.as_mut(), rng, replay)?;
        Ok(())
    }
}
