use crate::entities::{AgentId, Cell, Role};
use crate::error::SimulationResult;
use serde_json::json;
use std::{collections::HashMap, fs::File, io::BufWriter, path::PathBuf};

pub fn create_replay_logger(filename: Option<PathBuf>, runners: usize) -> Box<dyn ReplayLogger> {
    match filename {
        None => Box::new(NoOpReplayLogger {}),
        Some(filename) => Box::new(JsonReplayLogger::new(filename, runners)),
    }
}

/// Records what happened during a simulation so it can be replayed later.
///
/// Every method defaults to doing nothing.
pub trait ReplayLogger: Send + Sync {
    #[allow(unused_variables)]
    fn log_level_start(&mut self, level: usize, width: usize, height: usize) {}

    #[allow(unused_variables)]
    fn log_tick(&mut self, tick: usize, runners: usize, exited: usize) {}

    #[allow(unused_variables)]
    fn log_level_end(&mut self, outcome: String) {}

    #[allow(unused_variables)]
    fn log_event(&mut self, tick: usize, event: Event) {}

    fn save(&self) -> SimulationResult<()> {
        Ok(())
    }

    fn log_spawn(&mut self, tick: usize, id: AgentId, role: Role, location: Cell) {
        self.log_event(
            tick,
            Event {
                event_type: EventType::Spawn,
                entity: role.name().to_string(),
                entity_id: Some(id),
                location: Some(location),
                destination: None,
                strength: None,
            },
        );
    }

    fn log_move(&mut self, tick: usize, id: AgentId, role: Role, location: Cell, destination: Cell) {
        self.log_event(
            tick,
            Event {
                event_type: EventType::Move,
                entity: role.name().to_string(),
                entity_id: Some(id),
                location: Some(location),
                destination: Some(destination),
                strength: None,
            },
        );
    }

    fn log_release(&mut self, tick: usize, location: Cell, strength: f64) {
        self.log_event(
            tick,
            Event {
                event_type: EventType::Release,
                entity: "Pheromone".to_string(),
                entity_id: None,
                location: Some(location),
                destination: None,
                strength: Some(strength),
            },
        );
    }

    fn log_capture(&mut self, tick: usize, id: AgentId, location: Cell) {
        self.log_removal(tick, EventType::Capture, id, location);
    }

    fn log_exit(&mut self, tick: usize, id: AgentId, location: Cell) {
        self.log_removal(tick, EventType::Exit, id, location);
    }

    fn log_key_reposition(&mut self, tick: usize, id: AgentId, location: Cell, destination: Cell) {
        self.log_event(
            tick,
            Event {
                event_type: EventType::KeyReposition,
                entity: Role::Key.name().to_string(),
                entity_id: Some(id),
                location: Some(location),
                destination: Some(destination),
                strength: None,
            },
        );
    }

    fn log_removal(&mut self, tick: usize, event_type: EventType, id: AgentId, location: Cell) {
        self.log_event(
            tick,
            Event {
                event_type,
                entity: Role::Runner.name().to_string(),
                entity_id: Some(id),
                location: Some(location),
                destination: None,
                strength: None,
            },
        );
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub enum EventType {
    Spawn,
    Move,
    Release,
    Capture,
    Exit,
    KeyReposition,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct Event {
    event_type: EventType,
    entity: String,
    entity_id: Option<AgentId>,
    location: Option<Cell>,
    destination: Option<Cell>,
    strength: Option<f64>,
}

struct Tick {
    tick: usize,
    runners: usize,
    exited: usize,
}

struct LevelRecord {
    level: usize,
    width: usize,
    height: usize,
    ticks: Vec<Tick>,
    events: HashMap<usize, Vec<Event>>,
    outcome: Option<String>,
}

struct NoOpReplayLogger;
impl ReplayLogger for NoOpReplayLogger {}

struct JsonReplayLogger {
    filename: PathBuf,
    runners: usize,
    levels: Vec<LevelRecord>,
}

impl JsonReplayLogger {
    pub fn new(filename: PathBuf, runners: usize) -> JsonReplayLogger {
        JsonReplayLogger {
            filename,
            runners,
            levels: Vec::new(),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        let levels: Vec<_> = self
            .levels
            .iter()
            .map(|level| {
                let ticks: Vec<_> = level
                    .ticks
                    .iter()
                    .map(|tick| {
                        json!({
                            "tick": tick.tick,
                            "runners": tick.runners,
                            "exited": tick.exited,
                            "events": level.events.get(&tick.tick).unwrap_or(&Vec::new()),
                        })
                    })
                    .collect();

                json!({
                    "level": level.level,
                    "maze": {
                        "width": level.width,
                        "height": level.height,
                    },
                    // Spawns happen before the first tick
                    "spawns": level.events.get(&0).unwrap_or(&Vec::new()),
                    "ticks": ticks,
                    "outcome": level.outcome,
                })
            })
            .collect();

        json!({
            "runners": self.runners,
            "levels": levels,
        })
    }
}

impl ReplayLogger for JsonReplayLogger {
    fn log_level_start(&mut self, level: usize, width: usize, height: usize) {
        self.levels.push(LevelRecord {
            level,
            width,
            height,
            ticks: Vec::new(),
            events: HashMap::new(),
            outcome: None,
        });
    }

    fn log_tick(&mut self, tick: usize, runners: usize, exited: usize) {
        if let Some(level) = self.levels.last_mut() {
            level.ticks.push(Tick {
                tick,
                runners,
                exited,
            });
        }
    }

    fn log_level_end(&mut self, outcome: String) {
        if let Some(level) = self.levels.last_mut() {
            level.outcome = Some(outcome);
        }
    }

    fn log_event(&mut self, tick: usize, event: Event) {
        if let Some(level) = self.levels.last_mut() {
            level.events.entry(tick).or_default().push(event);
        }
    }

    fn save(&self) -> SimulationResult<()> {
        let file = File::create(&self.filename)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.to_json())?;
        Ok(())
    }
}
