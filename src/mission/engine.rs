//! Mission engine: construction, command intake, and the fixed tick order
//!
//! Everything that touches randomness goes through the engine's single
//! `SimRng`, so a mission rebuilt from the same parameters and command log
//! replays bit for bit.

use tracing::{debug, info, warn};

use crate::core::config::EngineConfig;
use crate::core::error::{Result, SimError};
use crate::core::rng::SimRng;
use crate::core::types::{CellCoord, Millis, Vec2};
use crate::mission::ai::{update_interaction, SquadAi};
use crate::mission::channeling::update_channel;
use crate::mission::combat::{update_turrets, update_unit_combat};
use crate::mission::commands::{self, advance_queue, Command, CommandKind};
use crate::mission::constants::ARTIFACT_ITEM;
use crate::mission::director::{pre_spawn, update_director, Director};
use crate::mission::doors::{update_doors, DoorOccupant, DoorState};
use crate::mission::enemies::{remove_dead_enemies, update_enemies};
use crate::mission::graph::Graph;
use crate::mission::library::{self, EnemyKind};
use crate::mission::loot::update_mines;
use crate::mission::map::MapDefinition;
use crate::mission::movement::update_unit_movement;
use crate::mission::objectives::{check_win_loss, setup_mission, update_objectives, MissionType};
use crate::mission::state::{CommandLogEntry, EngineMode, GameState, MissionStatus};
use crate::mission::units::{spawn_squad, Enemy, SquadConfig, UnitState};
use crate::mission::visibility::update_visibility;

/// Everything needed to start (or replay) a mission
#[derive(Debug, Clone)]
pub struct EngineParams {
    pub map: MapDefinition,
    pub seed: u64,
    pub squad: SquadConfig,
    pub mission_type: MissionType,
    /// Threat percentage the director starts at
    pub starting_threat: f64,
    pub time_scale: f64,
    pub mode: EngineMode,
    pub initial_command_log: Vec<CommandLogEntry>,
    pub skip_deployment: bool,
    /// Give every soldier an opening `Explore` command
    pub ai_control: bool,
    /// Fast-forward to this mission time after construction
    pub target_tick: Option<Millis>,
    pub config: EngineConfig,
}

impl EngineParams {
    pub fn new(map: MapDefinition, seed: u64, squad: SquadConfig) -> Self {
        Self {
            map,
            seed,
            squad,
            mission_type: MissionType::Default,
            starting_threat: 0.0,
            time_scale: 1.0,
            mode: EngineMode::Simulation,
            initial_command_log: Vec::new(),
            skip_deployment: true,
            ai_control: false,
            target_tick: None,
            config: EngineConfig::default(),
        }
    }

    pub fn with_mission(mut self, mission_type: MissionType) -> Self {
        self.mission_type = mission_type;
        self
    }

    pub fn with_starting_threat(mut self, threat: f64) -> Self {
        self.starting_threat = threat;
        self
    }

    pub fn with_time_scale(mut self, time_scale: f64) -> Self {
        self.time_scale = time_scale;
        self
    }

    pub fn with_deployment(mut self) -> Self {
        self.skip_deployment = false;
        self
    }

    pub fn with_ai_control(mut self, enabled: bool) -> Self {
        self.ai_control = enabled;
        self
    }

    pub fn with_target_tick(mut self, tick: Millis) -> Self {
        self.target_tick = Some(tick);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Replay `log` instead of taking live commands
    pub fn replaying(mut self, log: Vec<CommandLogEntry>) -> Self {
        self.mode = EngineMode::Replay;
        self.initial_command_log = log;
        self
    }
}

pub struct Engine {
    state: GameState,
    graph: Graph,
    config: EngineConfig,
    rng: SimRng,
    ai: SquadAi,
    static_sent: bool,
    replay_cursor: usize,
}

impl Engine {
    pub fn new(params: EngineParams) -> Result<Self> {
        let EngineParams {
            map,
            seed,
            squad,
            mission_type,
            starting_threat,
            time_scale,
            mode,
            initial_command_log,
            skip_deployment,
            ai_control,
            target_tick,
            config,
        } = params;

        let graph = Graph::new(&map)?;
        let mut rng = SimRng::new(seed);
        let director = Director::new(starting_threat, &config);
        let squad_spawn = map.squad_spawn;
        let mut state = GameState::new(map, seed, mission_type, director);
        state.settings.mode = mode;
        state.settings.time_scale = time_scale.max(0.0);

        if let Some(unknown) = squad.inventory.keys().find(|id| library::item(id).is_none()) {
            return Err(SimError::UnknownItem(unknown.clone()));
        }
        state.squad_inventory = squad.inventory.clone();

        let spawn = match squad_spawn {
            Some(cell) => cell,
            None => {
                let cell = graph
                    .floor_cells()
                    .first()
                    .copied()
                    .ok_or_else(|| SimError::InvalidMap("map has no floor cells".into()))?;
                warn!(%cell, "Map has no squad spawn, using first floor cell");
                cell
            }
        };
        state.units = spawn_squad(&squad, spawn, false, &mut rng)?;

        setup_mission(&mut state, &graph, &config, &mut rng, spawn)?;
        pre_spawn(&mut state, &config, &mut rng);
        update_visibility(&mut state, &graph, &config);
        update_objectives(&mut state);

        if !skip_deployment {
            state.status = MissionStatus::Deployment;
        }

        if mode == EngineMode::Replay {
            state.command_log = initial_command_log;
        } else if !initial_command_log.is_empty() {
            warn!(
                entries = initial_command_log.len(),
                "Command log ignored outside replay mode"
            );
        }

        let mut engine = Self {
            state,
            graph,
            config,
            rng,
            ai: SquadAi::default(),
            static_sent: false,
            replay_cursor: 0,
        };

        if ai_control && engine.state.command_log.is_empty() {
            let ids: Vec<String> = engine
                .state
                .units
                .iter()
                .filter(|u| !u.is_vip())
                .map(|u| u.id.clone())
                .collect();
            if !ids.is_empty() {
                let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
                engine.apply_command(Command::new(&refs, CommandKind::Explore));
            }
        }

        engine.state.rng_state = engine.rng.state();
        info!(
            seed,
            mission = ?mission_type,
            units = engine.state.units.len(),
            enemies = engine.state.enemies.len(),
            "Mission ready"
        );

        if let Some(target) = target_tick {
            engine.catch_up(target);
        }
        Ok(engine)
    }

    /// Step at the replay rate until `target` mission time
    fn catch_up(&mut self, target: Millis) {
        let step = self.config.replay_step_ms;
        while self.state.t < target {
            let before = self.state.t;
            self.update(step);
            if self.state.t <= before {
                break;
            }
        }
        debug!(t = self.state.t, target, "Caught up");
    }

    /// Take a live command
    ///
    /// Unknown unit ids are dropped. Commands are logged at the current
    /// mission time so the run can be replayed.
    pub fn apply_command(&mut self, mut command: Command) {
        if self.state.settings.mode == EngineMode::Replay {
            warn!(kind = ?command.kind, "Live command ignored during replay");
            return;
        }

        let before = command.unit_ids.len();
        command
            .unit_ids
            .retain(|id| self.state.units.iter().any(|u| &u.id == id));
        if command.unit_ids.len() < before {
            debug!(dropped = before - command.unit_ids.len(), "Unknown unit ids dropped");
        }
        if command.unit_ids.is_empty() && command.kind != CommandKind::StartMission {
            warn!(kind = ?command.kind, "Command names no known units");
            return;
        }

        self.state.command_log.push(CommandLogEntry {
            tick: self.state.t,
            command: command.clone(),
        });
        self.dispatch(&command);
    }

    fn dispatch(&mut self, command: &Command) {
        let status = self.state.status;
        commands::apply_command(&mut self.state, &self.graph, &self.config, command);
        if self.state.status != status {
            info!(t = self.state.t, status = ?self.state.status, "Mission status changed");
        }
    }

    /// Apply every logged command that is due
    fn replay_due(&mut self) {
        while let Some(entry) = self.state.command_log.get(self.replay_cursor) {
            if entry.tick > self.state.t {
                break;
            }
            let command = entry.command.clone();
            self.replay_cursor += 1;
            self.dispatch(&command);
        }
    }

    /// Advance the mission by `dt` milliseconds of wall time
    pub fn update(&mut self, dt: Millis) {
        if self.state.settings.is_paused {
            return;
        }
        if self.state.settings.mode == EngineMode::Replay {
            self.replay_due();
        }
        if self.state.status != MissionStatus::Playing {
            return;
        }

        let dt = dt * self.state.settings.time_scale;
        self.state.t += dt;

        update_director(&mut self.state, &self.config, &mut self.rng, dt);
        self.update_doors(dt);
        update_visibility(&mut self.state, &self.graph, &self.config);
        update_objectives(&mut self.state);
        update_mines(&mut self.state);
        self.update_units(dt);
        update_enemies(&mut self.state, &self.graph, &self.config, &mut self.rng, dt);
        self.cleanup_dead();

        if check_win_loss(&mut self.state) {
            info!(t = self.state.t, status = ?self.state.status, "Mission status changed");
        }
        self.state.rng_state = self.rng.state();

        debug_assert!(
            self.state.units.iter().all(|u| u.pos.x.is_finite() && u.pos.y.is_finite()),
            "unit position is not finite"
        );
        debug_assert!(
            self.state
                .units
                .iter()
                .all(|u| u.hp > 0.0 || u.state.is_terminal()),
            "unit at zero hp is still active"
        );
    }

    fn update_doors(&mut self, dt: Millis) {
        let occupants: Vec<DoorOccupant> = self
            .state
            .units
            .iter()
            .filter(|u| u.is_active())
            .map(|u| DoorOccupant {
                cell: u.cell(),
                is_soldier: true,
            })
            .chain(
                self.state
                    .enemies
                    .iter()
                    .filter(|e| e.is_alive())
                    .map(|e| DoorOccupant {
                        cell: e.cell(),
                        is_soldier: false,
                    }),
            )
            .collect();
        update_doors(&mut self.state.doors, &occupants, dt);
    }

    fn update_units(&mut self, dt: Millis) {
        let count = self.state.units.len();
        let (state, graph, config) = (&mut self.state, &self.graph, &self.config);

        for idx in 0..count {
            advance_queue(state, graph, config, idx);
        }
        self.ai.update(state, graph, config);
        for idx in 0..count {
            update_unit_combat(state, graph, &mut self.rng, idx);
        }
        update_turrets(state, graph, &mut self.rng);
        for idx in 0..count {
            update_unit_movement(state, graph, idx, dt);
        }
        for idx in 0..count {
            update_interaction(state, graph, config, idx);
        }
        for idx in 0..count {
            update_channel(state, config, idx, dt);
        }
    }

    fn cleanup_dead(&mut self) {
        for idx in 0..self.state.units.len() {
            let unit = &mut self.state.units[idx];
            if unit.hp > 0.0 || unit.state.is_terminal() {
                continue;
            }
            unit.hp = 0.0;
            unit.state = UnitState::Dead;
            unit.halt();
            unit.command_queue.clear();
            let carried = unit.carried_objective_id.take();
            let pos = unit.pos;
            info!(unit = %unit.id, t = self.state.t, "Unit killed");
            self.state.stats.casualties += 1;

            if let Some(objective_id) = carried {
                self.state.units[idx].recalculate_stats();
                self.state.spawn_loot(ARTIFACT_ITEM, pos, Some(objective_id));
            }
        }
        remove_dead_enemies(&mut self.state);
    }

    /// Snapshot for the caller
    ///
    /// The first snapshot carries the static map cells; later ones omit
    /// them unless asked.
    pub fn get_state(&mut self, include_static: bool) -> GameState {
        if include_static || !self.static_sent {
            self.static_sent = true;
            self.state.clone()
        } else {
            self.state.without_static()
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_time_scale(&mut self, time_scale: f64) {
        self.state.settings.time_scale = time_scale.max(0.0);
    }

    pub fn toggle_pause(&mut self) {
        self.state.settings.is_paused = !self.state.settings.is_paused;
    }

    // === Debug mutation ===

    pub fn debug_set_unit_pos(&mut self, unit_id: &str, pos: Vec2) {
        if let Some(idx) = self.state.unit_index(unit_id) {
            self.state.units[idx].pos = pos;
        }
    }

    pub fn debug_set_unit_hp(&mut self, unit_id: &str, hp: f64) {
        if let Some(idx) = self.state.unit_index(unit_id) {
            self.state.units[idx].hp = hp;
        }
    }

    pub fn debug_spawn_enemy(&mut self, kind: EnemyKind, pos: Vec2) -> String {
        let id = self.state.next_id("debug-enemy");
        let enemy = Enemy::spawn(id.clone(), kind, pos, self.config.speed_normalization);
        self.state.enemies.push(enemy);
        id
    }

    pub fn debug_spawn_loot(&mut self, item_id: &str, pos: Vec2) -> Result<String> {
        if library::item(item_id).is_none() {
            return Err(SimError::UnknownItem(item_id.to_string()));
        }
        Ok(self.state.spawn_loot(item_id, pos, None))
    }

    pub fn debug_set_door_state(&mut self, door_id: &str, door_state: DoorState) {
        if let Some(door) = self
            .graph
            .door_index(door_id)
            .and_then(|i| self.state.doors.get_mut(i))
        {
            door.state = door_state;
            door.target_state = None;
        }
    }

    pub fn debug_discover_all(&mut self) {
        let cells: Vec<CellCoord> = self.graph.floor_cells();
        self.state.discovered_cells.extend(cells);
        update_objectives(&mut self.state);
    }
}
