//! Serializable mission state
//!
//! Everything a tick reads or writes lives here, so a snapshot of this
//! struct plus the command log is enough to reproduce a mission.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::core::rng::RngState;
use crate::core::types::{CellCoord, Millis, Vec2};
use crate::mission::commands::Command;
use crate::mission::director::Director;
use crate::mission::doors::Door;
use crate::mission::loot::{LootItem, Mine, Turret};
use crate::mission::map::MapDefinition;
use crate::mission::objectives::{MissionType, Objective};
use crate::mission::units::{Enemy, Unit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissionStatus {
    Deployment,
    Playing,
    Won,
    Lost,
}

impl MissionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, MissionStatus::Won | MissionStatus::Lost)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineMode {
    #[default]
    Simulation,
    Replay,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissionStats {
    pub threat_level: f64,
    pub aliens_killed: u32,
    pub casualties: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub mode: EngineMode,
    pub time_scale: f64,
    pub is_paused: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: EngineMode::Simulation,
            time_scale: 1.0,
            is_paused: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandLogEntry {
    pub tick: Millis,
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub t: Millis,
    pub seed: u64,
    pub mission_type: MissionType,
    pub status: MissionStatus,
    pub map: MapDefinition,
    pub units: Vec<Unit>,
    pub enemies: Vec<Enemy>,
    pub objectives: Vec<Objective>,
    pub loot: Vec<LootItem>,
    pub mines: Vec<Mine>,
    pub turrets: Vec<Turret>,
    pub doors: Vec<Door>,
    pub visible_cells: BTreeSet<CellCoord>,
    pub discovered_cells: BTreeSet<CellCoord>,
    pub squad_inventory: BTreeMap<String, u32>,
    pub command_log: Vec<CommandLogEntry>,
    pub rng_state: RngState,
    pub stats: MissionStats,
    pub settings: Settings,
    pub director: Director,
    /// Counter behind generated loot, mine, and turret ids
    pub next_entity_id: u32,
}

impl GameState {
    pub fn new(map: MapDefinition, seed: u64, mission_type: MissionType, director: Director) -> Self {
        let doors = map.doors.clone();
        Self {
            t: 0.0,
            seed,
            mission_type,
            status: MissionStatus::Playing,
            map,
            units: Vec::new(),
            enemies: Vec::new(),
            objectives: Vec::new(),
            loot: Vec::new(),
            mines: Vec::new(),
            turrets: Vec::new(),
            doors,
            visible_cells: BTreeSet::new(),
            discovered_cells: BTreeSet::new(),
            squad_inventory: BTreeMap::new(),
            command_log: Vec::new(),
            rng_state: RngState { seed, word_pos: 0 },
            stats: MissionStats::default(),
            settings: Settings::default(),
            director,
            next_entity_id: 0,
        }
    }

    pub fn unit(&self, id: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn unit_index(&self, id: &str) -> Option<usize> {
        self.units.iter().position(|u| u.id == id)
    }

    pub fn enemy(&self, id: &str) -> Option<&Enemy> {
        self.enemies.iter().find(|e| e.id == id)
    }

    pub fn objective(&self, id: &str) -> Option<&Objective> {
        self.objectives.iter().find(|o| o.id == id)
    }

    pub fn objective_mut(&mut self, id: &str) -> Option<&mut Objective> {
        self.objectives.iter_mut().find(|o| o.id == id)
    }

    /// Whether a living unit is carrying the objective
    pub fn is_carried(&self, objective_id: &str) -> bool {
        self.units
            .iter()
            .any(|u| u.is_active() && u.carried_objective_id.as_deref() == Some(objective_id))
    }

    /// Whether dropped loot stands in for the objective
    pub fn is_dropped(&self, objective_id: &str) -> bool {
        self.loot
            .iter()
            .any(|l| l.objective_id.as_deref() == Some(objective_id))
    }

    pub fn next_id(&mut self, prefix: &str) -> String {
        self.next_entity_id += 1;
        format!("{}-{}", prefix, self.next_entity_id)
    }

    pub fn spawn_loot(&mut self, item_id: &str, pos: Vec2, objective_id: Option<String>) -> String {
        let id = self.next_id("loot");
        self.loot.push(LootItem {
            id: id.clone(),
            item_id: item_id.to_string(),
            pos,
            objective_id,
        });
        id
    }

    /// Copy without the static map cells
    pub fn without_static(&self) -> Self {
        let mut state = self.clone();
        state.map.cells.clear();
        state.map.walls.clear();
        state.map.boundaries.clear();
        state
    }
}
