//! Player and AI commands, and their execution against a unit
//!
//! Commands are data: the engine logs the ones that arrive from outside
//! and replays them at the same tick. AI-issued commands carry a
//! [`CommandLabel`] and are never logged, since the AI re-derives them.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::config::EngineConfig;
use crate::core::types::CellCoord;
use crate::mission::graph::Graph;
use crate::mission::items::{begin_item_use, ItemUse};
use crate::mission::pathfinding::{find_path_from, DoorPolicy};
use crate::mission::state::{GameState, MissionStatus};
use crate::mission::units::{EngagementPolicy, PriorMode, UnitState};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandKind {
    MoveTo {
        target: CellCoord,
    },
    Explore,
    EscortUnit {
        target_id: String,
    },
    /// Pick up loot or collect an objective, by id
    Pickup {
        target_id: String,
    },
    UseItem {
        item_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<CellCoord>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_unit_id: Option<String>,
    },
    SetEngagement {
        mode: EngagementPolicy,
    },
    DeployUnit {
        target: CellCoord,
    },
    StartMission,
    Extract,
    Stop,
    OpenDoor {
        door_id: String,
    },
    LockDoor {
        door_id: String,
    },
    ResumeAi,
}

impl CommandKind {
    /// Whether issuing this by hand suspends the unit's autonomy
    pub fn overrides_ai(&self) -> bool {
        !matches!(
            self,
            CommandKind::Explore
                | CommandKind::ResumeAi
                | CommandKind::StartMission
                | CommandKind::DeployUnit { .. }
        )
    }

    /// Whether executing this replaces movement and channels in flight
    fn preempts(&self) -> bool {
        matches!(
            self,
            CommandKind::MoveTo { .. }
                | CommandKind::EscortUnit { .. }
                | CommandKind::Pickup { .. }
                | CommandKind::UseItem { .. }
                | CommandKind::Extract
                | CommandKind::Stop
        )
    }
}

/// Why the AI issued a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandLabel {
    Exploring,
    Claiming,
    Extracting,
    Fleeing,
    Following,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    #[serde(default)]
    pub unit_ids: Vec<String>,
    #[serde(default)]
    pub queue: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<CommandLabel>,
    #[serde(flatten)]
    pub kind: CommandKind,
}

impl Command {
    pub fn new(unit_ids: &[&str], kind: CommandKind) -> Self {
        Self {
            unit_ids: unit_ids.iter().map(|id| id.to_string()).collect(),
            queue: false,
            label: None,
            kind,
        }
    }

    /// Command issued by the AI for a single unit
    pub fn autonomous(unit_id: &str, kind: CommandKind, label: CommandLabel) -> Self {
        Self {
            unit_ids: vec![unit_id.to_string()],
            queue: false,
            label: Some(label),
            kind,
        }
    }

    pub fn queued(mut self) -> Self {
        self.queue = true;
        self
    }

    pub fn is_autonomous(&self) -> bool {
        self.label.is_some()
    }

    pub fn has_label(&self, label: CommandLabel) -> bool {
        self.label == Some(label)
    }

    /// Copy of this command addressed to one unit
    fn for_unit(&self, unit_id: &str) -> Self {
        Self {
            unit_ids: vec![unit_id.to_string()],
            ..self.clone()
        }
    }
}

/// Route an externally issued command to every unit it names
///
/// Unknown unit ids are skipped; the mission-level commands act on the
/// state directly.
pub fn apply_command(state: &mut GameState, graph: &Graph, config: &EngineConfig, command: &Command) {
    match &command.kind {
        CommandKind::StartMission => {
            if state.status == MissionStatus::Deployment {
                state.status = MissionStatus::Playing;
                debug!(t = state.t, "Mission started");
            }
            return;
        }
        CommandKind::DeployUnit { target } => {
            if state.status != MissionStatus::Deployment || !graph.is_walkable(*target) {
                return;
            }
            for id in &command.unit_ids {
                if let Some(unit) = state.units.iter_mut().find(|u| &u.id == id) {
                    unit.pos = target.center();
                }
            }
            return;
        }
        _ => {}
    }

    for id in &command.unit_ids {
        match state.unit_index(id) {
            Some(idx) => issue(state, graph, config, idx, command.for_unit(id), true),
            None => debug!(unit = %id, "Command for unknown unit ignored"),
        }
    }
}

/// Give one unit a command, queueing or executing it
pub fn issue(
    state: &mut GameState,
    graph: &Graph,
    config: &EngineConfig,
    idx: usize,
    command: Command,
    manual: bool,
) {
    let unit = &mut state.units[idx];
    if unit.state.is_terminal() {
        return;
    }

    if manual && command.kind.overrides_ai() {
        if unit.prior_mode.is_none() {
            unit.prior_mode = Some(if unit.ai_enabled {
                PriorMode::Autonomous
            } else {
                PriorMode::Manual
            });
        }
        unit.ai_enabled = false;
    }

    if command.queue {
        if unit.active_command.is_some() || !unit.command_queue.is_empty() {
            unit.command_queue.push_back(command);
            return;
        }
    } else if command.kind.preempts() {
        unit.command_queue.clear();
    }

    execute(state, graph, config, idx, command);
}

/// Start the next queued command of an idle unit
///
/// An idle unit with nothing left to do gets its saved control mode back.
pub fn advance_queue(state: &mut GameState, graph: &Graph, config: &EngineConfig, idx: usize) {
    let unit = &mut state.units[idx];
    if unit.state != UnitState::Idle || unit.active_command.is_some() {
        return;
    }
    match unit.command_queue.pop_front() {
        Some(next) => execute(state, graph, config, idx, next),
        None => {
            if let Some(mode) = unit.prior_mode.take() {
                unit.ai_enabled = mode == PriorMode::Autonomous;
            }
        }
    }
}

/// Perform a command's immediate effects
pub fn execute(state: &mut GameState, graph: &Graph, config: &EngineConfig, idx: usize, command: Command) {
    {
        let unit = &mut state.units[idx];
        if command.kind.preempts() {
            unit.halt();
            unit.matched_speed = None;
            if !command.has_label(CommandLabel::Exploring) {
                unit.exploration_target = None;
            }
        }
    }

    match command.kind.clone() {
        CommandKind::MoveTo { target } => {
            state.units[idx].forced_target_id = None;
            move_unit_to(state, graph, idx, target, command);
        }
        CommandKind::Explore => {
            let unit = &mut state.units[idx];
            unit.ai_enabled = true;
            unit.prior_mode = None;
        }
        CommandKind::EscortUnit { target_id } => {
            let valid = state.units[idx].id != target_id
                && state.unit(&target_id).is_some_and(|t| t.is_active());
            if valid {
                let unit = &mut state.units[idx];
                unit.state = UnitState::Moving;
                unit.active_command = Some(command);
            }
        }
        CommandKind::Pickup { target_id } => {
            let cell = state
                .loot
                .iter()
                .find(|l| l.id == target_id)
                .map(|l| l.pos.cell())
                .or_else(|| state.objective(&target_id).and_then(|o| o.target_cell));
            match cell {
                Some(cell) => move_unit_to(state, graph, idx, cell, command),
                None => debug!(target = %target_id, "Pickup target not found"),
            }
        }
        CommandKind::UseItem { .. } => match begin_item_use(state, config, idx, &command) {
            ItemUse::Approach(cell) => move_unit_to(state, graph, idx, cell, command),
            ItemUse::Started | ItemUse::Rejected => {}
        },
        CommandKind::SetEngagement { mode } => {
            state.units[idx].engagement_policy = mode;
        }
        CommandKind::Extract => match state.map.extraction {
            Some(cell) => move_unit_to(state, graph, idx, cell, command),
            None => debug!("No extraction point on this map"),
        },
        CommandKind::Stop => {
            let unit = &mut state.units[idx];
            unit.command_queue.clear();
            unit.forced_target_id = None;
            unit.prior_mode = None;
            unit.ai_enabled = false;
        }
        CommandKind::OpenDoor { door_id } => {
            if let Some(door) = graph.door_index(&door_id).and_then(|i| state.doors.get_mut(i)) {
                door.request_open();
            }
        }
        CommandKind::LockDoor { door_id } => {
            if let Some(door) = graph.door_index(&door_id).and_then(|i| state.doors.get_mut(i)) {
                door.request_lock();
            }
        }
        CommandKind::ResumeAi => {
            let unit = &mut state.units[idx];
            unit.ai_enabled = true;
            unit.prior_mode = None;
        }
        CommandKind::StartMission | CommandKind::DeployUnit { .. } => {}
    }
}

/// Path a unit to `target` on behalf of `command`
///
/// A plain move into the cell the unit already occupies snaps it to the
/// centre and completes. Other commands stay active so their arrival
/// behavior can run.
pub fn move_unit_to(
    state: &mut GameState,
    graph: &Graph,
    idx: usize,
    target: CellCoord,
    command: Command,
) {
    let path = find_path_from(graph, &state.doors, state.units[idx].pos, target, DoorPolicy::ThroughClosed);
    let unit = &mut state.units[idx];
    unit.path.clear();
    unit.target_pos = None;

    match path {
        Some(path) if !path.is_empty() => {
            unit.target_pos = Some(path[0].center());
            unit.path = path;
            unit.state = UnitState::Moving;
            unit.active_command = Some(command);
        }
        Some(_) => {
            if matches!(command.kind, CommandKind::MoveTo { .. }) {
                unit.pos = target.center();
                unit.state = UnitState::Idle;
                unit.active_command = None;
            } else {
                unit.state = UnitState::Moving;
                unit.active_command = Some(command);
            }
        }
        None => {
            debug!(unit = %unit.id, %target, "No path to target");
            unit.state = UnitState::Idle;
            unit.active_command = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_json_shape() {
        let cmd = Command::new(&["assault-1"], CommandKind::MoveTo { target: CellCoord::new(3, 4) });
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["type"], "MOVE_TO");
        assert_eq!(json["unit_ids"][0], "assault-1");
        assert_eq!(json["target"]["x"], 3);

        let parsed: Command = serde_json::from_str(
            r#"{"type":"SET_ENGAGEMENT","unit_ids":["a"],"mode":"IGNORE"}"#,
        )
        .unwrap();
        assert_eq!(parsed.kind, CommandKind::SetEngagement { mode: EngagementPolicy::Ignore });
        assert!(!parsed.queue);
    }

    #[test]
    fn test_unit_less_commands_parse() {
        let parsed: Command = serde_json::from_str(r#"{"type":"START_MISSION"}"#).unwrap();
        assert_eq!(parsed.kind, CommandKind::StartMission);
        assert!(parsed.unit_ids.is_empty());
    }

    #[test]
    fn test_override_classification() {
        assert!(CommandKind::MoveTo { target: CellCoord::new(0, 0) }.overrides_ai());
        assert!(CommandKind::Stop.overrides_ai());
        assert!(!CommandKind::Explore.overrides_ai());
        assert!(!CommandKind::ResumeAi.overrides_ai());
    }

    #[test]
    fn test_autonomous_label() {
        let cmd = Command::autonomous("a", CommandKind::Explore, CommandLabel::Exploring);
        assert!(cmd.is_autonomous());
        assert!(cmd.has_label(CommandLabel::Exploring));
        assert!(!Command::new(&["a"], CommandKind::Explore).is_autonomous());
    }
}
