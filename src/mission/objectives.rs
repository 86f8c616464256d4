//! Mission objectives, per-mission setup, and the win/loss predicate

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::config::EngineConfig;
use crate::core::error::{Result, SimError};
use crate::core::rng::SimRng;
use crate::core::types::CellCoord;
use crate::mission::constants::{
    ESCORT_OBJECTIVE_ID, HIVE_ENEMY_ID, HIVE_OBJECTIVE_ID, MAX_RECOVER_OBJECTIVES,
    RECOVER_FALLBACK_DISTANCE_FACTOR, RECOVER_MIN_DISTANCE_FACTOR, SCRAP_CRATE_ITEM, VIP_ARCHETYPE,
    VIP_HP_FRACTION, VIP_UNIT_ID,
};
use crate::mission::graph::Graph;
use crate::mission::library::EnemyKind;
use crate::mission::state::{GameState, MissionStatus};
use crate::mission::units::{spawn_unit, Enemy, SoldierConfig, UnitState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectiveKind {
    Recover,
    Kill,
    Escort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectiveState {
    Pending,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MissionType {
    #[default]
    Default,
    ExtractArtifacts,
    DestroyHive,
    EscortVip,
    RecoverIntel,
}

impl MissionType {
    /// Missions whose map-defined Recover objectives stay objectives
    pub fn keeps_recover_objectives(self) -> bool {
        matches!(
            self,
            MissionType::Default | MissionType::ExtractArtifacts | MissionType::RecoverIntel
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub id: String,
    pub kind: ObjectiveKind,
    pub state: ObjectiveState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_cell: Option<CellCoord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_enemy_id: Option<String>,
    pub visible: bool,
    /// Collected objectives of this kind are carried to extraction
    pub carryable: bool,
}

impl Objective {
    pub fn recover(id: String, cell: CellCoord, carryable: bool) -> Self {
        Self {
            id,
            kind: ObjectiveKind::Recover,
            state: ObjectiveState::Pending,
            target_cell: Some(cell),
            target_enemy_id: None,
            visible: false,
            carryable,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state == ObjectiveState::Pending
    }

    pub fn is_completed(&self) -> bool {
        self.state == ObjectiveState::Completed
    }
}

/// Seed objectives, loot, and mission-specific actors
pub fn setup_mission(
    state: &mut GameState,
    graph: &Graph,
    config: &EngineConfig,
    rng: &mut SimRng,
    squad_spawn: CellCoord,
) -> Result<()> {
    let mission = state.mission_type;

    for def in state.map.objectives.clone() {
        match (def.kind, mission.keeps_recover_objectives()) {
            (ObjectiveKind::Recover, false) => {
                if let Some(cell) = def.target_cell {
                    state.spawn_loot(SCRAP_CRATE_ITEM, cell.center(), None);
                }
            }
            _ => state.objectives.push(Objective {
                id: def.id,
                kind: def.kind,
                state: ObjectiveState::Pending,
                target_cell: def.target_cell,
                target_enemy_id: def.target_enemy_id,
                visible: false,
                carryable: mission == MissionType::ExtractArtifacts,
            }),
        }
    }

    const BONUS_ITEMS: [&str; 5] = ["medkit", "stimpack", "frag_grenade", "mine", "scanner"];
    for cell in state.map.bonus_loot.clone() {
        let pick = rng.next_int(0, BONUS_ITEMS.len() as i64 - 1) as usize;
        state.spawn_loot(BONUS_ITEMS[pick], cell.center(), None);
    }

    match mission {
        MissionType::Default => {}
        MissionType::ExtractArtifacts | MissionType::RecoverIntel => {
            let (prefix, carryable) = if mission == MissionType::ExtractArtifacts {
                ("artifact", true)
            } else {
                ("intel", false)
            };
            let cells = recover_cells(state, graph, rng, squad_spawn);
            if cells.is_empty() {
                return Err(SimError::InvalidMission(format!(
                    "no room for {} objectives on a {}x{} map",
                    prefix, state.map.width, state.map.height
                )));
            }
            for (n, cell) in cells.into_iter().enumerate() {
                state
                    .objectives
                    .push(Objective::recover(format!("{}-{}", prefix, n + 1), cell, carryable));
            }
        }
        MissionType::DestroyHive => {
            let cell = graph
                .floor_cells()
                .into_iter()
                .filter(|c| *c != squad_spawn)
                .fold(None::<CellCoord>, |best, c| match best {
                    Some(b) if b.euclidean(&squad_spawn) >= c.euclidean(&squad_spawn) => Some(b),
                    _ => Some(c),
                })
                .ok_or_else(|| SimError::InvalidMission("no cell to place the hive".into()))?;
            state.enemies.push(Enemy::spawn(
                HIVE_ENEMY_ID.to_string(),
                EnemyKind::Hive,
                cell.center(),
                config.speed_normalization,
            ));
            state.objectives.push(Objective {
                id: HIVE_OBJECTIVE_ID.to_string(),
                kind: ObjectiveKind::Kill,
                state: ObjectiveState::Pending,
                target_cell: Some(cell),
                target_enemy_id: Some(HIVE_ENEMY_ID.to_string()),
                visible: false,
                carryable: false,
            });
        }
        MissionType::EscortVip => {
            let mut vip = spawn_unit(
                &SoldierConfig::new(VIP_ARCHETYPE),
                VIP_UNIT_ID.to_string(),
                squad_spawn,
                false,
                rng,
            )?;
            vip.hp = vip.max_hp * VIP_HP_FRACTION;
            state.units.push(vip);
            state.objectives.push(Objective {
                id: ESCORT_OBJECTIVE_ID.to_string(),
                kind: ObjectiveKind::Escort,
                state: ObjectiveState::Pending,
                target_cell: None,
                target_enemy_id: None,
                visible: true,
                carryable: false,
            });
        }
    }

    info!(
        mission = ?mission,
        objectives = state.objectives.len(),
        loot = state.loot.len(),
        "Mission set up"
    );
    Ok(())
}

/// Far floor cells for generated Recover objectives, shuffled by seed
fn recover_cells(state: &GameState, graph: &Graph, rng: &mut SimRng, squad_spawn: CellCoord) -> Vec<CellCoord> {
    let reference = state.map.extraction.unwrap_or(squad_spawn);
    let taken: Vec<CellCoord> = state.objectives.iter().filter_map(|o| o.target_cell).collect();
    let floor: Vec<CellCoord> = graph
        .floor_cells()
        .into_iter()
        .filter(|c| *c != squad_spawn && *c != reference && !taken.contains(c))
        .collect();

    let width = state.map.width as f64;
    let mut candidates: Vec<CellCoord> = floor
        .iter()
        .copied()
        .filter(|c| c.euclidean(&reference) > width * RECOVER_MIN_DISTANCE_FACTOR)
        .collect();
    if candidates.is_empty() {
        warn!("No far cells for objectives, relaxing distance");
        candidates = floor
            .into_iter()
            .filter(|c| c.euclidean(&reference) > width * RECOVER_FALLBACK_DISTANCE_FACTOR)
            .collect();
    }

    rng.shuffle(&mut candidates);
    candidates.truncate(MAX_RECOVER_OBJECTIVES);
    candidates
}

/// Refresh objective visibility and completion from the live state
pub fn update_objectives(state: &mut GameState) {
    let vips_extracted = {
        let mut vips = state.units.iter().filter(|u| u.is_vip()).peekable();
        vips.peek().is_some() && vips.all(|u| u.state == UnitState::Extracted)
    };

    for i in 0..state.objectives.len() {
        let objective = &state.objectives[i];
        let target_enemy = objective
            .target_enemy_id
            .as_deref()
            .and_then(|id| state.enemy(id))
            .filter(|e| e.is_alive());

        let seen = match objective.kind {
            ObjectiveKind::Kill => target_enemy.is_some_and(|e| state.visible_cells.contains(&e.cell())),
            _ => objective
                .target_cell
                .is_some_and(|c| state.discovered_cells.contains(&c)),
        };
        let done = match objective.kind {
            ObjectiveKind::Kill => target_enemy.is_none(),
            ObjectiveKind::Escort => vips_extracted,
            ObjectiveKind::Recover => false,
        };

        let objective = &mut state.objectives[i];
        objective.visible |= seen;
        if done && objective.is_pending() {
            objective.state = ObjectiveState::Completed;
            info!(objective = %objective.id, "Objective completed");
        }
    }
}

/// Whether every objective that needs the squad is done or on its way out
pub fn objectives_secured(state: &GameState) -> bool {
    state
        .objectives
        .iter()
        .filter(|o| o.kind != ObjectiveKind::Escort)
        .all(|o| o.is_completed() || state.is_carried(&o.id))
}

/// Evaluate the mission outcome, updating `state.status`
///
/// Returns true when the status changed this call.
pub fn check_win_loss(state: &mut GameState) -> bool {
    if state.status != MissionStatus::Playing {
        return false;
    }

    let outcome = evaluate(state);
    if let Some(status) = outcome {
        state.status = status;
        info!(t = state.t, status = ?status, "Mission resolved");
        return true;
    }
    false
}

fn evaluate(state: &GameState) -> Option<MissionStatus> {
    let vip_dead = state
        .units
        .iter()
        .any(|u| u.is_vip() && u.state == UnitState::Dead);
    if vip_dead {
        return Some(MissionStatus::Lost);
    }

    let all_complete = state.objectives.iter().all(|o| o.is_completed());
    if state.mission_type == MissionType::DestroyHive
        && state.objective(HIVE_OBJECTIVE_ID).is_some_and(|o| o.is_completed())
    {
        return Some(MissionStatus::Won);
    }

    // A VIP with no soldier left alive or extracted is stranded
    if state.mission_type == MissionType::EscortVip {
        let mut soldiers = state.units.iter().filter(|u| !u.is_vip()).peekable();
        if soldiers.peek().is_some() && soldiers.all(|u| u.state == UnitState::Dead) {
            return Some(MissionStatus::Lost);
        }
    }

    if state.units.iter().any(|u| !u.state.is_terminal()) {
        return None;
    }

    let won = match state.mission_type {
        MissionType::RecoverIntel | MissionType::DestroyHive => all_complete,
        MissionType::EscortVip => state
            .units
            .iter()
            .filter(|u| u.is_vip())
            .all(|u| u.state == UnitState::Extracted),
        MissionType::Default | MissionType::ExtractArtifacts => {
            all_complete && state.units.iter().any(|u| u.state == UnitState::Extracted)
        }
    };
    Some(if won { MissionStatus::Won } else { MissionStatus::Lost })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::map::MapDefinition;
    use crate::mission::state::tests::{empty_state, with_unit};

    fn setup(mission: MissionType, map: MapDefinition) -> GameState {
        let graph = Graph::new(&map).unwrap();
        let mut state = empty_state();
        state.map = map;
        state.mission_type = mission;
        let mut rng = SimRng::new(7);
        setup_mission(&mut state, &graph, &EngineConfig::default(), &mut rng, CellCoord::new(0, 0)).unwrap();
        state
    }

    #[test]
    fn test_recover_intel_places_far_objectives() {
        let map = MapDefinition::filled(10, 10).with_extraction(CellCoord::new(0, 0));
        let state = setup(MissionType::RecoverIntel, map);
        assert_eq!(state.objectives.len(), 3);
        for (n, obj) in state.objectives.iter().enumerate() {
            assert_eq!(obj.id, format!("intel-{}", n + 1));
            assert!(obj.target_cell.unwrap().euclidean(&CellCoord::new(0, 0)) > 5.0);
            assert!(!obj.carryable);
        }
    }

    #[test]
    fn test_objective_placement_is_seeded() {
        let map = MapDefinition::filled(10, 10);
        let a = setup(MissionType::ExtractArtifacts, map.clone());
        let b = setup(MissionType::ExtractArtifacts, map);
        assert_eq!(a.objectives, b.objectives);
        assert!(a.objectives.iter().all(|o| o.carryable));
    }

    #[test]
    fn test_destroy_hive_spawns_far_hive() {
        let state = setup(MissionType::DestroyHive, MapDefinition::filled(10, 10));
        let hive = state.enemy(HIVE_ENEMY_ID).unwrap();
        assert_eq!(hive.cell(), CellCoord::new(9, 9));
        assert_eq!(state.objective(HIVE_OBJECTIVE_ID).unwrap().kind, ObjectiveKind::Kill);
    }

    #[test]
    fn test_escort_vip_spawns_wounded_vip() {
        let state = setup(MissionType::EscortVip, MapDefinition::filled(10, 10));
        let vip = state.unit(VIP_UNIT_ID).unwrap();
        assert_eq!(vip.hp, 50.0);
        assert!(!vip.ai_enabled);
        assert!(state.objective(ESCORT_OBJECTIVE_ID).is_some());
    }

    #[test]
    fn test_recover_objectives_become_scrap_elsewhere() {
        use crate::mission::map::ObjectiveDefinition;
        let map = MapDefinition::filled(10, 10).with_objective(ObjectiveDefinition {
            id: "obj-1".into(),
            kind: ObjectiveKind::Recover,
            target_cell: Some(CellCoord::new(5, 5)),
            target_enemy_id: None,
        });
        let state = setup(MissionType::DestroyHive, map.clone());
        assert!(state.objective("obj-1").is_none());
        assert_eq!(state.loot[0].item_id, SCRAP_CRATE_ITEM);

        let state = setup(MissionType::Default, map);
        assert!(state.objective("obj-1").is_some());
    }

    #[test]
    fn test_kill_objective_completes_when_enemy_gone() {
        let mut state = setup(MissionType::DestroyHive, MapDefinition::filled(10, 10));
        update_objectives(&mut state);
        assert!(state.objectives[0].is_pending());
        state.enemies.clear();
        update_objectives(&mut state);
        assert!(state.objectives[0].is_completed());
    }

    #[test]
    fn test_playing_while_any_unit_active() {
        let mut state = with_unit(empty_state(), "assault", CellCoord::new(1, 1));
        state = with_unit(state, "medic", CellCoord::new(2, 1));
        state.units[0].state = UnitState::Dead;
        assert!(!check_win_loss(&mut state));
        assert_eq!(state.status, MissionStatus::Playing);

        state.units[1].state = UnitState::Extracted;
        assert!(check_win_loss(&mut state));
        assert_eq!(state.status, MissionStatus::Won);
    }

    #[test]
    fn test_squad_wipe_is_lost() {
        let mut state = with_unit(empty_state(), "assault", CellCoord::new(1, 1));
        state.units[0].state = UnitState::Dead;
        check_win_loss(&mut state);
        assert_eq!(state.status, MissionStatus::Lost);
    }

    #[test]
    fn test_hive_win_is_irrevocable() {
        let mut state = setup(MissionType::DestroyHive, MapDefinition::filled(10, 10));
        state = with_unit(state, "assault", CellCoord::new(1, 1));
        state.enemies.clear();
        update_objectives(&mut state);
        assert!(check_win_loss(&mut state));
        assert_eq!(state.status, MissionStatus::Won);

        state.units[0].state = UnitState::Dead;
        assert!(!check_win_loss(&mut state));
        assert_eq!(state.status, MissionStatus::Won);
    }

    #[test]
    fn test_escort_lost_when_all_soldiers_dead() {
        let mut state = setup(MissionType::EscortVip, MapDefinition::filled(10, 10));
        state = with_unit(state, "assault", CellCoord::new(1, 1));
        state = with_unit(state, "scout", CellCoord::new(2, 1));
        let soldiers: Vec<usize> = (0..state.units.len()).filter(|&i| !state.units[i].is_vip()).collect();

        state.units[soldiers[0]].state = UnitState::Dead;
        assert!(!check_win_loss(&mut state));
        assert_eq!(state.status, MissionStatus::Playing);

        state.units[soldiers[1]].state = UnitState::Dead;
        assert!(check_win_loss(&mut state));
        assert_eq!(state.status, MissionStatus::Lost);
    }

    #[test]
    fn test_escort_continues_after_soldiers_extract() {
        let mut state = setup(MissionType::EscortVip, MapDefinition::filled(10, 10));
        state = with_unit(state, "assault", CellCoord::new(1, 1));
        let soldier = state.units.iter().position(|u| !u.is_vip()).unwrap();
        state.units[soldier].state = UnitState::Extracted;
        assert!(!check_win_loss(&mut state));
        assert_eq!(state.status, MissionStatus::Playing);
    }

    #[test]
    fn test_dead_vip_loses_immediately() {
        let mut state = setup(MissionType::EscortVip, MapDefinition::filled(10, 10));
        state = with_unit(state, "assault", CellCoord::new(1, 1));
        state.units[0].state = UnitState::Dead;
        check_win_loss(&mut state);
        assert_eq!(state.status, MissionStatus::Lost);
    }
}
