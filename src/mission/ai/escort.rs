//! Escort formation
//!
//! Escorts of the same unit are sorted by id and given formation slots
//! relative to the escortee's heading: vanguard, rearguard, then flanks
//! alternating sides and stepping back one rank per pair.

use std::collections::BTreeMap;

use tracing::debug;

use super::{AiContext, SquadBehavior};
use crate::core::types::{CellCoord, Vec2};
use crate::mission::commands::CommandKind;
use crate::mission::constants::FORMATION_SLOT_TOLERANCE;
use crate::mission::pathfinding::{find_path_from, DoorPolicy};
use crate::mission::state::GameState;

/// Grid heading of a mover; north when it is standing still
pub fn heading(pos: Vec2, target_pos: Option<Vec2>) -> (i32, i32) {
    let dir = target_pos.map(|t| (t - pos).normalize()).unwrap_or(Vec2::new(0.0, 0.0));
    let rounded = (dir.x.round() as i32, dir.y.round() as i32);
    if rounded == (0, 0) {
        (0, -1)
    } else {
        rounded
    }
}

/// Cell offset from the escortee for the escort at `index`
pub fn slot_offset(index: usize, heading: (i32, i32)) -> (i32, i32) {
    let (hx, hy) = heading;
    match index {
        0 => (hx, hy),
        1 => (-hx, -hy),
        _ => {
            let k = index - 2;
            let side = if k % 2 == 0 { 1 } else { -1 };
            let depth = (k / 2) as i32;
            (-hy * side - hx * depth, hx * side - hy * depth)
        }
    }
}

fn escort_target(state: &GameState, idx: usize) -> Option<String> {
    match state.units[idx].active_command.as_ref().map(|c| &c.kind) {
        Some(CommandKind::EscortUnit { target_id }) => Some(target_id.clone()),
        _ => None,
    }
}

pub struct EscortBehavior;

impl SquadBehavior for EscortBehavior {
    fn name(&self) -> &'static str {
        "escort"
    }

    fn run(&self, ctx: &mut AiContext<'_>) {
        let state = &mut *ctx.state;
        for unit in state.units.iter_mut() {
            unit.matched_speed = None;
        }

        // escortee id -> escort indices, ordered by escort id
        let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for idx in 0..state.units.len() {
            if !state.units[idx].is_active() {
                continue;
            }
            if let Some(target_id) = escort_target(state, idx) {
                let valid = state.unit(&target_id).is_some_and(|t| t.is_active());
                if valid {
                    groups.entry(target_id).or_default().push(idx);
                } else {
                    debug!(unit = %state.units[idx].id, "Escort target gone");
                    state.units[idx].halt();
                }
            }
        }

        for (target_id, mut escorts) in groups {
            let Some(target_idx) = state.unit_index(&target_id) else {
                continue;
            };
            escorts.sort_by(|a, b| state.units[*a].id.cmp(&state.units[*b].id));

            let target = &state.units[target_idx];
            let anchor = target.cell();
            let dir = heading(target.pos, target.target_pos);
            let target_speed = target.stats.speed;
            let mut slowest_in_slot: Option<f64> = None;

            for (slot, &idx) in escorts.iter().enumerate() {
                let (dx, dy) = slot_offset(slot, dir);
                let mut cell = CellCoord::new(anchor.x + dx, anchor.y + dy);
                if !ctx.graph.is_walkable(cell) {
                    cell = anchor;
                }

                if state.units[idx].cell() != cell && state.units[idx].path.last() != Some(&cell) {
                    let path = find_path_from(
                        ctx.graph,
                        &state.doors,
                        state.units[idx].pos,
                        cell,
                        DoorPolicy::ThroughClosed,
                    );
                    let unit = &mut state.units[idx];
                    unit.path = path.unwrap_or_default();
                    unit.target_pos = unit.path.first().map(|c| c.center());
                } else if state.units[idx].cell() == cell {
                    let unit = &mut state.units[idx];
                    unit.path.clear();
                    unit.target_pos = None;
                }

                let unit = &mut state.units[idx];
                if unit.pos.distance(&cell.center()) <= FORMATION_SLOT_TOLERANCE {
                    unit.matched_speed = Some(unit.stats.speed.min(target_speed));
                    slowest_in_slot = Some(slowest_in_slot.map_or(unit.stats.speed, |s| s.min(unit.stats.speed)));
                }
            }

            if let Some(slowest) = slowest_in_slot {
                let target = &mut state.units[target_idx];
                if target.matched_speed.is_none() {
                    target.matched_speed = Some(target.stats.speed.min(slowest));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineConfig;
    use crate::mission::commands::Command;
    use crate::mission::graph::Graph;
    use crate::mission::map::MapDefinition;
    use crate::mission::state::tests::{empty_state, with_unit};
    use crate::mission::units::UnitState;

    #[test]
    fn test_heading_defaults_north() {
        assert_eq!(heading(Vec2::new(1.5, 1.5), None), (0, -1));
        assert_eq!(heading(Vec2::new(1.5, 1.5), Some(Vec2::new(3.5, 1.5))), (1, 0));
        assert_eq!(heading(Vec2::new(1.5, 1.5), Some(Vec2::new(2.5, 2.5))), (1, 1));
    }

    #[test]
    fn test_slot_layout() {
        let north = (0, -1);
        assert_eq!(slot_offset(0, north), (0, -1));
        assert_eq!(slot_offset(1, north), (0, 1));
        assert_eq!(slot_offset(2, north), (1, 0));
        assert_eq!(slot_offset(3, north), (-1, 0));
        assert_eq!(slot_offset(4, north), (1, 1));
        assert_eq!(slot_offset(5, north), (-1, 1));
    }

    fn escort_state() -> GameState {
        let mut state = with_unit(empty_state(), "vip", CellCoord::new(5, 5));
        state = with_unit(state, "scout", CellCoord::new(5, 8));
        state = with_unit(state, "heavy", CellCoord::new(5, 2));
        for idx in [1, 2] {
            let unit = &mut state.units[idx];
            unit.state = UnitState::Moving;
            unit.active_command = Some(Command::new(
                &[unit.id.as_str()],
                CommandKind::EscortUnit { target_id: "vip-1".into() },
            ));
        }
        state
    }

    fn run(state: &mut GameState) {
        let graph = Graph::new(&MapDefinition::filled(10, 10)).unwrap();
        let config = EngineConfig::default();
        let mut ctx = AiContext {
            state,
            graph: &graph,
            config: &config,
        };
        EscortBehavior.run(&mut ctx);
    }

    #[test]
    fn test_escorts_path_to_slots() {
        let mut state = escort_state();
        run(&mut state);
        // heavy-1 sorts before scout-1, so it takes the vanguard
        assert_eq!(state.units[2].path.last(), Some(&CellCoord::new(5, 4)));
        assert_eq!(state.units[1].path.last(), Some(&CellCoord::new(5, 6)));
    }

    #[test]
    fn test_speed_matched_in_slot() {
        let mut state = escort_state();
        state.units[1].pos = CellCoord::new(5, 6).center();
        state.units[2].pos = CellCoord::new(5, 4).center();
        run(&mut state);
        assert_eq!(state.units[1].matched_speed, Some(22.0));
        assert_eq!(state.units[2].matched_speed, Some(15.0));
        assert_eq!(state.units[0].matched_speed, Some(15.0));
        assert!(state.units[1].path.is_empty());
    }

    #[test]
    fn test_escort_ends_when_target_gone() {
        let mut state = escort_state();
        state.units[0].state = UnitState::Dead;
        run(&mut state);
        assert_eq!(state.units[1].state, UnitState::Idle);
        assert!(state.units[1].active_command.is_none());
    }
}
