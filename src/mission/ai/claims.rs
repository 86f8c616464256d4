//! Opportunistic loot and objective claims
//!
//! Every visible, unclaimed pickup target goes to the nearest available
//! unit, one target per unit per tick. Units left over move on pending
//! kill objectives, then toward extraction once the objectives are secured.

use std::collections::BTreeSet;

use tracing::debug;

use super::{is_available, AiContext, SquadBehavior};
use crate::core::types::{CellCoord, Vec2};
use crate::mission::commands::{issue, Command, CommandKind, CommandLabel};
use crate::mission::graph::Graph;
use crate::mission::objectives::{objectives_secured, ObjectiveKind};
use crate::mission::pathfinding::{find_path_from, DoorPolicy};
use crate::mission::state::GameState;

/// Something a unit can walk over and pick up
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimTarget {
    pub id: String,
    pub pos: Vec2,
}

/// Ids already being picked up or collected by some unit
fn claimed_ids(state: &GameState) -> BTreeSet<String> {
    let mut claimed = BTreeSet::new();
    for unit in state.units.iter().filter(|u| u.is_active()) {
        let commands = unit.active_command.iter().chain(unit.command_queue.iter());
        for command in commands {
            if let CommandKind::Pickup { target_id } = &command.kind {
                claimed.insert(target_id.clone());
            }
        }
        if let Some(id) = unit.channeling.as_ref().and_then(|c| c.target_id.clone()) {
            claimed.insert(id);
        }
    }
    claimed
}

/// Whether some squad member could walk to `pos`
fn reachable(state: &GameState, graph: &Graph, pos: Vec2) -> bool {
    state
        .units
        .iter()
        .filter(|u| u.is_active() && !u.is_vip())
        .any(|u| find_path_from(graph, &state.doors, u.pos, pos.cell(), DoorPolicy::ThroughClosed).is_some())
}

/// Visible loot, then visible recover objectives, that nobody has claimed
///
/// Targets no squad member can reach are left out.
pub fn claim_targets(state: &GameState, graph: &Graph) -> Vec<ClaimTarget> {
    let claimed = claimed_ids(state);
    let loot = state
        .loot
        .iter()
        .filter(|l| state.visible_cells.contains(&l.pos.cell()) && !claimed.contains(&l.id))
        .map(|l| ClaimTarget {
            id: l.id.clone(),
            pos: l.pos,
        });
    let objectives = state
        .objectives
        .iter()
        .filter(|o| o.kind == ObjectiveKind::Recover && o.is_pending())
        .filter(|o| !claimed.contains(&o.id) && !state.is_carried(&o.id) && !state.is_dropped(&o.id))
        .filter_map(|o| {
            let cell = o.target_cell?;
            state.visible_cells.contains(&cell).then(|| ClaimTarget {
                id: o.id.clone(),
                pos: cell.center(),
            })
        });
    loot.chain(objectives)
        .filter(|t| reachable(state, graph, t.pos))
        .collect()
}

/// Nearest candidate unit to `pos`; the earliest index wins ties
pub fn nearest_unit(state: &GameState, candidates: &[usize], pos: Vec2) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for &idx in candidates {
        let dist = state.units[idx].pos.distance(&pos);
        if best.map_or(true, |(_, d)| dist < d) {
            best = Some((idx, dist));
        }
    }
    best.map(|(idx, _)| idx)
}

pub struct ClaimBehavior;

impl SquadBehavior for ClaimBehavior {
    fn name(&self) -> &'static str {
        "claims"
    }

    fn run(&self, ctx: &mut AiContext<'_>) {
        let mut free: Vec<usize> = (0..ctx.state.units.len())
            .filter(|&i| is_available(&ctx.state.units[i]))
            .collect();
        if free.is_empty() {
            return;
        }

        for target in claim_targets(ctx.state, ctx.graph) {
            let Some(winner) = nearest_unit(ctx.state, &free, target.pos) else {
                break;
            };
            free.retain(|&i| i != winner);
            let unit_id = ctx.state.units[winner].id.clone();
            debug!(unit = %unit_id, target = %target.id, "Claimed pickup");
            let command = Command::autonomous(
                &unit_id,
                CommandKind::Pickup { target_id: target.id },
                CommandLabel::Claiming,
            );
            issue(ctx.state, ctx.graph, ctx.config, winner, command, false);
        }

        let kill_targets: Vec<CellCoord> = ctx
            .state
            .objectives
            .iter()
            .filter(|o| o.kind == ObjectiveKind::Kill && o.is_pending() && o.visible)
            .filter_map(|o| o.target_enemy_id.as_deref())
            .filter_map(|id| ctx.state.enemy(id))
            .map(|e| e.cell())
            .collect();
        let secured = objectives_secured(ctx.state);
        let extraction = ctx
            .state
            .map
            .extraction
            .filter(|c| ctx.state.discovered_cells.contains(c));

        for idx in free {
            let unit = &ctx.state.units[idx];
            let pos = unit.pos;
            let kill = kill_targets
                .iter()
                .copied()
                .min_by(|a, b| pos.distance(&a.center()).total_cmp(&pos.distance(&b.center())));

            let (target, label) = match (kill, extraction) {
                (Some(cell), _) => (cell, CommandLabel::Claiming),
                (None, Some(cell)) if secured => {
                    let heading_out = unit
                        .active_command
                        .as_ref()
                        .is_some_and(|c| c.has_label(CommandLabel::Extracting));
                    if heading_out || unit.cell() == cell {
                        continue;
                    }
                    (cell, CommandLabel::Extracting)
                }
                _ => continue,
            };
            let command = Command::autonomous(&unit.id, CommandKind::MoveTo { target }, label);
            issue(ctx.state, ctx.graph, ctx.config, idx, command, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineConfig;
    use crate::mission::map::MapDefinition;
    use crate::mission::objectives::Objective;
    use crate::mission::state::tests::{empty_state, with_unit};

    fn run(state: &mut GameState) {
        let graph = Graph::new(&MapDefinition::filled(10, 10)).unwrap();
        let config = EngineConfig::default();
        let mut ctx = AiContext {
            state,
            graph: &graph,
            config: &config,
        };
        ClaimBehavior.run(&mut ctx);
    }

    fn squad(cells: &[(i32, i32)]) -> GameState {
        let mut state = empty_state();
        for &(x, y) in cells {
            state = with_unit(state, "assault", CellCoord::new(x, y));
        }
        for unit in state.units.iter_mut() {
            unit.ai_enabled = true;
        }
        state.visible_cells = (0..10)
            .flat_map(|y| (0..10).map(move |x| CellCoord::new(x, y)))
            .collect();
        state.discovered_cells = state.visible_cells.clone();
        state
    }

    fn pickup_target(state: &GameState, idx: usize) -> Option<String> {
        match state.units[idx].active_command.as_ref().map(|c| &c.kind) {
            Some(CommandKind::Pickup { target_id }) => Some(target_id.clone()),
            _ => None,
        }
    }

    #[test]
    fn test_nearest_unit_claims_loot() {
        let mut state = squad(&[(0, 0), (6, 6)]);
        let loot = state.spawn_loot("medkit", Vec2::new(7.5, 7.5), None);
        run(&mut state);
        assert_eq!(pickup_target(&state, 0), None);
        assert_eq!(pickup_target(&state, 1), Some(loot));
    }

    #[test]
    fn test_exactly_one_claimant_on_tie() {
        let mut state = squad(&[(2, 5), (8, 5)]);
        let loot = state.spawn_loot("medkit", Vec2::new(5.5, 5.5), None);
        state.units[0].pos = Vec2::new(2.5, 5.5);
        state.units[1].pos = Vec2::new(8.5, 5.5);
        run(&mut state);
        assert_eq!(pickup_target(&state, 0), Some(loot));
        assert_eq!(pickup_target(&state, 1), None);

        run(&mut state);
        let claimants = (0..2).filter(|&i| pickup_target(&state, i).is_some()).count();
        assert_eq!(claimants, 1);
    }

    #[test]
    fn test_each_unit_takes_one_target() {
        let mut state = squad(&[(0, 0), (9, 9)]);
        let a = state.spawn_loot("medkit", Vec2::new(1.5, 0.5), None);
        let b = state.spawn_loot("stimpack", Vec2::new(2.5, 0.5), None);
        run(&mut state);
        assert_eq!(pickup_target(&state, 0), Some(a));
        assert_eq!(pickup_target(&state, 1), Some(b));
    }

    #[test]
    fn test_hidden_loot_ignored() {
        let mut state = squad(&[(0, 0)]);
        state.spawn_loot("medkit", Vec2::new(7.5, 7.5), None);
        state.visible_cells.remove(&CellCoord::new(7, 7));
        run(&mut state);
        assert_eq!(pickup_target(&state, 0), None);
    }

    #[test]
    fn test_unreachable_loot_not_claimed() {
        // (8, 8) is walled in by void on every side
        let map = MapDefinition::filled(10, 10)
            .with_void(CellCoord::new(8, 7))
            .with_void(CellCoord::new(7, 8))
            .with_void(CellCoord::new(9, 8))
            .with_void(CellCoord::new(8, 9));
        let graph = Graph::new(&map).unwrap();
        let mut state = squad(&[(0, 0)]);
        state.map = map;
        state.spawn_loot("medkit", Vec2::new(8.5, 8.5), None);
        assert!(claim_targets(&state, &graph).is_empty());
    }

    #[test]
    fn test_recover_objective_claimed() {
        let mut state = squad(&[(0, 0)]);
        state
            .objectives
            .push(Objective::recover("intel-1".into(), CellCoord::new(4, 4), false));
        run(&mut state);
        assert_eq!(pickup_target(&state, 0), Some("intel-1".to_string()));
    }

    #[test]
    fn test_heads_to_extraction_when_secured() {
        let mut state = squad(&[(0, 0)]);
        state.map.extraction = Some(CellCoord::new(9, 9));
        run(&mut state);
        let command = state.units[0].active_command.as_ref().unwrap();
        assert!(command.has_label(CommandLabel::Extracting));
        assert_eq!(command.kind, CommandKind::MoveTo { target: CellCoord::new(9, 9) });
    }
}
