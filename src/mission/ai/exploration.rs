//! Frontier exploration
//!
//! Idle AI units head for the nearest undiscovered cell, spreading out so
//! two units never chase the same frontier.

use std::collections::{BTreeSet, VecDeque};

use tracing::debug;

use super::claims::claim_targets;
use super::{is_available, AiContext, SquadBehavior};
use crate::core::types::{CellCoord, Vec2};
use crate::mission::commands::{issue, Command, CommandKind, CommandLabel};
use crate::mission::constants::{
    EXPLORE_AVOID_MAX, EXPLORE_AVOID_MIN, EXPLORE_UNIT_AVOID_MAX, EXPLORE_UNIT_AVOID_MIN,
};
use crate::mission::doors::Door;
use crate::mission::graph::Graph;
use crate::mission::pathfinding::{can_traverse, DoorPolicy};

/// Spacing rules for choosing a frontier cell
#[derive(Debug, Clone)]
pub struct FrontierFilter<'a> {
    /// Other units' exploration targets; never chosen
    pub claimed: &'a BTreeSet<CellCoord>,
    /// Other active units' positions
    pub others: &'a [Vec2],
    pub target_spacing: f64,
    pub unit_spacing: f64,
}

/// Nearest undiscovered cell reachable from `start`, breadth-first
///
/// Cells close to another unit or its target are skipped while anything
/// else is available; the nearest unclaimed cell is the fallback.
pub fn find_frontier(
    graph: &Graph,
    doors: &[Door],
    start: CellCoord,
    discovered: &BTreeSet<CellCoord>,
    filter: &FrontierFilter<'_>,
) -> Option<CellCoord> {
    if !graph.is_walkable(start) {
        return None;
    }
    let width = graph.width() as usize;
    let index = |c: CellCoord| c.y as usize * width + c.x as usize;
    let mut visited = vec![false; width * graph.height() as usize];
    let mut queue = VecDeque::from([start]);
    visited[index(start)] = true;
    let mut fallback = None;

    while let Some(cell) = queue.pop_front() {
        if !discovered.contains(&cell) && !filter.claimed.contains(&cell) {
            let spaced = filter
                .claimed
                .iter()
                .all(|t| t.euclidean(&cell) > filter.target_spacing)
                && filter
                    .others
                    .iter()
                    .all(|p| p.distance(&cell.center()) > filter.unit_spacing);
            if spaced {
                return Some(cell);
            }
            fallback.get_or_insert(cell);
        }

        for next in graph.neighbors(cell) {
            if !visited[index(next)] && can_traverse(graph, doors, cell, next, DoorPolicy::ThroughClosed) {
                visited[index(next)] = true;
                queue.push_back(next);
            }
        }
    }

    fallback
}

pub struct ExplorationBehavior;

impl SquadBehavior for ExplorationBehavior {
    fn name(&self) -> &'static str {
        "exploration"
    }

    fn run(&self, ctx: &mut AiContext<'_>) {
        let dim = ctx.graph.width().min(ctx.graph.height()) as f64;
        let target_spacing = (dim / 4.0).clamp(EXPLORE_AVOID_MIN, EXPLORE_AVOID_MAX);
        let unit_spacing = (dim / 6.0).clamp(EXPLORE_UNIT_AVOID_MIN, EXPLORE_UNIT_AVOID_MAX);
        // Something worth picking up is in sight and still unclaimed
        if !claim_targets(ctx.state, ctx.graph).is_empty() {
            return;
        }

        for idx in 0..ctx.state.units.len() {
            let state = &mut *ctx.state;
            if let Some(target) = state.units[idx].exploration_target {
                if state.discovered_cells.contains(&target) {
                    let unit = &mut state.units[idx];
                    unit.exploration_target = None;
                    if unit
                        .active_command
                        .as_ref()
                        .is_some_and(|c| c.has_label(CommandLabel::Exploring))
                    {
                        unit.halt();
                    }
                }
            }

            let unit = &state.units[idx];
            let exploring = unit
                .active_command
                .as_ref()
                .map_or(true, |c| c.has_label(CommandLabel::Exploring));
            if !is_available(unit) || !exploring {
                continue;
            }

            let claimed: BTreeSet<CellCoord> = state
                .units
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != idx)
                .filter_map(|(_, u)| u.exploration_target)
                .collect();
            let others: Vec<Vec2> = state
                .units
                .iter()
                .enumerate()
                .filter(|(j, u)| *j != idx && u.is_active())
                .map(|(_, u)| u.pos)
                .collect();
            let filter = FrontierFilter {
                claimed: &claimed,
                others: &others,
                target_spacing,
                unit_spacing,
            };
            let candidate = find_frontier(ctx.graph, &state.doors, unit.cell(), &state.discovered_cells, &filter);

            let pos = unit.pos;
            let current = unit.exploration_target;
            let chosen = match (current, candidate) {
                (None, Some(c)) => Some(c),
                (Some(cur), Some(c)) if c != cur => {
                    let switch = pos.distance(&c.center())
                        < ctx.config.exploration_switch_ratio * pos.distance(&cur.center());
                    switch.then_some(c)
                }
                // Stalled on its current target; walk there again
                (Some(cur), _) if unit.active_command.is_none() => Some(cur),
                _ => None,
            };

            if let Some(target) = chosen {
                let unit_id = unit.id.clone();
                state.units[idx].exploration_target = Some(target);
                debug!(unit = %unit_id, %target, "Exploring");
                let command = Command::autonomous(&unit_id, CommandKind::MoveTo { target }, CommandLabel::Exploring);
                issue(state, ctx.graph, ctx.config, idx, command, false);
            }
        }
    }
}
