//! VIP behavior
//!
//! The VIP is not a soldier and never takes squad AI orders. Each tick it
//! flees the nearest visible threat, otherwise heads for a discovered
//! extraction, otherwise follows the nearest armed ally.

use super::{AiContext, SquadBehavior};
use crate::core::types::CellCoord;
use crate::mission::commands::{issue, Command, CommandKind, CommandLabel};
use crate::mission::graph::Graph;
use crate::mission::state::GameState;
use crate::mission::units::UnitState;

/// Allies closer than this are close enough to not follow
const FOLLOW_DISTANCE: f64 = 2.0;
const FLEE_MIN_STEP: i32 = 2;
const FLEE_MAX_STEP: i32 = 4;

/// Discovered floor cell 2-4 tiles away in one of eight directions,
/// farthest from `threat`
pub fn flee_cell(state: &GameState, graph: &Graph, from: CellCoord, threat: CellCoord) -> Option<CellCoord> {
    let mut best: Option<(CellCoord, f64)> = None;
    for (dx, dy) in [(0, -1), (1, -1), (1, 0), (1, 1), (0, 1), (-1, 1), (-1, 0), (-1, -1)] {
        for step in FLEE_MIN_STEP..=FLEE_MAX_STEP {
            let cell = CellCoord::new(from.x + dx * step, from.y + dy * step);
            if !graph.is_walkable(cell) || !state.discovered_cells.contains(&cell) {
                continue;
            }
            let dist = cell.euclidean(&threat);
            if best.map_or(true, |(_, d)| dist > d) {
                best = Some((cell, dist));
            }
        }
    }
    best.map(|(cell, _)| cell)
}

pub struct VipBehavior;

impl SquadBehavior for VipBehavior {
    fn name(&self) -> &'static str {
        "vip"
    }

    fn run(&self, ctx: &mut AiContext<'_>) {
        for idx in 0..ctx.state.units.len() {
            let state = &*ctx.state;
            let vip = &state.units[idx];
            if !vip.is_vip() || !vip.is_active() || vip.state == UnitState::Channeling {
                continue;
            }
            // Manual orders to the VIP take precedence
            if vip.active_command.as_ref().is_some_and(|c| !c.is_autonomous()) {
                continue;
            }

            let threat = state
                .enemies
                .iter()
                .filter(|e| e.is_alive() && state.visible_cells.contains(&e.cell()))
                .map(|e| (e.cell(), vip.pos.distance(&e.pos)))
                .filter(|(_, d)| *d < ctx.config.vip_flee_distance)
                .fold(None::<(CellCoord, f64)>, |best, (c, d)| match best {
                    Some((_, bd)) if bd <= d => best,
                    _ => Some((c, d)),
                });
            let extraction = state
                .map
                .extraction
                .filter(|c| state.discovered_cells.contains(c));
            let ally = state
                .units
                .iter()
                .filter(|u| u.is_active() && !u.is_vip() && u.stats.damage > 0.0)
                .map(|u| (u.cell(), vip.pos.distance(&u.pos)))
                .fold(None::<(CellCoord, f64)>, |best, (c, d)| match best {
                    Some((_, bd)) if bd <= d => best,
                    _ => Some((c, d)),
                });

            let plan = if let Some((threat_cell, _)) = threat {
                flee_cell(state, ctx.graph, vip.cell(), threat_cell).map(|c| (c, CommandLabel::Fleeing))
            } else if let Some(cell) = extraction {
                (vip.cell() != cell).then_some((cell, CommandLabel::Extracting))
            } else {
                ally.filter(|(_, d)| *d > FOLLOW_DISTANCE)
                    .map(|(c, _)| (c, CommandLabel::Following))
            };

            let Some((target, label)) = plan else {
                continue;
            };
            let current = vip.active_command.as_ref().and_then(|c| match c.kind {
                CommandKind::MoveTo { target } => Some((target, c.label)),
                _ => None,
            });
            if current == Some((target, Some(label))) {
                continue;
            }

            let command = Command::autonomous(&vip.id, CommandKind::MoveTo { target }, label);
            issue(ctx.state, ctx.graph, ctx.config, idx, command, false);
        }
    }
}
