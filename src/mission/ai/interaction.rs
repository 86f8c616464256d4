//! Arrival behavior: turning a finished approach into a channel
//!
//! Runs after movement. Units that reached a pickup, item target, or the
//! extraction point start the matching channel. Idle units standing on a
//! pending objective or on a secured extraction start one on their own.

use tracing::debug;

use crate::core::config::EngineConfig;
use crate::mission::channeling::start_channel;
use crate::mission::commands::CommandKind;
use crate::mission::constants::PICKUP_REACH;
use crate::mission::graph::Graph;
use crate::mission::items::{begin_item_use, ItemUse};
use crate::mission::objectives::{objectives_secured, ObjectiveKind};
use crate::mission::state::GameState;
use crate::mission::units::{ChannelAction, UnitState};

fn arrived(state: &GameState, idx: usize) -> bool {
    let unit = &state.units[idx];
    unit.path.is_empty() && unit.target_pos.is_none()
}

/// Collectable objective in the unit's cell, if any
fn objective_here(state: &GameState, idx: usize) -> Option<String> {
    let cell = state.units[idx].cell();
    state
        .objectives
        .iter()
        .find(|o| {
            o.kind == ObjectiveKind::Recover
                && o.is_pending()
                && o.target_cell == Some(cell)
                && !state.is_carried(&o.id)
                && !state.is_dropped(&o.id)
        })
        .map(|o| o.id.clone())
}

pub fn update_interaction(state: &mut GameState, _graph: &Graph, config: &EngineConfig, idx: usize) {
    let unit = &state.units[idx];
    if !unit.is_active() || unit.state == UnitState::Channeling {
        return;
    }
    let at_extraction = state.map.extraction == Some(unit.cell());

    match unit.active_command.as_ref().map(|c| c.kind.clone()) {
        Some(CommandKind::Pickup { target_id }) if arrived(state, idx) => {
            let pos = unit.pos;
            let loot_in_reach = state.loot.iter().any(|l| {
                l.id == target_id
                    && (l.pos.x - pos.x).abs() <= PICKUP_REACH
                    && (l.pos.y - pos.y).abs() <= PICKUP_REACH
            });
            if loot_in_reach {
                start_channel(state, config, idx, ChannelAction::Pickup, Some(target_id));
            } else if objective_here(state, idx).as_deref() == Some(target_id.as_str()) {
                start_channel(state, config, idx, ChannelAction::Collect, Some(target_id));
            } else {
                debug!(unit = %unit.id, target = %target_id, "Pickup target gone");
                state.units[idx].halt();
            }
        }
        Some(CommandKind::UseItem { .. }) if arrived(state, idx) => {
            let Some(command) = unit.active_command.clone() else {
                return;
            };
            match begin_item_use(state, config, idx, &command) {
                ItemUse::Started => {}
                ItemUse::Approach(_) | ItemUse::Rejected => state.units[idx].halt(),
            }
        }
        Some(CommandKind::Extract) if arrived(state, idx) => {
            if at_extraction {
                start_channel(state, config, idx, ChannelAction::Extract, None);
            } else {
                state.units[idx].halt();
            }
        }
        None => {
            if unit.is_vip() {
                if at_extraction {
                    start_channel(state, config, idx, ChannelAction::Extract, None);
                }
            } else if let Some(objective_id) = objective_here(state, idx) {
                start_channel(state, config, idx, ChannelAction::Collect, Some(objective_id));
            } else if at_extraction && objectives_secured(state) {
                start_channel(state, config, idx, ChannelAction::Extract, None);
            }
        }
        // Nothing left to walk and nothing to do on arrival
        Some(kind)
            if unit.state == UnitState::Moving
                && arrived(state, idx)
                && !matches!(kind, CommandKind::EscortUnit { .. }) =>
        {
            state.units[idx].halt();
        }
        _ => {}
    }
}
