//! Timed actions: pickup, collect, item use, and extraction
//!
//! A channel holds the unit in place for `base * (30 / speed)` ms. It is
//! cancelled when its target disappears and applies its effect on
//! completion.

use tracing::debug;

use crate::core::config::EngineConfig;
use crate::core::types::Millis;
use crate::mission::commands::{Command, CommandKind, CommandLabel};
use crate::mission::constants::SCRAP_CRATE_ITEM;
use crate::mission::items::apply_item;
use crate::mission::objectives::ObjectiveState;
use crate::mission::state::GameState;
use crate::mission::units::{ChannelAction, Channeling, UnitState};

/// Put a unit into a channel for `action`
///
/// Units that start a channel without a command (idle arrivals) get a
/// synthesized one so the active-command invariant holds.
pub fn start_channel(
    state: &mut GameState,
    config: &EngineConfig,
    idx: usize,
    action: ChannelAction,
    target_id: Option<String>,
) {
    let base = match action {
        ChannelAction::Pickup => config.pickup_base_ms,
        ChannelAction::Collect => config.collect_base_ms,
        ChannelAction::UseItem => config.use_item_base_ms,
        ChannelAction::Extract => config.extract_base_ms,
    };
    let unit = &mut state.units[idx];
    let duration = config.channel_duration(base, unit.stats.speed);

    if unit.active_command.is_none() {
        let kind = match (&action, &target_id) {
            (ChannelAction::Extract, _) | (_, None) => CommandKind::Extract,
            (_, Some(id)) => CommandKind::Pickup { target_id: id.clone() },
        };
        let label = if kind == CommandKind::Extract {
            CommandLabel::Extracting
        } else {
            CommandLabel::Claiming
        };
        unit.active_command = Some(Command::autonomous(&unit.id, kind, label));
    }

    unit.path.clear();
    unit.target_pos = None;
    unit.state = UnitState::Channeling;
    unit.channeling = Some(Channeling {
        action,
        remaining: duration,
        total: duration,
        target_id,
    });
    debug!(unit = %unit.id, ?action, duration, "Channel started");
}

fn target_still_valid(state: &GameState, idx: usize, channel: &Channeling) -> bool {
    let target = channel.target_id.as_deref();
    match channel.action {
        ChannelAction::Extract => true,
        ChannelAction::Pickup => target.is_some_and(|id| state.loot.iter().any(|l| l.id == id)),
        ChannelAction::Collect => target.is_some_and(|id| {
            let unit_id = &state.units[idx].id;
            state.objective(id).is_some_and(|o| o.is_pending())
                && !state.is_dropped(id)
                && !state
                    .units
                    .iter()
                    .any(|u| &u.id != unit_id && u.is_active() && u.carried_objective_id.as_deref() == Some(id))
        }),
        ChannelAction::UseItem => {
            target.is_some_and(|id| state.squad_inventory.get(id).copied().unwrap_or(0) > 0)
        }
    }
}

/// Count down one unit's channel and resolve it when done
pub fn update_channel(state: &mut GameState, config: &EngineConfig, idx: usize, dt: Millis) {
    let unit = &state.units[idx];
    if unit.state != UnitState::Channeling {
        return;
    }
    let Some(channel) = unit.channeling.clone() else {
        state.units[idx].halt();
        return;
    };

    if !target_still_valid(state, idx, &channel) {
        debug!(unit = %unit.id, action = ?channel.action, "Channel target gone, cancelling");
        state.units[idx].halt();
        return;
    }

    let remaining = channel.remaining - dt;
    if remaining > 0.0 {
        if let Some(c) = state.units[idx].channeling.as_mut() {
            c.remaining = remaining;
        }
        return;
    }

    let command = state.units[idx].active_command.take();
    state.units[idx].halt();
    complete(state, config, idx, &channel, command);
}

fn complete(
    state: &mut GameState,
    config: &EngineConfig,
    idx: usize,
    channel: &Channeling,
    command: Option<Command>,
) {
    let target = channel.target_id.clone();
    match channel.action {
        ChannelAction::Extract => {
            let carried = state.units[idx].carried_objective_id.take();
            let unit = &mut state.units[idx];
            unit.state = UnitState::Extracted;
            if carried.is_some() {
                unit.objectives_completed += 1;
            }
            debug!(unit = %unit.id, "Unit extracted");
            if let Some(id) = carried {
                if let Some(objective) = state.objective_mut(&id) {
                    objective.state = ObjectiveState::Completed;
                }
            }
        }
        ChannelAction::Collect => {
            let Some(id) = target else { return };
            let carryable = state.objective(&id).is_some_and(|o| o.carryable);
            if carryable {
                let unit = &mut state.units[idx];
                unit.carried_objective_id = Some(id);
                unit.recalculate_stats();
            } else if let Some(objective) = state.objective_mut(&id) {
                objective.state = ObjectiveState::Completed;
                state.units[idx].objectives_completed += 1;
            }
        }
        ChannelAction::Pickup => {
            let Some(pos) = target
                .as_deref()
                .and_then(|id| state.loot.iter().position(|l| l.id == id))
            else {
                return;
            };
            let loot = state.loot.remove(pos);
            match loot.objective_id {
                Some(objective_id) => {
                    let unit = &mut state.units[idx];
                    unit.carried_objective_id = Some(objective_id);
                    unit.recalculate_stats();
                }
                None if loot.item_id != SCRAP_CRATE_ITEM => {
                    *state.squad_inventory.entry(loot.item_id).or_insert(0) += 1;
                }
                None => {}
            }
        }
        ChannelAction::UseItem => {
            if let Some(command) = command {
                apply_item(state, config, idx, &command);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{CellCoord, Vec2};
    use crate::mission::objectives::Objective;
    use crate::mission::state::tests::{empty_state, with_unit};

    fn config() -> EngineConfig {
        EngineConfig::default()
    }

    #[test]
    fn test_extract_duration_scaled() {
        let mut state = with_unit(empty_state(), "assault", CellCoord::new(1, 1));
        start_channel(&mut state, &config(), 0, ChannelAction::Extract, None);
        let unit = &state.units[0];
        assert_eq!(unit.state, UnitState::Channeling);
        assert!((unit.channeling.as_ref().unwrap().total - 7500.0).abs() < 1e-9);
        assert!(unit.active_command.is_some());
    }

    #[test]
    fn test_extract_completes() {
        let mut state = with_unit(empty_state(), "scout", CellCoord::new(1, 1));
        start_channel(&mut state, &config(), 0, ChannelAction::Extract, None);
        update_channel(&mut state, &config(), 0, 4000.0);
        assert_eq!(state.units[0].state, UnitState::Channeling);
        update_channel(&mut state, &config(), 0, 1000.0);
        assert_eq!(state.units[0].state, UnitState::Extracted);
        assert!(state.units[0].active_command.is_none());
        assert!(state.units[0].channeling.is_none());
    }

    #[test]
    fn test_pickup_adds_to_inventory() {
        let mut state = with_unit(empty_state(), "scout", CellCoord::new(1, 1));
        let loot = state.spawn_loot("medkit", Vec2::new(1.5, 1.5), None);
        start_channel(&mut state, &config(), 0, ChannelAction::Pickup, Some(loot));
        assert!((state.units[0].channeling.as_ref().unwrap().total - 3000.0).abs() < 1e-9);
        update_channel(&mut state, &config(), 0, 3000.0);
        assert!(state.loot.is_empty());
        assert_eq!(state.squad_inventory.get("medkit"), Some(&1));
        assert_eq!(state.units[0].state, UnitState::Idle);
    }

    #[test]
    fn test_pickup_cancelled_when_loot_vanishes() {
        let mut state = with_unit(empty_state(), "scout", CellCoord::new(1, 1));
        let loot = state.spawn_loot("medkit", Vec2::new(1.5, 1.5), None);
        start_channel(&mut state, &config(), 0, ChannelAction::Pickup, Some(loot));
        state.loot.clear();
        update_channel(&mut state, &config(), 0, 100.0);
        assert_eq!(state.units[0].state, UnitState::Idle);
        assert!(state.units[0].channeling.is_none());
    }

    #[test]
    fn test_collect_artifact_is_carried_until_extraction() {
        let mut state = with_unit(empty_state(), "scout", CellCoord::new(1, 1));
        state
            .objectives
            .push(Objective::recover("artifact-1".into(), CellCoord::new(1, 1), true));
        start_channel(&mut state, &config(), 0, ChannelAction::Collect, Some("artifact-1".into()));
        update_channel(&mut state, &config(), 0, 3000.0);
        assert_eq!(state.units[0].carried_objective_id.as_deref(), Some("artifact-1"));
        assert!(state.objectives[0].is_pending());
        assert_eq!(state.units[0].stats.speed, 20.0);

        start_channel(&mut state, &config(), 0, ChannelAction::Extract, None);
        update_channel(&mut state, &config(), 0, 20_000.0);
        assert!(state.objectives[0].is_completed());
        assert_eq!(state.units[0].objectives_completed, 1);
    }

    #[test]
    fn test_collect_intel_completes_immediately() {
        let mut state = with_unit(empty_state(), "scout", CellCoord::new(1, 1));
        state
            .objectives
            .push(Objective::recover("intel-1".into(), CellCoord::new(1, 1), false));
        start_channel(&mut state, &config(), 0, ChannelAction::Collect, Some("intel-1".into()));
        update_channel(&mut state, &config(), 0, 3000.0);
        assert!(state.objectives[0].is_completed());
        assert!(state.units[0].carried_objective_id.is_none());
    }
}
