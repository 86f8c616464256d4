//! Consumable item use
//!
//! Items come out of the shared squad inventory. Channeled items take
//! effect when the channel completes; the rest resolve on the spot.

use tracing::debug;

use crate::core::config::EngineConfig;
use crate::core::types::{CellCoord, Vec2};
use crate::mission::commands::{Command, CommandKind};
use crate::mission::constants::ITEM_USE_REACH;
use crate::mission::library::{self, Item, ItemAction};
use crate::mission::loot::{Mine, Turret};
use crate::mission::state::GameState;
use crate::mission::units::{ChannelAction, Channeling, UnitState};

/// Outcome of trying to use an item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemUse {
    Started,
    /// Out of reach; walk to this cell first
    Approach(CellCoord),
    Rejected,
}

struct ItemTarget {
    item: &'static Item,
    action: ItemAction,
    pos: Vec2,
    unit_idx: Option<usize>,
}

fn resolve_target(state: &GameState, idx: usize, command: &Command) -> Option<ItemTarget> {
    let CommandKind::UseItem {
        item_id,
        target,
        target_unit_id,
    } = &command.kind
    else {
        return None;
    };
    let item = library::item(item_id)?;
    let action = item.action?;
    let user = &state.units[idx];

    match action {
        ItemAction::Heal => {
            let target_idx = if item.is_self_heal() {
                idx
            } else {
                match target_unit_id {
                    Some(id) => state.unit_index(id)?,
                    None => idx,
                }
            };
            let patient = &state.units[target_idx];
            patient.is_active().then(|| ItemTarget {
                item,
                action,
                pos: patient.pos,
                unit_idx: Some(target_idx),
            })
        }
        ItemAction::Grenade => target.map(|cell| ItemTarget {
            item,
            action,
            pos: cell.center(),
            unit_idx: None,
        }),
        ItemAction::Mine | ItemAction::Sentry | ItemAction::Scanner => Some(ItemTarget {
            item,
            action,
            pos: target.map(|c| c.center()).unwrap_or(user.pos),
            unit_idx: None,
        }),
    }
}

/// Start using the item named by a `UseItem` command
pub fn begin_item_use(state: &mut GameState, config: &EngineConfig, idx: usize, command: &Command) -> ItemUse {
    let CommandKind::UseItem { item_id, .. } = &command.kind else {
        return ItemUse::Rejected;
    };
    if state.squad_inventory.get(item_id).copied().unwrap_or(0) == 0 {
        debug!(item = %item_id, "Item not in squad inventory");
        return ItemUse::Rejected;
    }
    let Some(target) = resolve_target(state, idx, command) else {
        debug!(item = %item_id, "Item use has no valid target");
        return ItemUse::Rejected;
    };

    let needs_reach = matches!(target.action, ItemAction::Heal | ItemAction::Mine | ItemAction::Sentry);
    if needs_reach && state.units[idx].pos.distance(&target.pos) > ITEM_USE_REACH {
        return ItemUse::Approach(target.pos.cell());
    }

    if target.item.channeled {
        let unit = &mut state.units[idx];
        let duration = config.channel_duration(config.use_item_base_ms, unit.stats.speed);
        unit.path.clear();
        unit.target_pos = None;
        unit.state = UnitState::Channeling;
        unit.channeling = Some(Channeling {
            action: ChannelAction::UseItem,
            remaining: duration,
            total: duration,
            target_id: Some(item_id.clone()),
        });
        unit.active_command = Some(command.clone());
    } else {
        apply_item(state, config, idx, command);
        state.units[idx].halt();
    }
    ItemUse::Started
}

/// Resolve an item's effect and take it out of the inventory
pub fn apply_item(state: &mut GameState, config: &EngineConfig, idx: usize, command: &Command) {
    let Some(target) = resolve_target(state, idx, command) else {
        return;
    };
    let owner_id = state.units[idx].id.clone();

    match target.action {
        ItemAction::Heal => {
            if let Some(patient) = target.unit_idx.map(|i| &mut state.units[i]) {
                let amount = target.item.heal_amount.unwrap_or(config.default_heal);
                patient.hp = (patient.hp + amount).min(patient.max_hp);
            }
        }
        ItemAction::Grenade => {
            let cell = target.pos.cell();
            let damage = config.grenade_damage;
            let mut dealt = 0.0;
            let mut kills = 0;
            for enemy in state.enemies.iter_mut().filter(|e| e.is_alive() && e.cell() == cell) {
                enemy.hp -= damage;
                dealt += damage;
                if enemy.hp <= 0.0 {
                    kills += 1;
                }
            }
            for unit in state.units.iter_mut().filter(|u| u.is_active() && u.cell() == cell) {
                unit.hp -= damage;
            }
            let thrower = &mut state.units[idx];
            thrower.damage_dealt += dealt;
            thrower.kills += kills;
        }
        ItemAction::Scanner => {
            let center = target.pos.cell();
            let r = config.scanner_radius;
            for dy in -r..=r {
                for dx in -r..=r {
                    let cell = CellCoord::new(center.x + dx, center.y + dy);
                    if state.map.in_bounds(cell) && center.euclidean(&cell) <= r as f64 {
                        state.discovered_cells.insert(cell);
                    }
                }
            }
        }
        ItemAction::Mine => {
            let id = state.next_id("mine");
            state.mines.push(Mine {
                id,
                pos: target.pos.cell().center(),
                damage: config.mine_damage,
                radius: config.mine_radius,
                owner_id,
            });
        }
        ItemAction::Sentry => {
            let id = state.next_id("turret");
            state.turrets.push(Turret {
                id,
                pos: target.pos.cell().center(),
                damage: library::SENTRY_DAMAGE,
                fire_rate: library::SENTRY_FIRE_RATE,
                accuracy: library::SENTRY_ACCURACY,
                attack_range: library::SENTRY_RANGE,
                owner_id,
                last_attack_time: None,
            });
        }
    }

    consume(state, target.item.id);
}

fn consume(state: &mut GameState, item_id: &str) {
    if let Some(count) = state.squad_inventory.get_mut(item_id) {
        *count = count.saturating_sub(1);
        if *count == 0 {
            state.squad_inventory.remove(item_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::state::tests::{empty_state, with_unit};

    fn use_item(item: &str, target: Option<CellCoord>) -> Command {
        Command::new(
            &["medic-1"],
            CommandKind::UseItem {
                item_id: item.into(),
                target,
                target_unit_id: None,
            },
        )
    }

    #[test]
    fn test_medkit_channels_scaled_by_speed() {
        let mut state = with_unit(empty_state(), "assault", CellCoord::new(2, 2));
        state.squad_inventory.insert("medkit".into(), 1);
        let config = EngineConfig::default();
        let result = begin_item_use(&mut state, &config, 0, &use_item("medkit", None));
        assert_eq!(result, ItemUse::Started);
        let channel = state.units[0].channeling.as_ref().unwrap();
        assert_eq!(channel.action, ChannelAction::UseItem);
        assert!((channel.total - 4500.0).abs() < 1e-9);
        assert_eq!(state.squad_inventory.get("medkit"), Some(&1));
    }

    #[test]
    fn test_stimpack_is_instant_and_consumed() {
        let mut state = with_unit(empty_state(), "assault", CellCoord::new(2, 2));
        state.units[0].hp = 50.0;
        state.squad_inventory.insert("stimpack".into(), 1);
        let config = EngineConfig::default();
        begin_item_use(&mut state, &config, 0, &use_item("stimpack", None));
        assert_eq!(state.units[0].hp, 75.0);
        assert_eq!(state.units[0].state, UnitState::Idle);
        assert!(state.squad_inventory.get("stimpack").is_none());
    }

    #[test]
    fn test_empty_inventory_rejected() {
        let mut state = with_unit(empty_state(), "assault", CellCoord::new(2, 2));
        let config = EngineConfig::default();
        let result = begin_item_use(&mut state, &config, 0, &use_item("medkit", None));
        assert_eq!(result, ItemUse::Rejected);
    }

    #[test]
    fn test_mine_out_of_reach_needs_approach() {
        let mut state = with_unit(empty_state(), "assault", CellCoord::new(0, 0));
        state.squad_inventory.insert("mine".into(), 2);
        let config = EngineConfig::default();
        let result = begin_item_use(&mut state, &config, 0, &use_item("mine", Some(CellCoord::new(4, 4))));
        assert_eq!(result, ItemUse::Approach(CellCoord::new(4, 4)));
    }

    #[test]
    fn test_scanner_reveals_radius() {
        let mut state = with_unit(empty_state(), "scout", CellCoord::new(0, 0));
        state.squad_inventory.insert("scanner".into(), 1);
        let config = EngineConfig::default();
        begin_item_use(&mut state, &config, 0, &use_item("scanner", Some(CellCoord::new(3, 3))));
        assert!(state.discovered_cells.contains(&CellCoord::new(3, 3)));
        assert!(state.discovered_cells.contains(&CellCoord::new(5, 5)));
        assert!(!state.discovered_cells.contains(&CellCoord::new(9, 9)));
    }

    #[test]
    fn test_grenade_hits_target_cell() {
        use crate::mission::library::EnemyKind;
        use crate::mission::units::Enemy;

        let mut state = with_unit(empty_state(), "assault", CellCoord::new(0, 0));
        state.squad_inventory.insert("frag_grenade".into(), 1);
        state.enemies.push(Enemy::spawn("enemy-1".into(), EnemyKind::XenoMite, Vec2::new(4.5, 4.5), 30.0));
        let config = EngineConfig::default();
        begin_item_use(&mut state, &config, 0, &use_item("frag_grenade", Some(CellCoord::new(4, 4))));
        assert!(state.enemies[0].hp <= 0.0);
        assert_eq!(state.units[0].kills, 1);
    }
}
