//! Soldier and turret fire
//!
//! Each tick a soldier re-picks its weapon, chooses a target among the
//! visible enemies it has line of fire to, and fires when off cooldown.

use tracing::debug;

use crate::core::rng::SimRng;
use crate::core::types::Vec2;
use crate::mission::constants::{ATTACK_RANGE_TOLERANCE, MIN_FIRE_DISTANCE, TARGET_PROXIMITY_WEIGHT};
use crate::mission::graph::Graph;
use crate::mission::line_of_sight::LineOfSight;
use crate::mission::state::GameState;
use crate::mission::units::{EngagementPolicy, UnitState};

/// Result of one shot
#[derive(Debug, Clone, Default)]
pub struct AttackResult {
    pub hit: bool,
    pub damage: f64,
    pub killed: bool,
}

/// Chance that a soldier or turret shot at `dist` lands
pub fn hit_chance(accuracy: f64, range: f64, dist: f64) -> f64 {
    (accuracy / 100.0 * range / dist.max(MIN_FIRE_DISTANCE)).clamp(0.0, 1.0)
}

/// Target preference: wounded and close enemies first
pub fn target_score(max_hp: f64, hp: f64, dist: f64) -> f64 {
    (max_hp - hp) + TARGET_PROXIMITY_WEIGHT / dist.max(MIN_FIRE_DISTANCE)
}

/// Index and distance of the best enemy `shooter` can fire on
fn choose_target(
    state: &GameState,
    los: &LineOfSight,
    shooter: Vec2,
    reach: f64,
    forced: Option<&str>,
) -> Option<(usize, f64)> {
    let candidates: Vec<(usize, f64)> = state
        .enemies
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_alive() && state.visible_cells.contains(&e.cell()))
        .map(|(i, e)| (i, shooter.distance(&e.pos)))
        .filter(|(i, dist)| *dist <= reach && los.has_line_of_fire(shooter, state.enemies[*i].pos))
        .collect();

    if let Some(forced) = forced {
        if let Some(hit) = candidates.iter().find(|(i, _)| state.enemies[*i].id == forced) {
            return Some(*hit);
        }
    }

    let mut best: Option<(usize, f64, f64)> = None;
    for (i, dist) in candidates {
        let enemy = &state.enemies[i];
        let score = target_score(enemy.max_hp, enemy.hp, dist);
        let better = match best {
            None => true,
            Some((_, best_dist, best_score)) => {
                score > best_score || (score == best_score && dist < best_dist)
            }
        };
        if better {
            best = Some((i, dist, score));
        }
    }
    best.map(|(i, dist, _)| (i, dist))
}

/// Weapon choice, targeting, and firing for one soldier
pub fn update_unit_combat(state: &mut GameState, graph: &Graph, rng: &mut SimRng, idx: usize) {
    {
        let unit = &state.units[idx];
        if !unit.is_active() || unit.state == UnitState::Channeling || unit.stats.damage <= 0.0 {
            return;
        }
    }

    let los = LineOfSight::new(graph, &state.doors);
    let pos = state.units[idx].pos;
    let nearest = state
        .enemies
        .iter()
        .filter(|e| e.is_alive() && state.visible_cells.contains(&e.cell()))
        .map(|e| pos.distance(&e.pos))
        .reduce(f64::min);
    state.units[idx].select_weapon(nearest);

    let unit = &state.units[idx];
    let cell = unit.cell();
    let locked_in_melee = state.enemies.iter().any(|e| e.is_alive() && e.cell() == cell);
    let can_fire = unit.engagement_policy == EngagementPolicy::Engage || locked_in_melee;
    let reach = unit.stats.attack_range + ATTACK_RANGE_TOLERANCE;
    let target = if can_fire {
        choose_target(state, &los, pos, reach, unit.forced_target_id.as_deref())
    } else {
        None
    };

    let now = state.t;
    let unit = &mut state.units[idx];
    let Some((target_idx, dist)) = target else {
        unit.forced_target_id = None;
        if unit.state == UnitState::Attacking {
            unit.state = if unit.active_command.is_some() {
                UnitState::Moving
            } else {
                UnitState::Idle
            };
        }
        return;
    };

    if unit.active_command.is_some() && unit.state == UnitState::Moving {
        unit.state = UnitState::Attacking;
    }
    // Stay on the chosen enemy until it dies or drops out of reach
    if unit.forced_target_id.as_deref() != Some(state.enemies[target_idx].id.as_str()) {
        unit.forced_target_id = Some(state.enemies[target_idx].id.clone());
    }

    let ready = unit
        .last_attack_time
        .map_or(true, |last| now - last >= unit.stats.fire_rate);
    if !ready {
        return;
    }

    let enemy = &mut state.enemies[target_idx];
    let chance = hit_chance(unit.stats.accuracy, unit.stats.attack_range, dist);
    let mut result = AttackResult::default();
    if rng.next_f64() <= chance {
        let was_alive = enemy.is_alive();
        enemy.hp -= unit.stats.damage;
        result.hit = true;
        result.damage = unit.stats.damage;
        result.killed = was_alive && !enemy.is_alive();
    }

    unit.last_attack_time = Some(now);
    unit.last_attack_target = Some(enemy.pos);
    unit.damage_dealt += result.damage;
    if result.killed {
        unit.kills += 1;
        unit.forced_target_id = None;
        debug!(unit = %unit.id, enemy = %enemy.id, "Enemy killed");
    }
}

/// Fire every deployed turret at its nearest reachable enemy
pub fn update_turrets(state: &mut GameState, graph: &Graph, rng: &mut SimRng) {
    let now = state.t;
    let los = LineOfSight::new(graph, &state.doors);
    for turret in state.turrets.iter_mut() {
        if turret.last_attack_time.is_some_and(|last| now - last < turret.fire_rate) {
            continue;
        }
        let target = state
            .enemies
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_alive())
            .map(|(i, e)| (i, turret.pos.distance(&e.pos)))
            .filter(|(i, d)| {
                *d <= turret.attack_range + ATTACK_RANGE_TOLERANCE
                    && los.has_line_of_fire(turret.pos, state.enemies[*i].pos)
            })
            .fold(None::<(usize, f64)>, |best, (i, d)| match best {
                Some((_, bd)) if bd <= d => best,
                _ => Some((i, d)),
            });

        if let Some((i, dist)) = target {
            turret.last_attack_time = Some(now);
            if rng.next_f64() <= hit_chance(turret.accuracy, turret.attack_range, dist) {
                state.enemies[i].hp -= turret.damage;
            }
        }
    }
}
