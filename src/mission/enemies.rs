//! Enemy behavior: chase, kite, attack, and move
//!
//! Melee enemies chase the nearest soldier they can see. Ranged enemies
//! keep to the edge of their weapon range and back off when crowded.
//! Without a target, enemies wander between random floor cells.

use tracing::debug;

use crate::core::config::EngineConfig;
use crate::core::rng::SimRng;
use crate::core::types::{CellCoord, Millis};
use crate::mission::constants::{ATTACK_RANGE_TOLERANCE, MIN_FIRE_DISTANCE};
use crate::mission::graph::Graph;
use crate::mission::library::EnemyAi;
use crate::mission::line_of_sight::LineOfSight;
use crate::mission::movement::step_along_path;
use crate::mission::pathfinding::{can_traverse, find_path_from, DoorPolicy};
use crate::mission::state::GameState;

/// Ranged enemies retreat from soldiers closer than this (tiles)
const KITE_MIN_DISTANCE: f64 = 3.0;

/// Chance that an enemy attack lands
///
/// `accuracy` is a dispersion angle in degrees; zero never misses.
pub fn enemy_hit_chance(accuracy: f64, dist: f64) -> f64 {
    if accuracy <= 0.0 {
        return 1.0;
    }
    let spread = dist.max(MIN_FIRE_DISTANCE) * accuracy.to_radians().tan();
    if spread <= 0.0 {
        1.0
    } else {
        (0.5 / spread).clamp(0.0, 1.0)
    }
}

/// Run every enemy for one tick
pub fn update_enemies(state: &mut GameState, graph: &Graph, config: &EngineConfig, rng: &mut SimRng, dt: Millis) {
    for i in 0..state.enemies.len() {
        let enemy = &state.enemies[i];
        if !enemy.is_alive() || (enemy.speed <= 0.0 && enemy.damage <= 0.0) {
            continue;
        }
        think(state, graph, config, rng, i);
        if !attack(state, graph, rng, i) {
            let doors = &state.doors;
            let enemy = &mut state.enemies[i];
            if enemy.speed > 0.0 {
                step_along_path(
                    graph,
                    doors,
                    &mut enemy.pos,
                    &mut enemy.path,
                    &mut enemy.target_pos,
                    enemy.speed,
                    dt,
                );
            }
        }
    }
}

/// Remove dead enemies, returning how many were removed
pub fn remove_dead_enemies(state: &mut GameState) -> u32 {
    let before = state.enemies.len();
    state.enemies.retain(|e| e.is_alive());
    let removed = (before - state.enemies.len()) as u32;
    state.stats.aliens_killed += removed;
    removed
}

fn set_path(state: &mut GameState, graph: &Graph, i: usize, goal: CellCoord) {
    let path = find_path_from(graph, &state.doors, state.enemies[i].pos, goal, DoorPolicy::ThroughClosed);
    let enemy = &mut state.enemies[i];
    enemy.path = path.unwrap_or_default();
    enemy.target_pos = enemy.path.first().map(|c| c.center());
}

fn think(state: &mut GameState, graph: &Graph, config: &EngineConfig, rng: &mut SimRng, i: usize) {
    let enemy = &state.enemies[i];
    if enemy.speed <= 0.0 {
        return;
    }

    let los = LineOfSight::new(graph, &state.doors);
    let target = state
        .units
        .iter()
        .filter(|u| u.is_active())
        .map(|u| (u, enemy.pos.distance(&u.pos)))
        .filter(|(u, d)| *d <= config.enemy_detection_range && los.has_line_of_sight(enemy.pos, u.pos))
        .fold(None, |best: Option<(&crate::mission::units::Unit, f64)>, (u, d)| match best {
            Some((_, bd)) if bd <= d => best,
            _ => Some((u, d)),
        })
        .map(|(u, d)| (u.id.clone(), u.pos, d));

    let Some((unit_id, unit_pos, dist)) = target else {
        state.enemies[i].target_unit_id = None;
        if state.enemies[i].path.is_empty() {
            let cells = graph.floor_cells();
            if !cells.is_empty() {
                let pick = rng.next_int(0, cells.len() as i64 - 1) as usize;
                set_path(state, graph, i, cells[pick]);
            }
        }
        return;
    };

    let ai = enemy.ai;
    let attack_range = enemy.attack_range;
    let here = enemy.cell();
    let goal = unit_pos.cell();
    state.enemies[i].target_unit_id = Some(unit_id);

    let chase = match ai {
        EnemyAi::Melee => true,
        EnemyAi::Ranged if dist < KITE_MIN_DISTANCE => {
            let away = graph
                .neighbors(here)
                .into_iter()
                .filter(|n| can_traverse(graph, &state.doors, here, *n, DoorPolicy::ThroughClosed))
                .map(|n| (n, n.center().distance(&unit_pos)))
                .filter(|(_, d)| *d > dist)
                .fold(None::<(CellCoord, f64)>, |best, (n, d)| match best {
                    Some((_, bd)) if bd >= d => best,
                    _ => Some((n, d)),
                });
            let enemy = &mut state.enemies[i];
            if let Some((cell, _)) = away {
                enemy.path = vec![cell];
                enemy.target_pos = Some(cell.center());
            }
            false
        }
        EnemyAi::Ranged if dist > attack_range - 1.0 => true,
        EnemyAi::Ranged => {
            let enemy = &mut state.enemies[i];
            enemy.path.clear();
            enemy.target_pos = None;
            false
        }
    };

    if chase && here != goal && state.enemies[i].path.last() != Some(&goal) {
        set_path(state, graph, i, goal);
    }
}

/// Attack the nearest soldier in reach; true when the enemy holds to fight
fn attack(state: &mut GameState, graph: &Graph, rng: &mut SimRng, i: usize) -> bool {
    let enemy = &state.enemies[i];
    if enemy.damage <= 0.0 {
        return false;
    }
    let here = enemy.cell();
    let locked_in_melee = state.units.iter().any(|u| u.is_active() && u.cell() == here);
    if !enemy.path.is_empty() && !locked_in_melee {
        return false;
    }

    let los = LineOfSight::new(graph, &state.doors);
    let reach = enemy.attack_range + ATTACK_RANGE_TOLERANCE;
    let target = state
        .units
        .iter()
        .enumerate()
        .filter(|(_, u)| u.is_active())
        .map(|(j, u)| (j, enemy.pos.distance(&u.pos)))
        .filter(|(j, d)| *d <= reach && los.has_line_of_sight(enemy.pos, state.units[*j].pos))
        .fold(None::<(usize, f64)>, |best, (j, d)| match best {
            Some((_, bd)) if bd <= d => best,
            _ => Some((j, d)),
        });

    let Some((j, dist)) = target else {
        return false;
    };

    let now = state.t;
    let enemy = &mut state.enemies[i];
    if locked_in_melee {
        enemy.path.clear();
        enemy.target_pos = None;
    }
    if enemy.last_attack_time.is_some_and(|last| now - last < enemy.fire_rate) {
        return true;
    }

    let unit = &mut state.units[j];
    enemy.last_attack_time = Some(now);
    enemy.last_attack_target = Some(unit.pos);
    if rng.next_f64() <= enemy_hit_chance(enemy.accuracy, dist) {
        unit.hp -= enemy.damage;
        debug!(enemy = %enemy.id, unit = %unit.id, hp = unit.hp, "Soldier hit");
    }
    true
}
