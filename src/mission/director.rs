//! Threat director: turn-based enemy waves
//!
//! Threat rises through each turn and jumps by `threat_per_turn` at every
//! turn boundary, where a wave spawns at the map's spawn points.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::config::EngineConfig;
use crate::core::rng::SimRng;
use crate::core::types::{Millis, Vec2};
use crate::mission::constants::SPAWN_JITTER;
use crate::mission::library::EnemyKind;
use crate::mission::state::GameState;
use crate::mission::units::Enemy;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Director {
    pub turn: u32,
    pub time_in_turn: Millis,
    pub spawned: u32,
}

impl Director {
    /// Director already `starting_threat` percent into the mission
    pub fn new(starting_threat: f64, config: &EngineConfig) -> Self {
        let turn = if config.threat_per_turn > 0.0 {
            (starting_threat.max(0.0) / config.threat_per_turn).floor() as u32
        } else {
            0
        };
        Self {
            turn,
            time_in_turn: 0.0,
            spawned: 0,
        }
    }

    pub fn threat_level(&self, config: &EngineConfig) -> f64 {
        let progress = if config.turn_duration_ms > 0.0 {
            self.time_in_turn / config.turn_duration_ms
        } else {
            0.0
        };
        (self.turn as f64 + progress) * config.threat_per_turn
    }
}

/// Spawn the waves of every turn the mission starts past
pub fn pre_spawn(state: &mut GameState, config: &EngineConfig, rng: &mut SimRng) {
    for turn in 1..=state.director.turn {
        spawn_wave(state, config, rng, turn);
    }
    state.stats.threat_level = state.director.threat_level(config);
}

/// Advance the director clock, spawning a wave at each turn boundary
pub fn update_director(state: &mut GameState, config: &EngineConfig, rng: &mut SimRng, dt: Millis) {
    state.director.time_in_turn += dt;
    while config.turn_duration_ms > 0.0 && state.director.time_in_turn >= config.turn_duration_ms {
        state.director.time_in_turn -= config.turn_duration_ms;
        state.director.turn += 1;
        let turn = state.director.turn;
        spawn_wave(state, config, rng, turn);
    }
    state.stats.threat_level = state.director.threat_level(config);
}

fn spawn_wave(state: &mut GameState, config: &EngineConfig, rng: &mut SimRng, turn: u32) {
    if state.map.spawn_points.is_empty() {
        return;
    }
    let count = config.base_enemy_count + turn.min(config.max_scaling_turns);
    let threat = turn as f64 * config.threat_per_turn;

    for _ in 0..count {
        let pick = rng.next_int(0, state.map.spawn_points.len() as i64 - 1) as usize;
        let center = state.map.spawn_points[pick].pos.center();
        let kind = pick_kind(rng.next_f64(), threat, config);
        let pos = Vec2::new(
            center.x + rng.next_f64() * SPAWN_JITTER * 2.0 - SPAWN_JITTER,
            center.y + rng.next_f64() * SPAWN_JITTER * 2.0 - SPAWN_JITTER,
        );
        state.director.spawned += 1;
        let id = format!("enemy-{}", state.director.spawned);
        state
            .enemies
            .push(Enemy::spawn(id, kind, pos, config.speed_normalization));
    }
    debug!(turn, count, threat, "Wave spawned");
}

/// Enemy type for a roll in [0, 1) at the given threat
fn pick_kind(roll: f64, threat: f64, config: &EngineConfig) -> EnemyKind {
    if threat < config.threat_low {
        if roll < 0.8 {
            EnemyKind::XenoMite
        } else {
            EnemyKind::WarriorDrone
        }
    } else if threat < config.threat_high {
        match roll {
            r if r < 0.4 => EnemyKind::XenoMite,
            r if r < 0.7 => EnemyKind::WarriorDrone,
            _ => EnemyKind::SpitterAcid,
        }
    } else {
        match roll {
            r if r < 0.3 => EnemyKind::WarriorDrone,
            r if r < 0.6 => EnemyKind::SpitterAcid,
            r if r < 0.9 => EnemyKind::PraetorianGuard,
            _ => EnemyKind::XenoMite,
        }
    }
}
