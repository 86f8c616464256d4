//! Things lying on the map: loot, armed mines, and deployed turrets

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::types::{Millis, Vec2};
use crate::mission::state::GameState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootItem {
    pub id: String,
    pub item_id: String,
    pub pos: Vec2,
    /// Set when this loot is a dropped objective (an artifact)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mine {
    pub id: String,
    pub pos: Vec2,
    pub damage: f64,
    pub radius: f64,
    pub owner_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turret {
    pub id: String,
    pub pos: Vec2,
    pub damage: f64,
    pub fire_rate: f64,
    pub accuracy: f64,
    pub attack_range: f64,
    pub owner_id: String,
    pub last_attack_time: Option<Millis>,
}

/// Detonate every mine with a living enemy inside its radius
///
/// A detonation damages all enemies in the radius and consumes the mine.
pub fn update_mines(state: &mut GameState) {
    let mut i = 0;
    while i < state.mines.len() {
        let (pos, radius, damage) = {
            let mine = &state.mines[i];
            (mine.pos, mine.radius, mine.damage)
        };
        let triggered = state
            .enemies
            .iter()
            .any(|e| e.is_alive() && e.pos.distance(&pos) <= radius);
        if !triggered {
            i += 1;
            continue;
        }

        let mine = state.mines.remove(i);
        let mut hits = 0;
        for enemy in state.enemies.iter_mut().filter(|e| e.is_alive()) {
            if enemy.pos.distance(&pos) <= radius {
                enemy.hp -= damage;
                hits += 1;
            }
        }
        debug!(mine = %mine.id, hits, "Mine detonated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::library::EnemyKind;
    use crate::mission::state::tests::empty_state;
    use crate::mission::units::Enemy;

    fn mine_at(x: f64, y: f64) -> Mine {
        Mine {
            id: "mine-1".into(),
            pos: Vec2::new(x, y),
            damage: 100.0,
            radius: 1.5,
            owner_id: "heavy-1".into(),
        }
    }

    #[test]
    fn test_mine_waits_for_enemy() {
        let mut state = empty_state();
        state.mines.push(mine_at(1.5, 1.5));
        state.enemies.push(Enemy::spawn("enemy-1".into(), EnemyKind::XenoMite, Vec2::new(5.5, 5.5), 30.0));
        update_mines(&mut state);
        assert_eq!(state.mines.len(), 1);
        assert_eq!(state.enemies[0].hp, 50.0);
    }

    #[test]
    fn test_mine_damages_everything_in_radius() {
        let mut state = empty_state();
        state.mines.push(mine_at(1.5, 1.5));
        state.enemies.push(Enemy::spawn("enemy-1".into(), EnemyKind::XenoMite, Vec2::new(2.0, 1.5), 30.0));
        state.enemies.push(Enemy::spawn("enemy-2".into(), EnemyKind::WarriorDrone, Vec2::new(1.5, 2.5), 30.0));
        state.enemies.push(Enemy::spawn("enemy-3".into(), EnemyKind::XenoMite, Vec2::new(4.5, 1.5), 30.0));
        update_mines(&mut state);
        assert!(state.mines.is_empty());
        assert!(state.enemies[0].hp <= 0.0);
        assert_eq!(state.enemies[1].hp, 50.0);
        assert_eq!(state.enemies[2].hp, 50.0);
    }
}
