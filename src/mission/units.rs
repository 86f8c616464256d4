//! Soldiers, enemies, and the squad configuration they spawn from

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use crate::core::error::{Result, SimError};
use crate::core::rng::SimRng;
use crate::core::types::{CellCoord, Millis, Vec2};
use crate::mission::commands::Command;
use crate::mission::constants::{ARTIFACT_ITEM, SPAWN_JITTER, VIP_ARCHETYPE};
use crate::mission::library::{self, AiProfile, EnemyAi, EnemyKind, WeaponType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitState {
    Idle,
    Moving,
    Attacking,
    Channeling,
    Extracted,
    Dead,
}

impl UnitState {
    /// Dead and Extracted are absorbing
    pub fn is_terminal(self) -> bool {
        matches!(self, UnitState::Dead | UnitState::Extracted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngagementPolicy {
    #[default]
    Engage,
    /// Only fight back when an enemy shares the cell
    Ignore,
}

/// Control mode saved when a manual command overrides autonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriorMode {
    Autonomous,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelAction {
    Pickup,
    Collect,
    UseItem,
    Extract,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channeling {
    pub action: ChannelAction,
    pub remaining: Millis,
    pub total: Millis,
    /// Loot, objective, or item the channel resolves against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
}

/// Derived combat and movement stats
///
/// Recomputed from archetype, equipment, active weapon, and burden
/// whenever any of them changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitStats {
    pub damage: f64,
    pub fire_rate: f64,
    pub accuracy: f64,
    pub soldier_aim: f64,
    pub attack_range: f64,
    pub speed: f64,
    pub equipment_accuracy_bonus: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    pub archetype_id: String,
    pub pos: Vec2,
    pub hp: f64,
    pub max_hp: f64,
    pub state: UnitState,
    pub stats: UnitStats,
    pub ai_profile: AiProfile,
    pub engagement_policy: EngagementPolicy,
    pub right_hand: Option<String>,
    pub left_hand: Option<String>,
    pub body: Option<String>,
    pub feet: Option<String>,
    pub active_weapon_id: Option<String>,
    pub path: Vec<CellCoord>,
    pub target_pos: Option<Vec2>,
    pub command_queue: VecDeque<Command>,
    pub active_command: Option<Command>,
    pub channeling: Option<Channeling>,
    pub ai_enabled: bool,
    pub prior_mode: Option<PriorMode>,
    pub carried_objective_id: Option<String>,
    pub exploration_target: Option<CellCoord>,
    pub forced_target_id: Option<String>,
    /// Speed imposed by an escort formation this tick
    pub matched_speed: Option<f64>,
    pub last_attack_time: Option<Millis>,
    pub last_attack_target: Option<Vec2>,
    pub kills: u32,
    pub damage_dealt: f64,
    pub objectives_completed: u32,
}

impl Unit {
    pub fn is_alive(&self) -> bool {
        self.state != UnitState::Dead && self.hp > 0.0
    }

    /// Alive and still on the map
    pub fn is_active(&self) -> bool {
        !self.state.is_terminal() && self.hp > 0.0
    }

    pub fn is_vip(&self) -> bool {
        self.archetype_id == VIP_ARCHETYPE
    }

    pub fn cell(&self) -> CellCoord {
        self.pos.cell()
    }

    pub fn movement_speed(&self) -> f64 {
        self.matched_speed.unwrap_or(self.stats.speed)
    }

    /// Drop every in-flight activity, leaving the unit idle in place
    pub fn halt(&mut self) {
        self.path.clear();
        self.target_pos = None;
        self.active_command = None;
        self.channeling = None;
        if !self.state.is_terminal() {
            self.state = UnitState::Idle;
        }
    }

    pub fn equipped_weapon(&self) -> Option<&'static library::Weapon> {
        self.active_weapon_id
            .as_deref()
            .or(self.right_hand.as_deref())
            .and_then(library::weapon)
    }

    /// Recompute derived stats after an equipment, weapon, or burden change
    pub fn recalculate_stats(&mut self) {
        let Some(arch) = library::archetype(&self.archetype_id) else {
            return;
        };

        let mut speed = arch.speed;
        let mut accuracy_bonus = 0.0;
        let burden = self.carried_objective_id.as_ref().map(|_| ARTIFACT_ITEM);
        for item_id in [self.body.as_deref(), self.feet.as_deref(), burden].into_iter().flatten() {
            if let Some(item) = library::item(item_id) {
                speed += item.speed_bonus;
                accuracy_bonus += item.accuracy_bonus;
            }
        }

        self.stats.speed = speed.max(1.0);
        self.stats.equipment_accuracy_bonus = accuracy_bonus;
        match self.equipped_weapon() {
            Some(weapon) => {
                self.stats.damage = weapon.damage;
                self.stats.fire_rate = weapon.fire_rate;
                self.stats.attack_range = weapon.range;
                self.stats.accuracy = self.stats.soldier_aim + accuracy_bonus + weapon.accuracy;
            }
            None => {
                self.stats.damage = arch.damage;
                self.stats.fire_rate = arch.fire_rate;
                self.stats.attack_range = arch.attack_range;
                self.stats.accuracy = self.stats.soldier_aim + accuracy_bonus;
            }
        }
    }

    /// Pick the hand to fight with given the distance to the nearest enemy
    ///
    /// Returns true when the active weapon changed.
    pub fn select_weapon(&mut self, nearest_enemy: Option<f64>) -> bool {
        use crate::mission::constants::{ATTACK_RANGE_TOLERANCE, MELEE_RANGE_TOLERANCE};

        let Some(dist) = nearest_enemy else {
            return false;
        };
        let left = self
            .left_hand
            .as_deref()
            .and_then(library::weapon)
            .filter(|w| w.weapon_type == WeaponType::Melee);
        let right = self.right_hand.as_deref().and_then(library::weapon);

        let choice = match (left, right) {
            (Some(l), _) if dist <= l.range + MELEE_RANGE_TOLERANCE => Some(l.id),
            (_, Some(r)) if dist <= r.range + ATTACK_RANGE_TOLERANCE => Some(r.id),
            _ => None,
        };

        match choice {
            Some(id) if self.active_weapon_id.as_deref() != Some(id) => {
                self.active_weapon_id = Some(id.to_string());
                self.recalculate_stats();
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub id: String,
    pub kind: EnemyKind,
    pub pos: Vec2,
    pub hp: f64,
    pub max_hp: f64,
    pub damage: f64,
    pub fire_rate: f64,
    pub accuracy: f64,
    pub attack_range: f64,
    pub speed: f64,
    pub ai: EnemyAi,
    pub path: Vec<CellCoord>,
    pub target_pos: Option<Vec2>,
    pub target_unit_id: Option<String>,
    pub last_attack_time: Option<Millis>,
    pub last_attack_target: Option<Vec2>,
}

impl Enemy {
    /// Enemy at full health; fire rate scales with speed like soldier channels
    pub fn spawn(id: String, kind: EnemyKind, pos: Vec2, speed_normalization: f64) -> Self {
        let arch = library::enemy_archetype(kind);
        let fire_rate = if arch.speed > 0.0 {
            arch.fire_rate * (speed_normalization / arch.speed)
        } else {
            arch.fire_rate
        };
        Self {
            id,
            kind,
            pos,
            hp: arch.hp,
            max_hp: arch.hp,
            damage: arch.damage,
            fire_rate,
            accuracy: arch.accuracy,
            attack_range: arch.attack_range,
            speed: arch.speed,
            ai: arch.ai,
            path: Vec::new(),
            target_pos: None,
            target_unit_id: None,
            last_attack_time: None,
            last_attack_target: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0.0
    }

    pub fn cell(&self) -> CellCoord {
        self.pos.cell()
    }
}

/// One soldier slot of a squad configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoldierConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub archetype_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_hp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soldier_aim: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_hand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_hand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feet: Option<String>,
}

impl SoldierConfig {
    pub fn new(archetype_id: &str) -> Self {
        Self {
            archetype_id: archetype_id.to_string(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SquadConfig {
    pub soldiers: Vec<SoldierConfig>,
    /// Shared consumables, item id to count
    #[serde(default)]
    pub inventory: BTreeMap<String, u32>,
}

impl SquadConfig {
    pub fn of(archetypes: &[&str]) -> Self {
        Self {
            soldiers: archetypes.iter().map(|a| SoldierConfig::new(a)).collect(),
            inventory: BTreeMap::new(),
        }
    }

    pub fn with_item(mut self, item_id: &str, count: u32) -> Self {
        *self.inventory.entry(item_id.to_string()).or_insert(0) += count;
        self
    }
}

/// Build a unit from its configuration, jittered around `spawn`
pub fn spawn_unit(
    config: &SoldierConfig,
    id: String,
    spawn: CellCoord,
    ai_enabled: bool,
    rng: &mut SimRng,
) -> Result<Unit> {
    let arch = library::archetype(&config.archetype_id)
        .ok_or_else(|| SimError::UnknownArchetype(config.archetype_id.clone()))?;

    let right_hand = config.right_hand.clone().or(arch.right_hand.map(String::from));
    let left_hand = config.left_hand.clone().or(arch.left_hand.map(String::from));
    for weapon_id in [&right_hand, &left_hand].into_iter().flatten() {
        if library::weapon(weapon_id).is_none() {
            return Err(SimError::UnknownItem(weapon_id.clone()));
        }
    }
    let mut hp_bonus = 0.0;
    for item_id in [&config.body, &config.feet].into_iter().flatten() {
        let item = library::item(item_id).ok_or_else(|| SimError::UnknownItem(item_id.clone()))?;
        hp_bonus += item.hp_bonus;
    }

    let max_hp = config.max_hp.unwrap_or(arch.base_hp) + hp_bonus;
    let hp = config.hp.unwrap_or(max_hp).min(max_hp);
    let center = spawn.center();
    let pos = Vec2::new(
        center.x + rng.next_f64() * SPAWN_JITTER * 2.0 - SPAWN_JITTER,
        center.y + rng.next_f64() * SPAWN_JITTER * 2.0 - SPAWN_JITTER,
    );

    let mut unit = Unit {
        id,
        archetype_id: arch.id.to_string(),
        pos,
        hp,
        max_hp,
        state: UnitState::Idle,
        stats: UnitStats {
            damage: arch.damage,
            fire_rate: arch.fire_rate,
            accuracy: arch.soldier_aim,
            soldier_aim: config.soldier_aim.unwrap_or(arch.soldier_aim),
            attack_range: arch.attack_range,
            speed: arch.speed,
            equipment_accuracy_bonus: 0.0,
        },
        ai_profile: arch.ai_profile,
        engagement_policy: EngagementPolicy::Engage,
        active_weapon_id: right_hand.clone(),
        right_hand,
        left_hand,
        body: config.body.clone(),
        feet: config.feet.clone(),
        path: Vec::new(),
        target_pos: None,
        command_queue: VecDeque::new(),
        active_command: None,
        channeling: None,
        ai_enabled: ai_enabled && arch.id != VIP_ARCHETYPE,
        prior_mode: None,
        carried_objective_id: None,
        exploration_target: None,
        forced_target_id: None,
        matched_speed: None,
        last_attack_time: None,
        last_attack_target: None,
        kills: 0,
        damage_dealt: 0.0,
        objectives_completed: 0,
    };
    unit.recalculate_stats();
    Ok(unit)
}

/// Spawn every soldier of the squad at `spawn`
///
/// Units without an explicit id are named `<archetype>-<n>`, counting per
/// archetype from 1.
pub fn spawn_squad(
    squad: &SquadConfig,
    spawn: CellCoord,
    ai_enabled: bool,
    rng: &mut SimRng,
) -> Result<Vec<Unit>> {
    let mut counters: BTreeMap<&str, u32> = BTreeMap::new();
    let mut units = Vec::with_capacity(squad.soldiers.len());
    for soldier in &squad.soldiers {
        let n = counters.entry(soldier.archetype_id.as_str()).or_insert(0);
        *n += 1;
        let id = soldier
            .id
            .clone()
            .unwrap_or_else(|| format!("{}-{}", soldier.archetype_id, n));
        if units.iter().any(|u: &Unit| u.id == id) {
            return Err(SimError::InvalidMission(format!("duplicate unit id '{}'", id)));
        }
        units.push(spawn_unit(soldier, id, spawn, ai_enabled, rng)?);
    }
    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(archetype: &str) -> Unit {
        let mut rng = SimRng::new(1);
        spawn_unit(
            &SoldierConfig::new(archetype),
            format!("{}-1", archetype),
            CellCoord::new(2, 2),
            true,
            &mut rng,
        )
        .unwrap()
    }

    #[test]
    fn test_spawn_uses_archetype_loadout() {
        let u = unit("assault");
        assert_eq!(u.hp, 100.0);
        assert_eq!(u.stats.speed, 20.0);
        assert_eq!(u.right_hand.as_deref(), Some("pulse_rifle"));
        assert_eq!(u.stats.damage, 20.0);
        assert_eq!(u.stats.accuracy, 95.0);
        assert_eq!(u.state, UnitState::Idle);
    }

    #[test]
    fn test_spawn_position_jittered_inside_cell() {
        let u = unit("scout");
        assert_eq!(u.cell(), CellCoord::new(2, 2));
        assert!((u.pos.x - 2.5).abs() <= SPAWN_JITTER);
        assert!((u.pos.y - 2.5).abs() <= SPAWN_JITTER);
    }

    #[test]
    fn test_equipment_bonuses() {
        let mut rng = SimRng::new(1);
        let mut config = SoldierConfig::new("heavy");
        config.body = Some("heavy_plate".into());
        config.feet = Some("combat_boots".into());
        let u = spawn_unit(&config, "h".into(), CellCoord::new(0, 0), true, &mut rng).unwrap();
        assert_eq!(u.max_hp, 270.0);
        assert_eq!(u.stats.speed, 15.0);
        assert_eq!(u.stats.equipment_accuracy_bonus, -10.0);
    }

    #[test]
    fn test_artifact_burden_slows_carrier() {
        let mut u = unit("assault");
        u.carried_objective_id = Some("artifact-1".into());
        u.recalculate_stats();
        assert_eq!(u.stats.speed, 10.0);
        assert_eq!(u.stats.accuracy, 80.0);
    }

    #[test]
    fn test_weapon_switch_to_melee_when_adjacent() {
        let mut u = unit("assault");
        assert!(u.select_weapon(Some(0.8)));
        assert_eq!(u.active_weapon_id.as_deref(), Some("combat_knife"));
        assert_eq!(u.stats.damage, 15.0);
        assert!(u.select_weapon(Some(5.0)));
        assert_eq!(u.active_weapon_id.as_deref(), Some("pulse_rifle"));
        assert!(!u.select_weapon(None));
    }

    #[test]
    fn test_unknown_archetype_rejected() {
        let mut rng = SimRng::new(1);
        let result = spawn_unit(
            &SoldierConfig::new("wizard"),
            "w".into(),
            CellCoord::new(0, 0),
            true,
            &mut rng,
        );
        assert!(matches!(result, Err(SimError::UnknownArchetype(_))));
    }

    #[test]
    fn test_squad_ids_count_per_archetype() {
        let mut rng = SimRng::new(3);
        let squad = SquadConfig::of(&["assault", "medic", "assault"]);
        let units = spawn_squad(&squad, CellCoord::new(1, 1), true, &mut rng).unwrap();
        let ids: Vec<_> = units.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["assault-1", "medic-1", "assault-2"]);
    }

    #[test]
    fn test_enemy_fire_rate_scaled_by_speed() {
        let e = Enemy::spawn("enemy-1".into(), EnemyKind::WarriorDrone, Vec2::new(0.5, 0.5), 30.0);
        assert!((e.fire_rate - 1000.0).abs() < 1e-9);
        let hive = Enemy::spawn("enemy-hive".into(), EnemyKind::Hive, Vec2::new(0.5, 0.5), 30.0);
        assert_eq!(hive.fire_rate, 1000.0);
    }
}
