//! Static content: soldier archetypes, weapons, items, and enemy archetypes

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AiProfile {
    /// Halts to fire
    StandGround,
    /// Keeps moving while firing
    Rush,
    /// Keeps moving while firing, prefers distance
    Retreat,
}

/// Soldier template; `speed` is tiles per second x10
#[derive(Debug, Clone, PartialEq)]
pub struct Archetype {
    pub id: &'static str,
    pub name: &'static str,
    pub base_hp: f64,
    pub damage: f64,
    pub fire_rate: f64,
    pub soldier_aim: f64,
    pub attack_range: f64,
    pub speed: f64,
    pub ai_profile: AiProfile,
    pub right_hand: Option<&'static str>,
    pub left_hand: Option<&'static str>,
}

pub const ARCHETYPES: &[Archetype] = &[
    Archetype {
        id: "assault",
        name: "Assault",
        base_hp: 100.0,
        damage: 20.0,
        fire_rate: 600.0,
        soldier_aim: 90.0,
        attack_range: 10.0,
        speed: 20.0,
        ai_profile: AiProfile::Rush,
        right_hand: Some("pulse_rifle"),
        left_hand: Some("combat_knife"),
    },
    Archetype {
        id: "medic",
        name: "Medic",
        base_hp: 80.0,
        damage: 15.0,
        fire_rate: 500.0,
        soldier_aim: 80.0,
        attack_range: 6.0,
        speed: 25.0,
        ai_profile: AiProfile::Retreat,
        right_hand: Some("pistol"),
        left_hand: Some("combat_knife"),
    },
    Archetype {
        id: "scout",
        name: "Scout",
        base_hp: 80.0,
        damage: 15.0,
        fire_rate: 400.0,
        soldier_aim: 85.0,
        attack_range: 8.0,
        speed: 30.0,
        ai_profile: AiProfile::Retreat,
        right_hand: Some("pistol"),
        left_hand: Some("combat_knife"),
    },
    Archetype {
        id: "heavy",
        name: "Heavy",
        base_hp: 120.0,
        damage: 40.0,
        fire_rate: 1000.0,
        soldier_aim: 70.0,
        attack_range: 4.0,
        speed: 15.0,
        ai_profile: AiProfile::StandGround,
        right_hand: Some("shotgun"),
        left_hand: Some("thunder_hammer"),
    },
    Archetype {
        id: "sniper",
        name: "Sniper",
        base_hp: 80.0,
        damage: 60.0,
        fire_rate: 2000.0,
        soldier_aim: 90.0,
        attack_range: 15.0,
        speed: 20.0,
        ai_profile: AiProfile::StandGround,
        right_hand: Some("sniper_rifle"),
        left_hand: Some("combat_knife"),
    },
    Archetype {
        id: "demolitionist",
        name: "Demolitionist",
        base_hp: 110.0,
        damage: 25.0,
        fire_rate: 100.0,
        soldier_aim: 70.0,
        attack_range: 3.0,
        speed: 18.0,
        ai_profile: AiProfile::Rush,
        right_hand: Some("flamer"),
        left_hand: Some("combat_knife"),
    },
    Archetype {
        id: "vip",
        name: "VIP",
        base_hp: 100.0,
        damage: 0.0,
        fire_rate: 0.0,
        soldier_aim: 50.0,
        attack_range: 0.0,
        speed: 22.0,
        ai_profile: AiProfile::Retreat,
        right_hand: None,
        left_hand: None,
    },
];

pub fn archetype(id: &str) -> Option<&'static Archetype> {
    ARCHETYPES.iter().find(|a| a.id == id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeaponType {
    Melee,
    Ranged,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Weapon {
    pub id: &'static str,
    pub name: &'static str,
    pub weapon_type: WeaponType,
    pub damage: f64,
    /// Cooldown between shots (ms)
    pub fire_rate: f64,
    /// Added to the wielder's aim
    pub accuracy: f64,
    pub range: f64,
}

pub const WEAPONS: &[Weapon] = &[
    Weapon {
        id: "combat_knife",
        name: "Combat Knife",
        weapon_type: WeaponType::Melee,
        damage: 15.0,
        fire_rate: 400.0,
        accuracy: 10.0,
        range: 1.0,
    },
    Weapon {
        id: "power_sword",
        name: "Power Sword",
        weapon_type: WeaponType::Melee,
        damage: 35.0,
        fire_rate: 800.0,
        accuracy: 15.0,
        range: 1.0,
    },
    Weapon {
        id: "thunder_hammer",
        name: "Thunder Hammer",
        weapon_type: WeaponType::Melee,
        damage: 80.0,
        fire_rate: 1500.0,
        accuracy: 5.0,
        range: 1.0,
    },
    Weapon {
        id: "pistol",
        name: "Pistol",
        weapon_type: WeaponType::Ranged,
        damage: 15.0,
        fire_rate: 500.0,
        accuracy: 0.0,
        range: 6.0,
    },
    Weapon {
        id: "pulse_rifle",
        name: "Pulse Rifle",
        weapon_type: WeaponType::Ranged,
        damage: 20.0,
        fire_rate: 600.0,
        accuracy: 5.0,
        range: 10.0,
    },
    Weapon {
        id: "shotgun",
        name: "Shotgun",
        weapon_type: WeaponType::Ranged,
        damage: 40.0,
        fire_rate: 1000.0,
        accuracy: -10.0,
        range: 4.0,
    },
    Weapon {
        id: "flamer",
        name: "Flamer",
        weapon_type: WeaponType::Ranged,
        damage: 25.0,
        fire_rate: 100.0,
        accuracy: -5.0,
        range: 3.0,
    },
    Weapon {
        id: "sniper_rifle",
        name: "Sniper Rifle",
        weapon_type: WeaponType::Ranged,
        damage: 60.0,
        fire_rate: 2000.0,
        accuracy: 10.0,
        range: 15.0,
    },
];

pub fn weapon(id: &str) -> Option<&'static Weapon> {
    WEAPONS.iter().find(|w| w.id == id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemAction {
    Heal,
    Grenade,
    Mine,
    Scanner,
    Sentry,
}

/// Equipment or consumable; passive bonuses apply while worn or carried
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: &'static str,
    pub name: &'static str,
    pub action: Option<ItemAction>,
    /// Use takes a channel instead of resolving instantly
    pub channeled: bool,
    pub heal_amount: Option<f64>,
    pub hp_bonus: f64,
    pub speed_bonus: f64,
    pub accuracy_bonus: f64,
}

impl Item {
    const fn passive(id: &'static str, name: &'static str, hp: f64, speed: f64, accuracy: f64) -> Self {
        Self {
            id,
            name,
            action: None,
            channeled: false,
            heal_amount: None,
            hp_bonus: hp,
            speed_bonus: speed,
            accuracy_bonus: accuracy,
        }
    }

    const fn active(id: &'static str, name: &'static str, action: ItemAction, channeled: bool) -> Self {
        Self {
            id,
            name,
            action: Some(action),
            channeled,
            heal_amount: None,
            hp_bonus: 0.0,
            speed_bonus: 0.0,
            accuracy_bonus: 0.0,
        }
    }

    const fn heals(mut self, amount: f64) -> Self {
        self.heal_amount = Some(amount);
        self
    }

    /// Heals that can only target the user
    pub fn is_self_heal(&self) -> bool {
        matches!(self.id, "medkit" | "stimpack")
    }
}

pub const ITEMS: &[Item] = &[
    Item::active("frag_grenade", "Frag Grenade", ItemAction::Grenade, false),
    Item::active("medkit", "Medkit", ItemAction::Heal, true).heals(50.0),
    Item::active("stimpack", "Stimpack", ItemAction::Heal, false).heals(25.0),
    Item::active("mine", "Landmine", ItemAction::Mine, true),
    Item::active("scanner", "Scanner", ItemAction::Scanner, false),
    Item::active("sentry_turret", "Sentry Turret", ItemAction::Sentry, true),
    Item::passive("combat_boots", "Combat Boots", 0.0, 5.0, 0.0),
    Item::passive("mag_lev_boots", "Mag-Lev Boots", 0.0, 10.0, 0.0),
    Item::passive("light_recon", "Light Recon Armor", 50.0, 2.0, 0.0),
    Item::passive("heavy_plate", "Heavy Plate Armor", 150.0, -5.0, -10.0),
    Item::passive("artifact_heavy", "Heavy Artifact", 0.0, -10.0, -15.0),
    Item::passive("scrap_crate", "Scrap Crate", 0.0, 0.0, 0.0),
];

pub fn item(id: &str) -> Option<&'static Item> {
    ITEMS.iter().find(|i| i.id == id)
}

/// Stats for turrets deployed from a sentry item
pub const SENTRY_DAMAGE: f64 = 15.0;
pub const SENTRY_FIRE_RATE: f64 = 500.0;
pub const SENTRY_ACCURACY: f64 = 70.0;
pub const SENTRY_RANGE: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnemyKind {
    XenoMite,
    WarriorDrone,
    PraetorianGuard,
    SpitterAcid,
    SwarmMelee,
    Hive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnemyAi {
    Melee,
    Ranged,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnemyArchetype {
    pub kind: EnemyKind,
    pub hp: f64,
    pub damage: f64,
    pub fire_rate: f64,
    /// Dispersion in degrees; lower is more accurate
    pub accuracy: f64,
    pub attack_range: f64,
    pub speed: f64,
    pub ai: EnemyAi,
}

pub fn enemy_archetype(kind: EnemyKind) -> EnemyArchetype {
    let (hp, damage, fire_rate, accuracy, attack_range, speed, ai) = match kind {
        EnemyKind::XenoMite => (50.0, 15.0, 400.0, 50.0, 1.0, 30.0, EnemyAi::Melee),
        EnemyKind::WarriorDrone => (150.0, 35.0, 800.0, 75.0, 1.0, 24.0, EnemyAi::Melee),
        EnemyKind::PraetorianGuard => (600.0, 80.0, 1500.0, 85.0, 1.0, 18.0, EnemyAi::Melee),
        EnemyKind::SpitterAcid => (120.0, 30.0, 1200.0, 90.0, 6.0, 28.0, EnemyAi::Ranged),
        EnemyKind::SwarmMelee => (50.0, 15.0, 800.0, 50.0, 1.0, 30.0, EnemyAi::Melee),
        EnemyKind::Hive => (1200.0, 0.0, 1000.0, 100.0, 0.0, 0.0, EnemyAi::Melee),
    };
    EnemyArchetype {
        kind,
        hp,
        damage,
        fire_rate,
        accuracy,
        attack_range,
        speed,
        ai,
    }
}
