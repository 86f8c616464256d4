//! Mission simulation constants - fixed geometry and rule values
//!
//! Tunable pacing numbers live in `core::config::EngineConfig`. The values
//! here are contracts other systems and tests rely on.

// Line of sight / line of fire
pub const UNIT_RADIUS: f64 = 0.3;
pub const DOOR_STRUT_MIN: f64 = 0.33; // passable gap starts here along the door segment
pub const DOOR_STRUT_MAX: f64 = 0.66; // and ends here

// Movement
pub const WAYPOINT_EPSILON: f64 = 0.05;
pub const SPEED_DIVISOR: f64 = 10.0; // speed stat is tiles/s x10

// Combat
pub const ATTACK_RANGE_TOLERANCE: f64 = 0.5;
pub const MELEE_RANGE_TOLERANCE: f64 = 0.05;
pub const MIN_FIRE_DISTANCE: f64 = 0.1;
pub const TARGET_PROXIMITY_WEIGHT: f64 = 100.0;

// Interaction
pub const PICKUP_REACH: f64 = 0.8;
pub const ITEM_USE_REACH: f64 = 1.0;
pub const FORMATION_SLOT_TOLERANCE: f64 = 0.8;

// Exploration claim spacing, clamped by map size
pub const EXPLORE_AVOID_MIN: f64 = 3.0;
pub const EXPLORE_AVOID_MAX: f64 = 5.0;
pub const EXPLORE_UNIT_AVOID_MIN: f64 = 1.5;
pub const EXPLORE_UNIT_AVOID_MAX: f64 = 3.0;

// Mission setup
pub const MAX_RECOVER_OBJECTIVES: usize = 3;
pub const RECOVER_MIN_DISTANCE_FACTOR: f64 = 0.5;
pub const RECOVER_FALLBACK_DISTANCE_FACTOR: f64 = 0.3;
pub const VIP_HP_FRACTION: f64 = 0.5;
pub const SPAWN_JITTER: f64 = 0.2;

// Ids
pub const VIP_ARCHETYPE: &str = "vip";
pub const VIP_UNIT_ID: &str = "vip-1";
pub const HIVE_ENEMY_ID: &str = "enemy-hive";
pub const HIVE_OBJECTIVE_ID: &str = "obj-hive";
pub const ESCORT_OBJECTIVE_ID: &str = "obj-escort";
pub const ARTIFACT_ITEM: &str = "artifact_heavy";
pub const SCRAP_CRATE_ITEM: &str = "scrap_crate";
