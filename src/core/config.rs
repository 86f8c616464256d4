//! Engine configuration with documented constants
//!
//! Tunable gameplay numbers live here. Geometry tolerances that gameplay
//! tests depend on (unit radius, door struts) are fixed in
//! `mission::constants` instead.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::error::Result;

/// Configuration for the simulation systems
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === VISIBILITY ===
    /// Sight radius of a soldier, in tiles
    pub vision_range: f64,

    // === CHANNELING ===
    /// Reference speed that channel durations are normalized against
    ///
    /// A unit at this speed channels for exactly the base duration; a unit
    /// at half this speed takes twice as long.
    pub speed_normalization: f64,

    /// Base duration of picking up loot (ms)
    pub pickup_base_ms: f64,

    /// Base duration of collecting an objective (ms)
    pub collect_base_ms: f64,

    /// Base duration of using a channeled item (ms)
    pub use_item_base_ms: f64,

    /// Base duration of extraction (ms)
    pub extract_base_ms: f64,

    // === AI ===
    /// A unit abandons its exploration target only for one closer than
    /// this fraction of the current distance
    pub exploration_switch_ratio: f64,

    /// How far enemies look for soldiers to chase (tiles)
    pub enemy_detection_range: f64,

    /// VIP flees when a visible enemy is closer than this (tiles)
    pub vip_flee_distance: f64,

    // === DIRECTOR ===
    /// Length of one threat turn (ms)
    pub turn_duration_ms: f64,

    /// Threat added per completed turn (percent)
    pub threat_per_turn: f64,

    /// Enemies spawned per wave before turn scaling
    pub base_enemy_count: u32,

    /// Turn count after which waves stop growing
    pub max_scaling_turns: u32,

    /// Threat below which waves are mostly light enemies
    pub threat_low: f64,

    /// Threat above which heavy enemies appear
    pub threat_high: f64,

    // === ITEMS ===
    pub grenade_damage: f64,
    pub mine_damage: f64,
    pub mine_radius: f64,
    pub scanner_radius: i32,
    pub default_heal: f64,

    // === REPLAY ===
    /// Fixed step used when catching up to a target tick (ms)
    pub replay_step_ms: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            vision_range: 10.0,

            speed_normalization: 30.0,
            pickup_base_ms: 3000.0,
            collect_base_ms: 3000.0,
            use_item_base_ms: 3000.0,
            extract_base_ms: 5000.0,

            exploration_switch_ratio: 0.7,
            enemy_detection_range: 12.0,
            vip_flee_distance: 5.0,

            turn_duration_ms: 45_000.0,
            threat_per_turn: 10.0,
            base_enemy_count: 3,
            max_scaling_turns: 10,
            threat_low: 30.0,
            threat_high: 70.0,

            grenade_damage: 100.0,
            mine_damage: 100.0,
            mine_radius: 1.5,
            scanner_radius: 5,
            default_heal: 25.0,

            replay_step_ms: 16.0,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Channel duration for `base_ms` at the given unit speed
    pub fn channel_duration(&self, base_ms: f64, speed: f64) -> f64 {
        base_ms * (self.speed_normalization / speed.max(1.0))
    }
}

/// Load engine configuration from a TOML file
///
/// Missing keys fall back to [`EngineConfig::default`].
pub fn load_config(path: impl AsRef<Path>) -> Result<EngineConfig> {
    let contents = fs::read_to_string(path.as_ref())?;
    EngineConfig::from_toml_str(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str("vision_range = 6.5\nbase_enemy_count = 1\n")
            .expect("valid toml");
        assert_eq!(config.vision_range, 6.5);
        assert_eq!(config.base_enemy_count, 1);
        assert_eq!(config.extract_base_ms, 5000.0);
    }

    #[test]
    fn test_channel_duration_scales_inversely_with_speed() {
        let config = EngineConfig::default();
        assert_eq!(config.channel_duration(3000.0, 15.0), 6000.0);
        assert_eq!(config.channel_duration(3000.0, 30.0), 3000.0);
        assert_eq!(config.channel_duration(3000.0, 60.0), 1500.0);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = EngineConfig::from_toml_str("vision_range = \"far\"").unwrap_err();
        assert!(matches!(err, crate::core::error::SimError::Config(_)));
    }
}
