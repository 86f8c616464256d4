//! Mission simulation - a squad against a hive on a tile grid
//!
//! Real-time with a fixed update order. All randomness flows through one
//! seeded generator and every live command is logged, so any mission can
//! be replayed exactly from its parameters and command log.
//!
//! Key pieces:
//! - The map is a walkable grid whose edges carry walls and doors
//! - Soldiers act on commands, their squad AI fills in the gaps
//! - A threat director spawns enemy waves over time
//! - Objectives decide the mission outcome

pub mod ai;
pub mod channeling;
pub mod combat;
pub mod commands;
pub mod constants;
pub mod director;
pub mod doors;
pub mod enemies;
pub mod engine;
pub mod graph;
pub mod items;
pub mod library;
pub mod line_of_sight;
pub mod loot;
pub mod map;
pub mod movement;
pub mod objectives;
pub mod pathfinding;
pub mod state;
pub mod units;
pub mod visibility;

// Re-exports for convenient access
pub use ai::{AiContext, SquadAi, SquadBehavior};
pub use combat::{hit_chance, target_score, AttackResult};
pub use commands::{Command, CommandKind, CommandLabel};
pub use director::Director;
pub use doors::{Door, DoorState};
pub use engine::{Engine, EngineParams};
pub use enemies::enemy_hit_chance;
pub use graph::{Boundary, Direction, Graph};
pub use library::{EnemyKind, ItemAction, WeaponType};
pub use line_of_sight::LineOfSight;
pub use loot::{LootItem, Mine, Turret};
pub use map::{BoundaryType, CellType, MapDefinition, ObjectiveDefinition, SpawnPoint};
pub use movement::MovementResult;
pub use objectives::{MissionType, Objective, ObjectiveKind, ObjectiveState};
pub use pathfinding::{find_path, DoorPolicy};
pub use state::{CommandLogEntry, EngineMode, GameState, MissionStats, MissionStatus, Settings};
pub use units::{
    ChannelAction, Channeling, EngagementPolicy, Enemy, PriorMode, SoldierConfig, SquadConfig,
    Unit, UnitState, UnitStats,
};
