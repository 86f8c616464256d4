pub mod config;
pub mod error;
pub mod rng;
pub mod types;

pub use config::{load_config, EngineConfig};
pub use error::{Result, SimError};
pub use rng::{RngState, SimRng};
pub use types::{CellCoord, Millis, Vec2};
