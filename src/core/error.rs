use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid map: {0}")]
    InvalidMap(String),

    #[error("Unknown archetype: {0}")]
    UnknownArchetype(String),

    #[error("Unknown item: {0}")]
    UnknownItem(String),

    #[error("Invalid mission setup: {0}")]
    InvalidMission(String),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
