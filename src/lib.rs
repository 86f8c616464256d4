//! Squad Tactics - deterministic squad mission simulation

pub mod core;
pub mod mission;
