//! Headless Mission Runner
//!
//! Runs an AI-controlled squad through a mission and prints a JSON result.
//! A recorded command log can be replayed and checked against a rerun.

use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

use squad_tactics::core::config::{load_config, EngineConfig};
use squad_tactics::core::error::Result;
use squad_tactics::core::types::CellCoord;
use squad_tactics::mission::{
    CommandLogEntry, Engine, EngineParams, MapDefinition, MissionStatus, MissionType,
    SquadConfig, UnitState,
};

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MissionArg {
    Default,
    ExtractArtifacts,
    DestroyHive,
    EscortVip,
    RecoverIntel,
}

impl From<MissionArg> for MissionType {
    fn from(arg: MissionArg) -> Self {
        match arg {
            MissionArg::Default => MissionType::Default,
            MissionArg::ExtractArtifacts => MissionType::ExtractArtifacts,
            MissionArg::DestroyHive => MissionType::DestroyHive,
            MissionArg::EscortVip => MissionType::EscortVip,
            MissionArg::RecoverIntel => MissionType::RecoverIntel,
        }
    }
}

/// Headless Mission Runner - AI squad missions with replay checks
#[derive(Parser, Debug)]
#[command(name = "mission_runner")]
#[command(about = "Run a squad mission headless and output the result as JSON")]
struct Args {
    /// Map JSON file (a built-in open map is used when omitted)
    #[arg(long)]
    map: Option<PathBuf>,

    /// Built-in map width in tiles
    #[arg(long, default_value_t = 16)]
    width: i32,

    /// Built-in map height in tiles
    #[arg(long, default_value_t = 16)]
    height: i32,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, value_enum, default_value = "default")]
    mission: MissionArg,

    /// Comma separated archetypes
    #[arg(long, default_value = "assault,medic,scout,heavy")]
    squad: String,

    /// Director threat at mission start
    #[arg(long, default_value_t = 0.0)]
    threat: f64,

    /// Maximum number of updates
    #[arg(long, default_value_t = 20_000)]
    ticks: u64,

    /// Milliseconds per update
    #[arg(long, default_value_t = 16.0)]
    dt: f64,

    /// Engine config TOML
    #[arg(long)]
    config: Option<PathBuf>,

    /// Replay this command log instead of running live
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Write the command log of the run here
    #[arg(long)]
    save_log: Option<PathBuf>,

    /// Rerun from the recorded log and report whether the outcome matched
    #[arg(long)]
    verify_replay: bool,
}

/// JSON output structure
#[derive(Serialize)]
struct MissionResult {
    outcome: MissionStatus,
    mission: MissionType,
    seed: u64,
    mission_time_ms: f64,
    updates: u64,
    threat_level: f64,
    aliens_killed: u32,
    casualties: u32,
    extracted: usize,
    objectives_completed: usize,
    objectives_total: usize,
    logged_commands: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    replay_matched: Option<bool>,
}

fn builtin_map(width: i32, height: i32) -> MapDefinition {
    MapDefinition::filled(width, height)
        .with_squad_spawn(CellCoord::new(1, 1))
        .with_extraction(CellCoord::new(1, height - 2))
        .with_spawn_point("hive-mouth", CellCoord::new(width - 2, height - 2))
}

/// Run until the mission resolves or `max_updates` is reached
fn run(engine: &mut Engine, max_updates: u64, dt: f64) -> u64 {
    let mut updates = 0;
    while updates < max_updates && !engine.state().status.is_terminal() {
        engine.update(dt);
        updates += 1;
    }
    updates
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    };
    let map = match &args.map {
        Some(path) => MapDefinition::from_json(&fs::read_to_string(path)?)?,
        None => builtin_map(args.width, args.height),
    };
    let archetypes: Vec<&str> = args
        .squad
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let mut params = EngineParams::new(map, seed, SquadConfig::of(&archetypes))
        .with_mission(args.mission.into())
        .with_starting_threat(args.threat)
        .with_ai_control(true)
        .with_config(config);
    if let Some(path) = &args.replay {
        let log: Vec<CommandLogEntry> = serde_json::from_str(&fs::read_to_string(path)?)?;
        params = params.replaying(log);
    }

    let mut engine = Engine::new(params.clone())?;
    let updates = run(&mut engine, args.ticks, args.dt);
    let state = engine.state();

    if let Some(path) = &args.save_log {
        fs::write(path, serde_json::to_string_pretty(&state.command_log)?)?;
    }

    let replay_matched = if args.verify_replay {
        let mut rerun = Engine::new(params.replaying(state.command_log.clone()))?;
        run(&mut rerun, updates, args.dt);
        let replayed = rerun.state();
        Some(
            replayed.status == state.status
                && replayed.t == state.t
                && replayed.rng_state == state.rng_state
                && replayed.units == state.units,
        )
    } else {
        None
    };

    let result = MissionResult {
        outcome: state.status,
        mission: state.mission_type,
        seed,
        mission_time_ms: state.t,
        updates,
        threat_level: state.stats.threat_level,
        aliens_killed: state.stats.aliens_killed,
        casualties: state.stats.casualties,
        extracted: state
            .units
            .iter()
            .filter(|u| u.state == UnitState::Extracted)
            .count(),
        objectives_completed: state.objectives.iter().filter(|o| o.is_completed()).count(),
        objectives_total: state.objectives.len(),
        logged_commands: state.command_log.len(),
        replay_matched,
    };
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
