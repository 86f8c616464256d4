//! Replay and monotonicity properties

use proptest::prelude::*;
use squad_tactics::core::types::CellCoord;
use squad_tactics::mission::*;

const STEP_MS: f64 = 50.0;
const STEPS: usize = 60;

fn params(seed: u64) -> EngineParams {
    let map = MapDefinition::filled(12, 12)
        .with_squad_spawn(CellCoord::new(1, 1))
        .with_extraction(CellCoord::new(10, 1))
        .with_spawn_point("nest", CellCoord::new(10, 10));
    EngineParams::new(map, seed, SquadConfig::of(&["assault", "scout", "heavy"]))
        .with_starting_threat(20.0)
        .with_ai_control(true)
}

const UNITS: [&str; 3] = ["assault-1", "scout-1", "heavy-1"];

fn run_live(seed: u64, orders: &[(usize, usize, i32, i32)]) -> Engine {
    let mut engine = Engine::new(params(seed)).unwrap();
    for step in 0..STEPS {
        for &(at, who, x, y) in orders {
            if at == step {
                engine.apply_command(Command::new(
                    &[UNITS[who]],
                    CommandKind::MoveTo {
                        target: CellCoord::new(x, y),
                    },
                ));
            }
        }
        engine.update(STEP_MS);
    }
    engine
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn test_replay_reproduces_live_run(
        seed in 0u64..10_000,
        orders in prop::collection::vec((0usize..STEPS, 0usize..3, 0i32..12, 0i32..12), 0..6),
    ) {
        let live = run_live(seed, &orders);
        let log = live.state().command_log.clone();

        let mut replay = Engine::new(params(seed).replaying(log)).unwrap();
        for _ in 0..STEPS {
            replay.update(STEP_MS);
        }

        let (a, b) = (live.state(), replay.state());
        prop_assert_eq!(a.t, b.t);
        prop_assert_eq!(a.status, b.status);
        prop_assert_eq!(a.rng_state, b.rng_state);
        prop_assert_eq!(&a.units, &b.units);
        prop_assert_eq!(&a.enemies, &b.enemies);
        prop_assert_eq!(&a.loot, &b.loot);
        prop_assert_eq!(&a.discovered_cells, &b.discovered_cells);
        prop_assert_eq!(&a.stats, &b.stats);
    }

    #[test]
    fn test_time_and_discovery_only_grow(seed in 0u64..10_000, dt in 1.0f64..200.0) {
        let mut engine = Engine::new(params(seed)).unwrap();
        let mut last_t = engine.state().t;
        let mut last_seen = engine.state().discovered_cells.clone();
        for _ in 0..40 {
            engine.update(dt);
            let state = engine.state();
            prop_assert!(state.t >= last_t);
            prop_assert!(state.discovered_cells.is_superset(&last_seen));
            last_t = state.t;
            last_seen = state.discovered_cells.clone();
        }
    }
}
