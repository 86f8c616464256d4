//! Engine-level mission tests

use squad_tactics::core::types::{CellCoord, Vec2};
use squad_tactics::mission::*;

fn open_map() -> MapDefinition {
    MapDefinition::filled(10, 10)
        .with_squad_spawn(CellCoord::new(1, 1))
        .with_extraction(CellCoord::new(8, 8))
}

fn engine(squad: SquadConfig) -> Engine {
    Engine::new(EngineParams::new(open_map(), 7, squad)).unwrap()
}

fn unit<'a>(engine: &'a Engine, id: &str) -> &'a Unit {
    engine.state().unit(id).unwrap()
}

fn pickup_claimants(engine: &Engine, loot_id: &str) -> usize {
    engine
        .state()
        .units
        .iter()
        .filter(|u| {
            matches!(
                u.active_command.as_ref().map(|c| &c.kind),
                Some(CommandKind::Pickup { target_id }) if target_id == loot_id
            )
        })
        .count()
}

#[test]
fn test_move_to_end_to_end() {
    let mut engine = engine(SquadConfig::of(&["assault"]));
    let target = CellCoord::new(5, 1);
    assert_eq!(unit(&engine, "assault-1").state, UnitState::Idle);

    engine.apply_command(Command::new(&["assault-1"], CommandKind::MoveTo { target }));
    assert_eq!(unit(&engine, "assault-1").state, UnitState::Moving);

    let goal = target.center();
    let mut last = unit(&engine, "assault-1").pos.distance(&goal);
    for _ in 0..40 {
        engine.update(100.0);
        let dist = unit(&engine, "assault-1").pos.distance(&goal);
        assert!(dist <= last + 1e-9, "moved away from target: {} -> {}", last, dist);
        last = dist;
    }

    let assault = unit(&engine, "assault-1");
    assert_eq!(assault.state, UnitState::Idle);
    assert_eq!(assault.cell(), target);
    assert!(assault.active_command.is_none());
}

#[test]
fn test_channel_durations_scale_with_speed() {
    let mut engine = engine(SquadConfig::of(&["assault", "scout"]).with_item("medkit", 2));
    for id in ["assault-1", "scout-1"] {
        engine.apply_command(Command::new(
            &[id],
            CommandKind::UseItem {
                item_id: "medkit".into(),
                target: None,
                target_unit_id: None,
            },
        ));
    }
    let total = |id: &str| unit(&engine, id).channeling.as_ref().map(|c| c.total);
    assert_eq!(total("assault-1"), Some(4500.0));
    assert_eq!(total("scout-1"), Some(3000.0));

    let mut engine = engine_with_assault_at_extraction();
    engine.apply_command(Command::new(&["assault-1"], CommandKind::Extract));
    engine.update(16.0);
    let channel = unit(&engine, "assault-1").channeling.clone().unwrap();
    assert_eq!(channel.action, ChannelAction::Extract);
    assert_eq!(channel.total, 7500.0);
}

fn engine_with_assault_at_extraction() -> Engine {
    let mut engine = engine(SquadConfig::of(&["assault", "scout"]));
    engine.debug_set_unit_pos("assault-1", CellCoord::new(8, 8).center());
    engine
}

#[test]
fn test_vip_death_loses_escort_mission() {
    let params = EngineParams::new(open_map(), 3, SquadConfig::of(&["assault"]))
        .with_mission(MissionType::EscortVip);
    let mut engine = Engine::new(params).unwrap();
    let vip = unit(&engine, "vip-1");
    assert_eq!(vip.hp, vip.max_hp * 0.5);
    assert!(!vip.ai_enabled);

    engine.debug_set_unit_hp("vip-1", 0.0);
    engine.update(16.0);
    assert_eq!(engine.state().status, MissionStatus::Lost);
}

#[test]
fn test_escort_lost_when_soldiers_wiped_out() {
    let params = EngineParams::new(open_map(), 3, SquadConfig::of(&["assault", "scout"]))
        .with_mission(MissionType::EscortVip);
    let mut engine = Engine::new(params).unwrap();

    engine.debug_set_unit_hp("assault-1", 0.0);
    engine.update(100.0);
    assert_eq!(engine.state().status, MissionStatus::Playing);

    engine.debug_set_unit_hp("scout-1", 0.0);
    engine.update(100.0);
    assert!(!unit(&engine, "vip-1").state.is_terminal());
    assert_eq!(engine.state().status, MissionStatus::Lost);
}

#[test]
fn test_mission_waits_for_whole_squad() {
    let mut engine = engine_with_assault_at_extraction();
    for _ in 0..80 {
        engine.update(100.0);
    }
    assert_eq!(unit(&engine, "assault-1").state, UnitState::Extracted);
    assert_eq!(unit(&engine, "scout-1").state, UnitState::Idle);
    assert_eq!(engine.state().status, MissionStatus::Playing);

    engine.debug_set_unit_hp("scout-1", 0.0);
    engine.update(100.0);
    assert_eq!(engine.state().status, MissionStatus::Won);
    assert_eq!(engine.state().stats.casualties, 1);
}

#[test]
fn test_loot_claimed_by_exactly_one_unit() {
    let params = EngineParams::new(open_map(), 11, SquadConfig::of(&["assault", "scout", "medic"]))
        .with_ai_control(true);
    let mut engine = Engine::new(params).unwrap();
    let loot = engine
        .debug_spawn_loot("medkit", Vec2::new(3.5, 1.5))
        .unwrap();

    for _ in 0..5 {
        engine.update(16.0);
        assert_eq!(pickup_claimants(&engine, &loot), 1);
    }
}

#[test]
fn test_two_loot_items_claimed_by_different_units() {
    let params = EngineParams::new(open_map(), 13, SquadConfig::of(&["assault", "scout", "medic"]))
        .with_ai_control(true);
    let mut engine = Engine::new(params).unwrap();
    let first = engine
        .debug_spawn_loot("medkit", Vec2::new(4.5, 1.5))
        .unwrap();
    let second = engine
        .debug_spawn_loot("stimpack", Vec2::new(1.5, 4.5))
        .unwrap();

    for _ in 0..5 {
        engine.update(16.0);
        assert_eq!(pickup_claimants(&engine, &first), 1);
        assert_eq!(pickup_claimants(&engine, &second), 1);

        let claimed: Vec<&str> = engine
            .state()
            .units
            .iter()
            .filter_map(|u| match u.active_command.as_ref().map(|c| &c.kind) {
                Some(CommandKind::Pickup { target_id }) => Some(target_id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(claimed.len(), 2);
        assert_ne!(claimed[0], claimed[1]);
    }
}

#[test]
fn test_manual_command_restores_autonomy() {
    let params = EngineParams::new(open_map(), 5, SquadConfig::of(&["assault"])).with_ai_control(true);
    let mut engine = Engine::new(params).unwrap();
    assert!(unit(&engine, "assault-1").ai_enabled);

    engine.apply_command(Command::new(
        &["assault-1"],
        CommandKind::MoveTo {
            target: CellCoord::new(3, 1),
        },
    ));
    let assault = unit(&engine, "assault-1");
    assert!(!assault.ai_enabled);
    assert_eq!(assault.prior_mode, Some(PriorMode::Autonomous));

    for _ in 0..30 {
        engine.update(100.0);
    }
    let assault = unit(&engine, "assault-1");
    assert!(assault.ai_enabled);
    assert_eq!(assault.prior_mode, None);
}

#[test]
fn test_stop_discards_saved_autonomy() {
    let params = EngineParams::new(open_map(), 5, SquadConfig::of(&["assault"])).with_ai_control(true);
    let mut engine = Engine::new(params).unwrap();
    engine.apply_command(Command::new(&["assault-1"], CommandKind::Stop));
    for _ in 0..10 {
        engine.update(100.0);
    }
    let assault = unit(&engine, "assault-1");
    assert!(!assault.ai_enabled);
    assert_eq!(assault.state, UnitState::Idle);
}

#[test]
fn test_destroy_hive_places_hive_far_from_squad() {
    let params = EngineParams::new(open_map(), 9, SquadConfig::of(&["assault"]))
        .with_mission(MissionType::DestroyHive);
    let engine = Engine::new(params).unwrap();
    let hive = engine.state().enemy("enemy-hive").unwrap();
    assert_eq!(hive.cell(), CellCoord::new(9, 9));
    assert!(engine.state().objective("obj-hive").is_some());
}
