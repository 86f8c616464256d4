//! Movement along cell waypoints
//!
//! Soldiers and enemies share one stepping routine. Distance per tick is
//! `speed / 10 * dt / 1000` tiles; leftover distance after reaching a
//! waypoint carries on toward the next one.

use crate::core::types::{CellCoord, Millis, Vec2};
use crate::mission::commands::CommandKind;
use crate::mission::constants::{SPEED_DIVISOR, WAYPOINT_EPSILON};
use crate::mission::doors::Door;
use crate::mission::graph::{Direction, Graph};
use crate::mission::library::AiProfile;
use crate::mission::pathfinding::{can_traverse, DoorPolicy};
use crate::mission::state::GameState;
use crate::mission::units::UnitState;

/// Result of a movement tick
#[derive(Debug, Clone, Default)]
pub struct MovementResult {
    pub moved: bool,
    pub reached_waypoint: bool,
    pub arrived: bool,
    /// Holding at a door that is not open yet
    pub door_blocked: bool,
}

/// Distance covered in `dt` at a x10 speed stat
pub fn step_distance(speed: f64, dt: Millis) -> f64 {
    speed / SPEED_DIVISOR * dt / 1000.0
}

/// Advance `pos` along `path`, consuming waypoints as they are reached
pub fn step_along_path(
    graph: &Graph,
    doors: &[Door],
    pos: &mut Vec2,
    path: &mut Vec<CellCoord>,
    target_pos: &mut Option<Vec2>,
    speed: f64,
    dt: Millis,
) -> MovementResult {
    let mut result = MovementResult::default();
    let mut step_left = step_distance(speed, dt);

    loop {
        let Some(next) = path.first().copied() else {
            *target_pos = None;
            result.arrived = true;
            return result;
        };
        let target = *target_pos.get_or_insert_with(|| next.center());

        let current = pos.cell();
        if current != next
            && Direction::between(current, next).is_some()
            && !can_traverse(graph, doors, current, next, DoorPolicy::Strict)
        {
            result.door_blocked = true;
            return result;
        }

        let dist = pos.distance(&target);
        if dist <= step_left + WAYPOINT_EPSILON {
            *pos = target;
            step_left = (step_left - dist).max(0.0);
            path.remove(0);
            *target_pos = path.first().map(|c| c.center());
            result.moved = true;
            result.reached_waypoint = true;
            if path.is_empty() {
                result.arrived = true;
                return result;
            }
            if step_left <= 0.0 {
                return result;
            }
        } else {
            let dir = (target - *pos).normalize();
            *pos = *pos + dir * step_left;
            result.moved = true;
            return result;
        }
    }
}

/// Move one soldier for this tick
///
/// Stand-ground units hold still while attacking. A finished plain move
/// leaves the unit idle; other commands stay active for their arrival
/// behavior.
pub fn update_unit_movement(state: &mut GameState, graph: &Graph, idx: usize, dt: Millis) {
    let doors = &state.doors;
    let unit = &mut state.units[idx];
    let mobile = match unit.state {
        UnitState::Moving => true,
        UnitState::Attacking => unit.ai_profile != AiProfile::StandGround,
        _ => false,
    };
    if !mobile || (unit.path.is_empty() && unit.target_pos.is_none()) {
        return;
    }

    let speed = unit.movement_speed();
    let result = step_along_path(
        graph,
        doors,
        &mut unit.pos,
        &mut unit.path,
        &mut unit.target_pos,
        speed,
        dt,
    );
    debug_assert!(unit.pos.is_finite(), "unit {} has a non-finite position", unit.id);

    if result.arrived {
        let plain_move = matches!(
            unit.active_command.as_ref().map(|c| &c.kind),
            None | Some(CommandKind::MoveTo { .. })
        );
        if plain_move {
            unit.active_command = None;
            unit.state = UnitState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::doors::DoorState;
    use crate::mission::map::MapDefinition;

    fn open_graph() -> Graph {
        Graph::new(&MapDefinition::filled(6, 6)).unwrap()
    }

    #[test]
    fn test_step_distance() {
        assert!((step_distance(20.0, 100.0) - 0.2).abs() < 1e-12);
        assert!((step_distance(30.0, 1000.0) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_moves_toward_waypoint() {
        let graph = open_graph();
        let mut pos = Vec2::new(0.5, 0.5);
        let mut path = vec![CellCoord::new(1, 0), CellCoord::new(2, 0)];
        let mut target = None;
        let result = step_along_path(&graph, &[], &mut pos, &mut path, &mut target, 20.0, 100.0);
        assert!(result.moved);
        assert!(!result.arrived);
        assert!((pos.x - 0.7).abs() < 1e-9);
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn test_step_carries_past_waypoint() {
        let graph = open_graph();
        let mut pos = Vec2::new(0.5, 0.5);
        let mut path = vec![CellCoord::new(1, 0), CellCoord::new(2, 0)];
        let mut target = None;
        let result = step_along_path(&graph, &[], &mut pos, &mut path, &mut target, 30.0, 500.0);
        assert!(result.reached_waypoint);
        assert!((pos.x - 2.0).abs() < 1e-9);
        assert_eq!(path, vec![CellCoord::new(2, 0)]);
    }

    #[test]
    fn test_arrival_consumes_path() {
        let graph = open_graph();
        let mut pos = Vec2::new(0.5, 0.5);
        let mut path = vec![CellCoord::new(1, 0)];
        let mut target = None;
        let result = step_along_path(&graph, &[], &mut pos, &mut path, &mut target, 30.0, 1000.0);
        assert!(result.arrived);
        assert_eq!(pos, Vec2::new(1.5, 0.5));
        assert!(path.is_empty());
        assert!(target.is_none());
    }

    #[test]
    fn test_holds_at_closed_door() {
        let map = MapDefinition::filled(6, 6).with_door(
            "d1",
            CellCoord::new(0, 0),
            CellCoord::new(1, 0),
            DoorState::Closed,
        );
        let graph = Graph::new(&map).unwrap();
        let mut doors = map.doors.clone();
        let mut pos = Vec2::new(0.5, 0.5);
        let mut path = vec![CellCoord::new(1, 0)];
        let mut target = None;
        let result = step_along_path(&graph, &doors, &mut pos, &mut path, &mut target, 20.0, 100.0);
        assert!(result.door_blocked);
        assert_eq!(pos, Vec2::new(0.5, 0.5));

        doors[0].state = DoorState::Open;
        let result = step_along_path(&graph, &doors, &mut pos, &mut path, &mut target, 20.0, 100.0);
        assert!(result.moved);
    }
}
