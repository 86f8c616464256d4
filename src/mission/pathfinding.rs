//! A* pathfinding over the cell graph
//!
//! Door-aware: passability of door edges is read from live door state on
//! every call. No state is kept between calls.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use ordered_float::OrderedFloat;

use crate::core::types::{CellCoord, Vec2};
use crate::mission::doors::{Door, DoorState};
use crate::mission::graph::{Boundary, Graph};

/// How door edges are treated during the search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorPolicy {
    /// Only open, destroyed, or opening doors
    Strict,
    /// Also plan through closed (not locked) doors, which open on arrival
    ThroughClosed,
}

/// Node in the A* open set
#[derive(Debug, Clone)]
struct PathNode {
    coord: CellCoord,
    f_cost: OrderedFloat<f64>,
}

impl PartialEq for PathNode {
    fn eq(&self, other: &Self) -> bool {
        self.f_cost == other.f_cost && self.coord == other.coord
    }
}

impl Eq for PathNode {}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap; coordinate breaks ties deterministically
        other
            .f_cost
            .cmp(&self.f_cost)
            .then_with(|| other.coord.cmp(&self.coord))
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Whether a unit may step from `a` to adjacent `b`
pub fn can_traverse(
    graph: &Graph,
    doors: &[Door],
    a: CellCoord,
    b: CellCoord,
    policy: DoorPolicy,
) -> bool {
    if !graph.is_walkable(b) {
        return false;
    }
    match graph.boundary(a, b) {
        Boundary::Open => true,
        Boundary::Wall => false,
        Boundary::Door(idx) => doors
            .get(idx)
            .map(|door| {
                door.is_passable()
                    || (policy == DoorPolicy::ThroughClosed && door.state == DoorState::Closed)
            })
            .unwrap_or(false),
    }
}

/// Find path using A* algorithm
///
/// The returned waypoints exclude `start` and end at `goal`. An empty path
/// means the unit is already there; `None` means the goal is unreachable.
pub fn find_path(
    graph: &Graph,
    doors: &[Door],
    start: CellCoord,
    goal: CellCoord,
    policy: DoorPolicy,
) -> Option<Vec<CellCoord>> {
    if !graph.is_walkable(goal) {
        return None;
    }
    if start == goal {
        return Some(Vec::new());
    }

    let mut open_set = BinaryHeap::new();
    let mut came_from: HashMap<CellCoord, CellCoord> = HashMap::new();
    let mut g_scores: HashMap<CellCoord, f64> = HashMap::new();

    g_scores.insert(start, 0.0);
    open_set.push(PathNode {
        coord: start,
        f_cost: OrderedFloat(heuristic(start, goal)),
    });

    while let Some(current) = open_set.pop() {
        if current.coord == goal {
            return Some(reconstruct_path(&came_from, start, goal));
        }

        let current_g = *g_scores.get(&current.coord).unwrap_or(&f64::INFINITY);

        for neighbor in graph.neighbors(current.coord) {
            if !can_traverse(graph, doors, current.coord, neighbor, policy) {
                continue;
            }

            let tentative_g = current_g + current.coord.euclidean(&neighbor);
            let neighbor_g = *g_scores.get(&neighbor).unwrap_or(&f64::INFINITY);

            if tentative_g < neighbor_g {
                came_from.insert(neighbor, current.coord);
                g_scores.insert(neighbor, tentative_g);
                open_set.push(PathNode {
                    coord: neighbor,
                    f_cost: OrderedFloat(tentative_g + heuristic(neighbor, goal)),
                });
            }
        }
    }

    None // No path found
}

/// Path from a continuous position, starting at the cell that contains it
pub fn find_path_from(
    graph: &Graph,
    doors: &[Door],
    from: Vec2,
    goal: CellCoord,
    policy: DoorPolicy,
) -> Option<Vec<CellCoord>> {
    find_path(graph, doors, from.cell(), goal, policy)
}

fn heuristic(a: CellCoord, b: CellCoord) -> f64 {
    a.manhattan(&b) as f64
}

/// Reconstruct path from came_from map, dropping the start cell
fn reconstruct_path(
    came_from: &HashMap<CellCoord, CellCoord>,
    start: CellCoord,
    mut current: CellCoord,
) -> Vec<CellCoord> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        if prev == start {
            break;
        }
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}
