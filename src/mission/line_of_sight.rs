//! Line of sight and line of fire
//!
//! Both queries walk rays cell by cell (Amanatides-Woo traversal) and test
//! each edge the ray crosses against the graph and live door state. A shot
//! is modelled as a "fat" ray: the centre ray plus two rays offset by
//! [`UNIT_RADIUS`] on either side.
//!
//! - Sight passes if ANY of the three rays is clear. Open, destroyed and
//!   opening doors are transparent.
//! - Fire passes only if ALL three rays are clear. Doors must be physically
//!   open, the outer thirds of an open door are struts, and a ray crossing an
//!   edge within `UNIT_RADIUS` of a wall corner clips it.

use std::collections::BTreeSet;

use crate::core::types::{CellCoord, Vec2};
use crate::mission::constants::{DOOR_STRUT_MAX, DOOR_STRUT_MIN, UNIT_RADIUS};
use crate::mission::doors::Door;
use crate::mission::graph::{Boundary, Graph};

const CORNER_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RayMode {
    Sight,
    Fire,
}

/// Visibility queries against one graph and the current door table
pub struct LineOfSight<'a> {
    graph: &'a Graph,
    doors: &'a [Door],
}

impl<'a> LineOfSight<'a> {
    pub fn new(graph: &'a Graph, doors: &'a [Door]) -> Self {
        Self { graph, doors }
    }

    /// Cells whose centre lies within `range` of `origin` and can be seen
    pub fn compute_visible_cells(&self, origin: Vec2, range: f64) -> BTreeSet<CellCoord> {
        let mut visible = BTreeSet::new();
        let range_sq = range * range;
        let start = origin.cell();
        let reach = range.ceil() as i32;

        let min_x = (start.x - reach).max(0);
        let max_x = (start.x + reach).min(self.graph.width() - 1);
        let min_y = (start.y - reach).max(0);
        let max_y = (start.y + reach).min(self.graph.height() - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let cell = CellCoord::new(x, y);
                let center = cell.center();
                if origin.distance_squared(&center) <= range_sq
                    && self.has_line_of_sight(origin, center)
                {
                    visible.insert(cell);
                }
            }
        }

        visible
    }

    pub fn has_line_of_sight(&self, a: Vec2, b: Vec2) -> bool {
        if a.cell() == b.cell() {
            return self.graph.is_walkable(a.cell());
        }
        self.fat_rays(a, b)
            .iter()
            .any(|ray| self.polyline_clear(ray, RayMode::Sight))
    }

    pub fn has_line_of_fire(&self, a: Vec2, b: Vec2) -> bool {
        if a.cell() == b.cell() {
            return self.graph.is_walkable(a.cell());
        }
        self.fat_rays(a, b)
            .iter()
            .all(|ray| self.polyline_clear(ray, RayMode::Fire))
    }

    /// Centre ray plus the two offset rays, each as a polyline that leaves
    /// and re-joins the centre so offsets cannot skip an edge near the ends
    fn fat_rays(&self, a: Vec2, b: Vec2) -> [Vec<Vec2>; 3] {
        let dir = (b - a).normalize();
        let perp = Vec2::new(-dir.y, dir.x) * UNIT_RADIUS;
        [
            vec![a, b],
            vec![a, a + perp, b + perp, b],
            vec![a, a - perp, b - perp, b],
        ]
    }

    fn polyline_clear(&self, points: &[Vec2], mode: RayMode) -> bool {
        points
            .windows(2)
            .all(|pair| self.segment_clear(pair[0], pair[1], mode))
    }

    fn segment_clear(&self, start: Vec2, end: Vec2, mode: RayMode) -> bool {
        let mut cell = start.cell();
        if !self.graph.is_walkable(cell) {
            return false;
        }
        let target = end.cell();

        let dx = end.x - start.x;
        let dy = end.y - start.y;
        let step_x: i32 = if dx > 0.0 { 1 } else if dx < 0.0 { -1 } else { 0 };
        let step_y: i32 = if dy > 0.0 { 1 } else if dy < 0.0 { -1 } else { 0 };

        let t_delta_x = if step_x != 0 { (1.0 / dx).abs() } else { f64::INFINITY };
        let t_delta_y = if step_y != 0 { (1.0 / dy).abs() } else { f64::INFINITY };

        let mut t_max_x = match step_x {
            1 => (start.x.floor() + 1.0 - start.x) * t_delta_x,
            -1 => (start.x - start.x.floor()) * t_delta_x,
            _ => f64::INFINITY,
        };
        let mut t_max_y = match step_y {
            1 => (start.y.floor() + 1.0 - start.y) * t_delta_y,
            -1 => (start.y - start.y.floor()) * t_delta_y,
            _ => f64::INFINITY,
        };

        let point_at = |t: f64| Vec2::new(start.x + dx * t, start.y + dy * t);
        let max_steps = (target.x - cell.x).abs() + (target.y - cell.y).abs() + 4;

        for _ in 0..max_steps {
            if cell == target {
                return true;
            }

            if step_x != 0 && step_y != 0 && (t_max_x - t_max_y).abs() <= CORNER_EPSILON {
                if t_max_x > 1.0 + CORNER_EPSILON {
                    return true;
                }
                if !self.corner_clear(cell, step_x, step_y, mode) {
                    return false;
                }
                cell = CellCoord::new(cell.x + step_x, cell.y + step_y);
                t_max_x += t_delta_x;
                t_max_y += t_delta_y;
            } else if t_max_x < t_max_y {
                if t_max_x > 1.0 + CORNER_EPSILON {
                    return true;
                }
                let next = CellCoord::new(cell.x + step_x, cell.y);
                let frac = point_at(t_max_x).y - cell.y as f64;
                if !self.crossing_clear(cell, next, frac, mode, true) {
                    return false;
                }
                cell = next;
                t_max_x += t_delta_x;
            } else {
                if t_max_y > 1.0 + CORNER_EPSILON {
                    return true;
                }
                let next = CellCoord::new(cell.x, cell.y + step_y);
                let frac = point_at(t_max_y).x - cell.x as f64;
                if !self.crossing_clear(cell, next, frac, mode, true) {
                    return false;
                }
                cell = next;
                t_max_y += t_delta_y;
            }
        }

        cell == target
    }

    /// Whether a ray may cross the edge from `from` into adjacent `to`
    ///
    /// `frac` is where along the edge (0..1) the ray crosses it.
    fn crossing_clear(
        &self,
        from: CellCoord,
        to: CellCoord,
        frac: f64,
        mode: RayMode,
        check_corners: bool,
    ) -> bool {
        if !self.graph.is_walkable(to) {
            return false;
        }
        let frac = frac.clamp(0.0, 1.0);

        let edge_clear = match self.graph.boundary(from, to) {
            Boundary::Open => true,
            Boundary::Wall => false,
            Boundary::Door(idx) => match self.doors.get(idx) {
                None => false,
                Some(door) => match mode {
                    RayMode::Sight => door.is_transparent(),
                    RayMode::Fire => {
                        door.permits_fire()
                            && (!door.has_struts()
                                || (DOOR_STRUT_MIN..=DOOR_STRUT_MAX).contains(&frac))
                    }
                },
            },
        };

        edge_clear && (mode == RayMode::Sight || !check_corners || self.edge_ends_clear(from, to, frac))
    }

    /// Fire rays crossing near the end of an edge clip whatever wall
    /// continues along the same grid line past that corner
    fn edge_ends_clear(&self, from: CellCoord, to: CellCoord, frac: f64) -> bool {
        let near_low = frac < UNIT_RADIUS;
        let near_high = 1.0 - frac < UNIT_RADIUS;

        if from.x != to.x {
            // Vertical grid line at x = lx spanning row from.y
            let lx = from.x.max(to.x);
            let low = || self.is_surface(CellCoord::new(lx - 1, from.y - 1), CellCoord::new(lx, from.y - 1));
            let high = || self.is_surface(CellCoord::new(lx - 1, from.y + 1), CellCoord::new(lx, from.y + 1));
            !(near_low && low()) && !(near_high && high())
        } else {
            // Horizontal grid line at y = ly spanning column from.x
            let ly = from.y.max(to.y);
            let low = || self.is_surface(CellCoord::new(from.x - 1, ly - 1), CellCoord::new(from.x - 1, ly));
            let high = || self.is_surface(CellCoord::new(from.x + 1, ly - 1), CellCoord::new(from.x + 1, ly));
            !(near_low && low()) && !(near_high && high())
        }
    }

    /// Whether the edge between two adjacent cells presents a solid face
    fn is_surface(&self, p: CellCoord, q: CellCoord) -> bool {
        let wp = self.graph.is_walkable(p);
        let wq = self.graph.is_walkable(q);
        if wp != wq {
            return true;
        }
        if !wp {
            return false;
        }
        match self.graph.boundary(p, q) {
            Boundary::Open => false,
            Boundary::Wall => true,
            Boundary::Door(idx) => self.doors.get(idx).map(|d| d.has_struts()).unwrap_or(true),
        }
    }

    /// Ray passing exactly through a lattice corner
    ///
    /// Sight may slip through either side; fire needs both sides clear.
    fn corner_clear(&self, cell: CellCoord, step_x: i32, step_y: i32, mode: RayMode) -> bool {
        let nx = CellCoord::new(cell.x + step_x, cell.y);
        let ny = CellCoord::new(cell.x, cell.y + step_y);
        let diag = CellCoord::new(cell.x + step_x, cell.y + step_y);

        let via_x = self.crossing_clear(cell, nx, 0.0, mode, false)
            && self.crossing_clear(nx, diag, 0.0, mode, false);
        let via_y = self.crossing_clear(cell, ny, 0.0, mode, false)
            && self.crossing_clear(ny, diag, 0.0, mode, false);

        match mode {
            RayMode::Sight => via_x || via_y,
            RayMode::Fire => via_x && via_y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::doors::DoorState;
    use crate::mission::map::MapDefinition;

    fn c(x: i32, y: i32) -> CellCoord {
        CellCoord::new(x, y)
    }

    fn v(x: f64, y: f64) -> Vec2 {
        Vec2::new(x, y)
    }

    #[test]
    fn test_open_room_sight_and_fire() {
        let graph = Graph::new(&MapDefinition::filled(6, 6)).unwrap();
        let los = LineOfSight::new(&graph, &[]);
        assert!(los.has_line_of_sight(v(0.5, 0.5), v(5.5, 4.5)));
        assert!(los.has_line_of_fire(v(1.5, 1.5), v(4.5, 3.5)));
    }

    #[test]
    fn test_thin_wall_blocks_both() {
        let map = MapDefinition::filled(2, 3).with_wall(c(1, 0), c(1, 3));
        let graph = Graph::new(&map).unwrap();
        let los = LineOfSight::new(&graph, &[]);
        assert!(!los.has_line_of_sight(v(0.5, 1.5), v(1.5, 1.5)));
        assert!(!los.has_line_of_fire(v(0.5, 1.5), v(1.5, 1.5)));
    }

    #[test]
    fn test_fire_down_single_width_corridor() {
        let graph = Graph::new(&MapDefinition::filled(8, 1)).unwrap();
        let los = LineOfSight::new(&graph, &[]);
        assert!(los.has_line_of_fire(v(0.5, 0.5), v(7.5, 0.5)));
    }

    #[test]
    fn test_visible_cells_stop_at_wall() {
        let map = MapDefinition::filled(5, 1).with_wall(c(3, 0), c(3, 1));
        let graph = Graph::new(&map).unwrap();
        let los = LineOfSight::new(&graph, &[]);
        let visible = los.compute_visible_cells(v(0.5, 0.5), 10.0);
        assert!(visible.contains(&c(0, 0)));
        assert!(visible.contains(&c(2, 0)));
        assert!(!visible.contains(&c(3, 0)));
        assert!(!visible.contains(&c(4, 0)));
    }

    #[test]
    fn test_visible_cells_respect_range() {
        let graph = Graph::new(&MapDefinition::filled(20, 1)).unwrap();
        let los = LineOfSight::new(&graph, &[]);
        let visible = los.compute_visible_cells(v(0.5, 0.5), 3.0);
        assert!(visible.contains(&c(3, 0)));
        assert!(!visible.contains(&c(4, 0)));
    }

    #[test]
    fn test_destroyed_door_has_no_struts() {
        let map = MapDefinition::filled(2, 1).with_door("d", c(0, 0), c(1, 0), DoorState::Destroyed);
        let graph = Graph::new(&map).unwrap();
        let los = LineOfSight::new(&graph, &map.doors);
        assert!(los.has_line_of_fire(v(0.5, 0.5), v(1.5, 0.5)));
    }

    #[test]
    fn test_diagonal_corner_sight_slips_through_one_side() {
        // (1,0) is void; the diagonal ray still sees past via (0,1)
        let map = MapDefinition::filled(2, 2).with_void(c(1, 0));
        let graph = Graph::new(&map).unwrap();
        let los = LineOfSight::new(&graph, &[]);
        assert!(los.has_line_of_sight(v(0.5, 0.5), v(1.5, 1.5)));
    }
}
