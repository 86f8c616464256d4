//! Cell adjacency graph built from a map definition
//!
//! Every cell carries four edges (N, E, S, W) with a boundary type. Door
//! edges store the door's index into the live door table; whether a door is
//! passable is decided by the caller against current door state.

use ahash::AHashMap;

use crate::core::error::{Result, SimError};
use crate::core::types::CellCoord;
use crate::mission::map::{BoundaryType, CellType, MapDefinition};

/// Edge between two adjacent cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Open,
    Wall,
    /// Index into the mission's door list
    Door(usize),
}

impl Boundary {
    pub fn boundary_type(&self) -> BoundaryType {
        match self {
            Boundary::Open => BoundaryType::Open,
            Boundary::Wall => BoundaryType::Wall,
            Boundary::Door(_) => BoundaryType::Door,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    fn index(self) -> usize {
        self as usize
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    /// Direction from `a` to orthogonally adjacent `b`
    pub fn between(a: CellCoord, b: CellCoord) -> Option<Self> {
        match (b.x - a.x, b.y - a.y) {
            (0, -1) => Some(Direction::North),
            (1, 0) => Some(Direction::East),
            (0, 1) => Some(Direction::South),
            (-1, 0) => Some(Direction::West),
            _ => None,
        }
    }

    pub fn step(self, cell: CellCoord) -> CellCoord {
        match self {
            Direction::North => CellCoord::new(cell.x, cell.y - 1),
            Direction::East => CellCoord::new(cell.x + 1, cell.y),
            Direction::South => CellCoord::new(cell.x, cell.y + 1),
            Direction::West => CellCoord::new(cell.x - 1, cell.y),
        }
    }
}

/// Static, queryable adjacency structure for one mission
#[derive(Debug, Clone)]
pub struct Graph {
    width: i32,
    height: i32,
    cells: Vec<CellType>,
    edges: Vec<[Boundary; 4]>,
    door_ids: AHashMap<String, usize>,
}

impl Graph {
    pub fn new(map: &MapDefinition) -> Result<Self> {
        map.validate()?;

        let size = (map.width * map.height) as usize;
        let mut graph = Self {
            width: map.width,
            height: map.height,
            cells: vec![CellType::Void; size],
            edges: vec![[Boundary::Wall; 4]; size],
            door_ids: AHashMap::new(),
        };

        for cell in &map.cells {
            if let Some(idx) = graph.index(CellCoord::new(cell.x, cell.y)) {
                graph.cells[idx] = cell.cell_type;
            }
        }

        // Floor-to-floor edges start open; everything else stays a wall
        for y in 0..map.height {
            for x in 0..map.width {
                let cell = CellCoord::new(x, y);
                if !graph.is_walkable(cell) {
                    continue;
                }
                for dir in Direction::ALL {
                    if graph.is_walkable(dir.step(cell)) {
                        graph.set_edge(cell, dir, Boundary::Open);
                    }
                }
            }
        }

        for wall in &map.walls {
            let (p1, p2) = (wall.p1, wall.p2);
            if p1.x == p2.x {
                let x = p1.x;
                for y in p1.y.min(p2.y)..p1.y.max(p2.y) {
                    graph.set_boundary(CellCoord::new(x - 1, y), CellCoord::new(x, y), Boundary::Wall);
                }
            } else if p1.y == p2.y {
                let y = p1.y;
                for x in p1.x.min(p2.x)..p1.x.max(p2.x) {
                    graph.set_boundary(CellCoord::new(x, y - 1), CellCoord::new(x, y), Boundary::Wall);
                }
            } else {
                return Err(SimError::InvalidMap(format!(
                    "wall ({}) to ({}) is not axis aligned",
                    p1, p2
                )));
            }
        }

        for (idx, door) in map.doors.iter().enumerate() {
            graph.door_ids.insert(door.id.clone(), idx);
            graph.set_boundary(door.segment[0], door.segment[1], Boundary::Door(idx));
        }

        for def in &map.boundaries {
            if Direction::between(def.a, def.b).is_none() {
                return Err(SimError::InvalidMap(format!(
                    "boundary ({}) to ({}) joins non-adjacent cells",
                    def.a, def.b
                )));
            }
            let boundary = match def.boundary_type {
                BoundaryType::Open => Boundary::Open,
                BoundaryType::Wall => Boundary::Wall,
                BoundaryType::Door => {
                    let id = def.door_id.as_deref().unwrap_or_default();
                    let idx = graph.door_ids.get(id).copied().ok_or_else(|| {
                        SimError::InvalidMap(format!("boundary references unknown door '{}'", id))
                    })?;
                    Boundary::Door(idx)
                }
            };
            graph.set_boundary(def.a, def.b, boundary);
        }

        Ok(graph)
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if self.in_bounds(cell) {
            Some((cell.y * self.width + cell.x) as usize)
        } else {
            None
        }
    }

    fn set_edge(&mut self, cell: CellCoord, dir: Direction, boundary: Boundary) {
        if let Some(idx) = self.index(cell) {
            self.edges[idx][dir.index()] = boundary;
        }
    }

    fn set_boundary(&mut self, a: CellCoord, b: CellCoord, boundary: Boundary) {
        if let Some(dir) = Direction::between(a, b) {
            self.set_edge(a, dir, boundary);
            self.set_edge(b, dir.opposite(), boundary);
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, cell: CellCoord) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }

    pub fn is_walkable(&self, cell: CellCoord) -> bool {
        self.index(cell)
            .map(|idx| self.cells[idx] == CellType::Floor)
            .unwrap_or(false)
    }

    /// Edge from `cell` in `dir`; out-of-bounds cells are walled in
    pub fn edge(&self, cell: CellCoord, dir: Direction) -> Boundary {
        self.index(cell)
            .map(|idx| self.edges[idx][dir.index()])
            .unwrap_or(Boundary::Wall)
    }

    /// Boundary between two cells; non-adjacent pairs count as walls
    pub fn boundary(&self, a: CellCoord, b: CellCoord) -> Boundary {
        match Direction::between(a, b) {
            Some(dir) => self.edge(a, dir),
            None => Boundary::Wall,
        }
    }

    pub fn boundary_type(&self, a: CellCoord, b: CellCoord) -> BoundaryType {
        self.boundary(a, b).boundary_type()
    }

    /// Walkable cells reachable through a non-wall edge, in N, E, S, W order
    pub fn neighbors(&self, cell: CellCoord) -> Vec<CellCoord> {
        Direction::ALL
            .iter()
            .filter(|dir| self.edge(cell, **dir) != Boundary::Wall)
            .map(|dir| dir.step(cell))
            .filter(|n| self.is_walkable(*n))
            .collect()
    }

    pub fn door_index(&self, door_id: &str) -> Option<usize> {
        self.door_ids.get(door_id).copied()
    }

    /// All walkable cells in row-major order
    pub fn floor_cells(&self) -> Vec<CellCoord> {
        let mut out = Vec::new();
        for y in 0..self.height {
            for x in 0..self.width {
                let cell = CellCoord::new(x, y);
                if self.is_walkable(cell) {
                    out.push(cell);
                }
            }
        }
        out
    }
}
