//! Static mission map description
//!
//! A `MapDefinition` is produced by an external generator or loaded from
//! JSON. It is read once at mission start; the engine never mutates it
//! except for the door table, which is copied into live state.

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};
use crate::core::types::CellCoord;
use crate::mission::doors::{Door, DoorState};
use crate::mission::objectives::ObjectiveKind;

/// Largest accepted map side, in cells
pub const MAX_MAP_DIMENSION: i32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellType {
    Void,
    Floor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
    #[serde(rename = "type")]
    pub cell_type: CellType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
}

/// Thin wall along grid lines, given by its two corner points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WallDefinition {
    pub p1: CellCoord,
    pub p2: CellCoord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundaryType {
    Open,
    Wall,
    Door,
}

/// Explicit boundary between two adjacent cells, overriding derived types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryDefinition {
    pub a: CellCoord,
    pub b: CellCoord,
    #[serde(rename = "type")]
    pub boundary_type: BoundaryType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub door_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnPoint {
    pub id: String,
    pub pos: CellCoord,
    #[serde(default = "default_spawn_radius")]
    pub radius: f64,
}

fn default_spawn_radius() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveDefinition {
    pub id: String,
    pub kind: ObjectiveKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_cell: Option<CellCoord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_enemy_id: Option<String>,
}

/// Complete static description of a mission map
///
/// Cells that are not listed are treated as `Void`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapDefinition {
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub cells: Vec<Cell>,
    #[serde(default)]
    pub walls: Vec<WallDefinition>,
    #[serde(default)]
    pub boundaries: Vec<BoundaryDefinition>,
    #[serde(default)]
    pub doors: Vec<Door>,
    #[serde(default)]
    pub spawn_points: Vec<SpawnPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub squad_spawn: Option<CellCoord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction: Option<CellCoord>,
    #[serde(default)]
    pub objectives: Vec<ObjectiveDefinition>,
    #[serde(default)]
    pub bonus_loot: Vec<CellCoord>,
}

impl MapDefinition {
    /// Rectangular map where every cell is floor
    pub fn filled(width: i32, height: i32) -> Self {
        let mut cells = Vec::with_capacity((width.max(0) * height.max(0)) as usize);
        for y in 0..height {
            for x in 0..width {
                cells.push(Cell {
                    x,
                    y,
                    cell_type: CellType::Floor,
                    room_id: None,
                });
            }
        }
        Self {
            width,
            height,
            cells,
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_void(mut self, cell: CellCoord) -> Self {
        for c in self.cells.iter_mut() {
            if c.x == cell.x && c.y == cell.y {
                c.cell_type = CellType::Void;
            }
        }
        self
    }

    pub fn with_wall(mut self, p1: CellCoord, p2: CellCoord) -> Self {
        self.walls.push(WallDefinition { p1, p2 });
        self
    }

    /// Add a door between two adjacent cells
    pub fn with_door(mut self, id: &str, a: CellCoord, b: CellCoord, state: DoorState) -> Self {
        self.doors.push(Door::new(id, a, b, state));
        self
    }

    pub fn with_squad_spawn(mut self, cell: CellCoord) -> Self {
        self.squad_spawn = Some(cell);
        self
    }

    pub fn with_extraction(mut self, cell: CellCoord) -> Self {
        self.extraction = Some(cell);
        self
    }

    pub fn with_spawn_point(mut self, id: &str, cell: CellCoord) -> Self {
        self.spawn_points.push(SpawnPoint {
            id: id.to_string(),
            pos: cell,
            radius: default_spawn_radius(),
        });
        self
    }

    pub fn with_objective(mut self, objective: ObjectiveDefinition) -> Self {
        self.objectives.push(objective);
        self
    }

    pub fn in_bounds(&self, cell: CellCoord) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }

    pub fn floor_cells(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.cells
            .iter()
            .filter(|c| c.cell_type == CellType::Floor)
            .map(|c| CellCoord::new(c.x, c.y))
    }

    /// Reject maps the engine could never finish a mission on
    pub fn validate(&self) -> Result<()> {
        if self.width <= 0 || self.height <= 0 {
            return Err(SimError::InvalidMap(format!(
                "dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.width > MAX_MAP_DIMENSION || self.height > MAX_MAP_DIMENSION {
            return Err(SimError::InvalidMap(format!(
                "dimensions {}x{} exceed {}",
                self.width, self.height, MAX_MAP_DIMENSION
            )));
        }
        if let Some(cell) = self
            .cells
            .iter()
            .map(|c| CellCoord::new(c.x, c.y))
            .find(|c| !self.in_bounds(*c))
        {
            return Err(SimError::InvalidMap(format!("cell {} out of bounds", cell)));
        }
        if self.floor_cells().next().is_none() {
            return Err(SimError::InvalidMap("map has no floor cells".into()));
        }
        for door in &self.doors {
            let [a, b] = door.segment;
            if !self.in_bounds(a) || !self.in_bounds(b) || a.manhattan(&b) != 1 {
                return Err(SimError::InvalidMap(format!(
                    "door {} does not separate two adjacent cells",
                    door.id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filled_map_is_valid() {
        let map = MapDefinition::filled(4, 3);
        assert_eq!(map.cells.len(), 12);
        assert!(map.validate().is_ok());
    }

    #[test]
    fn test_all_void_map_rejected() {
        let mut map = MapDefinition::filled(2, 1);
        map = map
            .with_void(CellCoord::new(0, 0))
            .with_void(CellCoord::new(1, 0));
        assert!(matches!(map.validate(), Err(SimError::InvalidMap(_))));
    }

    #[test]
    fn test_non_adjacent_door_rejected() {
        let map = MapDefinition::filled(3, 1).with_door(
            "d",
            CellCoord::new(0, 0),
            CellCoord::new(2, 0),
            DoorState::Closed,
        );
        assert!(map.validate().is_err());
    }

    #[test]
    fn test_json_map_defaults_optional_fields() {
        let json = r#"{
            "width": 2,
            "height": 1,
            "cells": [
                {"x": 0, "y": 0, "type": "Floor"},
                {"x": 1, "y": 0, "type": "Floor"}
            ],
            "extraction": {"x": 1, "y": 0}
        }"#;
        let map = MapDefinition::from_json(json).expect("parses");
        assert!(map.doors.is_empty());
        assert_eq!(map.extraction, Some(CellCoord::new(1, 0)));
    }
}
