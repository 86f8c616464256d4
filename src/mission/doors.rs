//! Doors: live state, passability rules, and timed open/close transitions

use serde::{Deserialize, Serialize};

use crate::core::types::{CellCoord, Millis};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoorState {
    Closed,
    Open,
    Locked,
    Destroyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    /// Barrier runs north-south, separating cells that differ in x
    Vertical,
    /// Barrier runs east-west, separating cells that differ in y
    Horizontal,
}

fn default_open_duration() -> f64 {
    1.0
}

fn default_door_hp() -> f64 {
    100.0
}

/// A door on the boundary between two adjacent cells
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Door {
    pub id: String,
    /// The two cells the door separates
    pub segment: [CellCoord; 2],
    pub state: DoorState,
    /// State the door is transitioning to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_state: Option<DoorState>,
    /// Countdown until `target_state` takes effect (ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_timer: Option<Millis>,
    /// Transition time in seconds
    #[serde(default = "default_open_duration")]
    pub open_duration: f64,
    #[serde(default = "default_door_hp")]
    pub hp: f64,
    #[serde(default = "default_door_hp")]
    pub max_hp: f64,
}

impl Door {
    pub fn new(id: &str, a: CellCoord, b: CellCoord, state: DoorState) -> Self {
        Self {
            id: id.to_string(),
            segment: [a, b],
            state,
            target_state: None,
            open_timer: None,
            open_duration: default_open_duration(),
            hp: default_door_hp(),
            max_hp: default_door_hp(),
        }
    }

    pub fn with_target(mut self, target: DoorState) -> Self {
        self.target_state = Some(target);
        self
    }

    pub fn orientation(&self) -> Orientation {
        if self.segment[0].x != self.segment[1].x {
            Orientation::Vertical
        } else {
            Orientation::Horizontal
        }
    }

    pub fn contains(&self, cell: CellCoord) -> bool {
        self.segment.contains(&cell)
    }

    /// Units may walk through: open, destroyed, or already opening
    pub fn is_passable(&self) -> bool {
        matches!(self.state, DoorState::Open | DoorState::Destroyed)
            || self.target_state == Some(DoorState::Open)
    }

    /// Sight passes through the same doors units can walk through
    pub fn is_transparent(&self) -> bool {
        self.is_passable()
    }

    /// Weapons fire needs the door physically open; an opening door still blocks
    pub fn permits_fire(&self) -> bool {
        matches!(self.state, DoorState::Open | DoorState::Destroyed)
    }

    /// Whether the door frame narrows the firing aperture
    pub fn has_struts(&self) -> bool {
        self.state != DoorState::Destroyed
    }

    fn begin_transition(&mut self, target: DoorState) {
        self.target_state = Some(target);
        self.open_timer = Some(self.open_duration * 1000.0);
    }

    /// Start opening unless already open or opening
    pub fn request_open(&mut self) {
        if matches!(self.state, DoorState::Closed | DoorState::Locked)
            && self.target_state != Some(DoorState::Open)
        {
            self.begin_transition(DoorState::Open);
        }
    }

    /// Lock the door, closing it first if it is open
    pub fn request_lock(&mut self) {
        match self.state {
            DoorState::Closed => {
                self.state = DoorState::Locked;
                self.target_state = None;
                self.open_timer = None;
            }
            DoorState::Open => self.begin_transition(DoorState::Locked),
            DoorState::Locked | DoorState::Destroyed => {}
        }
    }
}

/// Something standing in a cell that can trigger a door
#[derive(Debug, Clone, Copy)]
pub struct DoorOccupant {
    pub cell: CellCoord,
    pub is_soldier: bool,
}

/// Advance door timers and react to occupants
///
/// A closed door opens for anyone standing in one of its cells; a locked
/// door only for soldiers. An open door with nobody in its cells closes.
pub fn update_doors(doors: &mut [Door], occupants: &[DoorOccupant], dt: Millis) {
    for door in doors.iter_mut() {
        if door.state == DoorState::Destroyed {
            continue;
        }

        if let Some(timer) = door.open_timer {
            let remaining = timer - dt;
            if remaining <= 0.0 {
                if let Some(target) = door.target_state.take() {
                    door.state = target;
                }
                door.open_timer = None;
            } else {
                door.open_timer = Some(remaining);
            }
        }

        let present: Vec<&DoorOccupant> = occupants
            .iter()
            .filter(|o| door.contains(o.cell))
            .collect();
        let soldier_present = present.iter().any(|o| o.is_soldier);

        match door.state {
            DoorState::Closed if !present.is_empty() => door.request_open(),
            DoorState::Locked if soldier_present => door.request_open(),
            DoorState::Open if !present.is_empty() => {
                if door.target_state == Some(DoorState::Closed) {
                    door.target_state = None;
                    door.open_timer = None;
                }
            }
            DoorState::Open if door.target_state.is_none() => {
                door.begin_transition(DoorState::Closed);
            }
            _ => {}
        }
    }
}
