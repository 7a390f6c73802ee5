//! Room geometry: walls, exits and spawn zones.
//!
//! A [`Room`] is immutable once built and validated. Perimeter walls come
//! first in the wall list; interior obstacle walls (if any) start at
//! [`Room::first_obstacle`]. The planner relies on that ordering.
//!
//! The catalog in [`RoomLayout`] reproduces the square evacuation rooms:
//!
//! | Layout | Exits | Perimeter walls | Obstacles |
//! |--------|-------|-----------------|-----------|
//! | `SquareOneExit` | left | 5 | 0 |
//! | `SquareOneExitOneWall` | left | 5 | 1 |
//! | `SquareTwoExits` | left + right | 6 | 0 |
//! | `SquareTwoExitsOneWallOneDoor` | left (right door closed off) | 6 | 1 |
//! | `SquareTwoExitsOneWallTwoDoors` | left + right | 6 | 1 |

use std::fmt;
use std::str::FromStr;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::Segment;

/// Axis-aligned rectangle in which agents are placed at start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnZone {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl SpawnZone {
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn contains(&self, p: DVec2) -> bool {
        p.x >= self.x_min && p.x <= self.x_max && p.y >= self.y_min && p.y <= self.y_max
    }
}

/// Catalog of predefined rooms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomLayout {
    #[serde(rename = "square_room_with_1_exit")]
    SquareOneExit,
    #[serde(rename = "square_room_with_1_exit_1_additional_wall")]
    SquareOneExitOneWall,
    #[serde(rename = "square_room_with_2_exits")]
    SquareTwoExits,
    #[serde(rename = "square_room_with_2_exits_1_additional_wall_1")]
    SquareTwoExitsOneWallOneDoor,
    #[serde(rename = "square_room_with_2_exits_1_additional_wall_2")]
    SquareTwoExitsOneWallTwoDoors,
}

impl RoomLayout {
    pub const ALL: [RoomLayout; 5] = [
        RoomLayout::SquareOneExit,
        RoomLayout::SquareOneExitOneWall,
        RoomLayout::SquareTwoExits,
        RoomLayout::SquareTwoExitsOneWallOneDoor,
        RoomLayout::SquareTwoExitsOneWallTwoDoors,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RoomLayout::SquareOneExit => "square_room_with_1_exit",
            RoomLayout::SquareOneExitOneWall => "square_room_with_1_exit_1_additional_wall",
            RoomLayout::SquareTwoExits => "square_room_with_2_exits",
            RoomLayout::SquareTwoExitsOneWallOneDoor => {
                "square_room_with_2_exits_1_additional_wall_1"
            }
            RoomLayout::SquareTwoExitsOneWallTwoDoors => {
                "square_room_with_2_exits_1_additional_wall_2"
            }
        }
    }
}

impl fmt::Display for RoomLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RoomLayout {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        RoomLayout::ALL
            .into_iter()
            .find(|l| l.name() == s)
            .ok_or_else(|| Error::InvalidParam(format!("unknown room layout '{s}'")))
    }
}

/// Static geometry for one run.
#[derive(Debug, Clone)]
pub struct Room {
    size: f64,
    walls: Vec<Segment>,
    destinations: Vec<DVec2>,
    first_obstacle: usize,
    has_interior_obstacles: bool,
    spawn_zone: SpawnZone,
}

impl Room {
    /// Build a room after validating the geometry contract.
    ///
    /// Errors:
    /// - `Error::InvalidRoom` for an empty wall list, a destination count
    ///   other than 1 or 2, an obstacle range with no walls in it, or an
    ///   inverted spawn zone.
    /// - `Error::DegenerateWall` for any zero-length wall.
    pub fn new(
        size: f64,
        walls: Vec<Segment>,
        destinations: Vec<DVec2>,
        first_obstacle: usize,
        has_interior_obstacles: bool,
        spawn_zone: SpawnZone,
    ) -> Result<Self> {
        if !size.is_finite() || size <= 0.0 {
            return Err(Error::InvalidParam("room size must be finite and > 0".into()));
        }
        if walls.is_empty() {
            return Err(Error::InvalidRoom("wall list is empty".into()));
        }
        if let Some(index) = walls.iter().position(Segment::is_degenerate) {
            return Err(Error::DegenerateWall { index });
        }
        if destinations.is_empty() || destinations.len() > 2 {
            return Err(Error::InvalidRoom(format!(
                "expected 1 or 2 destinations, got {}",
                destinations.len()
            )));
        }
        if first_obstacle > walls.len() {
            return Err(Error::InvalidRoom(format!(
                "first obstacle index {} exceeds wall count {}",
                first_obstacle,
                walls.len()
            )));
        }
        if has_interior_obstacles && first_obstacle == walls.len() {
            return Err(Error::InvalidRoom(
                "obstacle routing enabled but no obstacle walls present".into(),
            ));
        }
        if spawn_zone.width() < 0.0 || spawn_zone.height() < 0.0 {
            return Err(Error::InvalidRoom("spawn zone bounds are inverted".into()));
        }
        Ok(Self {
            size,
            walls,
            destinations,
            first_obstacle,
            has_interior_obstacles,
            spawn_zone,
        })
    }

    /// Build one of the catalog rooms with side length `size`.
    pub fn from_layout(layout: RoomLayout, size: f64) -> Result<Self> {
        let l = size;
        let seg = Segment::from_coords;
        let left_exit = DVec2::new(-0.5, l / 2.0);
        let right_exit = DVec2::new(l + 0.5, l / 2.0);
        let half_spawn = SpawnZone {
            x_min: l / 2.0,
            x_max: l - 1.0,
            y_min: 1.0,
            y_max: l - 1.0,
        };
        let obstacle = seg(l / 4.0, l * 0.3, l / 4.0, l * 0.7);

        // One door on the left wall, split into two wall segments around it.
        let one_door = |door: f64| {
            vec![
                seg(0.0, 0.0, 0.0, l / 2.0 - door / 2.0),
                seg(0.0, l / 2.0 + door / 2.0, 0.0, l),
                seg(0.0, l, l, l),
                seg(l, l, l, 0.0),
                seg(l, 0.0, 0.0, 0.0),
            ]
        };
        // Doors on both the left and right walls.
        let two_doors = |door: f64| {
            vec![
                seg(0.0, 0.0, 0.0, l / 2.0 - door / 2.0),
                seg(0.0, l / 2.0 + door / 2.0, 0.0, l),
                seg(0.0, l, l, l),
                seg(l, l, l, l / 2.0 + door / 2.0),
                seg(l, l / 2.0 - door / 2.0, l, 0.0),
                seg(l, 0.0, 0.0, 0.0),
            ]
        };

        match layout {
            RoomLayout::SquareOneExit => {
                Room::new(l, one_door(l / 10.0), vec![left_exit], 5, false, half_spawn)
            }
            RoomLayout::SquareOneExitOneWall => {
                let mut walls = one_door(l / 15.0);
                walls.push(obstacle);
                Room::new(l, walls, vec![left_exit], 5, true, half_spawn)
            }
            RoomLayout::SquareTwoExits => {
                let spawn = SpawnZone {
                    x_min: 1.0,
                    ..half_spawn
                };
                Room::new(
                    l,
                    two_doors(l / 15.0),
                    vec![left_exit, right_exit],
                    6,
                    false,
                    spawn,
                )
            }
            RoomLayout::SquareTwoExitsOneWallOneDoor => {
                let mut walls = two_doors(l / 15.0);
                walls.push(obstacle);
                Room::new(l, walls, vec![left_exit], 6, true, half_spawn)
            }
            RoomLayout::SquareTwoExitsOneWallTwoDoors => {
                let mut walls = two_doors(l / 15.0);
                walls.push(obstacle);
                Room::new(l, walls, vec![left_exit, right_exit], 6, true, half_spawn)
            }
        }
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn walls(&self) -> &[Segment] {
        &self.walls
    }

    pub fn num_walls(&self) -> usize {
        self.walls.len()
    }

    /// Interior obstacle walls, i.e. everything past the perimeter.
    pub fn obstacle_walls(&self) -> &[Segment] {
        &self.walls[self.first_obstacle..]
    }

    pub fn first_obstacle(&self) -> usize {
        self.first_obstacle
    }

    pub fn has_interior_obstacles(&self) -> bool {
        self.has_interior_obstacles
    }

    pub fn destinations(&self) -> &[DVec2] {
        &self.destinations
    }

    pub fn spawn_zone(&self) -> &SpawnZone {
        &self.spawn_zone
    }

    /// Destination assigned to `agent` in a population of `num_agents`.
    ///
    /// With two exits the first half of the indices targets exit 0 and the
    /// rest exit 1. The split is by index, never recomputed.
    pub fn destination_for(&self, agent: usize, num_agents: usize) -> DVec2 {
        match self.destinations.as_slice() {
            [first, second] => {
                if 2 * agent < num_agents {
                    *first
                } else {
                    *second
                }
            }
            _ => self.destinations[0],
        }
    }

    /// Distance from `p` to the closest destination.
    pub fn nearest_destination_distance(&self, p: DVec2) -> f64 {
        self.destinations
            .iter()
            .map(|d| p.distance(*d))
            .fold(f64::INFINITY, f64::min)
    }
}
