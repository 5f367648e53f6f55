//! House topology: rooms laid out along one axis, linked by paired doors.
//!
//! Rooms and doors live in two dense arenas and refer to each other only by
//! index, so every derived table can be a flat array. A `House` is validated
//! on construction; generation and mutation of the layout happen elsewhere.
//!
//! ```
//! use earshot_logic::house::{HouseBuilder, WallType};
//!
//! let mut builder = HouseBuilder::new();
//! let hall = builder.add_room(0.0, 20.0, false);
//! let kitchen = builder.add_room(0.0, 12.0, true);
//! builder.connect(hall, WallType::Right, 0.0, kitchen, WallType::Left, 0.0);
//! let house = builder.build().unwrap();
//! assert_eq!(house.room_count(), 2);
//! assert_eq!(house.door_count(), 2);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

const POSITION_EPSILON: f64 = 1e-6;

/// Which wall of a room a door is set in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WallType {
    /// Side door at the room's left boundary.
    Left,
    /// Door in the back wall, anywhere between the boundaries.
    Back,
    /// Side door at the room's right boundary.
    Right,
}

impl WallType {
    fn name(self) -> &'static str {
        match self {
            WallType::Left => "left",
            WallType::Back => "back",
            WallType::Right => "right",
        }
    }
}

/// A room: a walkable segment `[left, right]` along the house axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: usize,
    /// Left walkable boundary.
    pub left: f64,
    /// Right walkable boundary.
    pub right: f64,
    /// Full room width, margins included.
    pub width: f64,
    /// Doors of this room, ordered by position once the house is built.
    pub doors: Vec<usize>,
    /// Whether items spawn in this room.
    pub item_spawn: bool,
}

impl Room {
    /// Room whose full width equals its walkable span.
    pub fn new(id: usize, left: f64, right: f64, item_spawn: bool) -> Self {
        Self {
            id,
            left,
            right,
            width: right - left,
            doors: Vec::new(),
            item_spawn,
        }
    }

    /// Length of the walkable span.
    pub fn walkable_width(&self) -> f64 {
        self.right - self.left
    }

    pub fn door_count(&self) -> usize {
        self.doors.len()
    }

    /// Midpoint of the walkable span.
    pub fn center(&self) -> f64 {
        0.5 * (self.left + self.right)
    }
}

/// A door: one side of an undirected passage between two rooms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Door {
    pub id: usize,
    /// Room this side of the passage belongs to.
    pub room: usize,
    /// Position along the room axis. Side doors sit on their wall.
    pub position: f64,
    /// The paired door on the other side.
    pub connects_to: usize,
    pub wall: WallType,
}

/// Validated house topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct House {
    rooms: Vec<Room>,
    doors: Vec<Door>,
}

impl House {
    /// Validate rooms and doors and order each room's doors by position.
    ///
    /// Side doors are snapped onto their wall so they coincide with the
    /// wall vertex of the room graph.
    pub fn new(mut rooms: Vec<Room>, mut doors: Vec<Door>) -> Result<Self, GeometryError> {
        check_ids(&rooms, &doors)?;
        check_rooms(&rooms)?;
        check_doors(&rooms, &doors)?;

        for door in &mut doors {
            let room = &rooms[door.room];
            match door.wall {
                WallType::Left => door.position = room.left,
                WallType::Right => door.position = room.right,
                WallType::Back => {}
            }
        }
        for room in &mut rooms {
            room.doors
                .sort_by(|a, b| doors[*a].position.total_cmp(&doors[*b].position));
        }

        Ok(Self { rooms, doors })
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn doors(&self) -> &[Door] {
        &self.doors
    }

    pub fn room(&self, id: usize) -> Option<&Room> {
        self.rooms.get(id)
    }

    pub fn door(&self, id: usize) -> Option<&Door> {
        self.doors.get(id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn door_count(&self) -> usize {
        self.doors.len()
    }

    /// Room on the far side of `door`.
    pub fn neighbor_through(&self, door: usize) -> usize {
        self.doors[self.doors[door].connects_to].room
    }

    /// Sum of all walkable widths.
    pub fn total_walkable_width(&self) -> f64 {
        self.rooms.iter().map(Room::walkable_width).sum()
    }
}

fn check_ids(rooms: &[Room], doors: &[Door]) -> Result<(), GeometryError> {
    if rooms.is_empty() {
        return Err(GeometryError::NoRooms);
    }
    for (index, room) in rooms.iter().enumerate() {
        if room.id != index {
            return Err(GeometryError::RoomIdMismatch { index, id: room.id });
        }
    }
    for (index, door) in doors.iter().enumerate() {
        if door.id != index {
            return Err(GeometryError::DoorIdMismatch { index, id: door.id });
        }
    }
    Ok(())
}

fn check_rooms(rooms: &[Room]) -> Result<(), GeometryError> {
    for room in rooms {
        if room.left > room.right || room.left.is_nan() || room.right.is_nan() {
            return Err(GeometryError::InvertedBounds {
                room: room.id,
                left: room.left,
                right: room.right,
            });
        }
    }
    Ok(())
}

fn check_doors(rooms: &[Room], doors: &[Door]) -> Result<(), GeometryError> {
    for door in doors {
        let Some(room) = rooms.get(door.room) else {
            return Err(GeometryError::UnknownRoom {
                door: door.id,
                room: door.room,
            });
        };
        if door.connects_to == door.id {
            return Err(GeometryError::SelfPaired { door: door.id });
        }
        let Some(target) = doors.get(door.connects_to) else {
            return Err(GeometryError::UnknownDoor {
                door: door.id,
                target: door.connects_to,
            });
        };
        if target.connects_to != door.id {
            return Err(GeometryError::AsymmetricPair {
                door: door.id,
                target: target.id,
                back: target.connects_to,
            });
        }
        if door.wall == WallType::Back
            && (door.position < room.left - POSITION_EPSILON
                || door.position > room.right + POSITION_EPSILON
                || door.position.is_nan())
        {
            return Err(GeometryError::DoorOutsideRoom {
                door: door.id,
                room: room.id,
                position: door.position,
            });
        }
        if !room.doors.contains(&door.id) {
            return Err(GeometryError::DoorMembership {
                door: door.id,
                room: room.id,
            });
        }
    }

    for room in rooms {
        let mut left = 0;
        let mut right = 0;
        for (i, &id) in room.doors.iter().enumerate() {
            if room.doors[..i].contains(&id) {
                return Err(GeometryError::DuplicateDoorListing {
                    room: room.id,
                    door: id,
                });
            }
            let Some(door) = doors.get(id) else {
                return Err(GeometryError::UnknownDoor {
                    door: id,
                    target: id,
                });
            };
            if door.room != room.id {
                return Err(GeometryError::DoorMembership {
                    door: id,
                    room: room.id,
                });
            }
            match door.wall {
                WallType::Left => left += 1,
                WallType::Right => right += 1,
                WallType::Back => {}
            }
        }
        for (count, wall) in [(left, WallType::Left), (right, WallType::Right)] {
            if count > 1 {
                return Err(GeometryError::DuplicateSideDoor {
                    room: room.id,
                    wall: wall.name(),
                });
            }
        }
    }
    Ok(())
}

/// Incremental builder for hand-made and test layouts.
#[derive(Debug, Default)]
pub struct HouseBuilder {
    rooms: Vec<Room>,
    doors: Vec<Door>,
}

impl HouseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a room spanning `[left, right]`; returns its id.
    pub fn add_room(&mut self, left: f64, right: f64, item_spawn: bool) -> usize {
        let id = self.rooms.len();
        self.rooms.push(Room::new(id, left, right, item_spawn));
        id
    }

    /// Add a room with an explicit full width wider than its walkable span.
    pub fn add_room_with_width(
        &mut self,
        left: f64,
        right: f64,
        width: f64,
        item_spawn: bool,
    ) -> usize {
        let id = self.add_room(left, right, item_spawn);
        self.rooms[id].width = width;
        id
    }

    /// Link two rooms with a pair of doors; returns `(door_in_a, door_in_b)`.
    ///
    /// Positions of side doors are ignored and snapped to the wall on build.
    pub fn connect(
        &mut self,
        room_a: usize,
        wall_a: WallType,
        position_a: f64,
        room_b: usize,
        wall_b: WallType,
        position_b: f64,
    ) -> (usize, usize) {
        let door_a = self.doors.len();
        let door_b = door_a + 1;
        self.doors.push(Door {
            id: door_a,
            room: room_a,
            position: position_a,
            connects_to: door_b,
            wall: wall_a,
        });
        self.doors.push(Door {
            id: door_b,
            room: room_b,
            position: position_b,
            connects_to: door_a,
            wall: wall_b,
        });
        if let Some(room) = self.rooms.get_mut(room_a) {
            room.doors.push(door_a);
        }
        if let Some(room) = self.rooms.get_mut(room_b) {
            room.doors.push(door_b);
        }
        (door_a, door_b)
    }

    pub fn build(self) -> Result<House, GeometryError> {
        House::new(self.rooms, self.doors)
    }
}
