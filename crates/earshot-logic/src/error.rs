//! Error types shared across the tracking pipeline.

use thiserror::Error;

use crate::config::ConfigError;

/// A malformed or disconnected house topology. Fatal: callers must fix the
/// generated layout before gameplay starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("house has no rooms")]
    NoRooms,

    #[error("room at index {index} carries id {id}; ids must be dense and ordered")]
    RoomIdMismatch { index: usize, id: usize },

    #[error("door at index {index} carries id {id}; ids must be dense and ordered")]
    DoorIdMismatch { index: usize, id: usize },

    #[error("room #{room} has inverted bounds ({left} > {right})")]
    InvertedBounds { room: usize, left: f64, right: f64 },

    #[error("door #{door} references unknown room #{room}")]
    UnknownRoom { door: usize, room: usize },

    #[error("door #{door} connects to unknown door #{target}")]
    UnknownDoor { door: usize, target: usize },

    #[error("door #{door} is paired with itself")]
    SelfPaired { door: usize },

    #[error("door #{door} connects to #{target}, which connects back to #{back}")]
    AsymmetricPair {
        door: usize,
        target: usize,
        back: usize,
    },

    #[error("door #{door} at {position} lies outside room #{room}")]
    DoorOutsideRoom {
        door: usize,
        room: usize,
        position: f64,
    },

    #[error("door #{door} is not listed by its room #{room}")]
    DoorMembership { door: usize, room: usize },

    #[error("room #{room} lists door #{door} more than once")]
    DuplicateDoorListing { room: usize, door: usize },

    #[error("room #{room} has more than one door on its {wall} wall")]
    DuplicateSideDoor { room: usize, wall: &'static str },

    #[error("house graph is disconnected: {from} cannot reach {to}")]
    Disconnected { from: String, to: String },
}

/// Errors raised by tracker entry points.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error("invalid tracker config: {0:?}")]
    Config(Vec<ConfigError>),

    #[error("room #{0} does not exist in the current topology")]
    UnknownRoom(usize),

    #[error("door #{0} does not exist in the current topology")]
    UnknownDoor(usize),

    #[error("observed volume {0} must be finite and positive")]
    InvalidVolume(f64),

    #[error("only one filter update is allowed per tick; predict or observe first")]
    UpdateOrder,

    #[error("snapshot holds {snapshot} rooms but the house has {current}")]
    StaleSnapshot { snapshot: usize, current: usize },
}

/// Errors that can occur during save/load.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}
