//! Noise types and physical defaults.
//!
//! Noise types carry a fixed reference loudness: the intensity measured one
//! world unit away from the source. Perceived volume falls off with the
//! inverse square of the travelled distance.

use serde::{Deserialize, Serialize};

/// Kind of noise the occupant (or the house) can make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseType {
    None = 0,
    Walk = 1,
    Run = 2,
    DoorUse = 3,
    ItemHandling = 4,
    Zap = 5,
}

/// Number of noise types, including `None`.
pub const NOISE_TYPE_COUNT: usize = 6;

impl NoiseType {
    /// All noise types in index order.
    pub const ALL: [NoiseType; NOISE_TYPE_COUNT] = [
        NoiseType::None,
        NoiseType::Walk,
        NoiseType::Run,
        NoiseType::DoorUse,
        NoiseType::ItemHandling,
        NoiseType::Zap,
    ];

    /// Noise types that actually make a sound.
    pub const AUDIBLE: [NoiseType; NOISE_TYPE_COUNT - 1] = [
        NoiseType::Walk,
        NoiseType::Run,
        NoiseType::DoorUse,
        NoiseType::ItemHandling,
        NoiseType::Zap,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(idx: usize) -> Option<NoiseType> {
        Self::ALL.get(idx).copied()
    }

    /// Reference loudness at one world unit from the source.
    pub fn loudness(self) -> f64 {
        match self {
            NoiseType::None => 0.0,
            NoiseType::Walk => 1.0,
            NoiseType::Run => 4.0,
            NoiseType::DoorUse => 3.0,
            NoiseType::ItemHandling => 2.0,
            NoiseType::Zap => 8.0,
        }
    }

    /// Footstep noises are split between walk and run by the learned propensity.
    pub fn is_footstep(self) -> bool {
        matches!(self, NoiseType::Walk | NoiseType::Run)
    }
}

impl std::fmt::Display for NoiseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NoiseType::None => "none",
            NoiseType::Walk => "walk",
            NoiseType::Run => "run",
            NoiseType::DoorUse => "door_use",
            NoiseType::ItemHandling => "item_handling",
            NoiseType::Zap => "zap",
        };
        f.write_str(name)
    }
}

/// Default physical constants. `TrackerConfig::default()` is built from these.
pub mod defaults {
    /// Fixed simulation step in seconds (50 Hz).
    pub const TICK_SECONDS: f64 = 0.02;
    /// Mean occupant walking speed in world units per second.
    pub const MEAN_VELOCITY: f64 = 3.0;
    /// Distance covered by one footstep.
    pub const STEP_LENGTH: f64 = 0.8;
    /// Seconds spent passing through a door.
    pub const DOOR_TRANSITION_DURATION: f64 = 0.5;
    /// Unwalkable margin at each end of a room.
    pub const ROOM_MARGIN: f64 = 0.5;
    /// Visible width of the camera, in world units.
    pub const SCREEN_WIDTH: f64 = 16.0;
    /// Volume below which a noise is no longer perceptible.
    pub const INAUDIBLE_THRESHOLD: f64 = 0.01;
    /// Minimum seconds between two ambient house noises.
    pub const AMBIENT_MIN_INTERVAL: f64 = 8.0;
    /// Maximum seconds between two ambient house noises.
    pub const AMBIENT_MAX_INTERVAL: f64 = 20.0;
    /// Reference loudness of an ambient house noise (creaks, pipes).
    pub const AMBIENT_LOUDNESS: f64 = 2.0;
    /// Floor for the expected stay in a room, in ticks.
    pub const MIN_STAYING_TICKS: f64 = 1.0;
    /// Pseudo-count weight of the current behavior weights when learning.
    pub const LEARNING_PRIOR_STRENGTH: f64 = 10.0;
}
