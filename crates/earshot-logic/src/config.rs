//! Physical and acoustic tuning for the tracker.
//!
//! Every table the tracker builds is derived from the house topology, the
//! learned behavior weights and this configuration. The configuration is
//! plain data so it can be loaded from JSON alongside game settings.
//!
//! ```
//! use earshot_logic::config::{validate_config, TrackerConfig};
//!
//! let config = TrackerConfig::default();
//! assert!(validate_config(&config).is_empty());
//! assert!(config.door_transition_cost() > 0.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::constants::defaults;

/// Tracker tuning constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Length of one simulation tick in seconds.
    pub tick_seconds: f64,
    /// Mean occupant velocity in world units per second.
    pub mean_velocity: f64,
    /// Distance covered by a single footstep.
    pub step_length: f64,
    /// Seconds needed to pass through a door.
    pub door_transition_duration: f64,
    /// Unwalkable margin at each end of a room.
    pub room_margin: f64,
    /// Width of the visible screen area in world units.
    pub screen_width: f64,
    /// Volume under which a noise is inaudible.
    pub inaudible_threshold: f64,
    /// Minimum seconds between ambient house noises.
    pub ambient_min_interval: f64,
    /// Maximum seconds between ambient house noises.
    pub ambient_max_interval: f64,
    /// Reference loudness of an ambient house noise.
    pub ambient_loudness: f64,
    /// Lower bound on the expected stay in a room, in ticks.
    pub min_staying_ticks: f64,
    /// Pseudo-count strength of the prior when learning behavior weights.
    pub learning_prior_strength: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tick_seconds: defaults::TICK_SECONDS,
            mean_velocity: defaults::MEAN_VELOCITY,
            step_length: defaults::STEP_LENGTH,
            door_transition_duration: defaults::DOOR_TRANSITION_DURATION,
            room_margin: defaults::ROOM_MARGIN,
            screen_width: defaults::SCREEN_WIDTH,
            inaudible_threshold: defaults::INAUDIBLE_THRESHOLD,
            ambient_min_interval: defaults::AMBIENT_MIN_INTERVAL,
            ambient_max_interval: defaults::AMBIENT_MAX_INTERVAL,
            ambient_loudness: defaults::AMBIENT_LOUDNESS,
            min_staying_ticks: defaults::MIN_STAYING_TICKS,
            learning_prior_strength: defaults::LEARNING_PRIOR_STRENGTH,
        }
    }
}

impl TrackerConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Graph weight of walking through a door (speed × transition time).
    pub fn door_transition_cost(&self) -> f64 {
        self.mean_velocity * self.door_transition_duration
    }

    /// Probability that the house emits an ambient noise during one tick.
    pub fn ambient_noise_rate(&self) -> f64 {
        let mean_interval = 0.5 * (self.ambient_min_interval + self.ambient_max_interval);
        if mean_interval <= 0.0 {
            return 1.0;
        }
        (self.tick_seconds / mean_interval).min(1.0)
    }

    /// Distance past which a noise of `loudness` drops under the threshold.
    pub fn max_travel_distance(&self, loudness: f64) -> f64 {
        if loudness <= 0.0 {
            return 0.0;
        }
        (loudness / self.inaudible_threshold).sqrt()
    }
}

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Tick length must be strictly positive.
    NonPositiveTick(f64),
    /// Mean velocity must be strictly positive.
    NonPositiveVelocity(f64),
    /// Step length must be strictly positive.
    NonPositiveStep(f64),
    /// Door transition duration cannot be negative.
    NegativeTransition(f64),
    /// Room margin cannot be negative.
    NegativeMargin(f64),
    /// Inaudible threshold must be strictly positive.
    NonPositiveThreshold(f64),
    /// Ambient interval bounds are inverted or negative.
    InvalidAmbientInterval { min: f64, max: f64 },
    /// Ambient loudness cannot be negative.
    NegativeAmbientLoudness(f64),
    /// Staying-time floor must be strictly positive.
    NonPositiveStayFloor(f64),
    /// Learning prior strength cannot be negative.
    NegativePriorStrength(f64),
}

/// Validate a tracker configuration, returning all errors found.
pub fn validate_config(config: &TrackerConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    if !(config.tick_seconds > 0.0) {
        errors.push(ConfigError::NonPositiveTick(config.tick_seconds));
    }
    if !(config.mean_velocity > 0.0) {
        errors.push(ConfigError::NonPositiveVelocity(config.mean_velocity));
    }
    if !(config.step_length > 0.0) {
        errors.push(ConfigError::NonPositiveStep(config.step_length));
    }
    if config.door_transition_duration < 0.0 {
        errors.push(ConfigError::NegativeTransition(
            config.door_transition_duration,
        ));
    }
    if config.room_margin < 0.0 {
        errors.push(ConfigError::NegativeMargin(config.room_margin));
    }
    if !(config.inaudible_threshold > 0.0) {
        errors.push(ConfigError::NonPositiveThreshold(config.inaudible_threshold));
    }
    if config.ambient_min_interval < 0.0 || config.ambient_max_interval < config.ambient_min_interval
    {
        errors.push(ConfigError::InvalidAmbientInterval {
            min: config.ambient_min_interval,
            max: config.ambient_max_interval,
        });
    }
    if config.ambient_loudness < 0.0 {
        errors.push(ConfigError::NegativeAmbientLoudness(config.ambient_loudness));
    }
    if !(config.min_staying_ticks > 0.0) {
        errors.push(ConfigError::NonPositiveStayFloor(config.min_staying_ticks));
    }
    if config.learning_prior_strength < 0.0 {
        errors.push(ConfigError::NegativePriorStrength(
            config.learning_prior_strength,
        ));
    }

    errors
}
