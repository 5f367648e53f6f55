//! Occupant movement model: dwell times and a Markov chain over rooms.
//!
//! Each room gets an expected walking distance, mixed from three activities
//! by the learned [`BehaviorWeights`]:
//!
//! | Activity | Distance |
//! |----------|----------|
//! | Exploration | `1.5 × effective width − screen width` |
//! | Item fetch | `effective width / 3` (rooms with item spawns only) |
//! | Door to door | `transition × velocity + effective width / (doors − 1)` |
//!
//! Dividing by velocity and tick length gives the expected stay in ticks.
//! A geometrically distributed stay becomes a self-loop probability of
//! `exp(−1 / stay)`; the rest of the row is split evenly between the room's
//! doors, so two parallel doors to the same neighbor count twice.

use serde::{Deserialize, Serialize};

use crate::behavior::BehaviorWeights;
use crate::config::TrackerConfig;
use crate::constants::NoiseType;
use crate::house::House;

/// Derived per-room movement statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomMovement {
    pub effective_width: f64,
    pub mean_exploration_distance: f64,
    pub mean_item_fetch_distance: f64,
    pub mean_door_to_door_distance: f64,
    pub mean_walking_distance: f64,
    /// Expected stay in ticks; always at least the configured floor.
    pub mean_staying_time: f64,
    pub door_count: usize,
    pub item_spawn: bool,
}

/// Movement statistics and transition matrix for one topology.
#[derive(Debug, Clone)]
pub struct PlayerMovementModel {
    rooms: Vec<RoomMovement>,
    /// Row-major `room × room` transition probabilities.
    transition: Vec<f64>,
    run_propensity: f64,
    step_length: f64,
}

impl PlayerMovementModel {
    /// Rebuild everything from topology, learned weights and configuration.
    pub fn recalculate(house: &House, weights: &BehaviorWeights, config: &TrackerConfig) -> Self {
        let weights = weights.sanitized();
        let [w_explore, w_item, w_door] = weights.activity_mix();
        let rooms: Vec<RoomMovement> = house
            .rooms()
            .iter()
            .map(|room| {
                let effective_width = (room.width - 2.0 * config.room_margin).max(0.0);
                let mean_exploration_distance =
                    (1.5 * effective_width - config.screen_width).max(0.0);
                let mean_item_fetch_distance = if room.item_spawn {
                    effective_width / 3.0
                } else {
                    0.0
                };
                let door_count = room.door_count();
                let crossing = if door_count > 1 {
                    effective_width / (door_count - 1) as f64
                } else {
                    0.0
                };
                let mean_door_to_door_distance =
                    config.door_transition_duration * config.mean_velocity + crossing;
                let mean_walking_distance = w_explore * mean_exploration_distance
                    + w_item * mean_item_fetch_distance
                    + w_door * mean_door_to_door_distance;
                let mean_staying_time = (mean_walking_distance
                    / config.mean_velocity
                    / config.tick_seconds)
                    .max(config.min_staying_ticks);

                RoomMovement {
                    effective_width,
                    mean_exploration_distance,
                    mean_item_fetch_distance,
                    mean_door_to_door_distance,
                    mean_walking_distance,
                    mean_staying_time,
                    door_count,
                    item_spawn: room.item_spawn,
                }
            })
            .collect();

        let n = rooms.len();
        let mut transition = vec![0.0; n * n];
        for room in house.rooms() {
            let row = room.id * n;
            if room.doors.is_empty() {
                transition[row + room.id] = 1.0;
                continue;
            }
            let stay = (-1.0 / rooms[room.id].mean_staying_time).exp();
            transition[row + room.id] += stay;
            let share = (1.0 - stay) / room.doors.len() as f64;
            for &door in &room.doors {
                transition[row + house.neighbor_through(door)] += share;
            }
        }

        Self {
            rooms,
            transition,
            run_propensity: weights.run_propensity,
            step_length: config.step_length,
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn room(&self, room: usize) -> &RoomMovement {
        &self.rooms[room]
    }

    pub fn mean_staying_time(&self, room: usize) -> f64 {
        self.rooms[room].mean_staying_time
    }

    /// Probability of moving from room `from` to room `to` in one tick.
    pub fn transition(&self, from: usize, to: usize) -> f64 {
        self.transition[from * self.rooms.len() + to]
    }

    pub fn transition_row(&self, from: usize) -> &[f64] {
        let n = self.rooms.len();
        &self.transition[from * n..(from + 1) * n]
    }

    /// Per-tick probability that the occupant emits `noise` in `room`.
    pub fn noise_likelihood(&self, noise: NoiseType, room: usize) -> f64 {
        let r = &self.rooms[room];
        let p = match noise {
            NoiseType::Walk | NoiseType::Run => {
                let steps_per_tick = (r.mean_walking_distance / self.step_length) / r.mean_staying_time;
                let share = if noise == NoiseType::Run {
                    self.run_propensity
                } else {
                    1.0 - self.run_propensity
                };
                steps_per_tick * share
            }
            NoiseType::DoorUse => r.door_count as f64 / r.mean_staying_time,
            NoiseType::ItemHandling if r.item_spawn => 1.0 / r.mean_staying_time,
            _ => 0.0,
        };
        p.clamp(0.0, 1.0)
    }

    /// Per-tick probability of any occupant noise in `room`.
    pub fn total_noise_likelihood(&self, room: usize) -> f64 {
        NoiseType::AUDIBLE
            .iter()
            .map(|&noise| self.noise_likelihood(noise, room))
            .sum::<f64>()
            .min(1.0)
    }

    /// One step of the chain: `out[j] = Σᵢ T[i, j] · belief[i]`.
    pub fn propagate(&self, belief: &[f64]) -> Vec<f64> {
        let n = self.rooms.len();
        let mut out = vec![0.0; n];
        for (i, &p) in belief.iter().enumerate().take(n) {
            if p == 0.0 {
                continue;
            }
            for (j, t) in self.transition_row(i).iter().enumerate() {
                out[j] += t * p;
            }
        }
        out
    }

    /// Stationary distribution by power iteration from uniform.
    pub fn stationary_distribution(&self, tolerance: f64, max_iterations: usize) -> Vec<f64> {
        let n = self.rooms.len();
        if n == 0 {
            return Vec::new();
        }
        let mut current = vec![1.0 / n as f64; n];
        for _ in 0..max_iterations {
            let next = self.propagate(&current);
            let delta: f64 = next
                .iter()
                .zip(&current)
                .map(|(a, b)| (a - b).abs())
                .sum();
            current = next;
            if delta < tolerance {
                break;
            }
        }
        current
    }
}
