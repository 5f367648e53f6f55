//! Bayesian belief over which room the occupant is in.
//!
//! The tracker owns every derived table for one topology and a belief
//! vector indexed by room id. Each tick the caller either reports a direct
//! sighting or asks for a blind prediction, then may apply at most one
//! acoustic update: a heard noise ([`BeliefTracker::filter`]) or silence
//! ([`BeliefTracker::filter_with_null_signal`]).
//!
//! ```
//! use earshot_logic::behavior::BehaviorWeights;
//! use earshot_logic::config::TrackerConfig;
//! use earshot_logic::constants::NoiseType;
//! use earshot_logic::house::{HouseBuilder, WallType};
//! use earshot_logic::tracker::BeliefTracker;
//!
//! let mut builder = HouseBuilder::new();
//! let a = builder.add_room(0.0, 10.0, false);
//! let b = builder.add_room(0.0, 10.0, false);
//! let c = builder.add_room(0.0, 10.0, false);
//! builder.connect(a, WallType::Right, 0.0, b, WallType::Left, 0.0);
//! let (_, c_door) = builder.connect(b, WallType::Right, 0.0, c, WallType::Left, 0.0);
//! let house = builder.build().unwrap();
//!
//! let mut tracker =
//!     BeliefTracker::new(house, BehaviorWeights::default(), TrackerConfig::default()).unwrap();
//! tracker.update_observer_room(c, false).unwrap();
//! // A run heard two units past the door into C.
//! tracker.filter(NoiseType::Run.loudness() / 4.0, c_door).unwrap();
//! assert!(tracker.belief()[b] > tracker.belief()[a]);
//! ```

use crate::behavior::BehaviorWeights;
use crate::config::{validate_config, TrackerConfig};
use crate::error::TrackerError;
use crate::graph::{DistanceTables, HouseGraph};
use crate::house::House;
use crate::movement::PlayerMovementModel;
use crate::persistence::TrackerSnapshot;
use crate::signal::SignalModel;

/// Largest drift of the belief sum from 1 that is still considered healthy.
const BELIEF_SUM_TOLERANCE: f64 = 1e-6;

/// Which kind of update last touched the belief.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerMode {
    DirectObservation,
    BlindPrediction,
    NoisyUpdate,
    NullUpdate,
}

/// Result of an update that may be refused for numeric reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The new belief was committed.
    Applied,
    /// The normalizer was not strictly positive; the prior was kept.
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickPhase {
    Open,
    Updated,
}

/// Tables derived from one topology and one set of behavior weights.
#[derive(Debug, Clone)]
struct Tables {
    distances: DistanceTables,
    movement: PlayerMovementModel,
    signal: SignalModel,
}

impl Tables {
    fn build(
        house: &House,
        weights: &BehaviorWeights,
        config: &TrackerConfig,
    ) -> Result<Self, TrackerError> {
        let graph = HouseGraph::build(house, config.door_transition_cost());
        let distances = graph.shortest_path_distances()?;
        let movement = PlayerMovementModel::recalculate(house, weights, config);
        let signal = SignalModel::build(house, &distances, &movement, config);
        log::info!(
            "tracker tables rebuilt: {} rooms, {} doors, {} graph vertices",
            house.room_count(),
            house.door_count(),
            graph.vertex_count()
        );
        Ok(Self {
            distances,
            movement,
            signal,
        })
    }
}

/// Belief state and precomputed tables for one tracked occupant.
#[derive(Debug, Clone)]
pub struct BeliefTracker {
    house: House,
    weights: BehaviorWeights,
    config: TrackerConfig,
    tables: Tables,
    belief: Vec<f64>,
    observer_room: Option<usize>,
    most_likely_room: usize,
    certainty: f64,
    last_mode: Option<TrackerMode>,
    phase: TickPhase,
}

impl BeliefTracker {
    /// Build all tables for `house` and start from a uniform belief.
    ///
    /// An invalid config is rejected up front with every problem found.
    pub fn new(
        house: House,
        weights: BehaviorWeights,
        config: TrackerConfig,
    ) -> Result<Self, TrackerError> {
        let problems = validate_config(&config);
        if !problems.is_empty() {
            return Err(TrackerError::Config(problems));
        }
        let weights = weights.sanitized();
        let tables = Tables::build(&house, &weights, &config)?;
        let belief = uniform(house.room_count());
        let mut tracker = Self {
            house,
            weights,
            config,
            tables,
            belief,
            observer_room: None,
            most_likely_room: 0,
            certainty: 0.0,
            last_mode: None,
            phase: TickPhase::Open,
        };
        tracker.update_summary();
        Ok(tracker)
    }

    /// Topology changed: rebuild every table and forget the old belief.
    ///
    /// On error the tracker keeps its previous topology untouched.
    pub fn rebuild(&mut self, house: House) -> Result<(), TrackerError> {
        let tables = Tables::build(&house, &self.weights, &self.config)?;
        self.house = house;
        self.tables = tables;
        self.observer_room = None;
        self.last_mode = None;
        self.set_uniform();
        Ok(())
    }

    /// New behavior weights: rebuild movement and signal tables, keep the
    /// belief.
    pub fn recalculate(&mut self, weights: BehaviorWeights) {
        self.weights = weights.sanitized();
        self.tables.movement =
            PlayerMovementModel::recalculate(&self.house, &self.weights, &self.config);
        self.tables.signal = SignalModel::build(
            &self.house,
            &self.tables.distances,
            &self.tables.movement,
            &self.config,
        );
        log::debug!("movement model recalculated with {:?}", self.weights);
    }

    /// Full reset: rebuild from the stored inputs and start over uniformly.
    pub fn reset(&mut self) -> Result<(), TrackerError> {
        self.tables = Tables::build(&self.house, &self.weights, &self.config)?;
        self.observer_room = None;
        self.last_mode = None;
        self.set_uniform();
        Ok(())
    }

    /// Forget everything known about the occupant's location.
    pub fn soft_reset(&mut self) {
        self.set_uniform();
    }

    /// The occupant was seen in `room`.
    pub fn known_in_room(&mut self, room: usize) -> Result<(), TrackerError> {
        self.check_room(room)?;
        self.belief.iter_mut().for_each(|p| *p = 0.0);
        self.belief[room] = 1.0;
        self.last_mode = Some(TrackerMode::DirectObservation);
        self.phase = TickPhase::Open;
        self.after_mutation();
        Ok(())
    }

    /// Record where the listener is. A direct sighting in the same room
    /// collapses the belief as [`known_in_room`](Self::known_in_room) does.
    pub fn update_observer_room(
        &mut self,
        room: usize,
        directly_observed: bool,
    ) -> Result<(), TrackerError> {
        self.check_room(room)?;
        self.observer_room = Some(room);
        if directly_observed {
            return self.known_in_room(room);
        }
        self.phase = TickPhase::Open;
        Ok(())
    }

    /// Advance the belief by one tick of the movement model.
    ///
    /// Only called while the occupant is out of sight, so the listener's
    /// own room is ruled out before renormalizing.
    pub fn predict_one_time_step(&mut self) -> UpdateOutcome {
        let mut next = self.tables.movement.propagate(&self.belief);
        if let Some(observer) = self.observer_room {
            next[observer] = 0.0;
        }
        self.last_mode = Some(TrackerMode::BlindPrediction);
        self.phase = TickPhase::Open;
        self.commit(next)
    }

    /// Bayes update for a noise of `volume` heard at `door`.
    ///
    /// Without a recorded listener room, the door's own room is assumed.
    pub fn filter(&mut self, volume: f64, door: usize) -> Result<UpdateOutcome, TrackerError> {
        if !(volume > 0.0) || !volume.is_finite() {
            return Err(TrackerError::InvalidVolume(volume));
        }
        let door_room = self
            .house
            .door(door)
            .map(|d| d.room)
            .ok_or(TrackerError::UnknownDoor(door))?;
        self.claim_update()?;

        let observer = self.observer_room.unwrap_or(door_room);
        let signal = &self.tables.signal;
        let posterior: Vec<f64> = self
            .belief
            .iter()
            .enumerate()
            .map(|(room, &prior)| signal.signal_likelihood(volume, door, room, observer) * prior)
            .collect();
        self.last_mode = Some(TrackerMode::NoisyUpdate);
        Ok(self.commit(posterior))
    }

    /// Bayes update for a tick in which the listener heard nothing.
    ///
    /// Needs a listener room; without one the update is skipped.
    pub fn filter_with_null_signal(&mut self) -> Result<UpdateOutcome, TrackerError> {
        self.claim_update()?;
        self.last_mode = Some(TrackerMode::NullUpdate);
        let Some(observer) = self.observer_room else {
            log::debug!("null-signal update without a listener room, skipped");
            return Ok(UpdateOutcome::Skipped);
        };
        let signal = &self.tables.signal;
        let posterior: Vec<f64> = self
            .belief
            .iter()
            .enumerate()
            .map(|(room, &prior)| signal.null_signal_likelihood(room, observer) * prior)
            .collect();
        Ok(self.commit(posterior))
    }

    pub fn belief(&self) -> &[f64] {
        &self.belief
    }

    pub fn most_likely_room(&self) -> usize {
        self.most_likely_room
    }

    /// Probability gap between the two most likely rooms.
    pub fn certainty(&self) -> f64 {
        self.certainty
    }

    pub fn observer_room(&self) -> Option<usize> {
        self.observer_room
    }

    pub fn last_mode(&self) -> Option<TrackerMode> {
        self.last_mode
    }

    pub fn house(&self) -> &House {
        &self.house
    }

    pub fn weights(&self) -> &BehaviorWeights {
        &self.weights
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn distances(&self) -> &DistanceTables {
        &self.tables.distances
    }

    pub fn movement_model(&self) -> &PlayerMovementModel {
        &self.tables.movement
    }

    pub fn signal_model(&self) -> &SignalModel {
        &self.tables.signal
    }

    /// Shannon entropy of the belief in nats.
    pub fn entropy(&self) -> f64 {
        self.belief
            .iter()
            .filter(|&&p| p > 0.0)
            .map(|&p| -p * p.ln())
            .sum()
    }

    /// Persistable state: belief and behavior weights.
    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot::new(self.belief.clone(), self.weights)
    }

    /// Load persisted state into a tracker built for the same topology.
    pub fn restore(&mut self, snapshot: TrackerSnapshot) -> Result<(), TrackerError> {
        if snapshot.belief.len() != self.house.room_count() {
            return Err(TrackerError::StaleSnapshot {
                snapshot: snapshot.belief.len(),
                current: self.house.room_count(),
            });
        }
        self.recalculate(snapshot.weights);
        if self.commit(snapshot.belief) == UpdateOutcome::Skipped {
            self.set_uniform();
        }
        self.phase = TickPhase::Open;
        Ok(())
    }

    fn check_room(&self, room: usize) -> Result<(), TrackerError> {
        if room < self.house.room_count() {
            Ok(())
        } else {
            Err(TrackerError::UnknownRoom(room))
        }
    }

    fn claim_update(&mut self) -> Result<(), TrackerError> {
        if self.phase == TickPhase::Updated {
            return Err(TrackerError::UpdateOrder);
        }
        self.phase = TickPhase::Updated;
        Ok(())
    }

    /// Normalize and store `unnormalized`, or keep the prior if its mass is
    /// not strictly positive and finite.
    fn commit(&mut self, unnormalized: Vec<f64>) -> UpdateOutcome {
        let total: f64 = unnormalized.iter().sum();
        let outcome = if total > 0.0 && total.is_finite() {
            self.belief = unnormalized.into_iter().map(|p| p / total).collect();
            UpdateOutcome::Applied
        } else {
            log::warn!(
                "{:?} update skipped: normalizer {} is not positive",
                self.last_mode,
                total
            );
            UpdateOutcome::Skipped
        };
        self.after_mutation();
        outcome
    }

    fn after_mutation(&mut self) {
        if !is_healthy(&self.belief) {
            log::warn!("corrupted belief {:?}, resetting to uniform", self.belief);
            self.belief = uniform(self.belief.len());
        }
        self.update_summary();
    }

    fn set_uniform(&mut self) {
        self.belief = uniform(self.house.room_count());
        self.phase = TickPhase::Open;
        self.update_summary();
    }

    fn update_summary(&mut self) {
        let (best, top, second) = top_two(&self.belief);
        self.most_likely_room = best;
        self.certainty = (top - second).max(0.0);
    }
}

fn uniform(rooms: usize) -> Vec<f64> {
    if rooms == 0 {
        return Vec::new();
    }
    vec![1.0 / rooms as f64; rooms]
}

fn is_healthy(belief: &[f64]) -> bool {
    if belief.iter().any(|p| !p.is_finite() || *p < 0.0) {
        return false;
    }
    let total: f64 = belief.iter().sum();
    (total - 1.0).abs() <= BELIEF_SUM_TOLERANCE
}

/// Index of the first maximum, the maximum, and the runner-up value.
fn top_two(belief: &[f64]) -> (usize, f64, f64) {
    let mut best = 0;
    let mut top = f64::NEG_INFINITY;
    let mut second = f64::NEG_INFINITY;
    for (room, &p) in belief.iter().enumerate() {
        if p > top {
            second = top;
            top = p;
            best = room;
        } else if p > second {
            second = p;
        }
    }
    if top == f64::NEG_INFINITY {
        return (0, 0.0, 0.0);
    }
    if second == f64::NEG_INFINITY {
        second = 0.0;
    }
    (best, top, second)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::NoiseType;
    use crate::house::{HouseBuilder, WallType};

    // A(0..10) - B(0..10) - C(0..10); doors 0/1 join A and B, 2/3 join B and C.
    fn line() -> BeliefTracker {
        let mut b = HouseBuilder::new();
        let a = b.add_room(0.0, 10.0, false);
        let m = b.add_room(0.0, 10.0, false);
        let c = b.add_room(0.0, 10.0, false);
        b.connect(a, WallType::Right, 0.0, m, WallType::Left, 0.0);
        b.connect(m, WallType::Right, 0.0, c, WallType::Left, 0.0);
        BeliefTracker::new(
            b.build().unwrap(),
            BehaviorWeights::default(),
            TrackerConfig::default(),
        )
        .unwrap()
    }

    fn ring(rooms: usize) -> House {
        let mut b = HouseBuilder::new();
        let ids: Vec<usize> = (0..rooms).map(|_| b.add_room(0.0, 8.0, false)).collect();
        for i in 0..rooms {
            let j = (i + 1) % rooms;
            b.connect(ids[i], WallType::Back, 6.0, ids[j], WallType::Back, 2.0);
        }
        b.build().unwrap()
    }

    #[test]
    fn test_starts_uniform_with_zero_certainty() {
        let tracker = line();
        for &p in tracker.belief() {
            assert!((p - 1.0 / 3.0).abs() < 1e-12);
        }
        assert_eq!(tracker.certainty(), 0.0);
        assert_eq!(tracker.most_likely_room(), 0);
        assert_eq!(tracker.last_mode(), None);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = TrackerConfig {
            step_length: 0.0,
            ..TrackerConfig::default()
        };
        let result = BeliefTracker::new(ring(3), BehaviorWeights::default(), config);
        match result {
            Err(TrackerError::Config(problems)) => {
                assert_eq!(problems, vec![crate::config::ConfigError::NonPositiveStep(0.0)]);
            }
            other => panic!("expected config error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_known_in_room_is_one_hot() {
        let mut tracker = line();
        tracker.known_in_room(1).unwrap();
        assert_eq!(tracker.belief(), &[0.0, 1.0, 0.0]);
        assert_eq!(tracker.most_likely_room(), 1);
        assert_eq!(tracker.certainty(), 1.0);
        assert_eq!(tracker.last_mode(), Some(TrackerMode::DirectObservation));
        assert!(matches!(
            tracker.known_in_room(7),
            Err(TrackerError::UnknownRoom(7))
        ));
    }

    #[test]
    fn test_direct_observation_through_observer_update() {
        let mut tracker = line();
        tracker.update_observer_room(2, true).unwrap();
        assert_eq!(tracker.observer_room(), Some(2));
        assert_eq!(tracker.belief(), &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_prediction_excludes_observer_room() {
        let mut tracker = line();
        tracker.known_in_room(1).unwrap();
        tracker.update_observer_room(2, false).unwrap();
        assert_eq!(tracker.predict_one_time_step(), UpdateOutcome::Applied);
        assert_eq!(tracker.belief()[2], 0.0);
        assert!(tracker.belief()[0] > 0.0);
        assert!((tracker.belief().iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_run_next_door_favors_the_neighbor() {
        let mut tracker = line();
        tracker.update_observer_room(2, false).unwrap();
        let outcome = tracker.filter(NoiseType::Run.loudness() / 4.0, 3).unwrap();
        assert_eq!(outcome, UpdateOutcome::Applied);
        assert!(tracker.belief()[1] > tracker.belief()[0]);
        assert_eq!(tracker.last_mode(), Some(TrackerMode::NoisyUpdate));
    }

    #[test]
    fn test_one_filter_per_tick() {
        let mut tracker = line();
        tracker.update_observer_room(2, false).unwrap();
        tracker.filter_with_null_signal().unwrap();
        assert!(matches!(tracker.filter(1.0, 3), Err(TrackerError::UpdateOrder)));
        assert!(matches!(
            tracker.filter_with_null_signal(),
            Err(TrackerError::UpdateOrder)
        ));
        tracker.predict_one_time_step();
        assert!(tracker.filter(1.0, 3).is_ok());
    }

    #[test]
    fn test_rejects_bad_noise_input() {
        let mut tracker = line();
        assert!(matches!(
            tracker.filter(0.0, 3),
            Err(TrackerError::InvalidVolume(_))
        ));
        assert!(matches!(
            tracker.filter(f64::NAN, 3),
            Err(TrackerError::InvalidVolume(_))
        ));
        assert!(matches!(
            tracker.filter(1.0, 99),
            Err(TrackerError::UnknownDoor(99))
        ));
        // Rejected input does not consume the tick's update.
        assert!(tracker.filter(1.0, 3).is_ok());
    }

    #[test]
    fn test_zero_mass_update_keeps_prior() {
        let mut tracker = line();
        tracker.known_in_room(0).unwrap();
        let before = tracker.belief().to_vec();
        assert_eq!(tracker.commit(vec![0.0; 3]), UpdateOutcome::Skipped);
        assert_eq!(tracker.belief(), &before[..]);
    }

    #[test]
    fn test_prediction_into_the_only_room_is_skipped() {
        let mut b = HouseBuilder::new();
        b.add_room(0.0, 10.0, false);
        let mut tracker = BeliefTracker::new(
            b.build().unwrap(),
            BehaviorWeights::default(),
            TrackerConfig::default(),
        )
        .unwrap();
        tracker.update_observer_room(0, false).unwrap();
        assert_eq!(tracker.predict_one_time_step(), UpdateOutcome::Skipped);
        assert_eq!(tracker.belief(), &[1.0]);
    }

    #[test]
    fn test_corrupted_belief_is_reset() {
        let mut tracker = line();
        tracker.belief[0] = f64::NAN;
        tracker.predict_one_time_step();
        for &p in tracker.belief() {
            assert!((p - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_soft_reset_is_uniform() {
        let mut tracker = BeliefTracker::new(
            ring(4),
            BehaviorWeights::default(),
            TrackerConfig::default(),
        )
        .unwrap();
        tracker.known_in_room(3).unwrap();
        tracker.soft_reset();
        assert_eq!(tracker.belief(), &[0.25, 0.25, 0.25, 0.25]);
        assert_eq!(tracker.certainty(), 0.0);
    }

    #[test]
    fn test_rebuild_and_reset_forget_the_observer() {
        let mut tracker = line();
        tracker.update_observer_room(1, true).unwrap();
        tracker.rebuild(ring(5)).unwrap();
        assert_eq!(tracker.belief().len(), 5);
        assert_eq!(tracker.observer_room(), None);

        tracker.update_observer_room(4, true).unwrap();
        tracker.reset().unwrap();
        assert_eq!(tracker.observer_room(), None);
        assert!((tracker.belief()[4] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_recalculate_keeps_belief() {
        let mut tracker = line();
        tracker.known_in_room(2).unwrap();
        tracker.recalculate(BehaviorWeights {
            run_propensity: 0.9,
            ..BehaviorWeights::default()
        });
        assert_eq!(tracker.belief(), &[0.0, 0.0, 1.0]);
        assert_eq!(tracker.weights().run_propensity, 0.9);
    }

    #[test]
    fn test_snapshot_restore() {
        let mut tracker = line();
        tracker.known_in_room(1).unwrap();
        tracker.predict_one_time_step();
        let snapshot = tracker.snapshot();

        let mut other = line();
        other.restore(snapshot.clone()).unwrap();
        for (a, b) in other.belief().iter().zip(tracker.belief()) {
            assert!((a - b).abs() < 1e-12);
        }
        assert_eq!(other.most_likely_room(), 1);

        let mut bigger = BeliefTracker::new(
            ring(4),
            BehaviorWeights::default(),
            TrackerConfig::default(),
        )
        .unwrap();
        assert!(matches!(
            bigger.restore(snapshot),
            Err(TrackerError::StaleSnapshot { snapshot: 3, current: 4 })
        ));
    }

    #[test]
    fn test_top_two_breaks_ties_by_first_index() {
        assert_eq!(top_two(&[0.4, 0.4, 0.2]), (0, 0.4, 0.4));
        assert_eq!(top_two(&[0.1, 0.6, 0.3]), (1, 0.6, 0.3));
        assert_eq!(top_two(&[1.0]), (0, 1.0, 0.0));
    }

    #[test]
    fn test_entropy_bounds() {
        let mut tracker = line();
        assert!((tracker.entropy() - 3.0f64.ln()).abs() < 1e-12);
        tracker.known_in_room(0).unwrap();
        assert_eq!(tracker.entropy(), 0.0);
    }
}
