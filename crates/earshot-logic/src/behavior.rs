//! Learned occupant behavior weights.
//!
//! The movement model mixes three ways of spending time in a room
//! (exploring, fetching an item, crossing from door to door) and splits
//! footsteps between walking and running. The mix is learned from what the
//! antagonist sees while the occupant is in plain view, and persisted
//! between sessions.

use serde::{Deserialize, Serialize};

use crate::constants::NoiseType;

/// Behavior parameters fed into the movement model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BehaviorWeights {
    /// Weight of wandering around the room.
    pub exploration: f64,
    /// Weight of walking to an item and back.
    pub item_fetch: f64,
    /// Weight of passing straight through between two doors.
    pub door_to_door: f64,
    /// Fraction of footsteps taken running.
    pub run_propensity: f64,
}

impl Default for BehaviorWeights {
    fn default() -> Self {
        Self {
            exploration: 0.5,
            item_fetch: 0.2,
            door_to_door: 0.3,
            run_propensity: 0.2,
        }
    }
}

impl BehaviorWeights {
    /// Copy with negative or non-finite weights zeroed and the run
    /// propensity clamped to `[0, 1]`.
    pub fn sanitized(&self) -> Self {
        let clean = |w: f64| if w.is_finite() { w.max(0.0) } else { 0.0 };
        let run = if self.run_propensity.is_finite() {
            self.run_propensity.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            exploration: clean(self.exploration),
            item_fetch: clean(self.item_fetch),
            door_to_door: clean(self.door_to_door),
            run_propensity: run,
        }
    }

    /// Activity weights scaled to sum to one; uniform if all are zero.
    pub fn activity_mix(&self) -> [f64; 3] {
        let w = self.sanitized();
        let total = w.exploration + w.item_fetch + w.door_to_door;
        if total <= 0.0 {
            return [1.0 / 3.0; 3];
        }
        [
            w.exploration / total,
            w.item_fetch / total,
            w.door_to_door / total,
        ]
    }
}

/// How a completed room visit was spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisitKind {
    Exploration,
    ItemFetch,
    DoorToDoor,
}

impl VisitKind {
    fn index(self) -> usize {
        match self {
            VisitKind::Exploration => 0,
            VisitKind::ItemFetch => 1,
            VisitKind::DoorToDoor => 2,
        }
    }
}

/// Classify a finished visit from how it started and ended.
pub fn classify_visit(
    entered_through: Option<usize>,
    left_through: Option<usize>,
    picked_item: bool,
) -> VisitKind {
    if picked_item {
        return VisitKind::ItemFetch;
    }
    match (entered_through, left_through) {
        (Some(a), Some(b)) if a != b => VisitKind::DoorToDoor,
        _ => VisitKind::Exploration,
    }
}

/// Accumulates direct observations and produces smoothed weights.
#[derive(Debug, Clone)]
pub struct BehaviorLearner {
    prior: BehaviorWeights,
    prior_strength: f64,
    walk_steps: f64,
    run_steps: f64,
    visits: [f64; 3],
}

impl BehaviorLearner {
    /// `prior_strength` is the number of pseudo-observations the prior is worth.
    pub fn new(prior: BehaviorWeights, prior_strength: f64) -> Self {
        Self {
            prior: prior.sanitized(),
            prior_strength: prior_strength.max(0.0),
            walk_steps: 0.0,
            run_steps: 0.0,
            visits: [0.0; 3],
        }
    }

    /// Record a noise the occupant made in plain view.
    pub fn observe_noise(&mut self, noise: NoiseType) {
        match noise {
            NoiseType::Walk => self.walk_steps += 1.0,
            NoiseType::Run => self.run_steps += 1.0,
            _ => {}
        }
    }

    /// Record a completed room visit.
    pub fn observe_visit(&mut self, kind: VisitKind) {
        self.visits[kind.index()] += 1.0;
    }

    /// Number of footsteps and visits recorded since the last commit.
    pub fn observation_count(&self) -> usize {
        (self.walk_steps + self.run_steps + self.visits.iter().sum::<f64>()) as usize
    }

    /// Current smoothed estimate.
    pub fn weights(&self) -> BehaviorWeights {
        let s = self.prior_strength;
        let mix = self.prior.activity_mix();
        let visit_total: f64 = self.visits.iter().sum();
        let smoothed = |k: usize| {
            let denom = s + visit_total;
            if denom <= 0.0 {
                mix[k]
            } else {
                (s * mix[k] + self.visits[k]) / denom
            }
        };

        let steps = self.walk_steps + self.run_steps;
        let run_propensity = if s + steps <= 0.0 {
            self.prior.run_propensity
        } else {
            (s * self.prior.run_propensity + self.run_steps) / (s + steps)
        };

        BehaviorWeights {
            exploration: smoothed(0),
            item_fetch: smoothed(1),
            door_to_door: smoothed(2),
            run_propensity,
        }
    }

    /// Fold the observations into the prior and start counting afresh.
    pub fn commit(&mut self) -> BehaviorWeights {
        let weights = self.weights();
        log::debug!(
            "behavior weights updated from {} observations: {:?}",
            self.observation_count(),
            weights
        );
        self.prior = weights;
        self.walk_steps = 0.0;
        self.run_steps = 0.0;
        self.visits = [0.0; 3];
        weights
    }
}
