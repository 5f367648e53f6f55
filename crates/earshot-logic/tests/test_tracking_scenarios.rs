//! Integration tests for the full tracking pipeline.
//!
//! Exercises: House → HouseGraph → DistanceTables → PlayerMovementModel
//! → SignalModel → BeliefTracker → TrackerSnapshot
//!
//! All tests are pure logic: no engine and no rendering.

use earshot_logic::behavior::BehaviorWeights;
use earshot_logic::config::TrackerConfig;
use earshot_logic::constants::NoiseType;
use earshot_logic::graph::{DistanceTables, HouseGraph};
use earshot_logic::house::{House, HouseBuilder, WallType};
use earshot_logic::persistence::{load_snapshot, save_snapshot};
use earshot_logic::tracker::{BeliefTracker, TrackerMode, UpdateOutcome};

// ── Helpers ────────────────────────────────────────────────────────────

/// A(0..10) - B(0..10) - C(0..10) in a line. Doors: 0|1 join A-B, 2|3 join B-C.
fn three_in_a_line() -> House {
    let mut b = HouseBuilder::new();
    let a = b.add_room(0.0, 10.0, false);
    let m = b.add_room(0.0, 10.0, false);
    let c = b.add_room(0.0, 10.0, false);
    b.connect(a, WallType::Right, 0.0, m, WallType::Left, 0.0);
    b.connect(m, WallType::Right, 0.0, c, WallType::Left, 0.0);
    b.build().unwrap()
}

/// Hallway with a kitchen and bedroom behind back doors, a bathroom behind
/// the bedroom, and a second entrance from the kitchen into the bedroom.
fn cottage() -> House {
    let mut b = HouseBuilder::new();
    let hall = b.add_room(0.0, 24.0, false);
    let kitchen = b.add_room(0.0, 14.0, true);
    let bedroom = b.add_room(0.0, 12.0, true);
    let bath = b.add_room(0.0, 5.0, false);
    b.connect(hall, WallType::Back, 6.0, kitchen, WallType::Back, 3.0);
    b.connect(hall, WallType::Back, 18.0, bedroom, WallType::Back, 4.0);
    b.connect(bedroom, WallType::Right, 0.0, bath, WallType::Left, 0.0);
    b.connect(kitchen, WallType::Right, 0.0, bedroom, WallType::Left, 0.0);
    b.build().unwrap()
}

/// Four equal rooms in a ring of back doors.
fn four_room_ring() -> House {
    let mut b = HouseBuilder::new();
    let ids: Vec<usize> = (0..4).map(|_| b.add_room(0.0, 8.0, false)).collect();
    for i in 0..4 {
        b.connect(ids[i], WallType::Back, 6.0, ids[(i + 1) % 4], WallType::Back, 2.0);
    }
    b.build().unwrap()
}

fn all_houses() -> Vec<House> {
    vec![three_in_a_line(), cottage(), four_room_ring()]
}

fn tracker_for(house: House) -> BeliefTracker {
    BeliefTracker::new(house, BehaviorWeights::default(), TrackerConfig::default()).unwrap()
}

fn distances(house: &House) -> DistanceTables {
    let config = TrackerConfig::default();
    HouseGraph::build(house, config.door_transition_cost())
        .shortest_path_distances()
        .unwrap()
}

fn assert_normalized(belief: &[f64]) {
    let sum: f64 = belief.iter().sum();
    assert!((sum - 1.0).abs() < 1e-9, "belief sums to {sum}");
    assert!(belief.iter().all(|&p| p >= 0.0), "negative entry in {belief:?}");
}

// ── Distance tables ────────────────────────────────────────────────────

#[test]
fn door_distances_form_a_metric() {
    for house in all_houses() {
        let d = distances(&house);
        let n = d.door_count();
        for a in 0..n {
            assert_eq!(d.door_to_door(a, a), 0.0);
            for b in 0..n {
                assert!(d.door_to_door(a, b).is_finite());
                assert_eq!(d.door_to_door(a, b), d.door_to_door(b, a));
                for c in 0..n {
                    assert!(
                        d.door_to_door(a, c) <= d.door_to_door(a, b) + d.door_to_door(b, c) + 1e-9
                    );
                }
            }
        }
    }
}

#[test]
fn room_distances_form_a_metric() {
    for house in all_houses() {
        let d = distances(&house);
        let n = d.room_count();
        for a in 0..n {
            for b in 0..n {
                assert!(d.room_to_room(a, b).is_finite());
                assert!((d.room_to_room(a, b) - d.room_to_room(b, a)).abs() < 1e-9);
                for c in 0..n {
                    assert!(
                        d.room_to_room(a, c) <= d.room_to_room(a, b) + d.room_to_room(b, c) + 1e-9
                    );
                }
            }
        }
    }
}

#[test]
fn disconnected_house_is_rejected() {
    let mut b = HouseBuilder::new();
    let a = b.add_room(0.0, 10.0, false);
    let m = b.add_room(0.0, 10.0, false);
    b.add_room(0.0, 10.0, false);
    b.connect(a, WallType::Right, 0.0, m, WallType::Left, 0.0);
    let house = b.build().unwrap();
    let result = BeliefTracker::new(house, BehaviorWeights::default(), TrackerConfig::default());
    assert!(matches!(
        result,
        Err(earshot_logic::TrackerError::Geometry(
            earshot_logic::GeometryError::Disconnected { .. }
        ))
    ));
}

// ── Movement and signal tables ─────────────────────────────────────────

#[test]
fn transition_rows_sum_to_one() {
    for house in all_houses() {
        let tracker = tracker_for(house);
        let movement = tracker.movement_model();
        for room in 0..movement.room_count() {
            let sum: f64 = movement.transition_row(room).iter().sum();
            assert!((sum - 1.0).abs() < 1e-9, "room {room}: {sum}");
        }
    }
}

#[test]
fn audibility_weights_are_uniform_or_zero() {
    // A tight threshold leaves some noises with no reachable door.
    let config = TrackerConfig {
        inaudible_threshold: 0.05,
        ..TrackerConfig::default()
    };
    for house in all_houses() {
        let rooms = house.room_count();
        let doors = house.door_count();
        let tracker = BeliefTracker::new(house, BehaviorWeights::default(), config.clone()).unwrap();
        let signal = tracker.signal_model();
        for noise in NoiseType::ALL {
            for room in 0..rooms {
                let weights: Vec<f64> = (0..doors)
                    .map(|door| signal.door_audibility(noise, room, door))
                    .collect();
                let sum: f64 = weights.iter().sum();
                if sum == 0.0 {
                    continue;
                }
                assert!((sum - 1.0).abs() < 1e-9);
                let nonzero: Vec<f64> = weights.into_iter().filter(|&w| w > 0.0).collect();
                assert!(nonzero.iter().all(|&w| (w - nonzero[0]).abs() < 1e-12));
            }
        }
    }
}

// ── Belief updates ─────────────────────────────────────────────────────

#[test]
fn known_in_room_collapses_belief() {
    let mut tracker = tracker_for(cottage());
    tracker.known_in_room(2).unwrap();
    assert_eq!(tracker.belief(), &[0.0, 0.0, 1.0, 0.0]);
    assert_eq!(tracker.certainty(), 1.0);
    assert_eq!(tracker.most_likely_room(), 2);
}

#[test]
fn belief_stays_normalized_through_a_session() {
    let mut tracker = tracker_for(cottage());
    tracker.known_in_room(1).unwrap();
    tracker.update_observer_room(0, false).unwrap();
    let doors = [0, 2];
    let volumes = [0.02, 0.1, 0.5, 2.0];
    for tick in 0..400 {
        tracker.predict_one_time_step();
        assert_normalized(tracker.belief());
        if tick % 7 == 0 {
            let volume = volumes[tick % volumes.len()];
            let door = doors[tick % doors.len()];
            tracker.filter(volume, door).unwrap();
        } else {
            tracker.filter_with_null_signal().unwrap();
        }
        assert_normalized(tracker.belief());
        assert_eq!(tracker.belief()[0], 0.0);
    }
}

#[test]
fn blind_prediction_converges_to_stationary_distribution() {
    // Unequal widths give unequal dwell times and a non-uniform limit.
    let mut b = HouseBuilder::new();
    let a = b.add_room(0.0, 10.0, false);
    let m = b.add_room(0.0, 20.0, true);
    let c = b.add_room(0.0, 6.0, false);
    b.connect(a, WallType::Right, 0.0, m, WallType::Left, 0.0);
    b.connect(m, WallType::Right, 0.0, c, WallType::Left, 0.0);
    let mut tracker = tracker_for(b.build().unwrap());

    let stationary = tracker
        .movement_model()
        .stationary_distribution(1e-15, 1_000_000);
    tracker.known_in_room(a).unwrap();
    for _ in 0..50_000 {
        assert_eq!(tracker.predict_one_time_step(), UpdateOutcome::Applied);
    }
    for (p, q) in tracker.belief().iter().zip(&stationary) {
        assert!((p - q).abs() < 1e-6, "{p} vs {q}");
    }
    assert_eq!(tracker.last_mode(), Some(TrackerMode::BlindPrediction));
}

#[test]
fn certainty_reflects_ties() {
    let mut tracker = tracker_for(four_room_ring());
    assert_eq!(tracker.certainty(), 0.0);
    tracker.known_in_room(3).unwrap();
    assert_eq!(tracker.certainty(), 1.0);
    // One step from a single room spreads mass evenly to both ring neighbors,
    // but the origin keeps the lead.
    tracker.predict_one_time_step();
    let b = tracker.belief();
    assert!((b[0] - b[2]).abs() < 1e-12);
    assert_eq!(tracker.most_likely_room(), 3);
    assert!(tracker.certainty() > 0.0 && tracker.certainty() < 1.0);
}

#[test]
fn run_heard_at_the_near_door_points_to_the_middle_room() {
    let mut tracker = tracker_for(three_in_a_line());
    let before = tracker.belief().to_vec();
    assert!(before.iter().all(|&p| (p - 1.0 / 3.0).abs() < 1e-12));

    tracker.update_observer_room(2, false).unwrap();
    // Door 3 is C's side of the B-C door; a run from two units away.
    let volume = NoiseType::Run.loudness() / 4.0;
    assert_eq!(tracker.filter(volume, 3).unwrap(), UpdateOutcome::Applied);

    let b = tracker.belief();
    assert!(b[1] > b[0], "B {} should beat A {}", b[1], b[0]);
    assert_normalized(b);
}

#[test]
fn silence_lowers_the_listeners_own_room() {
    let mut tracker = tracker_for(three_in_a_line());
    tracker.update_observer_room(2, false).unwrap();
    assert_eq!(tracker.filter_with_null_signal().unwrap(), UpdateOutcome::Applied);
    let b = tracker.belief();
    assert!(b[2] < b[0]);
    assert!(b[2] < b[1]);
    assert_eq!(tracker.last_mode(), Some(TrackerMode::NullUpdate));
}

#[test]
fn soft_reset_on_four_rooms_is_quarter_each() {
    let mut tracker = tracker_for(four_room_ring());
    tracker.known_in_room(1).unwrap();
    tracker.update_observer_room(0, false).unwrap();
    for _ in 0..10 {
        tracker.predict_one_time_step();
    }
    tracker.soft_reset();
    assert_eq!(tracker.belief(), &[0.25, 0.25, 0.25, 0.25]);
}

// ── Persistence ────────────────────────────────────────────────────────

#[test]
fn snapshot_survives_a_save_load_cycle() {
    let mut tracker = tracker_for(cottage());
    tracker.known_in_room(3).unwrap();
    tracker.predict_one_time_step();
    tracker.recalculate(BehaviorWeights {
        run_propensity: 0.6,
        ..BehaviorWeights::default()
    });

    let mut buffer = Vec::new();
    save_snapshot(&mut buffer, &tracker.snapshot()).unwrap();
    let loaded = load_snapshot(&buffer[..]).unwrap();

    let mut fresh = tracker_for(cottage());
    fresh.restore(loaded).unwrap();
    assert_eq!(fresh.weights().run_propensity, 0.6);
    assert_eq!(fresh.most_likely_room(), 3);
    for (a, b) in fresh.belief().iter().zip(tracker.belief()) {
        assert!((a - b).abs() < 1e-12);
    }
}
