//! Acoustic likelihood model.
//!
//! Precomputes, for one topology and one movement model:
//!
//! 1. distance curves from every door into every room ([`DistanceFunctions`]),
//! 2. door audibility: which doors a noise made in a room can reach before
//!    dropping under the inaudible threshold (inverse-square law),
//! 3. noise attribution: how likely a heard noise came from the occupant
//!    rather than the house itself,
//! 4. joint `(noise type, origin room)` tables and the probability of
//!    hearing nothing at all.
//!
//! All tables are flat arrays indexed by noise type, room and door ids.
//!
//! ```
//! use earshot_logic::behavior::BehaviorWeights;
//! use earshot_logic::config::TrackerConfig;
//! use earshot_logic::constants::NoiseType;
//! use earshot_logic::graph::HouseGraph;
//! use earshot_logic::house::{HouseBuilder, WallType};
//! use earshot_logic::movement::PlayerMovementModel;
//! use earshot_logic::signal::SignalModel;
//!
//! let mut builder = HouseBuilder::new();
//! let a = builder.add_room(0.0, 10.0, false);
//! let b = builder.add_room(0.0, 10.0, false);
//! builder.connect(a, WallType::Right, 0.0, b, WallType::Left, 0.0);
//! let house = builder.build().unwrap();
//!
//! let config = TrackerConfig::default();
//! let distances = HouseGraph::build(&house, config.door_transition_cost())
//!     .shortest_path_distances()
//!     .unwrap();
//! let movement = PlayerMovementModel::recalculate(&house, &BehaviorWeights::default(), &config);
//! let signal = SignalModel::build(&house, &distances, &movement, &config);
//!
//! // A run in room `a` reaches the only external door (door 1, in room `b`).
//! assert_eq!(signal.door_audibility(NoiseType::Run, a, 1), 1.0);
//! ```

use crate::breakpoints::DistanceFunctions;
use crate::config::TrackerConfig;
use crate::constants::{NoiseType, NOISE_TYPE_COUNT};
use crate::graph::DistanceTables;
use crate::house::House;
use crate::movement::PlayerMovementModel;

/// Probability that a heard noise came from the occupant or from the house.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseAttribution {
    pub occupant: f64,
    pub house: f64,
}

/// Door audibility per `(noise type, origin room, door)`.
#[derive(Debug, Clone)]
pub struct DoorAudibility {
    room_count: usize,
    door_count: usize,
    weights: Vec<f64>,
    /// Same layout as one noise slice of `weights`, for ambient house noise.
    ambient: Vec<f64>,
}

impl DoorAudibility {
    pub fn weight(&self, noise: NoiseType, room: usize, door: usize) -> f64 {
        self.weights[(noise.index() * self.room_count + room) * self.door_count + door]
    }

    pub fn ambient_weight(&self, room: usize, door: usize) -> f64 {
        self.ambient[room * self.door_count + door]
    }
}

/// Joint and null-signal tables.
#[derive(Debug, Clone)]
pub struct JointTables {
    room_count: usize,
    /// `noise × origin × observer`: P(occupant heard at observer | origin).
    hearing: Vec<f64>,
    /// `noise × origin × observer`
    joint: Vec<f64>,
    /// `origin × observer`
    null: Vec<f64>,
    /// observer → P(ambient house noise audible | ambient noise emitted)
    ambient_hearing: Vec<f64>,
}

/// Everything needed to turn a heard noise (or silence) into a likelihood.
#[derive(Debug, Clone)]
pub struct SignalModel {
    functions: DistanceFunctions,
    audibility: DoorAudibility,
    attribution: NoiseAttribution,
    tables: JointTables,
    walkable: Vec<f64>,
    total_walkable: f64,
    ambient_loudness: f64,
}

impl SignalModel {
    /// Run every precomputation for the given topology and movement model.
    pub fn build(
        house: &House,
        distances: &DistanceTables,
        movement: &PlayerMovementModel,
        config: &TrackerConfig,
    ) -> Self {
        let functions = precompute_distance_functions(house, distances);
        let audibility = precompute_door_audibility(house, &functions, config);
        let attribution = precompute_noise_attribution(movement, config);
        let tables =
            precompute_joint_and_null_tables(house, movement, &audibility, attribution, config);

        let floor = config.step_length;
        let walkable: Vec<f64> = house
            .rooms()
            .iter()
            .map(|r| r.walkable_width().max(floor))
            .collect();
        let total_walkable = walkable.iter().sum();

        log::debug!(
            "signal model built: {} rooms, {} doors, occupant share {:.3}",
            house.room_count(),
            house.door_count(),
            attribution.occupant
        );

        Self {
            functions,
            audibility,
            attribution,
            tables,
            walkable,
            total_walkable,
            ambient_loudness: config.ambient_loudness,
        }
    }

    pub fn room_count(&self) -> usize {
        self.tables.room_count
    }

    pub fn distance_functions(&self) -> &DistanceFunctions {
        &self.functions
    }

    pub fn attribution(&self) -> NoiseAttribution {
        self.attribution
    }

    /// Probability that `noise` made in `room` is heard at `door`.
    pub fn door_audibility(&self, noise: NoiseType, room: usize, door: usize) -> f64 {
        self.audibility.weight(noise, room, door)
    }

    /// Probability that `noise` made in `origin` is heard in `observer`.
    pub fn hearing_probability(&self, noise: NoiseType, origin: usize, observer: usize) -> f64 {
        let n = self.tables.room_count;
        self.tables.hearing[(noise.index() * n + origin) * n + observer]
    }

    /// Joint probability of `(noise, origin)` for a noise heard in `observer`.
    pub fn joint_probability(&self, noise: NoiseType, origin: usize, observer: usize) -> f64 {
        let n = self.tables.room_count;
        self.tables.joint[(noise.index() * n + origin) * n + observer]
    }

    /// Probability that `observer` hears nothing this tick while the
    /// occupant is in `origin`.
    pub fn null_signal_likelihood(&self, origin: usize, observer: usize) -> f64 {
        self.tables.null[origin * self.tables.room_count + observer]
    }

    /// Likelihood of hearing `volume` at `door` (in `observer`) if the
    /// occupant is in `candidate`.
    ///
    /// For each noise type the inverse-square law gives the distance the
    /// noise travelled; the number of positions in `candidate` at that
    /// distance from `door`, spread over the room's width, is weighted by
    /// the joint type/origin probability. A constant term accounts for the
    /// house making the noise itself.
    pub fn signal_likelihood(
        &self,
        volume: f64,
        door: usize,
        candidate: usize,
        observer: usize,
    ) -> f64 {
        if !(volume > 0.0) || !volume.is_finite() {
            return 0.0;
        }

        let mut occupant = 0.0;
        for noise in NoiseType::AUDIBLE {
            let joint = self.joint_probability(noise, candidate, observer);
            if joint == 0.0 {
                continue;
            }
            let distance = (noise.loudness() / volume).sqrt();
            let positions = self.functions.plausible_positions(door, candidate, distance);
            occupant += joint * positions as f64 / self.walkable[candidate];
        }

        occupant + self.ambient_likelihood(volume, door)
    }

    /// Likelihood of the observation under the house-made-it hypothesis.
    /// Independent of where the occupant is.
    pub fn ambient_likelihood(&self, volume: f64, door: usize) -> f64 {
        if self.attribution.house == 0.0 || self.ambient_loudness <= 0.0 || !(volume > 0.0) {
            return 0.0;
        }
        let distance = (self.ambient_loudness / volume).sqrt();
        let positions: usize = (0..self.tables.room_count)
            .map(|room| self.functions.plausible_positions(door, room, distance))
            .sum();
        self.attribution.house * positions as f64 / self.total_walkable
    }

    /// P(ambient house noise audible in `observer` | the house made one).
    pub fn ambient_hearing_probability(&self, observer: usize) -> f64 {
        self.tables.ambient_hearing[observer]
    }
}

/// Distance curves from every door into every room.
pub fn precompute_distance_functions(house: &House, distances: &DistanceTables) -> DistanceFunctions {
    DistanceFunctions::precompute(house, distances)
}

/// Uniform audibility over the external doors within the noise's reach.
pub fn precompute_door_audibility(
    house: &House,
    functions: &DistanceFunctions,
    config: &TrackerConfig,
) -> DoorAudibility {
    let room_count = house.room_count();
    let door_count = house.door_count();
    let mut weights = vec![0.0; NOISE_TYPE_COUNT * room_count * door_count];

    for noise in NoiseType::AUDIBLE {
        let reach = config.max_travel_distance(noise.loudness());
        for room in 0..room_count {
            let offset = (noise.index() * room_count + room) * door_count;
            fill_reachable(
                house,
                functions,
                room,
                reach,
                &mut weights[offset..offset + door_count],
            );
        }
    }

    let mut ambient = vec![0.0; room_count * door_count];
    let reach = config.max_travel_distance(config.ambient_loudness);
    for room in 0..room_count {
        let offset = room * door_count;
        fill_reachable(
            house,
            functions,
            room,
            reach,
            &mut ambient[offset..offset + door_count],
        );
    }

    DoorAudibility {
        room_count,
        door_count,
        weights,
        ambient,
    }
}

fn fill_reachable(
    house: &House,
    functions: &DistanceFunctions,
    room: usize,
    reach: f64,
    row: &mut [f64],
) {
    let reachable: Vec<usize> = house
        .doors()
        .iter()
        .filter(|door| door.room != room && functions.min_distance(door.id, room) <= reach)
        .map(|door| door.id)
        .collect();
    if reachable.is_empty() {
        return;
    }
    let share = 1.0 / reachable.len() as f64;
    for door in reachable {
        row[door] = share;
    }
}

/// Compare the occupant's mean per-tick noise rate with the ambient rate.
pub fn precompute_noise_attribution(
    movement: &PlayerMovementModel,
    config: &TrackerConfig,
) -> NoiseAttribution {
    let rooms = movement.room_count();
    let occupant_rate = if rooms == 0 {
        0.0
    } else {
        (0..rooms)
            .map(|room| movement.total_noise_likelihood(room))
            .sum::<f64>()
            / rooms as f64
    };
    let house_rate = config.ambient_noise_rate();
    let total = occupant_rate + house_rate;
    if !(total > 0.0) {
        return NoiseAttribution {
            occupant: 0.5,
            house: 0.5,
        };
    }
    let occupant = occupant_rate / total;
    NoiseAttribution {
        occupant,
        house: 1.0 - occupant,
    }
}

/// Build the joint `(noise, origin | observer)` table and the null-signal
/// table from emission rates and audibility.
pub fn precompute_joint_and_null_tables(
    house: &House,
    movement: &PlayerMovementModel,
    audibility: &DoorAudibility,
    attribution: NoiseAttribution,
    config: &TrackerConfig,
) -> JointTables {
    let n = house.room_count();
    let room_doors = |room: usize| house.rooms()[room].doors.iter().copied();

    let mut hearing = vec![0.0; NOISE_TYPE_COUNT * n * n];
    for noise in NoiseType::AUDIBLE {
        for origin in 0..n {
            for observer in 0..n {
                let p = if origin == observer {
                    1.0
                } else {
                    room_doors(observer)
                        .map(|door| audibility.weight(noise, origin, door))
                        .sum::<f64>()
                };
                hearing[(noise.index() * n + origin) * n + observer] = p.min(1.0);
            }
        }
    }

    let ambient_hearing: Vec<f64> = (0..n)
        .map(|observer| {
            let total: f64 = (0..n)
                .map(|origin| {
                    if origin == observer {
                        1.0
                    } else {
                        room_doors(observer)
                            .map(|door| audibility.ambient_weight(origin, door))
                            .sum::<f64>()
                            .min(1.0)
                    }
                })
                .sum();
            total / n as f64
        })
        .collect();

    let mut joint = vec![0.0; NOISE_TYPE_COUNT * n * n];
    for observer in 0..n {
        let mut normalizer = 0.0;
        for noise in NoiseType::AUDIBLE {
            for origin in 0..n {
                let raw = movement.noise_likelihood(noise, origin)
                    * hearing[(noise.index() * n + origin) * n + observer];
                joint[(noise.index() * n + origin) * n + observer] = raw;
                normalizer += raw;
            }
        }
        for noise in NoiseType::AUDIBLE {
            for origin in 0..n {
                let cell = &mut joint[(noise.index() * n + origin) * n + observer];
                *cell = if normalizer > 0.0 {
                    attribution.occupant * *cell / normalizer
                } else {
                    0.0
                };
            }
        }
    }

    let house_emits = config.ambient_noise_rate();
    let mut null = vec![0.0; n * n];
    for origin in 0..n {
        let emitted: f64 = NoiseType::AUDIBLE
            .iter()
            .map(|&noise| movement.noise_likelihood(noise, origin))
            .sum();
        let occupant_emits = emitted.min(1.0);
        for observer in 0..n {
            let heard: f64 = NoiseType::AUDIBLE
                .iter()
                .map(|&noise| {
                    movement.noise_likelihood(noise, origin)
                        * hearing[(noise.index() * n + origin) * n + observer]
                })
                .sum();
            let occupant_heard = if emitted > 0.0 { heard / emitted } else { 0.0 };
            let house_heard = ambient_hearing[observer];

            let both_silent = (1.0 - occupant_emits) * (1.0 - house_emits);
            let house_unheard =
                (1.0 - occupant_emits) * house_emits * (1.0 - house_heard);
            let occupant_unheard =
                occupant_emits * (1.0 - occupant_heard) * (1.0 - house_emits);
            let neither_heard = occupant_emits
                * (1.0 - occupant_heard)
                * house_emits
                * (1.0 - house_heard);

            null[origin * n + observer] =
                (both_silent + house_unheard + occupant_unheard + neither_heard).clamp(0.0, 1.0);
        }
    }

    JointTables {
        room_count: n,
        hearing,
        joint,
        null,
        ambient_hearing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::BehaviorWeights;
    use crate::graph::HouseGraph;
    use crate::house::{HouseBuilder, WallType};

    fn build(house: &House, config: &TrackerConfig) -> SignalModel {
        let distances = HouseGraph::build(house, config.door_transition_cost())
            .shortest_path_distances()
            .unwrap();
        let movement = PlayerMovementModel::recalculate(house, &BehaviorWeights::default(), config);
        SignalModel::build(house, &distances, &movement, config)
    }

    // A(0..10) - B(0..10) - C(0..10), plus D(0..30) behind a back door of A.
    fn house() -> House {
        let mut b = HouseBuilder::new();
        let a = b.add_room(0.0, 10.0, true);
        let m = b.add_room(0.0, 10.0, false);
        let c = b.add_room(0.0, 10.0, false);
        let d = b.add_room(0.0, 30.0, false);
        b.connect(a, WallType::Right, 0.0, m, WallType::Left, 0.0);
        b.connect(m, WallType::Right, 0.0, c, WallType::Left, 0.0);
        b.connect(a, WallType::Back, 3.0, d, WallType::Right, 0.0);
        b.build().unwrap()
    }

    #[test]
    fn test_audibility_is_uniform_or_empty() {
        let house = house();
        let model = build(&house, &TrackerConfig::default());
        for noise in NoiseType::ALL {
            for room in 0..house.room_count() {
                let sum: f64 = (0..house.door_count())
                    .map(|door| model.door_audibility(noise, room, door))
                    .sum();
                assert!(
                    sum == 0.0 || (sum - 1.0).abs() < 1e-9,
                    "{noise} in room {room} sums to {sum}"
                );
            }
        }
    }

    #[test]
    fn test_quiet_noises_do_not_reach_far_doors() {
        let house = house();
        // walk reach = sqrt(1 / 0.04) = 5; run reach = 10
        let config = TrackerConfig {
            inaudible_threshold: 0.04,
            ..TrackerConfig::default()
        };
        let model = build(&house, &config);
        // From C, B's right door (2) is 1.5 away; B's left door (1) is 11.5 away.
        assert!(model.door_audibility(NoiseType::Walk, 2, 2) > 0.0);
        assert_eq!(model.door_audibility(NoiseType::Walk, 2, 1), 0.0);
        // Own doors never count.
        assert_eq!(model.door_audibility(NoiseType::Run, 2, 3), 0.0);
        assert_eq!(model.door_audibility(NoiseType::None, 0, 1), 0.0);
    }

    #[test]
    fn test_attribution_is_complementary() {
        let house = house();
        let model = build(&house, &TrackerConfig::default());
        let a = model.attribution();
        assert!((a.occupant + a.house - 1.0).abs() < 1e-12);
        assert!(a.occupant > 0.0 && a.house > 0.0);
    }

    #[test]
    fn test_silent_house_attributes_everything_to_occupant() {
        let house = house();
        let config = TrackerConfig::default();
        let movement = PlayerMovementModel::recalculate(&house, &BehaviorWeights::default(), &config);
        let quiet = TrackerConfig {
            ambient_min_interval: f64::INFINITY,
            ambient_max_interval: f64::INFINITY,
            ..config
        };
        let a = precompute_noise_attribution(&movement, &quiet);
        assert_eq!(a.occupant, 1.0);
        assert_eq!(a.house, 0.0);
    }

    #[test]
    fn test_joint_table_sums_to_occupant_share() {
        let house = house();
        let model = build(&house, &TrackerConfig::default());
        let occupant = model.attribution().occupant;
        for observer in 0..house.room_count() {
            let sum: f64 = NoiseType::ALL
                .iter()
                .flat_map(|&noise| {
                    (0..house.room_count())
                        .map(move |origin| (noise, origin))
                })
                .map(|(noise, origin)| model.joint_probability(noise, origin, observer))
                .sum();
            assert!((sum - occupant).abs() < 1e-9, "observer {observer}: {sum}");
        }
    }

    #[test]
    fn test_null_signal_is_a_probability_and_favors_distance() {
        let house = house();
        let model = build(&house, &TrackerConfig::default());
        for origin in 0..house.room_count() {
            for observer in 0..house.room_count() {
                let p = model.null_signal_likelihood(origin, observer);
                assert!((0.0..=1.0).contains(&p));
            }
        }
        // Silence in C is more likely when the occupant is in D than next door in B.
        assert!(model.null_signal_likelihood(3, 2) >= model.null_signal_likelihood(1, 2));
        // Being in the listener's own room is the noisiest case.
        assert!(model.null_signal_likelihood(2, 2) <= model.null_signal_likelihood(1, 2));
    }

    #[test]
    fn test_run_next_door_is_explained_by_next_room() {
        let house = house();
        let model = build(&house, &TrackerConfig::default());
        // Run heard at C's left door (3) from 2 units away.
        let volume = NoiseType::Run.loudness() / 4.0;
        let in_b = model.signal_likelihood(volume, 3, 1, 2);
        let in_a = model.signal_likelihood(volume, 3, 0, 2);
        assert!(in_b > in_a);
        assert!(model.signal_likelihood(0.0, 3, 1, 2) == 0.0);
        assert!(model.signal_likelihood(f64::NAN, 3, 1, 2) == 0.0);
    }
}
