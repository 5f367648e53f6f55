//! Earshot Headless Tracking Harness
//!
//! Validates the tracking pipeline against a simulated occupant.
//! Runs entirely in-process with no engine and no rendering.
//!
//! Usage:
//!   cargo run -p earshot-simtest
//!   cargo run -p earshot-simtest -- --verbose
//!   cargo run -p earshot-simtest -- --seed 7 --ticks 50000 --config tuning.json

use earshot_logic::behavior::{classify_visit, BehaviorLearner, BehaviorWeights, VisitKind};
use earshot_logic::config::{validate_config, TrackerConfig};
use earshot_logic::constants::NoiseType;
use earshot_logic::house::{Door, House, HouseBuilder, Room, WallType};
use earshot_logic::persistence::{load_snapshot, save_snapshot, weights_from_json, weights_to_json};
use earshot_logic::tracker::{BeliefTracker, UpdateOutcome};
use earshot_logic::{GeometryError, TrackerError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

// ── Sample layouts (hand-made houses shipped with the game) ─────────────
const SAMPLE_HOUSES_JSON: &str = include_str!("../data/sample_houses.json");

#[derive(Debug, Deserialize)]
struct HouseSpec {
    name: String,
    rooms: Vec<RoomSpec>,
    passages: Vec<PassageSpec>,
}

#[derive(Debug, Deserialize)]
struct RoomSpec {
    left: f64,
    right: f64,
    item_spawn: bool,
}

#[derive(Debug, Deserialize)]
struct PassageSpec {
    room_a: usize,
    wall_a: WallType,
    position_a: f64,
    room_b: usize,
    wall_b: WallType,
    position_b: f64,
}

impl HouseSpec {
    fn build(&self) -> Result<House, GeometryError> {
        let mut builder = HouseBuilder::new();
        for room in &self.rooms {
            builder.add_room(room.left, room.right, room.item_spawn);
        }
        for p in &self.passages {
            builder.connect(p.room_a, p.wall_a, p.position_a, p.room_b, p.wall_b, p.position_b);
        }
        builder.build()
    }
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

struct Options {
    verbose: bool,
    seed: u64,
    ticks: usize,
    config_path: Option<String>,
}

fn parse_args() -> Options {
    let mut options = Options {
        verbose: false,
        seed: 42,
        ticks: 20_000,
        config_path: None,
    };
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--verbose" => options.verbose = true,
            "--seed" => match args.next().and_then(|v| v.parse().ok()) {
                Some(seed) => options.seed = seed,
                None => eprintln!("--seed expects an integer"),
            },
            "--ticks" => match args.next().and_then(|v| v.parse().ok()) {
                Some(ticks) => options.ticks = ticks,
                None => eprintln!("--ticks expects an integer"),
            },
            "--config" => options.config_path = args.next(),
            other => eprintln!("ignoring unknown argument {}", other),
        }
    }
    options
}

fn main() {
    let options = parse_args();
    let default_filter = if options.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    println!("=== Earshot Tracking Harness ===\n");

    let mut results = Vec::new();

    // 1. Configuration
    let (config, config_results) = validate_configuration(&options);
    results.extend(config_results);

    // 2. Sample layouts
    let (houses, house_results) = validate_sample_houses(options.verbose);
    results.extend(house_results);

    // 3. Malformed layouts
    results.extend(validate_malformed_houses(&config));

    // 4. Derived tables
    results.extend(validate_tables(&houses, &config));

    // 5. Tracker entry points
    results.extend(validate_tracker_basics(&houses, &config));

    // 6. Seeded tracking runs
    results.extend(validate_tracking_runs(&houses, &config, &options));

    // 7. Persistence
    results.extend(validate_persistence(&houses, &config));

    // 8. Topology rebuild
    results.extend(validate_rebuild(&houses, &config));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || options.verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn is_normalized(belief: &[f64]) -> bool {
    let sum: f64 = belief.iter().sum();
    (sum - 1.0).abs() < 1e-9 && belief.iter().all(|&p| p >= 0.0)
}

// ── 1. Configuration ────────────────────────────────────────────────────

fn validate_configuration(options: &Options) -> (TrackerConfig, Vec<TestResult>) {
    println!("--- Configuration ---");
    let mut results = Vec::new();

    let defaults = TrackerConfig::default();
    let errors = validate_config(&defaults);
    results.push(TestResult {
        name: "config_defaults_valid".into(),
        passed: errors.is_empty(),
        detail: format!("{} problems in defaults", errors.len()),
    });

    match TrackerConfig::from_json(r#"{ "tick_seconds": 0.05 }"#) {
        Ok(partial) => results.push(TestResult {
            name: "config_partial_json".into(),
            passed: partial.tick_seconds == 0.05 && partial.mean_velocity == defaults.mean_velocity,
            detail: "missing fields fall back to defaults".into(),
        }),
        Err(e) => results.push(TestResult {
            name: "config_partial_json".into(),
            passed: false,
            detail: format!("JSON parse error: {}", e),
        }),
    }

    let broken = TrackerConfig {
        tick_seconds: 0.0,
        mean_velocity: -1.0,
        inaudible_threshold: f64::NAN,
        ..TrackerConfig::default()
    };
    let broken_errors = validate_config(&broken);
    results.push(TestResult {
        name: "config_rejects_bad_values".into(),
        passed: broken_errors.len() == 3,
        detail: format!("{:?}", broken_errors),
    });

    let mut config = defaults;
    if let Some(path) = &options.config_path {
        let loaded = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|json| TrackerConfig::from_json(&json).map_err(|e| e.to_string()));
        match loaded {
            Ok(custom) => {
                let problems = validate_config(&custom);
                results.push(TestResult {
                    name: "config_file_valid".into(),
                    passed: problems.is_empty(),
                    detail: if problems.is_empty() {
                        format!("loaded {}", path)
                    } else {
                        format!("{}: {:?}", path, problems)
                    },
                });
                if problems.is_empty() {
                    config = custom;
                }
            }
            Err(e) => results.push(TestResult {
                name: "config_file_valid".into(),
                passed: false,
                detail: format!("{}: {}", path, e),
            }),
        }
    }

    (config, results)
}

// ── 2. Sample Houses ────────────────────────────────────────────────────

fn validate_sample_houses(verbose: bool) -> (Vec<(String, House)>, Vec<TestResult>) {
    println!("--- Sample Houses ---");
    let mut results = Vec::new();
    let mut houses = Vec::new();

    let specs: Vec<HouseSpec> = match serde_json::from_str(SAMPLE_HOUSES_JSON) {
        Ok(specs) => specs,
        Err(e) => {
            results.push(TestResult {
                name: "houses_parse".into(),
                passed: false,
                detail: format!("JSON parse error: {}", e),
            });
            return (houses, results);
        }
    };

    results.push(TestResult {
        name: "houses_not_empty".into(),
        passed: !specs.is_empty(),
        detail: format!("{} layouts loaded", specs.len()),
    });

    for spec in &specs {
        match spec.build() {
            Ok(house) => {
                if verbose {
                    println!(
                        "  {}: {} rooms, {} doors, {:.1} walkable",
                        spec.name,
                        house.room_count(),
                        house.door_count(),
                        house.total_walkable_width()
                    );
                }
                results.push(TestResult {
                    name: format!("house_{}_valid", spec.name),
                    passed: true,
                    detail: format!("{} rooms", house.room_count()),
                });
                houses.push((spec.name.clone(), house));
            }
            Err(e) => results.push(TestResult {
                name: format!("house_{}_valid", spec.name),
                passed: false,
                detail: e.to_string(),
            }),
        }
    }

    (houses, results)
}

// ── 3. Malformed Houses ─────────────────────────────────────────────────

fn validate_malformed_houses(config: &TrackerConfig) -> Vec<TestResult> {
    println!("--- Malformed Houses ---");
    let mut results = Vec::new();

    let mut expect_err = |name: &str, outcome: Result<House, GeometryError>| {
        results.push(TestResult {
            name: name.into(),
            passed: outcome.is_err(),
            detail: match outcome {
                Ok(_) => "accepted".into(),
                Err(e) => e.to_string(),
            },
        });
    };

    expect_err("geometry_no_rooms", HouseBuilder::new().build());

    let mut inverted = HouseBuilder::new();
    inverted.add_room(5.0, 1.0, false);
    expect_err("geometry_inverted_bounds", inverted.build());

    let mut two_left = HouseBuilder::new();
    let a = two_left.add_room(0.0, 10.0, false);
    let b = two_left.add_room(0.0, 10.0, false);
    let c = two_left.add_room(0.0, 10.0, false);
    two_left.connect(a, WallType::Left, 0.0, b, WallType::Right, 0.0);
    two_left.connect(a, WallType::Left, 0.0, c, WallType::Right, 0.0);
    expect_err("geometry_duplicate_side_door", two_left.build());

    let mut dangling = HouseBuilder::new();
    let a = dangling.add_room(0.0, 10.0, false);
    dangling.connect(a, WallType::Right, 0.0, 7, WallType::Left, 0.0);
    expect_err("geometry_unknown_room", dangling.build());

    let mut outside = HouseBuilder::new();
    let a = outside.add_room(0.0, 10.0, false);
    let b = outside.add_room(0.0, 10.0, false);
    outside.connect(a, WallType::Back, 14.0, b, WallType::Back, 2.0);
    expect_err("geometry_door_outside_room", outside.build());

    let rooms = vec![
        Room {
            doors: vec![0],
            ..Room::new(0, 0.0, 10.0, false)
        },
        Room {
            doors: vec![1, 2],
            ..Room::new(1, 0.0, 10.0, false)
        },
    ];
    let door = |id, room, position, connects_to| Door {
        id,
        room,
        position,
        connects_to,
        wall: WallType::Back,
    };
    let doors = vec![door(0, 0, 2.0, 1), door(1, 1, 2.0, 2), door(2, 1, 6.0, 1)];
    expect_err("geometry_asymmetric_pair", House::new(rooms, doors));

    // Structurally valid, but the third room has no way in.
    let mut island = HouseBuilder::new();
    let a = island.add_room(0.0, 10.0, false);
    let b = island.add_room(0.0, 10.0, false);
    island.add_room(0.0, 10.0, false);
    island.connect(a, WallType::Right, 0.0, b, WallType::Left, 0.0);
    let disconnected = island
        .build()
        .map_err(TrackerError::from)
        .and_then(|house| BeliefTracker::new(house, BehaviorWeights::default(), config.clone()));
    results.push(TestResult {
        name: "geometry_disconnected".into(),
        passed: matches!(
            disconnected,
            Err(TrackerError::Geometry(GeometryError::Disconnected { .. }))
        ),
        detail: match disconnected {
            Ok(_) => "accepted".into(),
            Err(e) => e.to_string(),
        },
    });

    results
}

// ── 4. Derived Tables ───────────────────────────────────────────────────

fn validate_tables(houses: &[(String, House)], config: &TrackerConfig) -> Vec<TestResult> {
    println!("--- Derived Tables ---");
    let mut results = Vec::new();

    for (name, house) in houses {
        let tracker = match BeliefTracker::new(house.clone(), BehaviorWeights::default(), config.clone())
        {
            Ok(t) => t,
            Err(e) => {
                results.push(TestResult {
                    name: format!("tables_{}_build", name),
                    passed: false,
                    detail: e.to_string(),
                });
                continue;
            }
        };

        let d = tracker.distances();
        let doors = d.door_count();
        let rooms = d.room_count();
        let mut asymmetric = 0;
        let mut triangle = 0;
        let mut infinite = 0;
        for a in 0..doors {
            for b in 0..doors {
                let ab = d.door_to_door(a, b);
                if !ab.is_finite() {
                    infinite += 1;
                }
                if (ab - d.door_to_door(b, a)).abs() > 1e-9 {
                    asymmetric += 1;
                }
                for c in 0..doors {
                    if d.door_to_door(a, c) > ab + d.door_to_door(b, c) + 1e-9 {
                        triangle += 1;
                    }
                }
            }
        }
        for a in 0..rooms {
            for b in 0..rooms {
                if !d.room_to_room(a, b).is_finite() {
                    infinite += 1;
                }
                if (d.room_to_room(a, b) - d.room_to_room(b, a)).abs() > 1e-9 {
                    asymmetric += 1;
                }
            }
        }
        results.push(TestResult {
            name: format!("tables_{}_distance_metric", name),
            passed: asymmetric == 0 && triangle == 0 && infinite == 0,
            detail: format!(
                "{} asymmetric, {} triangle violations, {} infinite",
                asymmetric, triangle, infinite
            ),
        });

        let movement = tracker.movement_model();
        let worst_row = (0..rooms)
            .map(|r| (movement.transition_row(r).iter().sum::<f64>() - 1.0).abs())
            .fold(0.0, f64::max);
        results.push(TestResult {
            name: format!("tables_{}_row_sums", name),
            passed: worst_row < 1e-9,
            detail: format!("max row deviation {:.2e}", worst_row),
        });

        let signal = tracker.signal_model();
        let mut bad_audibility = 0;
        let mut bad_null = 0;
        for noise in NoiseType::ALL {
            for room in 0..rooms {
                let sum: f64 = (0..doors)
                    .map(|door| signal.door_audibility(noise, room, door))
                    .sum();
                if sum != 0.0 && (sum - 1.0).abs() > 1e-9 {
                    bad_audibility += 1;
                }
            }
        }
        for origin in 0..rooms {
            for observer in 0..rooms {
                let p = signal.null_signal_likelihood(origin, observer);
                if !(0.0..=1.0).contains(&p) {
                    bad_null += 1;
                }
            }
        }
        results.push(TestResult {
            name: format!("tables_{}_probabilities", name),
            passed: bad_audibility == 0 && bad_null == 0,
            detail: format!(
                "{} bad audibility rows, {} bad null entries, occupant share {:.3}",
                bad_audibility,
                bad_null,
                signal.attribution().occupant
            ),
        });
    }

    results
}

// ── 5. Tracker Entry Points ─────────────────────────────────────────────

fn validate_tracker_basics(houses: &[(String, House)], config: &TrackerConfig) -> Vec<TestResult> {
    println!("--- Tracker ---");
    let mut results = Vec::new();

    let find = |wanted: &str| houses.iter().find(|(name, _)| name == wanted).map(|(_, h)| h);
    let (Some(line), Some(cottage)) = (find("three_in_a_line"), find("cottage")) else {
        results.push(TestResult {
            name: "tracker_sample_layouts".into(),
            passed: false,
            detail: "three_in_a_line and cottage layouts are required".into(),
        });
        return results;
    };

    let outcome = (|| -> Result<Vec<TestResult>, TrackerError> {
        let mut checks = Vec::new();
        let mut tracker = BeliefTracker::new(line.clone(), BehaviorWeights::default(), config.clone())?;

        checks.push(TestResult {
            name: "tracker_uniform_start".into(),
            passed: tracker.certainty() == 0.0 && is_normalized(tracker.belief()),
            detail: format!("{:?}", tracker.belief()),
        });

        tracker.update_observer_room(2, false)?;
        let volume = NoiseType::Run.loudness() / 4.0;
        tracker.filter(volume, 3)?;
        let b = tracker.belief();
        checks.push(TestResult {
            name: "tracker_run_next_door".into(),
            passed: b[1] > b[0],
            detail: format!("B {:.3} vs A {:.3}", b[1], b[0]),
        });

        let second = tracker.filter(volume, 3);
        checks.push(TestResult {
            name: "tracker_one_update_per_tick".into(),
            passed: matches!(second, Err(TrackerError::UpdateOrder)),
            detail: "second filter in the same tick is refused".into(),
        });

        tracker.known_in_room(0)?;
        checks.push(TestResult {
            name: "tracker_known_in_room".into(),
            passed: tracker.belief() == [1.0, 0.0, 0.0] && tracker.certainty() == 1.0,
            detail: format!("{:?}", tracker.belief()),
        });

        let mut four = BeliefTracker::new(cottage.clone(), BehaviorWeights::default(), config.clone())?;
        four.known_in_room(1)?;
        four.predict_one_time_step();
        four.soft_reset();
        checks.push(TestResult {
            name: "tracker_soft_reset".into(),
            passed: four.belief() == [0.25, 0.25, 0.25, 0.25],
            detail: format!("{:?}", four.belief()),
        });

        Ok(checks)
    })();

    match outcome {
        Ok(checks) => results.extend(checks),
        Err(e) => results.push(TestResult {
            name: "tracker_entry_points".into(),
            passed: false,
            detail: e.to_string(),
        }),
    }

    results
}

// ── 6. Seeded Tracking Runs ─────────────────────────────────────────────

/// Ticks between listener relocations.
const LISTENER_MOVE_TICKS: usize = 600;
/// Ticks between folding learned behavior back into the tracker.
const LEARNING_COMMIT_TICKS: usize = 2_000;
/// Closest distance a noise is assumed to travel before reaching a door.
const MIN_HEARING_DISTANCE: f64 = 0.25;

#[derive(Debug, Clone, Copy)]
enum Goal {
    Spot(f64),
    Door(usize),
}

/// Simulated occupant wandering the house.
struct Occupant {
    room: usize,
    x: f64,
    goal: Goal,
    running: bool,
    stride: f64,
    entered_through: Option<usize>,
    picked_item: bool,
}

#[derive(Default)]
struct OccupantStep {
    noises: Vec<NoiseType>,
    /// Room that was left this tick and how the visit was spent.
    finished_visit: Option<(usize, VisitKind)>,
}

impl Occupant {
    fn new(house: &House, room: usize, weights: &BehaviorWeights, rng: &mut StdRng) -> Self {
        let r = &house.rooms()[room];
        let mut occupant = Self {
            room,
            x: r.center(),
            goal: Goal::Spot(r.center()),
            running: false,
            stride: 0.0,
            entered_through: None,
            picked_item: false,
        };
        occupant.choose_goal(house, weights, rng);
        occupant
    }

    fn choose_goal(&mut self, house: &House, weights: &BehaviorWeights, rng: &mut StdRng) {
        let room = &house.rooms()[self.room];
        self.goal = if !room.doors.is_empty() && rng.gen_bool(0.35) {
            Goal::Door(room.doors[rng.gen_range(0..room.doors.len())])
        } else {
            Goal::Spot(rng.gen_range(room.left..=room.right))
        };
        self.running = rng.gen_bool(weights.run_propensity.clamp(0.0, 1.0));
    }

    fn step(
        &mut self,
        house: &House,
        config: &TrackerConfig,
        weights: &BehaviorWeights,
        rng: &mut StdRng,
    ) -> OccupantStep {
        let mut step = OccupantStep::default();
        let pace = if self.running { 2.0 } else { 1.0 };
        let speed = config.mean_velocity * config.tick_seconds * pace;
        let target = match self.goal {
            Goal::Spot(x) => x,
            Goal::Door(door) => house.doors()[door].position,
        };

        let gap = target - self.x;
        let moved = gap.abs().min(speed);
        self.x += moved * gap.signum();
        self.stride += moved;
        while self.stride >= config.step_length {
            self.stride -= config.step_length;
            step.noises.push(if self.running {
                NoiseType::Run
            } else {
                NoiseType::Walk
            });
        }

        if (target - self.x).abs() > 1e-9 {
            return step;
        }

        match self.goal {
            Goal::Door(door) => {
                let kind = classify_visit(self.entered_through, Some(door), self.picked_item);
                step.finished_visit = Some((self.room, kind));
                step.noises.push(NoiseType::DoorUse);
                let arrival = &house.doors()[house.doors()[door].connects_to];
                self.room = arrival.room;
                self.x = arrival.position;
                self.entered_through = Some(arrival.id);
                self.picked_item = false;
            }
            Goal::Spot(_) => {
                if house.rooms()[self.room].item_spawn && rng.gen_bool(0.3) {
                    step.noises.push(NoiseType::ItemHandling);
                    self.picked_item = true;
                }
            }
        }
        self.choose_goal(house, weights, rng);
        step
    }
}

/// Walking distance from position `x` in `room` to `door`.
fn distance_to_door(house: &House, tracker: &BeliefTracker, room: usize, x: f64, door: usize) -> f64 {
    let d = tracker.distances();
    house.rooms()[room]
        .doors
        .iter()
        .map(|&e| (x - house.doors()[e].position).abs() + d.door_to_door(e, door))
        .fold(f64::INFINITY, f64::min)
}

/// Loudest audible arrival of a noise at the listener's doors, as
/// `(volume, door)`, after inverse-square attenuation.
fn propagate(
    house: &House,
    tracker: &BeliefTracker,
    config: &TrackerConfig,
    loudness: f64,
    room: usize,
    x: f64,
    listener: usize,
) -> Option<(f64, usize)> {
    house.rooms()[listener]
        .doors
        .iter()
        .map(|&door| {
            let distance = distance_to_door(house, tracker, room, x, door).max(MIN_HEARING_DISTANCE);
            (loudness / (distance * distance), door)
        })
        .filter(|(volume, _)| *volume >= config.inaudible_threshold)
        .max_by(|a, b| a.0.total_cmp(&b.0))
}

#[derive(Debug, Default)]
struct RunStats {
    hidden_ticks: usize,
    sightings: usize,
    noisy_updates: usize,
    skipped: usize,
    hits: usize,
    true_mass: f64,
    violations: usize,
    recalculations: usize,
    rooms: usize,
    learned: Option<BehaviorWeights>,
}

fn run_tracking(
    house: &House,
    config: &TrackerConfig,
    seed: u64,
    ticks: usize,
) -> Result<RunStats, TrackerError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let weights = BehaviorWeights::default();
    let mut tracker = BeliefTracker::new(house.clone(), weights, config.clone())?;
    let mut learner = BehaviorLearner::new(weights, config.learning_prior_strength);
    let rooms = house.room_count();
    let mut stats = RunStats {
        rooms,
        ..RunStats::default()
    };

    let mut listener = rng.gen_range(0..rooms);
    let start = rng.gen_range(0..rooms);
    let mut occupant = Occupant::new(house, start, &weights, &mut rng);
    let ambient_rate = config.ambient_noise_rate().clamp(0.0, 1.0);

    for tick in 0..ticks {
        if tick > 0 && tick % LISTENER_MOVE_TICKS == 0 {
            listener = rng.gen_range(0..rooms);
        }
        if tick > 0 && tick % LEARNING_COMMIT_TICKS == 0 && learner.observation_count() > 0 {
            tracker.recalculate(learner.commit());
            stats.recalculations += 1;
        }

        let step = occupant.step(house, config, &weights, &mut rng);
        let visible = occupant.room == listener;
        tracker.update_observer_room(listener, visible)?;

        if let Some((room, kind)) = step.finished_visit {
            if room == listener {
                learner.observe_visit(kind);
            }
        }

        if visible {
            stats.sightings += 1;
            for &noise in &step.noises {
                learner.observe_noise(noise);
            }
        } else {
            if tracker.predict_one_time_step() == UpdateOutcome::Skipped {
                stats.skipped += 1;
            }

            let mut heard: Option<(f64, usize)> = step
                .noises
                .iter()
                .filter_map(|noise| {
                    propagate(house, &tracker, config, noise.loudness(), occupant.room, occupant.x, listener)
                })
                .max_by(|a, b| a.0.total_cmp(&b.0));
            if rng.gen_bool(ambient_rate) {
                let origin = rng.gen_range(0..rooms);
                let r = &house.rooms()[origin];
                let x = rng.gen_range(r.left..=r.right);
                if origin != listener {
                    let ambient =
                        propagate(house, &tracker, config, config.ambient_loudness, origin, x, listener);
                    heard = match (heard, ambient) {
                        (Some(a), Some(b)) => Some(if b.0 > a.0 { b } else { a }),
                        (a, b) => a.or(b),
                    };
                }
            }

            let outcome = match heard {
                Some((volume, door)) => {
                    stats.noisy_updates += 1;
                    log::trace!("tick {}: heard {:.4} at door {}", tick, volume, door);
                    tracker.filter(volume, door)?
                }
                None => tracker.filter_with_null_signal()?,
            };
            if outcome == UpdateOutcome::Skipped {
                stats.skipped += 1;
            }

            stats.hidden_ticks += 1;
            if tracker.most_likely_room() == occupant.room {
                stats.hits += 1;
            }
            stats.true_mass += tracker.belief()[occupant.room];
        }

        if !is_normalized(tracker.belief()) {
            stats.violations += 1;
        }
    }

    stats.learned = Some(*tracker.weights());
    Ok(stats)
}

/// Random connected house: a line of side doors plus back-door shortcuts.
fn generate_house(rng: &mut StdRng) -> Result<House, GeometryError> {
    let mut builder = HouseBuilder::new();
    let count = rng.gen_range(4..=9);
    let mut widths = Vec::with_capacity(count);
    for _ in 0..count {
        let width: f64 = rng.gen_range(6.0..30.0);
        builder.add_room(0.0, width, rng.gen_bool(0.4));
        widths.push(width);
    }
    for room in 1..count {
        builder.connect(room - 1, WallType::Right, 0.0, room, WallType::Left, 0.0);
    }
    for _ in 0..rng.gen_range(0..=count / 2) {
        let a = rng.gen_range(0..count);
        let b = rng.gen_range(0..count);
        if a == b {
            continue;
        }
        let pos_a = rng.gen_range(1.0..widths[a] - 1.0);
        let pos_b = rng.gen_range(1.0..widths[b] - 1.0);
        builder.connect(a, WallType::Back, pos_a, b, WallType::Back, pos_b);
    }
    builder.build()
}

fn validate_tracking_runs(
    houses: &[(String, House)],
    config: &TrackerConfig,
    options: &Options,
) -> Vec<TestResult> {
    println!("--- Tracking Runs (seed {}, {} ticks) ---", options.seed, options.ticks);
    let mut results = Vec::new();

    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut layouts: Vec<(String, House)> = houses
        .iter()
        .filter(|(_, house)| house.room_count() > 2)
        .cloned()
        .collect();
    for i in 0..3 {
        match generate_house(&mut rng) {
            Ok(house) => layouts.push((format!("generated_{}", i), house)),
            Err(e) => results.push(TestResult {
                name: format!("run_generated_{}_layout", i),
                passed: false,
                detail: e.to_string(),
            }),
        }
    }

    for (i, (name, house)) in layouts.iter().enumerate() {
        let seed = options.seed.wrapping_add(i as u64 + 1);
        let stats = match run_tracking(house, config, seed, options.ticks) {
            Ok(stats) => stats,
            Err(e) => {
                results.push(TestResult {
                    name: format!("run_{}", name),
                    passed: false,
                    detail: e.to_string(),
                });
                continue;
            }
        };

        let hidden = stats.hidden_ticks.max(1) as f64;
        let hit_rate = stats.hits as f64 / hidden;
        let mean_mass = stats.true_mass / hidden;
        let baseline = 1.0 / stats.rooms as f64;
        if options.verbose {
            println!(
                "  {}: {} hidden, {} sightings, {} noisy, {} skipped, {} recalcs",
                name,
                stats.hidden_ticks,
                stats.sightings,
                stats.noisy_updates,
                stats.skipped,
                stats.recalculations
            );
        }

        results.push(TestResult {
            name: format!("run_{}_normalized", name),
            passed: stats.violations == 0,
            detail: format!("{} ticks with a denormalized belief", stats.violations),
        });
        results.push(TestResult {
            name: format!("run_{}_beats_uniform", name),
            passed: mean_mass > baseline,
            detail: format!(
                "mean belief on true room {:.3}, top-1 hit rate {:.3}, uniform {:.3}",
                mean_mass, hit_rate, baseline
            ),
        });
        if let Some(learned) = stats.learned {
            let sane = learned == learned.sanitized() && learned.run_propensity <= 1.0;
            results.push(TestResult {
                name: format!("run_{}_learned_weights", name),
                passed: sane,
                detail: format!("{:?}", learned),
            });
        }
    }

    results
}

// ── 7. Persistence ──────────────────────────────────────────────────────

fn validate_persistence(houses: &[(String, House)], config: &TrackerConfig) -> Vec<TestResult> {
    println!("--- Persistence ---");
    let mut results = Vec::new();

    let Some((name, house)) = houses.iter().max_by_key(|(_, h)| h.room_count()) else {
        return results;
    };

    let outcome = (|| -> Result<bool, Box<dyn std::error::Error>> {
        let mut tracker = BeliefTracker::new(house.clone(), BehaviorWeights::default(), config.clone())?;
        tracker.known_in_room(house.room_count() - 1)?;
        for _ in 0..25 {
            tracker.predict_one_time_step();
        }
        tracker.recalculate(BehaviorWeights {
            run_propensity: 0.45,
            ..BehaviorWeights::default()
        });

        let mut buffer = Vec::new();
        save_snapshot(&mut buffer, &tracker.snapshot())?;
        let snapshot = load_snapshot(&buffer[..])?;

        let mut restored = BeliefTracker::new(house.clone(), BehaviorWeights::default(), config.clone())?;
        restored.restore(snapshot)?;
        let same_belief = restored
            .belief()
            .iter()
            .zip(tracker.belief())
            .all(|(a, b)| (a - b).abs() < 1e-12);
        Ok(same_belief && restored.weights() == tracker.weights())
    })();
    results.push(TestResult {
        name: format!("persist_{}_snapshot", name),
        passed: matches!(outcome, Ok(true)),
        detail: match outcome {
            Ok(true) => "belief and weights restored".into(),
            Ok(false) => "restored state differs".into(),
            Err(e) => e.to_string(),
        },
    });

    let weights = BehaviorWeights {
        door_to_door: 0.7,
        ..BehaviorWeights::default()
    };
    let json_roundtrip = weights_to_json(&weights).and_then(|json| weights_from_json(&json));
    results.push(TestResult {
        name: "persist_weights_json".into(),
        passed: matches!(&json_roundtrip, Ok(w) if *w == weights),
        detail: format!("{:?}", json_roundtrip.map_err(|e| e.to_string())),
    });

    results
}

// ── 8. Topology Rebuild ─────────────────────────────────────────────────

fn validate_rebuild(houses: &[(String, House)], config: &TrackerConfig) -> Vec<TestResult> {
    println!("--- Topology Rebuild ---");
    let mut results = Vec::new();
    if houses.len() < 2 {
        return results;
    }
    let (first, second) = (&houses[0].1, &houses[1].1);

    let outcome = (|| -> Result<Vec<TestResult>, TrackerError> {
        let mut checks = Vec::new();
        let mut tracker = BeliefTracker::new(first.clone(), BehaviorWeights::default(), config.clone())?;
        tracker.update_observer_room(0, true)?;
        tracker.rebuild(second.clone())?;
        let n = second.room_count();
        checks.push(TestResult {
            name: "rebuild_resets_belief".into(),
            passed: tracker.belief().len() == n
                && tracker.belief().iter().all(|&p| (p - 1.0 / n as f64).abs() < 1e-12)
                && tracker.observer_room().is_none(),
            detail: format!("{} rooms after rebuild", tracker.belief().len()),
        });

        let mut island = HouseBuilder::new();
        island.add_room(0.0, 10.0, false);
        island.add_room(0.0, 10.0, false);
        let refused = match island.build() {
            Ok(house) => tracker.rebuild(house).is_err(),
            Err(_) => false,
        };
        checks.push(TestResult {
            name: "rebuild_rejects_disconnected".into(),
            passed: refused && tracker.belief().len() == n,
            detail: "previous topology kept".into(),
        });
        Ok(checks)
    })();

    match outcome {
        Ok(checks) => results.extend(checks),
        Err(e) => results.push(TestResult {
            name: "rebuild".into(),
            passed: false,
            detail: e.to_string(),
        }),
    }

    results
}
