//! Pure hearing-based tracking logic for Earshot.
//!
//! This crate estimates which room an unseen occupant is in, from what a
//! listener hears (or does not hear) tick by tick. It is independent of any
//! engine or renderer: functions take plain data and return results, so the
//! whole pipeline is unit-testable and runs headless in the simtest harness.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`behavior`] | Learned behavior weights and the learner that updates them |
//! | [`breakpoints`] | Piecewise-linear door→room distance curves, Pareto pruning |
//! | [`config`] | Physical and acoustic tuning, validation |
//! | [`constants`] | Noise types, reference loudness, default tunings |
//! | [`error`] | Geometry, tracker and persistence errors |
//! | [`graph`] | Wall/door graph and all-pairs walking distances |
//! | [`house`] | Validated room and door arenas, builder |
//! | [`movement`] | Dwell times and room-to-room Markov chain |
//! | [`persistence`] | Belief and weight snapshots (bincode, JSON) |
//! | [`signal`] | Door audibility, noise attribution, likelihood tables |
//! | [`tracker`] | Belief vector, predict/filter updates, lifecycle |

pub mod behavior;
pub mod breakpoints;
pub mod config;
pub mod constants;
pub mod error;
pub mod graph;
pub mod house;
pub mod movement;
pub mod persistence;
pub mod signal;
pub mod tracker;

pub use error::{GeometryError, PersistError, TrackerError};
pub use tracker::{BeliefTracker, TrackerMode, UpdateOutcome};
