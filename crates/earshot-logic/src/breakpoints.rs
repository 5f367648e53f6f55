//! Piecewise-linear "distance from a door to any point in a room" curves.
//!
//! Inside a room, the walking distance from a target door to position `x`
//! is `min over doors d of dist(target, d) + |x − pos(d)|`: a chain of ±1
//! slopes. Doors whose best route from the target already passes through a
//! neighboring door add nothing to that minimum and are pruned first. The
//! survivors, in position order, yield the breakpoints
//!
//! ```text
//! left edge, d0, meet(d0, d1), d1, ..., meet(dk-1, dk), dk, right edge
//! ```
//!
//! where `meet(i, j) = (dist(t, i) + |pos i − pos j| + dist(t, j)) / 2` is
//! the peak between two cones. Each interval between consecutive
//! breakpoints is monotone, so the number of intervals bracketing a distance,
//! with shared breakpoints counted once, is the number of positions in the
//! room at that distance.

use crate::graph::DistanceTables;
use crate::house::House;

const DOMINANCE_EPSILON: f64 = 1e-9;

/// Breakpoint curves and distance bounds for every (door, room) pair.
#[derive(Debug, Clone)]
pub struct DistanceFunctions {
    room_count: usize,
    /// `door × room` breakpoint sequences.
    breakpoints: Vec<Vec<f64>>,
    min_distance: Vec<f64>,
    max_distance: Vec<f64>,
}

impl DistanceFunctions {
    pub fn precompute(house: &House, distances: &DistanceTables) -> Self {
        let room_count = house.room_count();
        let pairs = house.door_count() * room_count;
        let mut breakpoints = Vec::with_capacity(pairs);
        let mut min_distance = Vec::with_capacity(pairs);
        let mut max_distance = Vec::with_capacity(pairs);

        for target in 0..house.door_count() {
            for room in 0..room_count {
                let points = room_breakpoints(house, distances, target, room);
                let (lo, hi) = if points.is_empty() {
                    (f64::INFINITY, f64::INFINITY)
                } else {
                    points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &b| {
                        (lo.min(b), hi.max(b))
                    })
                };
                breakpoints.push(points);
                min_distance.push(lo);
                max_distance.push(hi);
            }
        }

        Self {
            room_count,
            breakpoints,
            min_distance,
            max_distance,
        }
    }

    pub fn breakpoints(&self, door: usize, room: usize) -> &[f64] {
        &self.breakpoints[door * self.room_count + room]
    }

    /// Shortest walking distance from `door` to any point of `room`.
    pub fn min_distance(&self, door: usize, room: usize) -> f64 {
        self.min_distance[door * self.room_count + room]
    }

    /// Longest shortest-path distance from `door` to a point of `room`.
    pub fn max_distance(&self, door: usize, room: usize) -> f64 {
        self.max_distance[door * self.room_count + room]
    }

    /// Number of positions in `room` whose walking distance from `door`
    /// equals `distance`.
    pub fn plausible_positions(&self, door: usize, room: usize, distance: f64) -> usize {
        count_bracketing(self.breakpoints(door, room), distance)
    }
}

/// Doors of `room` that are not Pareto-dominated with respect to `target`,
/// in position order.
///
/// Door `b` is dominated by door `a` when `dist(target, b)` is no shorter
/// than going to `a` and walking across the room. Coincident doors with
/// equal distances keep the lower id.
pub fn surviving_doors(
    house: &House,
    distances: &DistanceTables,
    target: usize,
    room: usize,
) -> Vec<usize> {
    let doors = &house.rooms()[room].doors;
    let dist = |d: usize| distances.door_to_door(target, d);
    let pos = |d: usize| house.doors()[d].position;

    doors
        .iter()
        .copied()
        .filter(|&b| {
            !doors.iter().copied().any(|a| {
                if a == b {
                    return false;
                }
                let sep = (pos(a) - pos(b)).abs();
                let b_via_a = dist(b) + DOMINANCE_EPSILON >= dist(a) + sep;
                let a_via_b = dist(a) + DOMINANCE_EPSILON >= dist(b) + sep;
                b_via_a && (!a_via_b || a < b)
            })
        })
        .collect()
}

fn room_breakpoints(
    house: &House,
    distances: &DistanceTables,
    target: usize,
    room: usize,
) -> Vec<f64> {
    let survivors = surviving_doors(house, distances, target, room);
    let (Some(&first), Some(&last)) = (survivors.first(), survivors.last()) else {
        return Vec::new();
    };
    let r = &house.rooms()[room];
    let dist = |d: usize| distances.door_to_door(target, d);
    let pos = |d: usize| house.doors()[d].position;

    let mut points = Vec::with_capacity(2 * survivors.len() + 1);
    points.push(dist(first) + (pos(first) - r.left).abs());
    for pair in survivors.windows(2) {
        let (i, j) = (pair[0], pair[1]);
        points.push(dist(i));
        points.push(0.5 * (dist(i) + (pos(j) - pos(i)).abs() + dist(j)));
    }
    points.push(dist(last));
    points.push(dist(last) + (r.right - pos(last)).abs());
    points
}

/// Counts intervals containing `distance`. Each interval owns its start
/// point, so a breakpoint shared by two intervals is one position. The last
/// spanning interval also owns its end.
fn count_bracketing(points: &[f64], distance: f64) -> usize {
    let spans: Vec<(f64, f64)> = points
        .windows(2)
        .map(|pair| (pair[0], pair[1]))
        .filter(|(start, end)| (end - start).abs() > DOMINANCE_EPSILON)
        .collect();
    if spans.is_empty() {
        return match points.first() {
            Some(&b) if (b - distance).abs() <= DOMINANCE_EPSILON => 1,
            _ => 0,
        };
    }
    let last = spans.len() - 1;
    spans
        .iter()
        .enumerate()
        .filter(|&(i, &(start, end))| {
            let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
            let inside = distance >= lo - DOMINANCE_EPSILON && distance <= hi + DOMINANCE_EPSILON;
            let at_end = (distance - end).abs() <= DOMINANCE_EPSILON;
            inside && (i == last || !at_end)
        })
        .count()
}
