//! Walking-distance graph over walls and doorways.
//!
//! Each room contributes a chain of vertices: its left wall, every back-wall
//! door in position order, and its right wall. Side doors share the vertex
//! of the wall they sit in. Consecutive vertices are joined by their
//! positional distance and every door pair by a fixed transition cost.
//!
//! `HouseGraph::shortest_path_distances` runs Dijkstra from every door and
//! every room midpoint. House graphs hold tens of vertices, so per-source
//! search is cheap.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use ordered_float::OrderedFloat;

use crate::error::GeometryError;
use crate::house::{House, WallType};

/// A wall or doorway vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphVertex {
    /// Room owning this vertex.
    pub room: usize,
    /// Position along the room axis.
    pub position: f64,
    /// Door located at this vertex, if any.
    pub door: Option<usize>,
    /// `(neighbor vertex, weight)` pairs.
    pub edges: Vec<(usize, f64)>,
}

/// Pre-built graph of a house, ready for shortest-path queries.
#[derive(Debug, Clone)]
pub struct HouseGraph {
    vertices: Vec<GraphVertex>,
    /// door id → vertex index
    door_vertex: Vec<usize>,
    /// room id → vertex indices in position order
    room_vertices: Vec<Vec<usize>>,
    room_centers: Vec<f64>,
}

impl HouseGraph {
    /// Build the graph. `door_transition_cost` is the weight of every door
    /// pair edge (walking speed × transition duration).
    pub fn build(house: &House, door_transition_cost: f64) -> Self {
        let mut vertices: Vec<GraphVertex> = Vec::new();
        let mut door_vertex = vec![usize::MAX; house.door_count()];
        let mut room_vertices = Vec::with_capacity(house.room_count());

        for room in house.rooms() {
            let mut left_door = None;
            let mut right_door = None;
            let mut back_doors = Vec::new();
            for &id in &room.doors {
                let door = &house.doors()[id];
                match door.wall {
                    WallType::Left => left_door = Some(id),
                    WallType::Right => right_door = Some(id),
                    WallType::Back => back_doors.push(id),
                }
            }

            let mut chain = Vec::with_capacity(back_doors.len() + 2);
            chain.push((room.left, left_door));
            for id in back_doors {
                chain.push((house.doors()[id].position, Some(id)));
            }
            chain.push((room.right, right_door));

            let first = vertices.len();
            let mut indices = Vec::with_capacity(chain.len());
            for (offset, (position, door)) in chain.into_iter().enumerate() {
                let index = first + offset;
                if let Some(id) = door {
                    door_vertex[id] = index;
                }
                vertices.push(GraphVertex {
                    room: room.id,
                    position,
                    door,
                    edges: Vec::new(),
                });
                indices.push(index);
            }
            for pair in indices.windows(2) {
                let weight = (vertices[pair[1]].position - vertices[pair[0]].position).abs();
                link(&mut vertices, pair[0], pair[1], weight);
            }
            room_vertices.push(indices);
        }

        for door in house.doors() {
            if door.id < door.connects_to {
                let a = door_vertex[door.id];
                let b = door_vertex[door.connects_to];
                link(&mut vertices, a, b, door_transition_cost);
            }
        }

        Self {
            vertices,
            door_vertex,
            room_vertices,
            room_centers: house.rooms().iter().map(|r| r.center()).collect(),
        }
    }

    /// Vertex index of `door`.
    pub fn vertex_for_door(&self, door: usize) -> usize {
        self.door_vertex[door]
    }

    pub fn vertices(&self) -> &[GraphVertex] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Vertices of `room` in position order, walls included.
    pub fn room_vertices(&self, room: usize) -> &[usize] {
        &self.room_vertices[room]
    }

    /// Whether every vertex can reach every other.
    pub fn is_connected(&self) -> bool {
        if self.vertices.is_empty() {
            return true;
        }
        let mut seen = vec![false; self.vertices.len()];
        let mut queue = VecDeque::from([0usize]);
        seen[0] = true;
        let mut reached = 1;
        while let Some(current) = queue.pop_front() {
            for &(next, _) in &self.vertices[current].edges {
                if !seen[next] {
                    seen[next] = true;
                    reached += 1;
                    queue.push_back(next);
                }
            }
        }
        reached == self.vertices.len()
    }

    /// All-pairs door and room walking distances.
    ///
    /// Room distances are measured between room midpoints. Fails with
    /// [`GeometryError::Disconnected`] if any pair is unreachable.
    pub fn shortest_path_distances(&self) -> Result<DistanceTables, GeometryError> {
        let door_count = self.door_vertex.len();
        let room_count = self.room_vertices.len();

        let mut door_door = vec![0.0; door_count * door_count];
        for a in 0..door_count {
            let dist = self.dijkstra(&[(self.door_vertex[a], 0.0)]);
            for b in 0..door_count {
                let d = dist[self.door_vertex[b]];
                if !d.is_finite() {
                    return Err(GeometryError::Disconnected {
                        from: format!("door #{a}"),
                        to: format!("door #{b}"),
                    });
                }
                door_door[a * door_count + b] = d;
            }
        }
        // Dijkstra sums in different orders per source; mirror the upper triangle.
        for a in 0..door_count {
            for b in (a + 1)..door_count {
                door_door[b * door_count + a] = door_door[a * door_count + b];
            }
        }

        let mut room_room = vec![0.0; room_count * room_count];
        for a in 0..room_count {
            let center = self.room_centers[a];
            let sources: Vec<(usize, f64)> = self.room_vertices[a]
                .iter()
                .map(|&v| (v, (self.vertices[v].position - center).abs()))
                .collect();
            let dist = self.dijkstra(&sources);
            for b in (a + 1)..room_count {
                let center_b = self.room_centers[b];
                let d = self.room_vertices[b]
                    .iter()
                    .map(|&v| dist[v] + (self.vertices[v].position - center_b).abs())
                    .fold(f64::INFINITY, f64::min);
                if !d.is_finite() {
                    return Err(GeometryError::Disconnected {
                        from: format!("room #{a}"),
                        to: format!("room #{b}"),
                    });
                }
                room_room[a * room_count + b] = d;
                room_room[b * room_count + a] = d;
            }
        }

        Ok(DistanceTables {
            door_count,
            room_count,
            door_door,
            room_room,
        })
    }

    fn dijkstra(&self, sources: &[(usize, f64)]) -> Vec<f64> {
        let mut dist = vec![f64::INFINITY; self.vertices.len()];
        let mut heap = BinaryHeap::new();
        for &(vertex, start) in sources {
            if start < dist[vertex] {
                dist[vertex] = start;
                heap.push(Reverse((OrderedFloat(start), vertex)));
            }
        }
        while let Some(Reverse((OrderedFloat(d), vertex))) = heap.pop() {
            if d > dist[vertex] {
                continue;
            }
            for &(next, weight) in &self.vertices[vertex].edges {
                let candidate = d + weight;
                if candidate < dist[next] {
                    dist[next] = candidate;
                    heap.push(Reverse((OrderedFloat(candidate), next)));
                }
            }
        }
        dist
    }
}

fn link(vertices: &mut [GraphVertex], a: usize, b: usize, weight: f64) {
    vertices[a].edges.push((b, weight));
    vertices[b].edges.push((a, weight));
}

/// Symmetric walking-distance matrices stored as flat row-major arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceTables {
    door_count: usize,
    room_count: usize,
    door_door: Vec<f64>,
    room_room: Vec<f64>,
}

impl DistanceTables {
    pub fn door_count(&self) -> usize {
        self.door_count
    }

    pub fn room_count(&self) -> usize {
        self.room_count
    }

    /// Walking distance between two doors.
    pub fn door_to_door(&self, a: usize, b: usize) -> f64 {
        self.door_door[a * self.door_count + b]
    }

    /// Walking distance between two room midpoints.
    pub fn room_to_room(&self, a: usize, b: usize) -> f64 {
        self.room_room[a * self.room_count + b]
    }
}
