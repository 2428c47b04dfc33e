//! Graphs and a plain Dijkstra shared by the unit tests.

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{Coordinate, Edge, VertexId, WeightedGraph};

pub fn coordinates(count: u32) -> Vec<Coordinate> {
    (0..count)
        .map(|i| Coordinate::new(52.0 + i as f32 * 0.001, 13.0))
        .collect()
}

/// The one-way sample network used throughout the query tests.
pub fn sample_edges() -> Vec<Edge> {
    [
        (0, 3, 2.0),
        (1, 2, 1.6),
        (1, 4, 2.5),
        (2, 0, 1.3),
        (2, 3, 1.7),
        (2, 4, 1.5),
        (3, 0, 2.0),
        (3, 5, 1.3),
        (3, 2, 1.7),
        (4, 5, 1.2),
        (4, 1, 2.5),
        (5, 6, 1.9),
        (5, 7, 1.2),
        (5, 3, 1.3),
        (5, 4, 1.2),
        (6, 3, 3.2),
        (6, 5, 1.9),
        (7, 4, 3.0),
    ]
    .into_iter()
    .map(|(from, to, weight)| Edge::one_way(from, to, weight))
    .collect()
}

pub fn sample_graph() -> WeightedGraph {
    WeightedGraph::from_edges(&coordinates(8), &sample_edges())
}

/// Random network with integral weights so that sums are exact in `f32`.
pub fn random_edges(seed: u64, vertices: u32, edges: usize) -> Vec<Edge> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..edges)
        .map(|_| {
            let from = rng.gen_range(0..vertices);
            let to = rng.gen_range(0..vertices);
            let weight = rng.gen_range(0..=20) as f32;
            match rng.gen_range(0..3) {
                0 => Edge::one_way(from, to, weight),
                1 => Edge::one_way(to, from, weight),
                _ => Edge::two_way(from, to, weight),
            }
        })
        .collect()
}

/// Textbook `O(n²)` Dijkstra over the ingestion edges.
pub fn reference_distance(
    vertices: u32,
    edges: &[Edge],
    from: VertexId,
    to: VertexId,
) -> Option<f32> {
    let n = vertices as usize;
    let mut arcs = vec![vec![]; n];
    for edge in edges {
        if edge.forward {
            arcs[edge.from as usize].push((edge.to, edge.weight));
        }
        if edge.backward {
            arcs[edge.to as usize].push((edge.from, edge.weight));
        }
    }

    let mut distance = vec![f32::INFINITY; n];
    let mut done = vec![false; n];
    distance[from as usize] = 0.0;

    loop {
        let next = (0..n)
            .filter(|&v| !done[v] && distance[v].is_finite())
            .min_by(|&a, &b| distance[a].total_cmp(&distance[b]))?;

        if next == to as usize {
            return Some(distance[next]);
        }
        done[next] = true;

        for &(head, weight) in &arcs[next] {
            let candidate = distance[next] + weight;
            if candidate < distance[head as usize] {
                distance[head as usize] = candidate;
            }
        }
    }
}
