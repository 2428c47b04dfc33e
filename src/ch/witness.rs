use rustc_hash::FxHashSet;

use crate::{MinHeap, VertexId, WeightedGraph};

/// Decides whether a shortcut `from -> via -> to` is superfluous.
pub trait WitnessCalculator {
    /// Returns `true` only if the active graph contains a path `from -> to`
    /// avoiding `via` with weight at most `max_weight`. Gives up and returns
    /// `false` once `max_settles` vertices have been settled.
    fn exists(
        &mut self,
        graph: &WeightedGraph,
        from: VertexId,
        to: VertexId,
        via: VertexId,
        max_weight: f32,
        max_settles: usize,
    ) -> bool;
}

/// Witness search as a bounded one-to-one Dijkstra on the uncontracted graph.
pub struct DijkstraWitnessCalculator {
    heap: MinHeap,
    settled: FxHashSet<VertexId>,
}

impl DijkstraWitnessCalculator {
    pub fn new(vertex_count: usize) -> Self {
        Self {
            heap: MinHeap::new(vertex_count),
            settled: FxHashSet::default(),
        }
    }
}

impl WitnessCalculator for DijkstraWitnessCalculator {
    fn exists(
        &mut self,
        graph: &WeightedGraph,
        from: VertexId,
        to: VertexId,
        via: VertexId,
        max_weight: f32,
        max_settles: usize,
    ) -> bool {
        if from == to {
            return true;
        }

        if self.heap.capacity() < graph.vertex_count() as usize {
            self.heap = MinHeap::new(graph.vertex_count() as usize);
        }
        self.heap.clear();
        self.settled.clear();

        // `via` counts as settled so it is never entered.
        self.settled.insert(via);
        self.heap.push(from, 0.0);

        let mut settles = 0;

        while let Some(entry) = self.heap.pop() {
            if entry.weight > max_weight {
                return false;
            }

            if entry.vertex == to {
                return true;
            }

            self.settled.insert(entry.vertex);
            settles += 1;
            if settles >= max_settles {
                return false;
            }

            for edge in graph.active_edges(entry.vertex) {
                if !edge.forward || self.settled.contains(&edge.neighbour) {
                    continue;
                }

                let weight = entry.weight + edge.weight;
                if weight <= max_weight {
                    self.heap.push_or_decrease(edge.neighbour, weight);
                }
            }
        }

        false
    }
}
