use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;

use crate::{HeapEntry, MinHeap, VertexId};

use super::{unfolding::unfold_edge, ContractionHierarchy, HashMap};

struct SettledEntry {
    vertex: VertexId,
    weight: f32,
    previous: Option<usize>,
}

/// One side of a search: the queue plus everything needed to walk back from a
/// settled vertex to the start.
struct Frontier {
    queue: MinHeap,
    predecessors: HashMap<VertexId, VertexId>,
    settled: HashMap<VertexId, usize>,
    entries: Vec<SettledEntry>,
}

impl Frontier {
    fn new(vertex_count: usize) -> Self {
        Self {
            queue: MinHeap::new(vertex_count),
            predecessors: HashMap::default(),
            settled: HashMap::default(),
            entries: vec![],
        }
    }

    fn reset(&mut self, start: VertexId) {
        self.queue.clear();
        self.predecessors.clear();
        self.settled.clear();
        self.entries.clear();
        self.queue.push(start, 0.0);
    }

    fn min_key(&self) -> Option<f32> {
        self.queue.peek().map(|entry| entry.weight)
    }

    fn settled_weight(&self, vertex: VertexId) -> Option<f32> {
        self.settled
            .get(&vertex)
            .map(|&index| self.entries[index].weight)
    }

    /// Settles the closest queued vertex and relaxes the edges `neighbours`
    /// yields for it.
    fn settle_next<F, I>(&mut self, neighbours: F) -> Option<HeapEntry>
    where
        F: Fn(VertexId) -> I,
        I: IntoIterator<Item = (VertexId, f32)>,
    {
        let entry = self.queue.pop()?;

        let previous = self
            .predecessors
            .get(&entry.vertex)
            .and_then(|predecessor| self.settled.get(predecessor))
            .copied();
        self.settled.insert(entry.vertex, self.entries.len());
        self.entries.push(SettledEntry {
            vertex: entry.vertex,
            weight: entry.weight,
            previous,
        });

        for (to, weight) in neighbours(entry.vertex) {
            if self.settled.contains_key(&to) {
                continue;
            }

            if self.queue.push_or_decrease(to, entry.weight + weight) {
                self.predecessors.insert(to, entry.vertex);
            }
        }

        Some(entry)
    }

    /// Vertices from `vertex` back to the start of the search.
    fn chain(&self, vertex: VertexId) -> Vec<VertexId> {
        let mut chain = vec![];
        let mut next = self.settled.get(&vertex).copied();

        while let Some(index) = next {
            chain.push(self.entries[index].vertex);
            next = self.entries[index].previous;
        }

        chain
    }
}

/// Answers queries on a [`ContractionHierarchy`].
///
/// A router holds the scratch space of its searches, so it needs `&mut self`
/// for every query. Run one router per thread to query a hierarchy
/// concurrently.
pub struct Router<'ch> {
    ch: &'ch ContractionHierarchy,
    forward: Frontier,
    backward: Frontier,
    cancelled: Option<&'ch AtomicBool>,
}

impl<'ch> Router<'ch> {
    pub fn new(ch: &'ch ContractionHierarchy) -> Self {
        let vertex_count = ch.vertex_count() as usize;
        Self {
            ch,
            forward: Frontier::new(vertex_count),
            backward: Frontier::new(vertex_count),
            cancelled: None,
        }
    }

    /// Queries return no result as soon as `cancelled` is set.
    pub fn with_cancellation(ch: &'ch ContractionHierarchy, cancelled: &'ch AtomicBool) -> Self {
        Self {
            cancelled: Some(cancelled),
            ..Self::new(ch)
        }
    }

    pub fn hierarchy(&self) -> &'ch ContractionHierarchy {
        self.ch
    }

    pub fn distance(&mut self, start: VertexId, target: VertexId) -> Option<f32> {
        self.bidirectional_dijkstra(start, target)
            .map(|(_, weight)| weight)
    }

    /// The unpacked shortest path from `start` to `target` and its weight.
    pub fn calculate_shortest_path(
        &mut self,
        start: VertexId,
        target: VertexId,
    ) -> Option<(Vec<VertexId>, f32)> {
        let (meeting, weight) = self.bidirectional_dijkstra(start, target)?;
        Some((self.unpack(meeting), weight))
    }

    /// Distances from every source to every target. Pairs searched after
    /// the router was cancelled have no distance.
    pub fn many_to_many(&mut self, sources: &[VertexId], targets: &[VertexId]) -> DistanceTable {
        let forward_meeting_nodes = sources
            .iter()
            .map(|&source| self.search_space(source, true))
            .collect();
        let backward_meeting_nodes = targets
            .iter()
            .map(|&target| self.search_space(target, false))
            .collect();

        DistanceTable {
            forward_meeting_nodes,
            backward_meeting_nodes,
        }
    }

    pub fn one_to_many(&mut self, source: VertexId, targets: &[VertexId]) -> Vec<Option<f32>> {
        self.many_to_many(&[source], targets)
            .rows()
            .into_iter()
            .next()
            .unwrap_or_default()
    }

    /// Whether at least `min_settle_count` vertices are reachable from `vertex`
    /// in the original graph.
    ///
    /// Used to spot vertices stuck in tiny islands, e.g. before snapping a
    /// coordinate to them.
    pub fn check_connectivity(&mut self, vertex: VertexId, min_settle_count: usize) -> bool {
        self.check(vertex);
        if min_settle_count == 0 {
            return true;
        }

        let ch = self.ch;
        let graph = ch.graph();
        self.forward.reset(vertex);

        let mut settles = 0;
        while self
            .forward
            .settle_next(|v| {
                graph
                    .edges(v)
                    .iter()
                    .filter(|edge| edge.forward)
                    .map(|edge| (edge.neighbour, edge.weight))
            })
            .is_some()
        {
            settles += 1;
            if settles >= min_settle_count {
                return true;
            }

            if self.is_cancelled() {
                return false;
            }
        }

        false
    }

    fn bidirectional_dijkstra(
        &mut self,
        start: VertexId,
        target: VertexId,
    ) -> Option<(VertexId, f32)> {
        self.check(start);
        self.check(target);

        let ch = self.ch;
        self.forward.reset(start);
        self.backward.reset(target);

        let mut best_weight = f32::INFINITY;
        let mut best_meeting_node = None;
        let mut forward_turn = true;

        loop {
            if self.is_cancelled() {
                debug!("query {start} -> {target} cancelled");
                return None;
            }

            // A side whose closest vertex is already worse than the best
            // meeting cannot improve it any more.
            let forward_open = self.forward.min_key().is_some_and(|key| key <= best_weight);
            let backward_open = self.backward.min_key().is_some_and(|key| key <= best_weight);

            let forward = match (forward_open, backward_open) {
                (false, false) => break,
                (true, false) => true,
                (false, true) => false,
                (true, true) => forward_turn,
            };
            forward_turn = !forward;

            let (settled, opposite) = if forward {
                let settled = self.forward.settle_next(|v| {
                    ch.forward_edges[v as usize]
                        .iter()
                        .map(|edge| (edge.to, edge.weight))
                });
                (settled, &self.backward)
            } else {
                let settled = self.backward.settle_next(|v| {
                    ch.backward_edges[v as usize]
                        .iter()
                        .map(|edge| (edge.to, edge.weight))
                });
                (settled, &self.forward)
            };

            let Some(HeapEntry { vertex, weight }) = settled else {
                continue;
            };

            if let Some(opposite_weight) = opposite.settled_weight(vertex) {
                let total_weight = weight + opposite_weight;
                if total_weight < best_weight {
                    best_weight = total_weight;
                    best_meeting_node = Some(vertex);
                }
            }
        }

        best_meeting_node.map(|vertex| (vertex, best_weight))
    }

    fn unpack(&self, meeting_node: VertexId) -> Vec<VertexId> {
        let graph = self.ch.graph();

        let mut upward = self.forward.chain(meeting_node);
        upward.reverse();
        let downward = self.backward.chain(meeting_node);

        let mut path = vec![upward[0]];
        for pair in upward.windows(2).chain(downward.windows(2)) {
            unfold_edge(graph, pair[0], pair[1], &mut path);
        }

        path
    }

    /// Every vertex reachable from `start` on upward edges, sorted by id.
    /// Empty once the router is cancelled.
    fn search_space(&mut self, start: VertexId, forward: bool) -> Vec<MeetingNode> {
        self.check(start);

        let ch = self.ch;
        let cancelled = self.cancelled;
        let (frontier, edges) = if forward {
            (&mut self.forward, &ch.forward_edges)
        } else {
            (&mut self.backward, &ch.backward_edges)
        };
        frontier.reset(start);

        let mut settled = vec![];
        while let Some(HeapEntry { vertex, weight }) = frontier.settle_next(|v| {
            edges[v as usize]
                .iter()
                .map(|edge| (edge.to, edge.weight))
        }) {
            if cancelled.is_some_and(|cancelled| cancelled.load(Ordering::Relaxed)) {
                debug!("search space of {start} cancelled");
                return vec![];
            }

            settled.push(MeetingNode { vertex, weight });
        }

        settled.sort_by_key(|node| node.vertex);
        settled
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled
            .is_some_and(|cancelled| cancelled.load(Ordering::Relaxed))
    }

    fn check(&self, vertex: VertexId) {
        assert!(
            vertex < self.ch.vertex_count(),
            "vertex {vertex} out of range, hierarchy has {} vertices",
            self.ch.vertex_count()
        );
    }
}

/// Distances between every source and every target of a
/// [`Router::many_to_many`] query.
///
/// Only the upward search spaces are stored; each distance is found by
/// merging the space of its source with the space of its target.
pub struct DistanceTable {
    forward_meeting_nodes: Vec<Vec<MeetingNode>>,
    backward_meeting_nodes: Vec<Vec<MeetingNode>>,
}

struct MeetingNode {
    vertex: VertexId,
    weight: f32,
}

impl DistanceTable {
    /// Distance from the `source`-th source to the `target`-th target.
    pub fn weight(&self, source: usize, target: usize) -> Option<f32> {
        let forward_nodes = &self.forward_meeting_nodes[source];
        let backward_nodes = &self.backward_meeting_nodes[target];

        let mut i = 0;
        let mut j = 0;

        let mut min_weight = f32::INFINITY;
        let mut found = false;

        while i < forward_nodes.len() && j < backward_nodes.len() {
            let forward = &forward_nodes[i];
            let backward = &backward_nodes[j];

            if forward.vertex == backward.vertex {
                i += 1;
                j += 1;

                min_weight = min_weight.min(forward.weight + backward.weight);
                found = true;
            } else if forward.vertex < backward.vertex {
                i += 1;
            } else {
                j += 1;
            }
        }

        found.then_some(min_weight)
    }

    pub fn source_count(&self) -> usize {
        self.forward_meeting_nodes.len()
    }

    pub fn target_count(&self) -> usize {
        self.backward_meeting_nodes.len()
    }

    /// The full matrix, one row per source.
    pub fn rows(&self) -> Vec<Vec<Option<f32>>> {
        (0..self.source_count())
            .map(|source| {
                (0..self.target_count())
                    .map(|target| self.weight(source, target))
                    .collect()
            })
            .collect()
    }
}
