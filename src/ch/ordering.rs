use crate::{ContractionParameters, VertexId, WeightedGraph};

use super::{preprocessor::required_shortcuts, WitnessCalculator};

/// Assigns each remaining vertex a contraction priority; lower is contracted
/// sooner.
pub trait NodeWeightCalculator {
    /// Must not change any state observable by later calls.
    fn calculate(
        &self,
        graph: &WeightedGraph,
        witness: &mut dyn WitnessCalculator,
        vertex: VertexId,
    ) -> f32;

    /// Called right after `vertex` was marked contracted.
    fn notify_contracted(&mut self, graph: &WeightedGraph, vertex: VertexId);
}

/// Shortcuts added minus edges removed.
#[derive(Copy, Clone, Debug)]
pub struct EdgeDifference {
    max_settles: usize,
}

impl EdgeDifference {
    pub fn new(max_settles: usize) -> Self {
        Self { max_settles }
    }
}

impl NodeWeightCalculator for EdgeDifference {
    fn calculate(
        &self,
        graph: &WeightedGraph,
        witness: &mut dyn WitnessCalculator,
        vertex: VertexId,
    ) -> f32 {
        let added = required_shortcuts(graph, witness, vertex, self.max_settles).len();
        let removed = graph.active_edges(vertex).count();
        added as f32 - removed as f32
    }

    fn notify_contracted(&mut self, _graph: &WeightedGraph, _vertex: VertexId) {}
}

/// Cheap first pass: only vertices that merely connect two neighbours are
/// eligible, everything else is deferred with `f32::MAX`.
#[derive(Copy, Clone, Debug, Default)]
pub struct SparseOrdering;

impl NodeWeightCalculator for SparseOrdering {
    fn calculate(
        &self,
        graph: &WeightedGraph,
        _witness: &mut dyn WitnessCalculator,
        vertex: VertexId,
    ) -> f32 {
        let mut edges = graph.active_edges(vertex);
        match (edges.next(), edges.next(), edges.next()) {
            (Some(a), Some(b), None) if a.neighbour != b.neighbour => -1.0,
            _ => f32::MAX,
        }
    }

    fn notify_contracted(&mut self, _graph: &WeightedGraph, _vertex: VertexId) {}
}

/// Edge difference combined with the number of already contracted neighbours
/// and the depth of the vertex in the hierarchy built so far.
///
/// Both extra terms grow around regions that were contracted recently, which
/// spreads contraction uniformly over the graph and keeps hubs for last.
#[derive(Clone, Debug)]
pub struct HierarchicalOrdering {
    edge_difference: EdgeDifference,
    edge_difference_weight: f32,
    contracted_neighbours_weight: f32,
    depth_weight: f32,
    contracted_neighbours: Vec<u32>,
    depth: Vec<u32>,
}

impl HierarchicalOrdering {
    pub fn new(vertex_count: usize, parameters: &ContractionParameters) -> Self {
        Self {
            edge_difference: EdgeDifference::new(parameters.max_settles),
            edge_difference_weight: parameters.edge_difference_weight,
            contracted_neighbours_weight: parameters.contracted_neighbours_weight,
            depth_weight: parameters.depth_weight,
            contracted_neighbours: vec![0; vertex_count],
            depth: vec![0; vertex_count],
        }
    }

    pub fn depth(&self, vertex: VertexId) -> u32 {
        self.depth[vertex as usize]
    }

    pub fn contracted_neighbours(&self, vertex: VertexId) -> u32 {
        self.contracted_neighbours[vertex as usize]
    }
}

impl NodeWeightCalculator for HierarchicalOrdering {
    fn calculate(
        &self,
        graph: &WeightedGraph,
        witness: &mut dyn WitnessCalculator,
        vertex: VertexId,
    ) -> f32 {
        let edge_difference = self.edge_difference.calculate(graph, witness, vertex);
        self.edge_difference_weight * edge_difference
            + self.contracted_neighbours_weight * self.contracted_neighbours(vertex) as f32
            + self.depth_weight * self.depth(vertex) as f32
    }

    fn notify_contracted(&mut self, graph: &WeightedGraph, vertex: VertexId) {
        let mut neighbours: Vec<_> = graph.active_edges(vertex).map(|e| e.neighbour).collect();
        neighbours.sort_unstable();
        neighbours.dedup();

        let depth = self.depth[vertex as usize] + 1;
        for neighbour in neighbours {
            let neighbour = neighbour as usize;
            self.contracted_neighbours[neighbour] += 1;
            self.depth[neighbour] = self.depth[neighbour].max(depth);
        }
    }
}
