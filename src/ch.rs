use super::{Route, VertexId, WeightedGraph};
use crate::{ContractionParameters, OrderingKind};

use log::info;
use rustc_hash::FxHashMap;

mod ordering;
mod preprocessor;
mod query;
mod storage;
mod unfolding;
mod witness;

pub use ordering::{EdgeDifference, HierarchicalOrdering, NodeWeightCalculator, SparseOrdering};
pub use preprocessor::{contract, Preprocessor, PreprocessorState, Shortcut};
pub use query::{DistanceTable, Router};
pub use witness::{DijkstraWitnessCalculator, WitnessCalculator};

type HashMap<K, V> = FxHashMap<K, V>;

#[derive(Copy, Clone)]
struct Edge {
    to: VertexId,
    weight: f32,
}

/// A fully contracted graph, ready for queries.
///
/// Besides the graph itself, which keeps every original edge and shortcut for
/// unpacking, the hierarchy holds the upward edges of each vertex: `forward_edges`
/// can be travelled from the vertex to a higher level, `backward_edges` from a
/// higher level into the vertex.
pub struct ContractionHierarchy {
    graph: WeightedGraph,
    forward_edges: Vec<Vec<Edge>>,
    backward_edges: Vec<Vec<Edge>>,
}

impl ContractionHierarchy {
    /// Contracts `graph` with the ordering selected in `parameters`.
    pub fn build(graph: WeightedGraph, parameters: &ContractionParameters) -> Self {
        let vertex_count = graph.vertex_count() as usize;
        let witness = DijkstraWitnessCalculator::new(vertex_count);
        let mut preprocessor = Preprocessor::new(graph, witness, parameters.clone());

        if parameters.sparse_first_pass {
            preprocessor.contract_while_below(&mut SparseOrdering, f32::MAX);
        }

        match parameters.ordering {
            OrderingKind::EdgeDifference => {
                preprocessor.contract_remaining(&mut EdgeDifference::new(parameters.max_settles))
            }
            OrderingKind::Hierarchical => preprocessor
                .contract_remaining(&mut HierarchicalOrdering::new(vertex_count, parameters)),
        }

        preprocessor.finish()
    }

    /// Freezes a graph whose vertices have all been contracted.
    pub(crate) fn from_graph(graph: WeightedGraph) -> Self {
        assert_eq!(
            graph.contracted_count(),
            graph.vertex_count(),
            "hierarchy requires every vertex to be contracted"
        );

        let level = |vertex: VertexId| graph.level(vertex).unwrap_or(u32::MAX);

        let mut forward_edges = Vec::with_capacity(graph.vertex_count() as usize);
        let mut backward_edges = Vec::with_capacity(graph.vertex_count() as usize);

        for vertex in 0..graph.vertex_count() {
            let upward = graph
                .edges(vertex)
                .iter()
                .filter(|edge| level(edge.neighbour) > level(vertex));

            forward_edges.push(
                upward
                    .clone()
                    .filter(|edge| edge.forward)
                    .map(|edge| Edge {
                        to: edge.neighbour,
                        weight: edge.weight,
                    })
                    .collect(),
            );
            backward_edges.push(
                upward
                    .filter(|edge| edge.backward)
                    .map(|edge| Edge {
                        to: edge.neighbour,
                        weight: edge.weight,
                    })
                    .collect(),
            );
        }

        info!(
            "hierarchy with {} vertices and {} shortcuts",
            graph.vertex_count(),
            shortcut_count(&graph)
        );

        Self {
            graph,
            forward_edges,
            backward_edges,
        }
    }

    pub fn distance(&self, start: VertexId, target: VertexId) -> Option<f32> {
        Router::new(self).distance(start, target)
    }

    pub fn route(&self, start: VertexId, target: VertexId) -> Option<Route> {
        Router::new(self).route(start, target)
    }

    pub fn many_to_many(&self, sources: &[VertexId], targets: &[VertexId]) -> DistanceTable {
        Router::new(self).many_to_many(sources, targets)
    }

    pub fn vertex_count(&self) -> u32 {
        self.graph.vertex_count()
    }

    pub fn graph(&self) -> &WeightedGraph {
        &self.graph
    }

    pub fn level(&self, vertex: VertexId) -> u32 {
        self.graph.level(vertex).unwrap_or(u32::MAX)
    }

    pub fn shortcut_count(&self) -> usize {
        shortcut_count(&self.graph)
    }

    /// Expands the edge `from -> to` into the original vertices it stands for.
    pub fn unpack(&self, from: VertexId, to: VertexId) -> Vec<VertexId> {
        let mut path = vec![from];
        unfolding::unfold_edge(&self.graph, from, to, &mut path);
        path
    }
}

fn shortcut_count(graph: &WeightedGraph) -> usize {
    (0..graph.vertex_count())
        .map(|vertex| graph.edges(vertex).iter().filter(|e| e.is_shortcut()).count())
        .sum::<usize>()
        / 2
}
