mod ch;
mod config;
mod error;
mod graph;
mod heap;
mod route;

#[cfg(test)]
mod testing;

pub use ch::{
    contract, ContractionHierarchy, DijkstraWitnessCalculator, DistanceTable, EdgeDifference,
    HierarchicalOrdering, NodeWeightCalculator, Preprocessor, PreprocessorState, Router, Shortcut,
    SparseOrdering, WitnessCalculator,
};
pub use config::{ContractionParameters, OrderingKind};
pub use error::StoreError;
pub use graph::{ChEdge, DuplicatePolicy, WeightedGraph, NO_TAGS};
pub use heap::{HeapEntry, MinHeap};
pub use route::Route;

pub type VertexId = u32;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Coordinate {
    pub lat: f32,
    pub lon: f32,
}

impl Coordinate {
    pub fn new(lat: f32, lon: f32) -> Self {
        Self { lat, lon }
    }
}

/// A directed edge as handed over by the ingestion layer.
///
/// `forward` allows travel `from -> to`, `backward` allows `to -> from`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Edge {
    pub from: VertexId,
    pub to: VertexId,
    pub weight: f32,
    pub forward: bool,
    pub backward: bool,
}

impl Edge {
    pub fn one_way(from: VertexId, to: VertexId, weight: f32) -> Self {
        Self {
            from,
            to,
            weight,
            forward: true,
            backward: false,
        }
    }

    pub fn two_way(from: VertexId, to: VertexId, weight: f32) -> Self {
        Self {
            from,
            to,
            weight,
            forward: true,
            backward: true,
        }
    }
}
