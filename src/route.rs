use geo::{Distance, Haversine, Point};
use log::debug;

use crate::{ContractionHierarchy, Coordinate, Router, VertexId, WeightedGraph};

/// An unpacked shortest path.
#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    pub path: Vec<VertexId>,
    /// Sum of the edge weights along `path`.
    pub weight: f32,
    /// Great circle length of `path` in metres.
    pub distance: f64,
}

fn point(coordinate: Coordinate) -> Point<f64> {
    Point::new(coordinate.lon as f64, coordinate.lat as f64)
}

fn haversine(a: Coordinate, b: Coordinate) -> f64 {
    Haversine.distance(point(a), point(b))
}

fn path_length(graph: &WeightedGraph, path: &[VertexId]) -> f64 {
    path.windows(2)
        .map(|pair| haversine(graph.vertex(pair[0]), graph.vertex(pair[1])))
        .sum()
}

impl ContractionHierarchy {
    /// The vertex closest to `coordinate`, `None` for an empty hierarchy.
    pub fn nearest_vertex(&self, coordinate: Coordinate) -> Option<VertexId> {
        self.graph()
            .vertices()
            .iter()
            .map(|&vertex| haversine(vertex, coordinate))
            .enumerate()
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(vertex, _)| vertex as VertexId)
    }
}

impl Router<'_> {
    pub fn route(&mut self, start: VertexId, target: VertexId) -> Option<Route> {
        let (path, weight) = self.calculate_shortest_path(start, target)?;
        let distance = path_length(self.hierarchy().graph(), &path);

        Some(Route {
            path,
            weight,
            distance,
        })
    }

    /// Routes between the vertices nearest to two coordinates.
    pub fn route_between(&mut self, from: Coordinate, to: Coordinate) -> Option<Route> {
        let ch = self.hierarchy();
        let start = ch.nearest_vertex(from)?;
        let target = ch.nearest_vertex(to)?;
        debug!("snapped {from:?} to {start} and {to:?} to {target}");

        self.route(start, target)
    }
}
