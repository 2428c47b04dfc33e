use crate::{Coordinate, Edge, VertexId};

/// Tags reference used for edges that carry no profile data, e.g. shortcuts.
pub const NO_TAGS: u32 = 0;

/// An edge as stored in the adjacency list of one of its endpoints.
///
/// `forward` allows travel from the owning vertex to `neighbour`, `backward`
/// allows travel from `neighbour` to the owning vertex. Every edge is stored at
/// both endpoints with the flags mirrored.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ChEdge {
    pub neighbour: VertexId,
    pub weight: f32,
    pub forward: bool,
    pub backward: bool,
    /// The contracted vertex this shortcut bypasses, `None` for original edges.
    pub contracted_via: Option<VertexId>,
    pub tags: u32,
}

impl ChEdge {
    pub fn is_shortcut(&self) -> bool {
        self.contracted_via.is_some()
    }

    fn mirrored(self, owner: VertexId) -> Self {
        Self {
            neighbour: owner,
            forward: self.backward,
            backward: self.forward,
            ..self
        }
    }
}

/// What happens when an edge is added between a pair that is already connected.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Per direction only the lowest weight edge survives.
    #[default]
    KeepMinimum,
    /// Every added edge is stored.
    Coexist,
}

/// Arena storage for the road graph and, during preprocessing, its hierarchy.
///
/// Vertices are never removed; contraction only marks them with a level.
/// `edges` keeps every record for unpacking and storage, `active` only those
/// between uncontracted vertices.
#[derive(Clone, Debug, Default)]
pub struct WeightedGraph {
    vertices: Vec<Coordinate>,
    edges: Vec<Vec<ChEdge>>,
    active: Vec<Vec<ChEdge>>,
    levels: Vec<Option<u32>>,
    contracted: u32,
    policy: DuplicatePolicy,
}

impl WeightedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn from_edges(vertices: &[Coordinate], edges: &[Edge]) -> Self {
        let mut graph = Self::new();
        for vertex in vertices {
            graph.add_vertex(vertex.lat, vertex.lon);
        }
        for edge in edges {
            graph.add_edge(
                edge.from,
                edge.to,
                edge.weight,
                edge.forward,
                edge.backward,
                None,
            );
        }
        graph
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    pub fn add_vertex(&mut self, lat: f32, lon: f32) -> VertexId {
        let id = self.vertices.len() as VertexId;
        self.vertices.push(Coordinate { lat, lon });
        self.edges.push(vec![]);
        self.active.push(vec![]);
        self.levels.push(None);
        id
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    pub fn contains(&self, vertex: VertexId) -> bool {
        (vertex as usize) < self.vertices.len()
    }

    pub fn vertex(&self, vertex: VertexId) -> Coordinate {
        self.check(vertex);
        self.vertices[vertex as usize]
    }

    pub fn vertices(&self) -> &[Coordinate] {
        &self.vertices
    }

    /// Number of stored edges, counting each edge once rather than per endpoint.
    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(Vec::len).sum::<usize>() / 2
    }

    pub fn add_edge(
        &mut self,
        from: VertexId,
        to: VertexId,
        weight: f32,
        forward: bool,
        backward: bool,
        contracted_via: Option<VertexId>,
    ) {
        self.add_edge_with_tags(from, to, weight, forward, backward, contracted_via, NO_TAGS)
    }

    /// Self-loops and edges without any traversable direction are dropped, they
    /// can never be part of a shortest path.
    #[allow(clippy::too_many_arguments)]
    pub fn add_edge_with_tags(
        &mut self,
        from: VertexId,
        to: VertexId,
        weight: f32,
        forward: bool,
        backward: bool,
        contracted_via: Option<VertexId>,
        tags: u32,
    ) {
        self.check(from);
        self.check(to);
        assert!(
            weight >= 0.0,
            "edge {from} -> {to} has invalid weight {weight}"
        );

        if from == to || !(forward || backward) {
            return;
        }

        let edge = ChEdge {
            neighbour: to,
            weight,
            forward,
            backward,
            contracted_via,
            tags,
        };

        match self.policy {
            DuplicatePolicy::Coexist => {
                self.edges[from as usize].push(edge);
                self.edges[to as usize].push(edge.mirrored(from));
                if self.is_active_pair(from, to) {
                    self.active[from as usize].push(edge);
                    self.active[to as usize].push(edge.mirrored(from));
                }
            }
            DuplicatePolicy::KeepMinimum => {
                if forward {
                    self.merge(from, ChEdge { backward: false, ..edge });
                }
                if backward {
                    self.merge(from, ChEdge { forward: false, ..edge });
                }
            }
        }
    }

    /// Both endpoints hold mirrored copies, so the same decision is taken on
    /// each side.
    fn merge(&mut self, from: VertexId, edge: ChEdge) {
        let to = edge.neighbour;
        if merge_directed(&mut self.edges[from as usize], edge) {
            let mirrored = merge_directed(&mut self.edges[to as usize], edge.mirrored(from));
            debug_assert!(mirrored, "adjacency of {from} and {to} out of sync");

            // Merging only looks at records of the same pair, so the active
            // lists reach the same decision.
            if self.is_active_pair(from, to) {
                merge_directed(&mut self.active[from as usize], edge);
                merge_directed(&mut self.active[to as usize], edge.mirrored(from));
            }
        }
    }

    fn is_active_pair(&self, from: VertexId, to: VertexId) -> bool {
        !self.is_contracted(from) && !self.is_contracted(to)
    }

    /// Panics for ids outside the graph; a valid isolated vertex yields an
    /// empty slice.
    pub fn edges(&self, vertex: VertexId) -> &[ChEdge] {
        self.check(vertex);
        &self.edges[vertex as usize]
    }

    /// Edges of `vertex` whose neighbour is still part of the active graph.
    ///
    /// Runs in the active degree of `vertex`: records towards contracted
    /// neighbours are pruned when those neighbours are contracted.
    pub fn active_edges(&self, vertex: VertexId) -> impl Iterator<Item = &ChEdge> + '_ {
        self.check(vertex);
        self.active[vertex as usize]
            .iter()
            .filter(|edge| !self.is_contracted(edge.neighbour))
    }

    /// The lowest weight edge that can be travelled from `from` to `to`.
    pub fn forward_edge(&self, from: VertexId, to: VertexId) -> Option<&ChEdge> {
        self.edges(from)
            .iter()
            .filter(|edge| edge.neighbour == to && edge.forward)
            .min_by(|a, b| a.weight.total_cmp(&b.weight))
    }

    /// Removes the direction `from -> to`, returning whether it existed.
    ///
    /// Records that still allow `to -> from` are kept with only that flag.
    pub fn remove_edge(&mut self, from: VertexId, to: VertexId) -> bool {
        if self.forward_edge(from, to).is_none() {
            self.check(to);
            return false;
        }

        for edges in [&mut self.edges, &mut self.active] {
            clear_direction(&mut edges[from as usize], to, true);
            clear_direction(&mut edges[to as usize], from, false);
        }

        true
    }

    pub fn is_contracted(&self, vertex: VertexId) -> bool {
        self.level(vertex).is_some()
    }

    pub fn level(&self, vertex: VertexId) -> Option<u32> {
        self.check(vertex);
        self.levels[vertex as usize]
    }

    pub fn contracted_count(&self) -> u32 {
        self.contracted
    }

    /// Takes `vertex` out of the active graph. Its own records stay in place.
    pub fn mark_contracted(&mut self, vertex: VertexId, level: u32) {
        assert!(
            !self.is_contracted(vertex),
            "vertex {vertex} is already contracted"
        );
        self.levels[vertex as usize] = Some(level);
        self.contracted += 1;

        let mut neighbours: Vec<_> = self.active[vertex as usize]
            .iter()
            .map(|edge| edge.neighbour)
            .collect();
        neighbours.sort_unstable();
        neighbours.dedup();

        for neighbour in neighbours {
            self.active[neighbour as usize].retain(|edge| edge.neighbour != vertex);
        }
    }

    /// Appends a stored edge verbatim, without mirroring or merging.
    ///
    /// Used to restore finished hierarchies, so the record never joins the
    /// active graph.
    pub(crate) fn push_raw(&mut self, vertex: VertexId, edge: ChEdge) {
        self.check(vertex);
        self.check(edge.neighbour);
        self.edges[vertex as usize].push(edge);
    }

    fn check(&self, vertex: VertexId) {
        assert!(
            self.contains(vertex),
            "vertex {vertex} out of range, graph has {} vertices",
            self.vertices.len()
        );
    }
}

/// Clears `forward` (or `backward`) on all records towards `neighbour` and
/// drops the records left without a direction.
fn clear_direction(edges: &mut Vec<ChEdge>, neighbour: VertexId, forward: bool) {
    for edge in edges.iter_mut().filter(|edge| edge.neighbour == neighbour) {
        if forward {
            edge.forward = false;
        } else {
            edge.backward = false;
        }
    }
    edges.retain(|edge| edge.forward || edge.backward);
}

/// Merges an edge with exactly one direction flag set into `edges`.
///
/// Returns `false` if an edge at least as good already covers that direction.
fn merge_directed(edges: &mut Vec<ChEdge>, edge: ChEdge) -> bool {
    let covers = |other: &ChEdge| {
        other.neighbour == edge.neighbour
            && ((edge.forward && other.forward) || (edge.backward && other.backward))
    };

    if edges
        .iter()
        .any(|other| covers(other) && other.weight <= edge.weight)
    {
        return false;
    }

    for other in edges.iter_mut().filter(|other| covers(other)) {
        other.forward &= !edge.forward;
        other.backward &= !edge.backward;
    }
    edges.retain(|other| other.forward || other.backward);

    let same = edges.iter_mut().find(|other| {
        other.neighbour == edge.neighbour
            && other.weight == edge.weight
            && other.contracted_via == edge.contracted_via
            && other.tags == edge.tags
    });

    match same {
        Some(other) => {
            other.forward |= edge.forward;
            other.backward |= edge.backward;
        }
        None => edges.push(edge),
    }

    true
}
