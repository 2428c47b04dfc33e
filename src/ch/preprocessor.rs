use log::{debug, info, trace};
use rustc_hash::FxHashMap;

use crate::{ContractionParameters, HeapEntry, MinHeap, VertexId, WeightedGraph};

use super::{ContractionHierarchy, NodeWeightCalculator, WitnessCalculator};

/// A shortcut `from -> to` replacing the path through the contracted `via`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Shortcut {
    pub from: VertexId,
    pub to: VertexId,
    pub via: VertexId,
    pub weight: f32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PreprocessorState {
    Ready,
    Contracting,
    Done,
}

/// Shortcuts needed to preserve all shortest paths through `vertex` if it were
/// contracted now.
///
/// Every pair of an incoming neighbour `u` and an outgoing neighbour `w != u`
/// is checked separately, so a two-way road yields one shortcut per direction.
pub(crate) fn required_shortcuts(
    graph: &WeightedGraph,
    witness: &mut dyn WitnessCalculator,
    vertex: VertexId,
    max_settles: usize,
) -> Vec<Shortcut> {
    let mut incoming = FxHashMap::default();
    let mut outgoing = FxHashMap::default();

    for edge in graph.active_edges(vertex) {
        if edge.backward {
            let weight = incoming.entry(edge.neighbour).or_insert(edge.weight);
            *weight = weight.min(edge.weight);
        }
        if edge.forward {
            let weight = outgoing.entry(edge.neighbour).or_insert(edge.weight);
            *weight = weight.min(edge.weight);
        }
    }

    let mut incoming: Vec<(VertexId, f32)> = incoming.into_iter().collect();
    let mut outgoing: Vec<(VertexId, f32)> = outgoing.into_iter().collect();
    incoming.sort_unstable_by_key(|&(neighbour, _)| neighbour);
    outgoing.sort_unstable_by_key(|&(neighbour, _)| neighbour);

    let mut shortcuts = vec![];

    for &(from, in_weight) in &incoming {
        for &(to, out_weight) in &outgoing {
            if from == to {
                continue;
            }

            let weight = in_weight + out_weight;
            if !witness.exists(graph, from, to, vertex, weight, max_settles) {
                shortcuts.push(Shortcut {
                    from,
                    to,
                    via: vertex,
                    weight,
                });
            }
        }
    }

    shortcuts
}

/// Drives the contraction of a graph into a hierarchy.
///
/// The queue holds priorities lazily: a popped vertex is recomputed and only
/// contracted if it is still no worse than the next entry.
pub struct Preprocessor<W: WitnessCalculator> {
    graph: WeightedGraph,
    witness: W,
    parameters: ContractionParameters,
    queue: MinHeap,
    next_level: u32,
    shortcut_count: usize,
    state: PreprocessorState,
}

impl<W: WitnessCalculator> Preprocessor<W> {
    pub fn new(graph: WeightedGraph, witness: W, parameters: ContractionParameters) -> Self {
        let queue = MinHeap::new(graph.vertex_count() as usize);
        let next_level = graph.contracted_count();
        let mut this = Self {
            graph,
            witness,
            parameters,
            queue,
            next_level,
            shortcut_count: 0,
            state: PreprocessorState::Ready,
        };
        this.update_state();
        this
    }

    pub fn state(&self) -> PreprocessorState {
        self.state
    }

    pub fn graph(&self) -> &WeightedGraph {
        &self.graph
    }

    pub fn shortcut_count(&self) -> usize {
        self.shortcut_count
    }

    /// Contracts every remaining vertex.
    pub fn contract_remaining<O: NodeWeightCalculator + ?Sized>(&mut self, ordering: &mut O) {
        self.run(ordering, None);
    }

    /// Contracts vertices as long as their priority stays below `bound`.
    pub fn contract_while_below<O: NodeWeightCalculator + ?Sized>(
        &mut self,
        ordering: &mut O,
        bound: f32,
    ) {
        self.run(ordering, Some(bound));
    }

    /// Contracts one specific vertex and returns the shortcuts it required.
    ///
    /// Panics if `vertex` is already contracted.
    pub fn contract_vertex<O: NodeWeightCalculator + ?Sized>(
        &mut self,
        vertex: VertexId,
        ordering: &mut O,
    ) -> Vec<Shortcut> {
        assert!(
            !self.graph.is_contracted(vertex),
            "vertex {vertex} is already contracted"
        );
        self.state = PreprocessorState::Contracting;

        let shortcuts = required_shortcuts(
            &self.graph,
            &mut self.witness,
            vertex,
            self.parameters.max_settles,
        );

        for shortcut in &shortcuts {
            trace!(
                "shortcut {} -> {} via {} ({})",
                shortcut.from,
                shortcut.to,
                shortcut.via,
                shortcut.weight
            );
            self.graph
                .add_edge(shortcut.from, shortcut.to, shortcut.weight, true, false, Some(vertex));
        }

        self.graph.mark_contracted(vertex, self.next_level);
        self.next_level += 1;
        self.shortcut_count += shortcuts.len();
        ordering.notify_contracted(&self.graph, vertex);

        let contracted = self.next_level as usize;
        if self.parameters.progress_interval > 0 && contracted % self.parameters.progress_interval == 0
        {
            debug!(
                "contracted {contracted}/{} vertices, {} shortcuts so far",
                self.graph.vertex_count(),
                self.shortcut_count
            );
        }

        self.update_state();
        shortcuts
    }

    /// Freezes the hierarchy. Panics unless every vertex has been contracted.
    pub fn finish(self) -> ContractionHierarchy {
        assert_eq!(
            self.state,
            PreprocessorState::Done,
            "preprocessing finished with {} of {} vertices contracted",
            self.graph.contracted_count(),
            self.graph.vertex_count()
        );
        ContractionHierarchy::from_graph(self.graph)
    }

    fn run<O: NodeWeightCalculator + ?Sized>(&mut self, ordering: &mut O, bound: Option<f32>) {
        if self.state == PreprocessorState::Done {
            return;
        }

        info!(
            "contracting {} of {} vertices",
            self.graph.vertex_count() - self.graph.contracted_count(),
            self.graph.vertex_count()
        );
        self.state = PreprocessorState::Contracting;

        self.queue.clear();
        for vertex in 0..self.graph.vertex_count() {
            if !self.graph.is_contracted(vertex) {
                let priority = ordering.calculate(&self.graph, &mut self.witness, vertex);
                self.queue.push(vertex, priority);
            }
        }

        while let Some(HeapEntry { vertex, .. }) = self.queue.pop() {
            let priority = ordering.calculate(&self.graph, &mut self.witness, vertex);

            if let Some(next) = self.queue.peek() {
                if priority > next.weight {
                    trace!("deferring {vertex}, priority rose to {priority}");
                    self.queue.push(vertex, priority);
                    continue;
                }
            }

            if bound.is_some_and(|bound| priority >= bound) {
                break;
            }

            self.contract_vertex(vertex, ordering);

            let mut neighbours: Vec<_> = self
                .graph
                .active_edges(vertex)
                .map(|edge| edge.neighbour)
                .collect();
            neighbours.sort_unstable();
            neighbours.dedup();

            for neighbour in neighbours {
                if self.queue.contains(neighbour) {
                    let priority = ordering.calculate(&self.graph, &mut self.witness, neighbour);
                    self.queue.update_key(neighbour, priority);
                }
            }
        }

        self.queue.clear();

        info!(
            "{} of {} vertices contracted, {} shortcuts added",
            self.graph.contracted_count(),
            self.graph.vertex_count(),
            self.shortcut_count
        );
    }

    fn update_state(&mut self) {
        if self.next_level == self.graph.vertex_count() {
            self.state = PreprocessorState::Done;
        }
    }
}

/// Contracts `graph` completely using the given strategies.
pub fn contract<O, W>(
    graph: WeightedGraph,
    ordering: &mut O,
    witness: W,
    parameters: &ContractionParameters,
) -> ContractionHierarchy
where
    O: NodeWeightCalculator + ?Sized,
    W: WitnessCalculator,
{
    let mut preprocessor = Preprocessor::new(graph, witness, parameters.clone());
    preprocessor.contract_remaining(ordering);
    preprocessor.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        testing::{coordinates, random_edges},
        Coordinate, DijkstraWitnessCalculator, Edge, EdgeDifference, HierarchicalOrdering,
        SparseOrdering,
    };

    fn preprocessor(graph: WeightedGraph) -> Preprocessor<DijkstraWitnessCalculator> {
        let witness = DijkstraWitnessCalculator::new(graph.vertex_count() as usize);
        Preprocessor::new(graph, witness, ContractionParameters::default())
    }

    fn chain() -> WeightedGraph {
        WeightedGraph::from_edges(
            &coordinates(3),
            &[Edge::two_way(0, 1, 1.0), Edge::two_way(1, 2, 1.0)],
        )
    }

    #[test]
    fn contracting_chain_middle_adds_shortcuts_both_ways() {
        let mut preprocessor = preprocessor(chain());
        let mut ordering = EdgeDifference::new(100);

        assert_eq!(preprocessor.state(), PreprocessorState::Ready);
        let shortcuts = preprocessor.contract_vertex(1, &mut ordering);

        assert_eq!(
            shortcuts,
            vec![
                Shortcut { from: 0, to: 2, via: 1, weight: 2.0 },
                Shortcut { from: 2, to: 0, via: 1, weight: 2.0 },
            ]
        );
        assert_eq!(preprocessor.state(), PreprocessorState::Contracting);

        let graph = preprocessor.graph();
        let edge = graph.forward_edge(0, 2).unwrap();
        assert_eq!((edge.weight, edge.contracted_via), (2.0, Some(1)));
        assert!(edge.forward && edge.backward);
        assert_eq!(graph.forward_edge(2, 0).unwrap().weight, 2.0);
        assert!(graph.is_contracted(1));
        // The contracted vertex keeps its edges for the query phase.
        assert_eq!(graph.edges(1).len(), 2);
    }

    #[test]
    fn witness_prevents_shortcut() {
        let graph = WeightedGraph::from_edges(
            &coordinates(3),
            &[
                Edge::two_way(0, 1, 1.0),
                Edge::two_way(1, 2, 1.0),
                Edge::two_way(0, 2, 1.5),
            ],
        );
        let mut preprocessor = preprocessor(graph);

        assert!(preprocessor
            .contract_vertex(1, &mut EdgeDifference::new(100))
            .is_empty());
    }

    #[test]
    #[should_panic(expected = "already contracted")]
    fn contracting_twice_panics() {
        let mut preprocessor = preprocessor(chain());
        let mut ordering = EdgeDifference::new(100);
        preprocessor.contract_vertex(1, &mut ordering);
        preprocessor.contract_vertex(1, &mut ordering);
    }

    #[test_log::test]
    fn contracts_every_vertex_exactly_once() {
        let edges = random_edges(7, 40, 90);
        let graph = WeightedGraph::from_edges(&coordinates(40), &edges);
        let mut preprocessor = preprocessor(graph);
        let mut ordering = HierarchicalOrdering::new(40, &ContractionParameters::default());

        preprocessor.contract_remaining(&mut ordering);
        assert_eq!(preprocessor.state(), PreprocessorState::Done);

        let mut levels: Vec<_> = (0..40)
            .map(|v| preprocessor.graph().level(v).unwrap())
            .collect();
        levels.sort_unstable();
        assert_eq!(levels, (0..40).collect::<Vec<_>>());
    }

    #[test]
    fn shortcut_weights_equal_their_constituents() {
        let edges = random_edges(11, 30, 100);
        let graph = WeightedGraph::from_edges(&coordinates(30), &edges);
        let mut preprocessor = preprocessor(graph);
        preprocessor.contract_remaining(&mut EdgeDifference::new(50));
        let graph = preprocessor.graph();

        let mut checked = 0;
        for from in 0..graph.vertex_count() {
            for edge in graph.edges(from).iter().filter(|e| e.forward) {
                if let Some(via) = edge.contracted_via {
                    let first = graph.forward_edge(from, via).unwrap().weight;
                    let second = graph.forward_edge(via, edge.neighbour).unwrap().weight;
                    assert_eq!(edge.weight, first + second);
                    assert!(graph.level(via) < graph.level(from));
                    assert!(graph.level(via) < graph.level(edge.neighbour));
                    checked += 1;
                }
            }
        }
        assert!(checked > 0);
    }

    #[test]
    fn star_centre_waits_for_its_leaves() {
        let edges: Vec<_> = (1..=5).map(|leaf| Edge::two_way(0, leaf, 1.0)).collect();
        let graph = WeightedGraph::from_edges(&coordinates(6), &edges);
        let mut preprocessor = preprocessor(graph);

        preprocessor.contract_remaining(&mut EdgeDifference::new(100));

        assert!(preprocessor.graph().level(0).unwrap() >= 4);
        assert_eq!(preprocessor.shortcut_count(), 0);
    }

    #[test]
    fn sparse_pass_only_takes_degree_two_vertices() {
        let edges: Vec<_> = (0..5).map(|i| Edge::two_way(i, i + 1, 1.0)).collect();
        let graph = WeightedGraph::from_edges(&coordinates(6), &edges);
        let mut preprocessor = preprocessor(graph);

        preprocessor.contract_while_below(&mut SparseOrdering, f32::MAX);
        let graph = preprocessor.graph();

        assert!(!graph.is_contracted(0));
        assert!(!graph.is_contracted(5));
        assert_eq!(graph.contracted_count(), 4);
        assert_eq!(graph.forward_edge(0, 5).map(|e| e.weight), Some(5.0));
        assert_eq!(preprocessor.state(), PreprocessorState::Contracting);

        preprocessor.contract_remaining(&mut EdgeDifference::new(100));
        assert_eq!(preprocessor.state(), PreprocessorState::Done);
    }

    /// Priority `base + penalty * contracted`, recomputed from the graph on
    /// every call. Without edges no neighbour ever gets its key refreshed, so
    /// only the lazy check at pop time can see a priority rise.
    struct ScriptedOrdering {
        base: Vec<f32>,
        penalty: Vec<f32>,
    }

    impl NodeWeightCalculator for ScriptedOrdering {
        fn calculate(
            &self,
            graph: &WeightedGraph,
            _witness: &mut dyn WitnessCalculator,
            vertex: VertexId,
        ) -> f32 {
            let vertex = vertex as usize;
            self.base[vertex] + self.penalty[vertex] * graph.contracted_count() as f32
        }

        fn notify_contracted(&mut self, _graph: &WeightedGraph, _vertex: VertexId) {}
    }

    #[test_log::test]
    fn stale_priorities_are_deferred_at_pop() {
        let graph = WeightedGraph::from_edges(&coordinates(5), &[]);
        let mut preprocessor = preprocessor(graph);
        let mut ordering = ScriptedOrdering {
            base: vec![0.0, 1.0, 2.0, 3.0, 4.0],
            penalty: vec![0.0, 1.0, 0.0, 5.0, 0.0],
        };

        preprocessor.contract_remaining(&mut ordering);

        // Vertex 1 rises to 2 and ties with vertex 2, which is no worse, so
        // it is contracted right away. Vertex 3 rises to 18 above vertex 4
        // and is pushed back behind it.
        let levels: Vec<_> = (0..5)
            .map(|v| preprocessor.graph().level(v).unwrap())
            .collect();
        assert_eq!(levels, vec![0, 1, 2, 4, 3]);
        assert_eq!(preprocessor.state(), PreprocessorState::Done);
    }

    #[test]
    fn long_chain_contracts_completely() {
        let vertices = 3_000;
        let edges: Vec<_> = (0..vertices - 1)
            .map(|i| Edge::two_way(i, i + 1, 1.0))
            .collect();
        let graph = WeightedGraph::from_edges(&coordinates(vertices), &edges);
        let parameters = ContractionParameters::default()
            .with_max_settles(64)
            .with_progress_interval(1_000);
        let witness = DijkstraWitnessCalculator::new(vertices as usize);
        let mut preprocessor = Preprocessor::new(graph, witness, parameters.clone());

        preprocessor.contract_while_below(&mut SparseOrdering, f32::MAX);
        let mut ordering = HierarchicalOrdering::new(vertices as usize, &parameters);
        preprocessor.contract_remaining(&mut ordering);

        let hierarchy = preprocessor.finish();
        assert_eq!(hierarchy.distance(0, vertices - 1), Some((vertices - 1) as f32));
        assert_eq!(hierarchy.distance(vertices - 1, 1), Some((vertices - 2) as f32));
    }

    #[test]
    fn zero_weight_cycles_terminate() {
        let edges: Vec<_> = (0..6).map(|i| Edge::two_way(i, (i + 1) % 6, 0.0)).collect();
        let graph = WeightedGraph::from_edges(&coordinates(6), &edges);
        let mut preprocessor = preprocessor(graph);

        preprocessor.contract_remaining(&mut EdgeDifference::new(100));
        assert_eq!(preprocessor.state(), PreprocessorState::Done);
    }

    #[test]
    fn empty_graph_is_done_immediately() {
        let preprocessor = preprocessor(WeightedGraph::new());
        assert_eq!(preprocessor.state(), PreprocessorState::Done);
        assert_eq!(preprocessor.finish().vertex_count(), 0);
    }

    #[test]
    fn isolated_vertices_contract_trivially() {
        let graph = WeightedGraph::from_edges(&[Coordinate::new(0.0, 0.0); 3], &[]);
        let hierarchy = contract(
            graph,
            &mut EdgeDifference::new(10),
            DijkstraWitnessCalculator::new(3),
            &ContractionParameters::default(),
        );
        assert_eq!(hierarchy.vertex_count(), 3);
    }

    #[test]
    #[should_panic(expected = "preprocessing finished")]
    fn finishing_early_panics() {
        preprocessor(chain()).finish();
    }
}
