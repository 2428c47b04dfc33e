use crate::{VertexId, WeightedGraph};

/// Appends the original vertices of the edge `from -> to` to `path`, excluding
/// `from` itself, which is expected to be the last vertex already pushed.
///
/// A shortcut is replaced by its two halves around the vertex it bypasses,
/// recursively, until only original edges remain.
pub(super) fn unfold_edge(
    graph: &WeightedGraph,
    from: VertexId,
    to: VertexId,
    path: &mut Vec<VertexId>,
) {
    let via = graph
        .forward_edge(from, to)
        .unwrap_or_else(|| panic!("hierarchy has no edge {from} -> {to} to unfold"))
        .contracted_via;

    match via {
        Some(via) => {
            unfold_edge(graph, from, via, path);
            unfold_edge(graph, via, to, path);
        }
        None => path.push(to),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{testing::coordinates, Edge};

    #[test]
    fn nested_shortcuts_unfold_in_order() {
        let mut graph = WeightedGraph::from_edges(
            &coordinates(4),
            &[
                Edge::one_way(0, 1, 1.0),
                Edge::one_way(1, 2, 1.0),
                Edge::one_way(2, 3, 1.0),
            ],
        );
        graph.add_edge(0, 2, 2.0, true, false, Some(1));
        graph.add_edge(0, 3, 3.0, true, false, Some(2));

        let mut path = vec![0];
        unfold_edge(&graph, 0, 3, &mut path);
        assert_eq!(path, vec![0, 1, 2, 3]);
    }

    #[test]
    #[should_panic(expected = "no edge")]
    fn missing_edge_panics() {
        let graph = WeightedGraph::from_edges(&coordinates(2), &[Edge::one_way(0, 1, 1.0)]);
        unfold_edge(&graph, 1, 0, &mut vec![1]);
    }
}
