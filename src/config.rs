use serde::{Deserialize, Serialize};

/// Ordering strategy used for the main contraction pass.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingKind {
    EdgeDifference,
    #[default]
    Hierarchical,
}

/// Set of parameters used when contracting a graph.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ContractionParameters {
    /// Maximum number of vertices a single witness search may settle before
    /// the shortcut is added anyway.
    pub max_settles: usize,
    pub ordering: OrderingKind,
    /// Contract degree-two vertices before running the main ordering.
    pub sparse_first_pass: bool,
    pub edge_difference_weight: f32,
    pub contracted_neighbours_weight: f32,
    pub depth_weight: f32,
    /// Number of contractions between two progress log lines.
    pub progress_interval: usize,
}

impl Default for ContractionParameters {
    fn default() -> Self {
        Self {
            max_settles: 500,
            ordering: OrderingKind::default(),
            sparse_first_pass: true,
            edge_difference_weight: 2.0,
            contracted_neighbours_weight: 1.0,
            depth_weight: 1.0,
            progress_interval: 10_000,
        }
    }
}

impl ContractionParameters {
    pub fn with_max_settles(mut self, max_settles: usize) -> Self {
        self.max_settles = max_settles;
        self
    }

    pub fn with_ordering(mut self, ordering: OrderingKind) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn with_sparse_first_pass(mut self, sparse_first_pass: bool) -> Self {
        self.sparse_first_pass = sparse_first_pass;
        self
    }

    pub fn with_weights(
        mut self,
        edge_difference_weight: f32,
        contracted_neighbours_weight: f32,
        depth_weight: f32,
    ) -> Self {
        self.edge_difference_weight = edge_difference_weight;
        self.contracted_neighbours_weight = contracted_neighbours_weight;
        self.depth_weight = depth_weight;
        self
    }

    pub fn with_progress_interval(mut self, progress_interval: usize) -> Self {
        self.progress_interval = progress_interval;
        self
    }
}
