//! A binary min-heap over vertices with decrease-key support.
//!
//! Every vertex can be contained at most once. Positions are tracked in a
//! vector indexed by vertex id so keys can be changed in `O(log n)`. Entries
//! with equal weight are ordered by vertex id, which makes every search built
//! on top of the heap deterministic.

use crate::VertexId;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HeapEntry {
    pub vertex: VertexId,
    pub weight: f32,
}

impl HeapEntry {
    fn precedes(&self, other: &Self) -> bool {
        self.weight < other.weight || (self.weight == other.weight && self.vertex < other.vertex)
    }
}

const INVALID_POSITION: usize = usize::MAX;

#[derive(Clone, Debug)]
pub struct MinHeap {
    positions: Vec<usize>,
    data: Vec<HeapEntry>,
}

impl MinHeap {
    /// Creates an empty heap for vertex ids in `[0, vertex_count)`.
    pub fn new(vertex_count: usize) -> Self {
        Self {
            positions: vec![INVALID_POSITION; vertex_count],
            data: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.positions.len()
    }

    pub fn contains(&self, vertex: VertexId) -> bool {
        self.positions[vertex as usize] != INVALID_POSITION
    }

    /// The current key of `vertex`, if it is queued.
    pub fn weight(&self, vertex: VertexId) -> Option<f32> {
        self.data
            .get(self.positions[vertex as usize])
            .map(|entry| entry.weight)
    }

    pub fn peek(&self) -> Option<HeapEntry> {
        self.data.first().copied()
    }

    /// Drops all entries in `O(len)`, keeping the position table allocated.
    pub fn clear(&mut self) {
        for entry in &self.data {
            self.positions[entry.vertex as usize] = INVALID_POSITION;
        }
        self.data.clear();
    }

    pub fn pop(&mut self) -> Option<HeapEntry> {
        if self.data.is_empty() {
            return None;
        }

        let last = self.data.len() - 1;
        self.swap(0, last);
        let entry = self.data.pop()?;
        self.positions[entry.vertex as usize] = INVALID_POSITION;

        if !self.data.is_empty() {
            self.move_down(0);
        }

        Some(entry)
    }

    /// Panics if `vertex` is already queued.
    pub fn push(&mut self, vertex: VertexId, weight: f32) {
        assert!(!self.contains(vertex), "vertex {vertex} is already queued");
        let position = self.data.len();
        self.positions[vertex as usize] = position;
        self.data.push(HeapEntry { vertex, weight });
        self.move_up(position);
    }

    /// Lowers the key of a queued vertex. Larger keys are ignored.
    pub fn decrease_key(&mut self, vertex: VertexId, weight: f32) {
        let position = self.positions[vertex as usize];
        if weight < self.data[position].weight {
            self.data[position].weight = weight;
            self.move_up(position);
        }
    }

    /// Sets the key of a queued vertex, moving it in either direction.
    pub fn update_key(&mut self, vertex: VertexId, weight: f32) {
        let position = self.positions[vertex as usize];
        let old = self.data[position].weight;
        self.data[position].weight = weight;
        if weight < old {
            self.move_up(position);
        } else {
            self.move_down(position);
        }
    }

    /// Inserts `vertex` or lowers its key. Returns `true` if the heap changed.
    pub fn push_or_decrease(&mut self, vertex: VertexId, weight: f32) -> bool {
        match self.weight(vertex) {
            None => {
                self.push(vertex, weight);
                true
            }
            Some(current) if weight < current => {
                self.decrease_key(vertex, weight);
                true
            }
            Some(_) => false,
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.data.swap(a, b);
        self.positions[self.data[a].vertex as usize] = a;
        self.positions[self.data[b].vertex as usize] = b;
    }

    fn move_up(&mut self, mut position: usize) {
        while position > 0 {
            let parent = (position - 1) / 2;
            if !self.data[position].precedes(&self.data[parent]) {
                break;
            }
            self.swap(position, parent);
            position = parent;
        }
    }

    fn move_down(&mut self, mut position: usize) {
        loop {
            let left = 2 * position + 1;
            if left >= self.data.len() {
                break;
            }

            let right = left + 1;
            let child = if right < self.data.len() && self.data[right].precedes(&self.data[left]) {
                right
            } else {
                left
            };

            if !self.data[child].precedes(&self.data[position]) {
                break;
            }
            self.swap(position, child);
            position = child;
        }
    }
}
