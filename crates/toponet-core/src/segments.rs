/// Edges grouped by target entity in CSR layout.
///
/// `edge_order[offsets[t]..offsets[t + 1]]` lists the edges whose target is
/// `t`, in their original relative order. A segmented reduction that walks
/// each slice front to back therefore sums every target in a fixed order,
/// independent of how the targets are spread over worker threads.
///
/// ```text
/// targets:    [1, 0, 1, 2]
/// offsets:    [0, 1, 3, 4]
/// edge_order: [1, 0, 2, 3]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSegments {
    offsets: Vec<usize>,
    edge_order: Vec<usize>,
}

impl TargetSegments {
    /// Counting sort of edge positions by target.
    pub(crate) fn from_targets(num_targets: usize, target_index: &[u32]) -> Self {
        let mut offsets = vec![0usize; num_targets + 1];
        for &t in target_index {
            offsets[t as usize + 1] += 1;
        }
        for t in 0..num_targets {
            offsets[t + 1] += offsets[t];
        }

        let mut cursor = offsets.clone();
        let mut edge_order = vec![0usize; target_index.len()];
        for (e, &t) in target_index.iter().enumerate() {
            let slot = &mut cursor[t as usize];
            edge_order[*slot] = e;
            *slot += 1;
        }

        Self {
            offsets,
            edge_order,
        }
    }

    /// Number of targets covered (including those without edges).
    pub fn num_targets(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Edge positions whose target is `target`.
    pub fn edges_of(&self, target: usize) -> &[usize] {
        &self.edge_order[self.offsets[target]..self.offsets[target + 1]]
    }

    /// Incoming edge count of `target`.
    pub fn degree(&self, target: usize) -> usize {
        self.offsets[target + 1] - self.offsets[target]
    }

    /// Row pointer array of length `num_targets + 1`.
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// All edge positions, grouped by target.
    pub fn edge_order(&self) -> &[usize] {
        &self.edge_order
    }
}
