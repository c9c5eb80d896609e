use serde::{Deserialize, Serialize};

use crate::{Error, Result, Side, TargetSegments};

/// Base weights attached to the edges of a [`SparseStructure`].
///
/// The attention kernels combine these with learned scores. `Scalar` weights
/// broadcast across heads; `PerHead` weights are laid out edge-major
/// (`values[e * heads + h]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeWeights {
    /// Every edge has base weight `1.0`.
    Ones,
    /// One weight per edge.
    Scalar(Vec<f32>),
    /// One weight per edge per attention head.
    PerHead { heads: usize, values: Vec<f32> },
}

impl EdgeWeights {
    /// Number of heads the weights are laid out for, if per-head.
    pub fn heads(&self) -> Option<usize> {
        match self {
            EdgeWeights::PerHead { heads, .. } => Some(*heads),
            _ => None,
        }
    }

    fn check(&self, num_edges: usize) -> Result<()> {
        match self {
            EdgeWeights::Ones => Ok(()),
            EdgeWeights::Scalar(values) => {
                if values.len() != num_edges {
                    return Err(Error::LengthMismatch {
                        what: "edge weights",
                        expected: num_edges,
                        got: values.len(),
                    });
                }
                check_finite(values)
            }
            EdgeWeights::PerHead { heads, values } => {
                if *heads == 0 {
                    return Err(Error::InvalidWeights(
                        "per-head weights need at least one head".into(),
                    ));
                }
                if values.len() != num_edges * heads {
                    return Err(Error::LengthMismatch {
                        what: "per-head edge weights",
                        expected: num_edges * heads,
                        got: values.len(),
                    });
                }
                check_finite(values)
            }
        }
    }

    fn reorder(&self, order: &[usize]) -> Self {
        match self {
            EdgeWeights::Ones => EdgeWeights::Ones,
            EdgeWeights::Scalar(values) => {
                EdgeWeights::Scalar(order.iter().map(|&e| values[e]).collect())
            }
            EdgeWeights::PerHead { heads, values } => EdgeWeights::PerHead {
                heads: *heads,
                values: order
                    .iter()
                    .flat_map(|&e| values[e * heads..(e + 1) * heads].iter().copied())
                    .collect(),
            },
        }
    }
}

fn check_finite(values: &[f32]) -> Result<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(e) => Err(Error::InvalidWeights(format!(
            "non-finite weight {} at position {e}",
            values[e]
        ))),
        None => Ok(()),
    }
}

/// An explicit edge list: which target entity listens to which source entity.
///
/// Stores two parallel index sequences (COO layout) plus base weights.
/// Duplicate `(target, source)` pairs are independent edges and are never
/// merged. Targets and sources may be different kinds of entity (nodes and
/// hyperedges for an incidence structure), so each side declares its own
/// entity count and every index is checked against it on construction.
///
/// # Example
///
/// ```rust
/// use toponet_core::{EdgeWeights, SparseStructure};
///
/// let s = SparseStructure::from_coo(
///     3,
///     3,
///     vec![1, 1],
///     vec![0, 2],
///     EdgeWeights::Scalar(vec![0.5, 0.25]),
/// )
/// .unwrap();
///
/// assert_eq!(s.num_edges(), 2);
/// assert!(SparseStructure::from_pairs(3, 3, &[(3, 0)]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStructure")]
pub struct SparseStructure {
    num_targets: usize,
    num_sources: usize,
    target_index: Vec<u32>,
    source_index: Vec<u32>,
    weights: EdgeWeights,
}

/// Unchecked wire form; deserialization goes through [`SparseStructure::from_coo`].
#[derive(Deserialize)]
struct RawStructure {
    num_targets: usize,
    num_sources: usize,
    target_index: Vec<u32>,
    source_index: Vec<u32>,
    weights: EdgeWeights,
}

impl TryFrom<RawStructure> for SparseStructure {
    type Error = Error;

    fn try_from(raw: RawStructure) -> Result<Self> {
        Self::from_coo(
            raw.num_targets,
            raw.num_sources,
            raw.target_index,
            raw.source_index,
            raw.weights,
        )
    }
}

impl SparseStructure {
    /// Create a structure with no edges.
    pub fn new(num_targets: usize, num_sources: usize) -> Self {
        Self {
            num_targets,
            num_sources,
            target_index: Vec::new(),
            source_index: Vec::new(),
            weights: EdgeWeights::Ones,
        }
    }

    /// Build from parallel index sequences.
    ///
    /// # Errors
    ///
    /// - [`Error::LengthMismatch`] if the index or weight sequences disagree in length
    /// - [`Error::IndexOutOfRange`] if any index is outside its declared range
    /// - [`Error::InvalidWeights`] for non-finite weights or zero heads
    pub fn from_coo(
        num_targets: usize,
        num_sources: usize,
        target_index: Vec<u32>,
        source_index: Vec<u32>,
        weights: EdgeWeights,
    ) -> Result<Self> {
        check_count(Side::Target, num_targets)?;
        check_count(Side::Source, num_sources)?;

        if target_index.len() != source_index.len() {
            return Err(Error::LengthMismatch {
                what: "source index",
                expected: target_index.len(),
                got: source_index.len(),
            });
        }
        check_range(Side::Target, &target_index, num_targets)?;
        check_range(Side::Source, &source_index, num_sources)?;
        weights.check(target_index.len())?;

        Ok(Self {
            num_targets,
            num_sources,
            target_index,
            source_index,
            weights,
        })
    }

    /// Build from `(target, source)` pairs with unit base weights.
    pub fn from_pairs(
        num_targets: usize,
        num_sources: usize,
        pairs: &[(usize, usize)],
    ) -> Result<Self> {
        let mut target_index = Vec::with_capacity(pairs.len());
        let mut source_index = Vec::with_capacity(pairs.len());
        for (e, &(t, s)) in pairs.iter().enumerate() {
            target_index.push(to_index(Side::Target, e, t, num_targets)?);
            source_index.push(to_index(Side::Source, e, s, num_sources)?);
        }
        Self::from_coo(
            num_targets,
            num_sources,
            target_index,
            source_index,
            EdgeWeights::Ones,
        )
    }

    /// Build from a row-major dense matrix of shape `rows x cols`.
    ///
    /// Every non-zero entry `(r, c)` becomes an edge with target `r`,
    /// source `c` and base weight equal to the entry, in row-major order.
    pub fn from_dense(rows: usize, cols: usize, values: &[f32]) -> Result<Self> {
        let Some(len) = rows.checked_mul(cols) else {
            return Err(Error::InvalidStructure(format!(
                "dense matrix {rows} x {cols} overflows usize"
            )));
        };
        if values.len() != len {
            return Err(Error::LengthMismatch {
                what: "dense matrix",
                expected: len,
                got: values.len(),
            });
        }
        check_count(Side::Target, rows)?;
        check_count(Side::Source, cols)?;

        let mut target_index = Vec::new();
        let mut source_index = Vec::new();
        let mut weights = Vec::new();
        for (i, &v) in values.iter().enumerate() {
            if v != 0.0 {
                target_index.push((i / cols) as u32);
                source_index.push((i % cols) as u32);
                weights.push(v);
            }
        }
        Self::from_coo(
            rows,
            cols,
            target_index,
            source_index,
            EdgeWeights::Scalar(weights),
        )
    }

    /// Replace the base weights.
    pub fn with_weights(mut self, weights: EdgeWeights) -> Result<Self> {
        weights.check(self.num_edges())?;
        self.weights = weights;
        Ok(self)
    }

    /// Number of entities that can receive messages.
    pub fn num_targets(&self) -> usize {
        self.num_targets
    }

    /// Number of entities that can send messages.
    pub fn num_sources(&self) -> usize {
        self.num_sources
    }

    /// Number of edges (E).
    pub fn num_edges(&self) -> usize {
        self.target_index.len()
    }

    /// True when there are no edges at all.
    ///
    /// Edges whose base weight is zero still count.
    pub fn is_empty(&self) -> bool {
        self.target_index.is_empty()
    }

    /// Target index per edge.
    pub fn target_index(&self) -> &[u32] {
        &self.target_index
    }

    /// Source index per edge.
    pub fn source_index(&self) -> &[u32] {
        &self.source_index
    }

    /// Base weights.
    pub fn weights(&self) -> &EdgeWeights {
        &self.weights
    }

    /// Swap the roles of targets and sources.
    ///
    /// For an incidence structure `B1` (nodes x hyperedges) this yields
    /// `B1^T` (hyperedges x nodes). Edge order and weights are preserved.
    pub fn transpose(&self) -> Self {
        Self {
            num_targets: self.num_sources,
            num_sources: self.num_targets,
            target_index: self.source_index.clone(),
            source_index: self.target_index.clone(),
            weights: self.weights.clone(),
        }
    }

    /// Reorder edges: edge `i` of the result is edge `order[i]` of `self`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidStructure`] unless `order` is a permutation of `0..E`.
    pub fn permute(&self, order: &[usize]) -> Result<Self> {
        let e = self.num_edges();
        if order.len() != e {
            return Err(Error::LengthMismatch {
                what: "edge permutation",
                expected: e,
                got: order.len(),
            });
        }
        let mut seen = vec![false; e];
        for &i in order {
            if i >= e || seen[i] {
                return Err(Error::InvalidStructure(format!(
                    "edge order is not a permutation (entry {i})"
                )));
            }
            seen[i] = true;
        }

        Ok(Self {
            num_targets: self.num_targets,
            num_sources: self.num_sources,
            target_index: order.iter().map(|&i| self.target_index[i]).collect(),
            source_index: order.iter().map(|&i| self.source_index[i]).collect(),
            weights: self.weights.reorder(order),
        })
    }

    /// Number of incoming edges per target.
    pub fn in_degrees(&self) -> Vec<usize> {
        let mut degrees = vec![0usize; self.num_targets];
        for &t in &self.target_index {
            degrees[t as usize] += 1;
        }
        degrees
    }

    /// Group edges by target (stable within each target).
    pub fn segments(&self) -> TargetSegments {
        TargetSegments::from_targets(self.num_targets, &self.target_index)
    }
}

fn check_count(side: Side, count: usize) -> Result<()> {
    if count > u32::MAX as usize {
        return Err(Error::InvalidStructure(format!(
            "{side} count {count} exceeds the u32 index range"
        )));
    }
    Ok(())
}

fn check_range(side: Side, index: &[u32], bound: usize) -> Result<()> {
    match index.iter().position(|&i| i as usize >= bound) {
        Some(edge) => Err(Error::IndexOutOfRange {
            side,
            edge,
            index: index[edge] as usize,
            bound,
        }),
        None => Ok(()),
    }
}

fn to_index(side: Side, edge: usize, index: usize, bound: usize) -> Result<u32> {
    if index >= bound {
        return Err(Error::IndexOutOfRange {
            side,
            edge,
            index,
            bound,
        });
    }
    Ok(index as u32)
}
