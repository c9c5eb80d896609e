//! Shared sparse attention pipeline.
//!
//! Both layers run the same five steps over an explicit edge list:
//!
//! ```text
//! gather  : s_e = V[source[e]],  t_e = K[target[e]]
//! score   : raw[e, h]  = scorer(s_e, t_e)
//! combine : w[e, h]    = normalize(raw, base)       (Sum or Scale)
//! message : m[e, h, :] = s_e[h, :] * w[e, h]
//! scatter : out[target[e], h, :] += m[e, h, :]
//! ```
//!
//! No per-entity neighbor lists are built; the edge list is the only
//! adjacency representation, and gather/scatter are index operations on it.

pub mod activation;
pub mod aggregate;
pub mod heads;
pub mod normalize;
pub mod projection;
pub mod score;

use candle_core::{Device, Tensor};
use toponet_core::SparseStructure;

use crate::config::{Aggregation, BaseWeightCombine, Normalization};
use crate::{Error, Result};
use score::{Arity, EdgeScorer};

/// A [`SparseStructure`] with its index sequences uploaded as `u32` tensors.
pub struct EdgeIndex<'a> {
    structure: &'a SparseStructure,
    source: Tensor,
    target: Tensor,
}

impl<'a> EdgeIndex<'a> {
    /// Upload the index sequences of `structure` to `device`.
    pub fn new(structure: &'a SparseStructure, device: &Device) -> Result<Self> {
        let e = structure.num_edges();
        let source = Tensor::from_slice(structure.source_index(), e, device)?;
        let target = Tensor::from_slice(structure.target_index(), e, device)?;
        Ok(Self {
            structure,
            source,
            target,
        })
    }

    /// The structure the indices were taken from.
    pub fn structure(&self) -> &'a SparseStructure {
        self.structure
    }

    /// Source entity of every edge, shape `(E,)`.
    pub fn source(&self) -> &Tensor {
        &self.source
    }

    /// Target entity of every edge, shape `(E,)`.
    pub fn target(&self) -> &Tensor {
        &self.target
    }
}

/// How scores become weights and weights become sums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Propagation {
    pub combine: BaseWeightCombine,
    pub normalization: Normalization,
    pub aggregation: Aggregation,
}

/// Result of one attention pass.
#[derive(Debug, Clone)]
pub struct Attended {
    /// Normalized per-edge weights, `(E, H)`.
    pub weights: Tensor,
    /// Per-head aggregate, `(num_targets, H, C)`.
    pub output: Tensor,
}

/// Normalized `(E, H)` weights without aggregating.
///
/// - `values`: `(num_sources, H, C)` source features; the scorer reads these
///   as the source endpoint
/// - `target_keys`: `(num_targets, H, C')` target features, read only by
///   [`Arity::Pair`] scorers
pub fn attention_weights(
    scorer: &dyn EdgeScorer,
    values: &Tensor,
    target_keys: Option<&Tensor>,
    edges: &EdgeIndex<'_>,
    propagation: Propagation,
) -> Result<Tensor> {
    let (_, weights) = score_edges(scorer, values, target_keys, edges, propagation)?;
    Ok(weights)
}

/// Score, normalize and aggregate in one pass.
pub fn attend(
    scorer: &dyn EdgeScorer,
    values: &Tensor,
    target_keys: Option<&Tensor>,
    edges: &EdgeIndex<'_>,
    propagation: Propagation,
) -> Result<Attended> {
    let (gathered, weights) = score_edges(scorer, values, target_keys, edges, propagation)?;
    if edges.structure().is_empty() {
        let (_, h, c) = values.dims3()?;
        let output = Tensor::zeros(
            (edges.structure().num_targets(), h, c),
            values.dtype(),
            values.device(),
        )?;
        return Ok(Attended { weights, output });
    }

    let output = aggregate::aggregate(&gathered, &weights, edges, propagation.aggregation)?;
    Ok(Attended { weights, output })
}

fn score_edges(
    scorer: &dyn EdgeScorer,
    values: &Tensor,
    target_keys: Option<&Tensor>,
    edges: &EdgeIndex<'_>,
    propagation: Propagation,
) -> Result<(Tensor, Tensor)> {
    let (num_sources, h, c) = values.dims3()?;
    let structure = edges.structure();
    if num_sources != structure.num_sources() {
        return Err(Error::DimensionMismatch {
            context: "source entity count",
            expected: structure.num_sources(),
            got: num_sources,
        });
    }
    let keys = match scorer.arity() {
        Arity::Single => None,
        Arity::Pair => {
            let keys = target_keys.unwrap_or(values);
            let num_keys = keys.dim(0)?;
            if num_keys != structure.num_targets() {
                return Err(Error::DimensionMismatch {
                    context: "target entity count",
                    expected: structure.num_targets(),
                    got: num_keys,
                });
            }
            Some(keys)
        }
    };
    if structure.is_empty() {
        let weights = Tensor::zeros((0, h), values.dtype(), values.device())?;
        let gathered = Tensor::zeros((0, h, c), values.dtype(), values.device())?;
        return Ok((gathered, weights));
    }

    let gathered = values.index_select(edges.source(), 0)?;
    let raw = match keys {
        None => scorer.score(&gathered, None)?,
        Some(keys) => {
            let keys = keys.index_select(edges.target(), 0)?;
            scorer.score(&gathered, Some(&keys))?
        }
    };

    let base = normalize::base_weights(structure, h, raw.dtype(), raw.device())?;
    let weights = normalize::combine_and_normalize(
        &raw,
        &base,
        propagation.combine,
        propagation.normalization,
        edges,
    )?;
    Ok((gathered, weights))
}
