//! Base-weight combination and softmax normalization of edge scores.

use candle_core::{DType, Device, Tensor, D};
use toponet_core::{EdgeWeights, SparseStructure};

use super::EdgeIndex;
use crate::config::{BaseWeightCombine, Normalization};
use crate::{Error, Result};

/// Base weights of `structure` as an `(E, 1)` or `(E, H)` tensor.
///
/// Scalar weights stay one column wide and broadcast across heads.
pub fn base_weights(
    structure: &SparseStructure,
    heads: usize,
    dtype: DType,
    device: &Device,
) -> Result<Tensor> {
    let e = structure.num_edges();
    let base = match structure.weights() {
        EdgeWeights::Ones => Tensor::ones((e, 1), dtype, device)?,
        EdgeWeights::Scalar(values) => {
            Tensor::from_slice(values.as_slice(), (e, 1), device)?.to_dtype(dtype)?
        }
        EdgeWeights::PerHead { heads: h, values } => {
            if *h != heads {
                return Err(Error::DimensionMismatch {
                    context: "per-head edge weights",
                    expected: heads,
                    got: *h,
                });
            }
            Tensor::from_slice(values.as_slice(), (e, heads), device)?.to_dtype(dtype)?
        }
    };
    Ok(base)
}

/// Merge raw `(E, H)` scores with base weights and normalize.
///
/// - [`BaseWeightCombine::Sum`]: `normalize(base + raw)`
/// - [`BaseWeightCombine::Scale`]: `base * normalize(raw)`
pub fn combine_and_normalize(
    raw: &Tensor,
    base: &Tensor,
    combine: BaseWeightCombine,
    normalization: Normalization,
    edges: &EdgeIndex<'_>,
) -> Result<Tensor> {
    match combine {
        BaseWeightCombine::Sum => normalize(&raw.broadcast_add(base)?, normalization, edges),
        BaseWeightCombine::Scale => {
            Ok(normalize(raw, normalization, edges)?.broadcast_mul(base)?)
        }
    }
}

/// Softmax of `(E, H)` scores along the configured axis.
pub fn normalize(
    scores: &Tensor,
    normalization: Normalization,
    edges: &EdgeIndex<'_>,
) -> Result<Tensor> {
    match normalization {
        Normalization::HeadAxis => Ok(candle_nn::ops::softmax(scores, D::Minus1)?),
        Normalization::Neighbor => neighbor_softmax(scores, edges),
    }
}

/// Softmax per head over all edges that share a target.
///
/// The per-target maximum is subtracted before exponentiating. It is
/// computed on the host in `f64` and enters the graph as a constant in the
/// scores' dtype; softmax is invariant to the shift, so the gradient is
/// unaffected.
fn neighbor_softmax(scores: &Tensor, edges: &EdgeIndex<'_>) -> Result<Tensor> {
    let (_, heads) = scores.dims2()?;
    let num_targets = edges.structure().num_targets();
    let targets = edges.structure().target_index();

    let host = scores.to_dtype(DType::F64)?.to_vec2::<f64>()?;
    let mut max = vec![f64::NEG_INFINITY; num_targets * heads];
    for (row, &t) in host.iter().zip(targets) {
        let slot = &mut max[t as usize * heads..(t as usize + 1) * heads];
        for (m, &v) in slot.iter_mut().zip(row) {
            *m = m.max(v);
        }
    }
    // Targets without edges are never gathered back.
    for m in &mut max {
        if !m.is_finite() {
            *m = 0.0;
        }
    }

    let max = Tensor::from_vec(max, (num_targets, heads), scores.device())?
        .to_dtype(scores.dtype())?;
    let shift = max.index_select(edges.target(), 0)?;
    let exp = (scores - shift)?.exp()?;

    let denom = Tensor::zeros((num_targets, heads), scores.dtype(), scores.device())?
        .index_add(edges.target(), &exp, 0)?
        .index_select(edges.target(), 0)?;
    Ok((exp / denom)?)
}
