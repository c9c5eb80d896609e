//! Segmented aggregation: scatter-add weighted messages into target rows.
//!
//! ```text
//! message[e, h, :] = X'[source[e], h, :] * w[e, h]
//! out[target[e], h, :] += message[e, h, :]
//! ```
//!
//! The accumulator starts at zero, so targets without incoming edges keep
//! an all-zero row. Two strategies produce the same sums:
//!
//! | Strategy | How | Reduction order |
//! |----------|-----|-----------------|
//! | `IndexAdd` | candle `index_add` over the edge axis | edge order |
//! | `Segmented` | CSR grouping, one rayon task per target row | edge order within each target |

use std::ops::AddAssign;

use candle_core::{bail, CpuStorage, CustomOp1, Device, Layout, Shape, Tensor};
use rayon::prelude::*;
use toponet_core::TargetSegments;

use super::EdgeIndex;
use crate::config::Aggregation;
use crate::Result;

/// Weight gathered source features and reduce them per target.
///
/// - `source_values`: `(E, H, C)` source features already gathered per edge
/// - `weights`: `(E, H)` normalized attention
///
/// Returns `(num_targets, H, C)`.
pub fn aggregate(
    source_values: &Tensor,
    weights: &Tensor,
    edges: &EdgeIndex<'_>,
    strategy: Aggregation,
) -> Result<Tensor> {
    let messages = source_values.broadcast_mul(&weights.unsqueeze(2)?)?;
    let num_targets = edges.structure().num_targets();
    match strategy {
        Aggregation::IndexAdd => scatter_add(&messages, edges.target(), num_targets),
        Aggregation::Segmented => {
            segmented_sum(&messages, edges.target(), &edges.structure().segments())
        }
    }
}

/// `zeros(num_targets, H, C).index_add(target, messages)`
pub fn scatter_add(messages: &Tensor, target: &Tensor, num_targets: usize) -> Result<Tensor> {
    let (_, h, c) = messages.dims3()?;
    let acc = Tensor::zeros((num_targets, h, c), messages.dtype(), messages.device())?;
    Ok(acc.index_add(target, &messages.contiguous()?, 0)?)
}

/// Partition-by-target reduction.
///
/// Each output row is owned by exactly one task, so no two workers ever
/// write the same memory, and each row is summed in a fixed edge order.
/// The reduction runs on the CPU; messages on another device are moved
/// there and the result is moved back. Messages must be `f32` or `f64`.
///
/// The backward pass gathers the output gradient by `target`, the same
/// gradient `index_add` produces.
pub fn segmented_sum(
    messages: &Tensor,
    target: &Tensor,
    segments: &TargetSegments,
) -> Result<Tensor> {
    let device = messages.device().clone();
    let op = SegmentedSum {
        segments: segments.clone(),
        target: target.to_device(&Device::Cpu)?,
    };
    let out = messages
        .to_device(&Device::Cpu)?
        .contiguous()?
        .apply_op1(op)?;
    Ok(out.to_device(&device)?)
}

struct SegmentedSum {
    segments: TargetSegments,
    target: Tensor,
}

impl SegmentedSum {
    fn reduce<T>(&self, flat: &[T], width: usize) -> Vec<T>
    where
        T: Copy + Default + Send + Sync + AddAssign,
    {
        let mut out = vec![T::default(); self.segments.num_targets() * width];
        if width > 0 {
            out.par_chunks_mut(width)
                .enumerate()
                .for_each(|(target, row)| {
                    for &e in self.segments.edges_of(target) {
                        let message = &flat[e * width..(e + 1) * width];
                        for (acc, &v) in row.iter_mut().zip(message) {
                            *acc += v;
                        }
                    }
                });
        }
        out
    }
}

impl CustomOp1 for SegmentedSum {
    fn name(&self) -> &'static str {
        "segmented-sum"
    }

    fn cpu_fwd(
        &self,
        storage: &CpuStorage,
        layout: &Layout,
    ) -> candle_core::Result<(CpuStorage, Shape)> {
        let (_, h, c) = layout.shape().dims3()?;
        let Some((start, end)) = layout.contiguous_offsets() else {
            bail!("segmented sum expects contiguous messages")
        };
        let width = h * c;
        let out = match storage {
            CpuStorage::F32(values) => CpuStorage::F32(self.reduce(&values[start..end], width)),
            CpuStorage::F64(values) => CpuStorage::F64(self.reduce(&values[start..end], width)),
            _ => bail!("segmented sum supports f32 and f64 messages"),
        };
        Ok((out, Shape::from((self.segments.num_targets(), h, c))))
    }

    fn bwd(
        &self,
        _arg: &Tensor,
        _res: &Tensor,
        grad_res: &Tensor,
    ) -> candle_core::Result<Option<Tensor>> {
        Ok(Some(grad_res.index_select(&self.target, 0)?))
    }
}
