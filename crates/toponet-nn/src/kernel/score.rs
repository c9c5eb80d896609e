//! Per-edge attention logits.
//!
//! Scorers see features already gathered per edge: `source` and `target`
//! are `(E, H, C)` tensors holding the two endpoints of every edge. They
//! return raw `(E, H)` logits, before base weights or normalization.
//!
//! | Scorer | Arity | Logit |
//! |--------|-------|-------|
//! | [`SplitScorer`] | pair | `act(<s, a_src>) + act(<t, a_dst>)` |
//! | [`SingleScorer`] | single | `leaky_relu(s) . a` |
//! | [`ConcatScorer`] | pair | `leaky_relu([s \|\| t]) . a` |

use candle_core::{Tensor, D};

use super::activation::leaky_relu;
use crate::config::AttentionActivation;
use crate::{Error, Result};

/// Number of endpoint vectors a scorer reads per edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Source endpoint only.
    Single,
    /// Source and target endpoints.
    Pair,
}

/// Computes raw attention logits for every edge.
pub trait EdgeScorer {
    fn arity(&self) -> Arity;

    /// `source`, `target`: `(E, H, C)` per-edge endpoint features.
    /// `target` is `None` for [`Arity::Single`] scorers.
    fn score(&self, source: &Tensor, target: Option<&Tensor>) -> Result<Tensor>;
}

fn require_target(target: Option<&Tensor>) -> Result<&Tensor> {
    target.ok_or_else(|| Error::InvalidConfig("pair scorer called without target features".into()))
}

/// Separate source and target attention vectors, one pair per head.
///
/// This is the Cell Attention Network scorer: each endpoint is reduced to a
/// scalar per head, activated independently, then summed.
pub struct SplitScorer<'a> {
    att_src: &'a Tensor,
    att_dst: &'a Tensor,
    activation: AttentionActivation,
    negative_slope: f64,
}

impl<'a> SplitScorer<'a> {
    /// `att_src`, `att_dst`: `(1, H, C)`.
    pub fn new(
        att_src: &'a Tensor,
        att_dst: &'a Tensor,
        activation: AttentionActivation,
        negative_slope: f64,
    ) -> Self {
        Self {
            att_src,
            att_dst,
            activation,
            negative_slope,
        }
    }
}

impl EdgeScorer for SplitScorer<'_> {
    fn arity(&self) -> Arity {
        Arity::Pair
    }

    fn score(&self, source: &Tensor, target: Option<&Tensor>) -> Result<Tensor> {
        let target = require_target(target)?;
        let alpha_src = source.broadcast_mul(self.att_src)?.sum(D::Minus1)?;
        let alpha_dst = target.broadcast_mul(self.att_dst)?.sum(D::Minus1)?;
        let alpha_src = self.activation.apply(&alpha_src, self.negative_slope)?;
        let alpha_dst = self.activation.apply(&alpha_dst, self.negative_slope)?;
        Ok((alpha_src + alpha_dst)?)
    }
}

/// One attention column over the activated source features.
pub struct SingleScorer<'a> {
    att: &'a Tensor,
    negative_slope: f64,
}

impl<'a> SingleScorer<'a> {
    /// `att`: `(C, 1)`.
    pub fn new(att: &'a Tensor, negative_slope: f64) -> Self {
        Self {
            att,
            negative_slope,
        }
    }
}

impl EdgeScorer for SingleScorer<'_> {
    fn arity(&self) -> Arity {
        Arity::Single
    }

    fn score(&self, source: &Tensor, _target: Option<&Tensor>) -> Result<Tensor> {
        column_logits(&leaky_relu(source, self.negative_slope)?, self.att)
    }
}

/// One attention column over the activated, concatenated endpoint features.
pub struct ConcatScorer<'a> {
    att: &'a Tensor,
    negative_slope: f64,
}

impl<'a> ConcatScorer<'a> {
    /// `att`: `(C_src + C_dst, 1)`.
    pub fn new(att: &'a Tensor, negative_slope: f64) -> Self {
        Self {
            att,
            negative_slope,
        }
    }
}

impl EdgeScorer for ConcatScorer<'_> {
    fn arity(&self) -> Arity {
        Arity::Pair
    }

    fn score(&self, source: &Tensor, target: Option<&Tensor>) -> Result<Tensor> {
        let target = require_target(target)?;
        let pair = Tensor::cat(&[source, target], 2)?;
        column_logits(&leaky_relu(&pair, self.negative_slope)?, self.att)
    }
}

/// `(E, H, C) x (C, 1) -> (E, H)`
fn column_logits(features: &Tensor, att: &Tensor) -> Result<Tensor> {
    let (e, h, c) = features.dims3()?;
    let (rows, _) = att.dims2()?;
    if rows != c {
        return Err(Error::DimensionMismatch {
            context: "attention column height",
            expected: c,
            got: rows,
        });
    }
    Ok(features.reshape((e * h, c))?.matmul(att)?.reshape((e, h))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn test_split_scorer_sums_activated_logits() {
        let device = Device::Cpu;
        // E = 1, H = 2, C = 2
        let src = Tensor::new(&[[[1f32, 2.0], [3.0, -4.0]]], &device).unwrap();
        let dst = Tensor::new(&[[[0f32, 1.0], [1.0, 1.0]]], &device).unwrap();
        let att_src = Tensor::new(&[[[1f32, 1.0], [1.0, 1.0]]], &device).unwrap();
        let att_dst = Tensor::new(&[[[2f32, 0.0], [0.0, 2.0]]], &device).unwrap();

        let scorer = SplitScorer::new(&att_src, &att_dst, AttentionActivation::LeakyRelu, 0.5);
        let out = scorer.score(&src, Some(&dst)).unwrap();
        // head 0: 3 + 0; head 1: leaky(-1) + 2 = -0.5 + 2
        assert_eq!(out.to_vec2::<f32>().unwrap(), vec![vec![3.0, 1.5]]);
    }

    #[test]
    fn test_split_scorer_requires_target() {
        let device = Device::Cpu;
        let src = Tensor::ones((1, 1, 2), candle_core::DType::F32, &device).unwrap();
        let scorer = SplitScorer::new(&src, &src, AttentionActivation::Tanh, 0.0);
        assert!(scorer.score(&src, None).is_err());
    }

    #[test]
    fn test_single_scorer() {
        let device = Device::Cpu;
        let src = Tensor::new(&[[[1f32, -2.0]], [[0.5, 0.5]]], &device).unwrap();
        let att = Tensor::new(&[[1f32], [1.0]], &device).unwrap();
        let out = SingleScorer::new(&att, 0.5).score(&src, None).unwrap();
        assert_eq!(out.dims(), &[2, 1]);
        assert_eq!(out.to_vec2::<f32>().unwrap(), vec![vec![0.0], vec![1.0]]);
    }

    #[test]
    fn test_concat_scorer() {
        let device = Device::Cpu;
        let src = Tensor::new(&[[[1f32]]], &device).unwrap();
        let dst = Tensor::new(&[[[2f32]]], &device).unwrap();
        let att = Tensor::new(&[[1f32], [10.0]], &device).unwrap();
        let out = ConcatScorer::new(&att, 0.01).score(&src, Some(&dst)).unwrap();
        assert_eq!(out.to_vec2::<f32>().unwrap(), vec![vec![21.0]]);
    }

    #[test]
    fn test_column_height_checked() {
        let device = Device::Cpu;
        let src = Tensor::ones((2, 1, 3), candle_core::DType::F32, &device).unwrap();
        let att = Tensor::ones((2, 1), candle_core::DType::F32, &device).unwrap();
        assert!(matches!(
            SingleScorer::new(&att, 0.01).score(&src, None),
            Err(Error::DimensionMismatch { expected: 3, got: 2, .. })
        ));
    }
}
