//! Elementwise nonlinearities used by the scorers and the update step.

use candle_core::Tensor;

use crate::config::{AttentionActivation, UpdateFunc};
use crate::Result;

/// `relu(x) + slope * (x - relu(x))`
pub fn leaky_relu(xs: &Tensor, negative_slope: f64) -> Result<Tensor> {
    let pos = xs.relu()?;
    let neg = (xs - &pos)?.affine(negative_slope, 0.0)?;
    Ok((pos + neg)?)
}

impl AttentionActivation {
    /// Apply to a tensor of attention logits.
    pub fn apply(self, xs: &Tensor, negative_slope: f64) -> Result<Tensor> {
        match self {
            AttentionActivation::LeakyRelu => leaky_relu(xs, negative_slope),
            AttentionActivation::Elu => Ok(xs.elu(1.0)?),
            AttentionActivation::Tanh => Ok(xs.tanh()?),
        }
    }
}

impl UpdateFunc {
    /// Apply to aggregated messages.
    pub fn apply(self, xs: &Tensor) -> Result<Tensor> {
        match self {
            UpdateFunc::Relu => Ok(xs.relu()?),
            UpdateFunc::Sigmoid => Ok(candle_nn::ops::sigmoid(xs)?),
        }
    }
}
