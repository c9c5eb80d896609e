//! Parameter initialization and the [`Parameterized`] seam.
//!
//! Fans follow the PyTorch convention so layers start from the same
//! distribution a reference implementation would: for a tensor of shape
//! `(d0, d1, rest..)`, `fan_in = d1 * prod(rest)` and
//! `fan_out = d0 * prod(rest)`.

use candle_core::{Device, Tensor, Var};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal, Uniform};

use crate::config::InitScheme;
use crate::{Error, Result};

/// A layer with learned tensors.
///
/// Optimizers read [`parameters`](Parameterized::parameters) to collect
/// gradients and update values between forward evaluations; the layer never
/// mutates them during a forward pass.
pub trait Parameterized {
    /// All learned tensors, in a stable order.
    fn parameters(&self) -> Vec<Var>;

    /// Re-draw every learned tensor in place from the configured scheme.
    fn reset_parameters(&mut self) -> Result<()>;
}

/// Seeded Xavier sampler owned by a layer.
///
/// Two layers built with the same seed start identical; each reset advances
/// the stream.
#[derive(Debug, Clone)]
pub struct XavierInit {
    scheme: InitScheme,
    gain: f64,
    rng: StdRng,
}

impl XavierInit {
    pub fn new(scheme: InitScheme, gain: f64, seed: u64) -> Self {
        Self {
            scheme,
            gain,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draw a fresh `f32` tensor of `shape`.
    pub fn sample(&mut self, shape: &[usize], device: &Device) -> Result<Tensor> {
        let (fan_in, fan_out) = fans(shape);
        let count: usize = shape.iter().product();
        let denom = (fan_in + fan_out).max(1) as f64;

        let values: Vec<f32> = match self.scheme {
            InitScheme::XavierUniform => {
                let bound = (self.gain * (6.0 / denom).sqrt()) as f32;
                let dist = Uniform::new_inclusive(-bound, bound)
                    .map_err(|e| Error::InvalidConfig(format!("xavier uniform bound: {e}")))?;
                (0..count).map(|_| dist.sample(&mut self.rng)).collect()
            }
            InitScheme::XavierNormal => {
                let std = (self.gain * (2.0 / denom).sqrt()) as f32;
                let dist = Normal::new(0.0f32, std)
                    .map_err(|e| Error::InvalidConfig(format!("xavier normal std: {e}")))?;
                (0..count).map(|_| dist.sample(&mut self.rng)).collect()
            }
        };

        Ok(Tensor::from_vec(values, shape, device)?)
    }

    /// Allocate a new variable.
    pub fn var(&mut self, shape: &[usize], device: &Device) -> Result<Var> {
        let t = self.sample(shape, device)?;
        Ok(Var::from_tensor(&t)?)
    }

    /// Overwrite an existing variable in place, keeping its identity.
    pub fn reset(&mut self, var: &Var) -> Result<()> {
        let t = self.sample(var.dims(), var.device())?;
        var.set(&t)?;
        Ok(())
    }
}

/// `(fan_in, fan_out)` for a parameter shape.
pub fn fans(shape: &[usize]) -> (usize, usize) {
    match shape {
        [] => (1, 1),
        [n] => (*n, *n),
        [d0, d1, rest @ ..] => {
            let receptive: usize = rest.iter().product();
            (d1 * receptive, d0 * receptive)
        }
    }
}

/// Replace the value of `var` with `value` after checking the shape.
pub(crate) fn assign(var: &Var, value: &Tensor, context: &'static str) -> Result<()> {
    let want = var.dims();
    let got = value.dims();
    if want.len() != got.len() {
        return Err(Error::DimensionMismatch {
            context,
            expected: want.len(),
            got: got.len(),
        });
    }
    for (&w, &g) in want.iter().zip(got) {
        if w != g {
            return Err(Error::DimensionMismatch {
                context,
                expected: w,
                got: g,
            });
        }
    }
    if value.dtype() != var.dtype() {
        return Err(Error::DTypeMismatch {
            expected: var.dtype(),
            got: value.dtype(),
        });
    }
    var.set(value)?;
    Ok(())
}
