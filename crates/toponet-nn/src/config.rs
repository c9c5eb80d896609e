//! Layer configuration.
//!
//! Every choice is a closed enum, resolved when a layer is built. Names
//! parse with [`FromStr`] using the same `snake_case` spelling serde uses, so
//! a misspelled activation fails at construction time, never mid-forward.
//!
//! ```rust
//! use toponet_nn::config::{AttentionActivation, AttentionConfig};
//!
//! let config = AttentionConfig {
//!     heads: 4,
//!     activation: "elu".parse().unwrap(),
//!     ..AttentionConfig::new(16, 8)
//! };
//! assert_eq!(config.activation, AttentionActivation::Elu);
//! assert!("gelu".parse::<AttentionActivation>().is_err());
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

macro_rules! named_choice {
    ($ty:ident, $what:literal, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            /// Canonical `snake_case` name.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($ty::$variant => $name,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($name => Ok($ty::$variant),)+
                    other => Err(Error::InvalidConfig(format!(
                        concat!("unknown ", $what, " `{}` (expected one of: {})"),
                        other,
                        [$($name),+].join(", ")
                    ))),
                }
            }
        }
    };
}

/// Nonlinearity applied to per-edge attention logits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttentionActivation {
    /// `max(x, 0) + slope * min(x, 0)`
    #[default]
    LeakyRelu,
    /// ELU with alpha = 1
    Elu,
    /// Hyperbolic tangent
    Tanh,
}

named_choice!(AttentionActivation, "attention activation", {
    LeakyRelu => "leaky_relu",
    Elu => "elu",
    Tanh => "tanh",
});

/// Elementwise update applied to aggregated messages (hypergraph layer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateFunc {
    #[default]
    Relu,
    Sigmoid,
}

named_choice!(UpdateFunc, "update function", {
    Relu => "relu",
    Sigmoid => "sigmoid",
});

/// Parameter initialization distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitScheme {
    /// Glorot uniform: `U(-a, a)`, `a = gain * sqrt(6 / (fan_in + fan_out))`
    #[default]
    XavierUniform,
    /// Glorot normal: `N(0, gain * sqrt(2 / (fan_in + fan_out)))`
    XavierNormal,
}

named_choice!(InitScheme, "init scheme", {
    XavierUniform => "xavier_uniform",
    XavierNormal => "xavier_normal",
});

/// How the structure's base edge weight meets the learned attention score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseWeightCombine {
    /// Add before normalizing: `softmax(base + score)`.
    #[default]
    Sum,
    /// Multiply after normalizing: `base * softmax(score)`.
    Scale,
}

named_choice!(BaseWeightCombine, "base weight combine", {
    Sum => "sum",
    Scale => "scale",
});

/// Axis the attention softmax runs over.
///
/// | Variant | Groups | Sums to one over |
/// |---------|--------|------------------|
/// | `HeadAxis` | one edge | its H heads |
/// | `Neighbor` | one target, one head | the target's incoming edges |
///
/// `HeadAxis` is the CAN reference behavior. With a single head it is
/// constant 1.0, which is what the hypergraph layer does by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    #[default]
    HeadAxis,
    Neighbor,
}

named_choice!(Normalization, "normalization", {
    HeadAxis => "head_axis",
    Neighbor => "neighbor",
});

/// Scatter-add strategy for the segmented aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Candle `index_add` over the edge axis.
    #[default]
    IndexAdd,
    /// Edges grouped by target, target rows reduced in parallel with rayon.
    Segmented,
}

named_choice!(Aggregation, "aggregation", {
    IndexAdd => "index_add",
    Segmented => "segmented",
});

/// Configuration for [`CellAttention`](crate::CellAttention).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionConfig {
    /// Input feature width (Cin).
    pub in_channels: usize,
    /// Output width per head (Cout).
    pub out_channels: usize,
    /// Number of attention heads (H).
    pub heads: usize,
    /// Concatenate heads (`H * Cout` wide) instead of averaging them.
    pub concat: bool,
    /// Nonlinearity on the source and target logits.
    pub activation: AttentionActivation,
    /// Negative slope for [`AttentionActivation::LeakyRelu`].
    pub negative_slope: f64,
    pub base_weight_combine: BaseWeightCombine,
    pub normalization: Normalization,
    pub aggregation: Aggregation,
    pub init: InitScheme,
    /// Xavier gain.
    pub gain: f64,
    /// Seed for parameter sampling.
    pub seed: u64,
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            in_channels: 1,
            out_channels: 1,
            heads: 1,
            concat: true,
            activation: AttentionActivation::LeakyRelu,
            negative_slope: 0.01,
            base_weight_combine: BaseWeightCombine::Sum,
            normalization: Normalization::HeadAxis,
            aggregation: Aggregation::IndexAdd,
            init: InitScheme::XavierUniform,
            gain: 1.0,
            seed: 42,
        }
    }
}

impl AttentionConfig {
    /// Defaults with the given channel widths.
    pub fn new(in_channels: usize, out_channels: usize) -> Self {
        Self {
            in_channels,
            out_channels,
            ..Default::default()
        }
    }

    /// Width of the layer output.
    pub fn output_channels(&self) -> usize {
        if self.concat {
            self.heads * self.out_channels
        } else {
            self.out_channels
        }
    }

    /// Check channel counts and numeric knobs.
    pub fn validate(&self) -> Result<()> {
        check_positive("in_channels", self.in_channels)?;
        check_positive("out_channels", self.out_channels)?;
        check_positive("heads", self.heads)?;
        check_gain(self.gain)?;
        check_slope(self.negative_slope)
    }
}

/// Configuration for [`HyperGat`](crate::HyperGat).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperGatConfig {
    /// Node feature width.
    pub in_channels: usize,
    /// Width of hyperedge and node outputs.
    pub out_channels: usize,
    pub update_func: UpdateFunc,
    /// Negative slope of the leaky ReLU applied to attention inputs.
    pub negative_slope: f64,
    pub base_weight_combine: BaseWeightCombine,
    pub normalization: Normalization,
    pub aggregation: Aggregation,
    pub init: InitScheme,
    pub gain: f64,
    pub seed: u64,
}

impl Default for HyperGatConfig {
    fn default() -> Self {
        Self {
            in_channels: 1,
            out_channels: 1,
            update_func: UpdateFunc::Relu,
            negative_slope: 0.01,
            base_weight_combine: BaseWeightCombine::Scale,
            normalization: Normalization::HeadAxis,
            aggregation: Aggregation::IndexAdd,
            init: InitScheme::XavierUniform,
            gain: 1.414,
            seed: 42,
        }
    }
}

impl HyperGatConfig {
    /// Defaults with the given channel widths.
    pub fn new(in_channels: usize, out_channels: usize) -> Self {
        Self {
            in_channels,
            out_channels,
            ..Default::default()
        }
    }

    /// Check channel counts and numeric knobs.
    pub fn validate(&self) -> Result<()> {
        check_positive("in_channels", self.in_channels)?;
        check_positive("out_channels", self.out_channels)?;
        check_gain(self.gain)?;
        check_slope(self.negative_slope)
    }
}

fn check_positive(name: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(Error::InvalidConfig(format!("{name} must be > 0")));
    }
    Ok(())
}

fn check_gain(gain: f64) -> Result<()> {
    if !(gain.is_finite() && gain > 0.0) {
        return Err(Error::InvalidConfig(format!(
            "gain must be finite and > 0, got {gain}"
        )));
    }
    Ok(())
}

fn check_slope(slope: f64) -> Result<()> {
    if !(slope.is_finite() && slope >= 0.0) {
        return Err(Error::InvalidConfig(format!(
            "negative_slope must be finite and >= 0, got {slope}"
        )));
    }
    Ok(())
}
