//! Pairwise multi-head attention over a cell or graph neighborhood.
//!
//! ```text
//! X'          = X W                                (N, H, C)
//! raw[e, h]   = act(<X'[src_e, h], a_src[h]>) + act(<X'[dst_e, h], a_dst[h]>)
//! w[e, h]     = softmax(base[e] + raw[e, h])       (head axis by default)
//! out[i, h]   = sum_{e: dst_e = i} w[e, h] X'[src_e, h]
//! ```
//!
//! # Reference
//!
//! Giusti et al., "Cell Attention Networks", 2022.

use candle_core::{DType, Device, Tensor, Var};
use toponet_core::SparseStructure;

use crate::config::AttentionConfig;
use crate::init::{assign, Parameterized, XavierInit};
use crate::kernel::heads::combine_heads;
use crate::kernel::projection::{check_rank, project};
use crate::kernel::score::SplitScorer;
use crate::kernel::{self, EdgeIndex, Propagation};
use crate::{Error, Result};

/// Multi-head attention layer for a square neighborhood (targets and
/// sources are the same entities).
#[derive(Debug)]
pub struct CellAttention {
    config: AttentionConfig,
    lin: Var,
    att_src: Var,
    att_dst: Var,
    init: XavierInit,
}

impl CellAttention {
    /// Build and initialize a layer.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] if `config` fails validation.
    pub fn new(config: AttentionConfig, device: &Device) -> Result<Self> {
        config.validate()?;
        let mut init = XavierInit::new(config.init, config.gain, config.seed);
        let (h, c) = (config.heads, config.out_channels);
        let lin = init.var(&[config.in_channels, h * c], device)?;
        let att_src = init.var(&[1, h, c], device)?;
        let att_dst = init.var(&[1, h, c], device)?;
        Ok(Self {
            config,
            lin,
            att_src,
            att_dst,
            init,
        })
    }

    pub fn config(&self) -> &AttentionConfig {
        &self.config
    }

    /// `heads * out_channels` when concatenating, `out_channels` otherwise.
    pub fn output_channels(&self) -> usize {
        self.config.output_channels()
    }

    /// Projection weight, `(in_channels, heads * out_channels)`.
    pub fn projection(&self) -> &Var {
        &self.lin
    }

    /// Source and target attention vectors, each `(1, heads, out_channels)`.
    pub fn attention(&self) -> (&Var, &Var) {
        (&self.att_src, &self.att_dst)
    }

    pub fn set_projection(&self, weight: &Tensor) -> Result<()> {
        assign(&self.lin, weight, "projection weight")
    }

    pub fn set_attention(&self, att_src: &Tensor, att_dst: &Tensor) -> Result<()> {
        assign(&self.att_src, att_src, "source attention vector")?;
        assign(&self.att_dst, att_dst, "target attention vector")
    }

    /// Aggregate `x` over `structure`.
    ///
    /// - `x`: `(N, in_channels)`
    /// - `structure`: `N x N`
    ///
    /// Returns `(N, output_channels)`. An empty structure yields zeros.
    pub fn forward(&self, x: &Tensor, structure: &SparseStructure) -> Result<Tensor> {
        let n = self.check_inputs(x, structure)?;
        if structure.is_empty() {
            tracing::warn!(
                entities = n,
                "empty neighborhood, returning zero features"
            );
            return Ok(Tensor::zeros(
                (n, self.output_channels()),
                x.dtype(),
                x.device(),
            )?);
        }
        tracing::debug!(
            entities = n,
            edges = structure.num_edges(),
            heads = self.config.heads,
            concat = self.config.concat,
            "cell attention forward"
        );

        let xp = project(x, self.lin.as_tensor(), self.config.heads)?;
        let edges = EdgeIndex::new(structure, x.device())?;
        let attended = kernel::attend(&self.scorer(), &xp, Some(&xp), &edges, self.propagation())?;
        combine_heads(&attended.output, self.config.concat)
    }

    /// Normalized `(E, heads)` weights that [`forward`](Self::forward) uses.
    pub fn attention_weights(&self, x: &Tensor, structure: &SparseStructure) -> Result<Tensor> {
        self.check_inputs(x, structure)?;
        let xp = project(x, self.lin.as_tensor(), self.config.heads)?;
        let edges = EdgeIndex::new(structure, x.device())?;
        kernel::attention_weights(&self.scorer(), &xp, Some(&xp), &edges, self.propagation())
    }

    fn scorer(&self) -> SplitScorer<'_> {
        SplitScorer::new(
            self.att_src.as_tensor(),
            self.att_dst.as_tensor(),
            self.config.activation,
            self.config.negative_slope,
        )
    }

    fn propagation(&self) -> Propagation {
        Propagation {
            combine: self.config.base_weight_combine,
            normalization: self.config.normalization,
            aggregation: self.config.aggregation,
        }
    }

    fn check_inputs(&self, x: &Tensor, structure: &SparseStructure) -> Result<usize> {
        check_rank(x, 2, "feature matrix rank")?;
        let (n, cin) = x.dims2()?;
        if cin != self.config.in_channels {
            return Err(Error::DimensionMismatch {
                context: "feature width",
                expected: self.config.in_channels,
                got: cin,
            });
        }
        if x.dtype() != DType::F32 {
            return Err(Error::DTypeMismatch {
                expected: DType::F32,
                got: x.dtype(),
            });
        }
        if structure.num_targets() != n {
            return Err(Error::DimensionMismatch {
                context: "neighborhood target count",
                expected: n,
                got: structure.num_targets(),
            });
        }
        if structure.num_sources() != n {
            return Err(Error::DimensionMismatch {
                context: "neighborhood source count",
                expected: n,
                got: structure.num_sources(),
            });
        }
        if let Some(h) = structure.weights().heads() {
            if h != self.config.heads {
                return Err(Error::DimensionMismatch {
                    context: "per-head edge weights",
                    expected: self.config.heads,
                    got: h,
                });
            }
        }
        Ok(n)
    }
}

impl Parameterized for CellAttention {
    fn parameters(&self) -> Vec<Var> {
        vec![self.lin.clone(), self.att_src.clone(), self.att_dst.clone()]
    }

    fn reset_parameters(&mut self) -> Result<()> {
        self.init.reset(&self.lin)?;
        self.init.reset(&self.att_src)?;
        self.init.reset(&self.att_dst)
    }
}
