//! Sparse multi-head attentional aggregation.
//!
//! `toponet-nn` computes entity representations by propagating features over
//! a [`SparseStructure`](toponet_core::SparseStructure) with learned
//! per-edge attention. It sits on top of the structure layer
//! (`toponet-core`) and produces plain `candle` tensors.
//!
//! # Modules
//!
//! - [`kernel`]: Shared primitives (projection, scoring, normalization, aggregation, head combination)
//! - [`can`]: Pairwise multi-head attention ([`CellAttention`])
//! - [`hypergat`]: Two-stage hypergraph attention ([`HyperGat`])
//! - [`config`]: Layer configuration and named choices
//! - [`init`]: Xavier initialization and the [`Parameterized`] trait
//!
//! # Example: Cell Attention Forward Pass
//!
//! ```rust
//! use candle_core::{DType, Device, Tensor};
//! use toponet_core::SparseStructure;
//! use toponet_nn::{AttentionConfig, CellAttention};
//!
//! let mut config = AttentionConfig::new(8, 4);
//! config.heads = 2;
//! let layer = CellAttention::new(config, &Device::Cpu)?;
//!
//! let x = Tensor::ones((3, 8), DType::F32, &Device::Cpu)?;
//! let adj = SparseStructure::from_pairs(3, 3, &[(0, 1), (1, 0), (1, 2)])?;
//! let out = layer.forward(&x, &adj)?;
//! assert_eq!(out.dims(), &[3, 8]);
//! # Ok::<(), toponet_nn::Error>(())
//! ```
//!
//! # Example: Hypergraph Attention
//!
//! ```rust
//! use candle_core::{DType, Device, Tensor};
//! use toponet_core::SparseStructure;
//! use toponet_nn::{HyperGat, HyperGatConfig};
//!
//! let layer = HyperGat::new(HyperGatConfig::new(8, 4), &Device::Cpu)?;
//! let x = Tensor::ones((3, 8), DType::F32, &Device::Cpu)?;
//! // Nodes x hyperedges.
//! let b1 = SparseStructure::from_pairs(3, 2, &[(0, 0), (1, 0), (1, 1), (2, 1)])?;
//! let out = layer.forward_with_hyperedges(&x, &b1)?;
//! assert_eq!(out.hyperedges.dims(), &[2, 4]);
//! assert_eq!(out.nodes.dims(), &[3, 4]);
//! # Ok::<(), toponet_nn::Error>(())
//! ```

pub mod can;
pub mod config;
pub mod error;
pub mod hypergat;
pub mod init;
pub mod kernel;

pub use can::CellAttention;
pub use config::{
    Aggregation, AttentionActivation, AttentionConfig, BaseWeightCombine, HyperGatConfig,
    InitScheme, Normalization, UpdateFunc,
};
pub use error::{Error, Result};
pub use hypergat::{HyperGat, HyperGatOutput};
pub use init::{Parameterized, XavierInit};
