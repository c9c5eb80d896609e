//! `toponet` is the facade over the sparse attention workspace.
//!
//! - [`sparse`]: Sparse structures (edge lists, incidence, CSR segments)
//! - [`nn`]: Attention kernels and layers on `candle` tensors
//!
//! The most used types are re-exported at the top level.

pub use toponet_core as sparse;
pub use toponet_nn as nn;

pub use toponet_core::{EdgeWeights, SparseStructure, TargetSegments};
pub use toponet_nn::{
    Aggregation, AttentionActivation, AttentionConfig, BaseWeightCombine, CellAttention,
    HyperGat, HyperGatConfig, HyperGatOutput, InitScheme, Normalization, Parameterized,
    UpdateFunc,
};
