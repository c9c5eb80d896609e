// Allow minor clippy style warnings at crate level
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]

//! Sparse connection structures for attentional message passing.
//!
//! This crate holds the data model the attention kernels in `toponet-nn`
//! consume. It has no tensor dependency: everything here is index
//! bookkeeping over plain vectors.
//!
//! - [`SparseStructure`] - An explicit `(target, source, weight)` edge list
//! - [`EdgeWeights`] - Base weights, either implicit ones, one per edge, or one per edge per head
//! - [`TargetSegments`] - Edges grouped by target (CSR layout) for segmented reductions
//!
//! # Structures in Topological Deep Learning
//!
//! The same edge-list encoding covers every neighborhood the layers use:
//!
//! | Neighborhood | Targets | Sources | Typical matrix |
//! |--------------|---------|---------|----------------|
//! | Graph adjacency | nodes | nodes | `A` |
//! | Upper / lower adjacency | k-cells | k-cells | `A_up`, `A_down` |
//! | Incidence | nodes | hyperedges | `B1` |
//! | Co-incidence | hyperedges | nodes | `B1^T` |
//!
//! # Example
//!
//! ```rust
//! use toponet_core::SparseStructure;
//!
//! // Node 1 listens to nodes 0 and 2.
//! let adj = SparseStructure::from_pairs(3, 3, &[(1, 0), (1, 2)]).unwrap();
//! assert_eq!(adj.num_edges(), 2);
//! assert_eq!(adj.in_degrees(), vec![0, 2, 0]);
//!
//! // Incidence of two hyperedges over three nodes, and its transpose.
//! let b1 = SparseStructure::from_pairs(3, 2, &[(0, 0), (1, 0), (2, 1)]).unwrap();
//! let b1_t = b1.transpose();
//! assert_eq!(b1_t.num_targets(), 2);
//! ```

mod error;
mod segments;
mod structure;

pub use error::{Error, Result, Side};
pub use segments::TargetSegments;
pub use structure::{EdgeWeights, SparseStructure};
