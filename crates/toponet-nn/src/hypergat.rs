//! Two-stage hypergraph attention.
//!
//! The incidence structure `B1` has nodes as targets and hyperedges as
//! sources. Stage 1 walks it transposed (nodes into hyperedges), stage 2
//! walks it as given (hyperedges back into nodes):
//!
//! ```text
//! P1  = X W1                                            (N, C)
//! e1  = leaky_relu(P1[node]) . a1                       node -> hyperedge
//! He  = update(sum_e w1[e] P1[node_e])                  (M, C)
//! P2  = He W2                                           (M, C)
//! e2  = leaky_relu([P2[hyperedge] || P1[node]]) . a2    hyperedge -> node
//! out = update(sum_e w2[e] P2[hyperedge_e])             (N, C)
//! ```
//!
//! There is a single implicit head, so the default head-axis softmax gives
//! every incidence weight 1 and the base weight alone scales each message.
//!
//! # Reference
//!
//! Ding et al., "Be More with Less: Hypergraph Attention Networks for
//! Inductive Text Classification", EMNLP 2020.

use candle_core::{DType, Device, Tensor, Var};
use toponet_core::SparseStructure;

use crate::config::HyperGatConfig;
use crate::init::{assign, Parameterized, XavierInit};
use crate::kernel::projection::{check_rank, project};
use crate::kernel::score::{ConcatScorer, SingleScorer};
use crate::kernel::{self, EdgeIndex, Propagation};
use crate::{Error, Result};

/// Outputs of both stages.
#[derive(Debug, Clone)]
pub struct HyperGatOutput {
    /// Hyperedge representations after stage 1, `(M, out_channels)`.
    pub hyperedges: Tensor,
    /// Node representations after stage 2, `(N, out_channels)`.
    pub nodes: Tensor,
}

/// Hypergraph attention layer (node -> hyperedge -> node).
#[derive(Debug)]
pub struct HyperGat {
    config: HyperGatConfig,
    weight1: Var,
    weight2: Var,
    att_weight1: Var,
    att_weight2: Var,
    init: XavierInit,
}

impl HyperGat {
    pub fn new(config: HyperGatConfig, device: &Device) -> Result<Self> {
        config.validate()?;
        let mut init = XavierInit::new(config.init, config.gain, config.seed);
        let (cin, c) = (config.in_channels, config.out_channels);
        let weight1 = init.var(&[cin, c], device)?;
        let weight2 = init.var(&[c, c], device)?;
        let att_weight1 = init.var(&[c, 1], device)?;
        let att_weight2 = init.var(&[2 * c, 1], device)?;
        Ok(Self {
            config,
            weight1,
            weight2,
            att_weight1,
            att_weight2,
            init,
        })
    }

    pub fn config(&self) -> &HyperGatConfig {
        &self.config
    }

    pub fn out_channels(&self) -> usize {
        self.config.out_channels
    }

    pub fn weight1(&self) -> &Var {
        &self.weight1
    }

    pub fn weight2(&self) -> &Var {
        &self.weight2
    }

    pub fn att_weight1(&self) -> &Var {
        &self.att_weight1
    }

    pub fn att_weight2(&self) -> &Var {
        &self.att_weight2
    }

    pub fn set_weights(&self, weight1: &Tensor, weight2: &Tensor) -> Result<()> {
        assign(&self.weight1, weight1, "stage 1 projection")?;
        assign(&self.weight2, weight2, "stage 2 projection")
    }

    pub fn set_attention(&self, att_weight1: &Tensor, att_weight2: &Tensor) -> Result<()> {
        assign(&self.att_weight1, att_weight1, "stage 1 attention")?;
        assign(&self.att_weight2, att_weight2, "stage 2 attention")
    }

    /// Node representations, `(N, out_channels)`.
    ///
    /// `incidence` is `N x M` (targets are nodes, sources are hyperedges).
    pub fn forward(&self, x: &Tensor, incidence: &SparseStructure) -> Result<Tensor> {
        Ok(self.forward_with_hyperedges(x, incidence)?.nodes)
    }

    /// Both the stage 1 hyperedge and the stage 2 node representations.
    pub fn forward_with_hyperedges(
        &self,
        x: &Tensor,
        incidence: &SparseStructure,
    ) -> Result<HyperGatOutput> {
        let n = self.check_inputs(x, incidence)?;
        let m = incidence.num_sources();
        let c = self.config.out_channels;

        if incidence.is_empty() {
            tracing::warn!(
                nodes = n,
                hyperedges = m,
                "empty incidence, returning zero features"
            );
            return Ok(HyperGatOutput {
                hyperedges: Tensor::zeros((m, c), x.dtype(), x.device())?,
                nodes: Tensor::zeros((n, c), x.dtype(), x.device())?,
            });
        }
        tracing::debug!(
            nodes = n,
            hyperedges = m,
            incidences = incidence.num_edges(),
            "hypergraph attention forward"
        );

        let propagation = Propagation {
            combine: self.config.base_weight_combine,
            normalization: self.config.normalization,
            aggregation: self.config.aggregation,
        };
        let update = self.config.update_func;
        let slope = self.config.negative_slope;

        let p1 = project(x, self.weight1.as_tensor(), 1)?;
        let node_to_edge = incidence.transpose();
        let edges1 = EdgeIndex::new(&node_to_edge, x.device())?;
        let stage1 = kernel::attend(
            &SingleScorer::new(self.att_weight1.as_tensor(), slope),
            &p1,
            None,
            &edges1,
            propagation,
        )?;
        let hyperedges = update.apply(&stage1.output.squeeze(1)?)?;
        tracing::trace!(hyperedges = m, "stage 1 done");

        let p2 = project(&hyperedges, self.weight2.as_tensor(), 1)?;
        let edges2 = EdgeIndex::new(incidence, x.device())?;
        let stage2 = kernel::attend(
            &ConcatScorer::new(self.att_weight2.as_tensor(), slope),
            &p2,
            Some(&p1),
            &edges2,
            propagation,
        )?;
        let nodes = update.apply(&stage2.output.squeeze(1)?)?;
        tracing::trace!(nodes = n, "stage 2 done");

        Ok(HyperGatOutput { hyperedges, nodes })
    }

    fn check_inputs(&self, x: &Tensor, incidence: &SparseStructure) -> Result<usize> {
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
        if incidence.num_targets() != n {
            return Err(Error::DimensionMismatch {
                context: "incidence node count",
                expected: n,
                got: incidence.num_targets(),
            });
        }
        if let Some(h) = incidence.weights().heads() {
            if h != 1 {
                return Err(Error::DimensionMismatch {
                    context: "per-head incidence weights",
                    expected: 1,
                    got: h,
                });
            }
        }
        Ok(n)
    }
}

impl Parameterized for HyperGat {
    fn parameters(&self) -> Vec<Var> {
        vec![
            self.weight1.clone(),
            self.weight2.clone(),
            self.att_weight1.clone(),
            self.att_weight2.clone(),
        ]
    }

    fn reset_parameters(&mut self) -> Result<()> {
        self.init.reset(&self.weight1)?;
        self.init.reset(&self.weight2)?;
        self.init.reset(&self.att_weight1)?;
        self.init.reset(&self.att_weight2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Aggregation, Normalization, UpdateFunc};
    use toponet_core::EdgeWeights;

    fn close(a: &[Vec<f32>], b: &[Vec<f32>]) -> bool {
        a.len() == b.len()
            && a.iter()
                .zip(b)
                .all(|(x, y)| x.iter().zip(y).all(|(u, v)| (u - v).abs() < 1e-5))
    }

    #[test]
    fn test_parameter_shapes() {
        let layer = HyperGat::new(HyperGatConfig::new(5, 3), &Device::Cpu).unwrap();
        let shapes: Vec<Vec<usize>> = layer
            .parameters()
            .iter()
            .map(|v| v.dims().to_vec())
            .collect();
        assert_eq!(shapes, vec![vec![5, 3], vec![3, 3], vec![3, 1], vec![6, 1]]);
    }

    #[test]
    fn test_single_node_hyperedges_pass_projection_through() {
        let device = Device::Cpu;
        let mut config = HyperGatConfig::new(2, 2);
        config.update_func = UpdateFunc::Sigmoid;
        let layer = HyperGat::new(config, &device).unwrap();

        // Node i is the only member of hyperedge (i + 1) % 3.
        let incidence = SparseStructure::from_pairs(3, 3, &[(0, 1), (1, 2), (2, 0)]).unwrap();
        let x = Tensor::new(&[[1f32, -1.0], [0.5, 2.0], [-3.0, 0.0]], &device).unwrap();
        let out = layer.forward_with_hyperedges(&x, &incidence).unwrap();

        let p1 = x.matmul(layer.weight1().as_tensor()).unwrap();
        let expected = candle_nn::ops::sigmoid(&p1)
            .unwrap()
            .to_vec2::<f32>()
            .unwrap();
        let he = out.hyperedges.to_vec2::<f32>().unwrap();
        let reordered = vec![he[1].clone(), he[2].clone(), he[0].clone()];
        assert!(close(&reordered, &expected));
        assert_eq!(out.nodes.dims(), &[3, 2]);
    }

    #[test]
    fn test_stage_two_with_identity_weights() {
        let device = Device::Cpu;
        let layer = HyperGat::new(HyperGatConfig::new(2, 2), &device).unwrap();
        let eye = Tensor::new(&[[1f32, 0.0], [0.0, 1.0]], &device).unwrap();
        layer.set_weights(&eye, &eye).unwrap();

        // Hyperedge 0 = {0, 1}, hyperedge 1 = {1, 2}.
        let incidence =
            SparseStructure::from_pairs(3, 2, &[(0, 0), (1, 0), (1, 1), (2, 1)]).unwrap();
        let x = Tensor::new(&[[1f32, 0.0], [2.0, 1.0], [0.0, 3.0]], &device).unwrap();
        let out = layer.forward_with_hyperedges(&x, &incidence).unwrap();

        let he = out.hyperedges.to_vec2::<f32>().unwrap();
        assert!(close(&he, &[vec![3.0, 1.0], vec![2.0, 4.0]]));
        let nodes = out.nodes.to_vec2::<f32>().unwrap();
        assert!(close(
            &nodes,
            &[vec![3.0, 1.0], vec![5.0, 5.0], vec![2.0, 4.0]]
        ));
    }

    #[test]
    fn test_base_weights_scale_messages() {
        let device = Device::Cpu;
        let layer = HyperGat::new(HyperGatConfig::new(1, 1), &device).unwrap();
        let one = Tensor::new(&[[1f32]], &device).unwrap();
        layer.set_weights(&one, &one).unwrap();

        let incidence = SparseStructure::from_coo(
            2,
            1,
            vec![0, 1],
            vec![0, 0],
            EdgeWeights::Scalar(vec![2.0, 0.5]),
        )
        .unwrap();
        let x = Tensor::new(&[[1f32], [4.0]], &device).unwrap();
        let out = layer.forward_with_hyperedges(&x, &incidence).unwrap();
        // He = 2 * 1 + 0.5 * 4 = 4; node outputs 2 * 4 and 0.5 * 4.
        assert!(close(&out.hyperedges.to_vec2::<f32>().unwrap(), &[vec![4.0]]));
        assert!(close(
            &out.nodes.to_vec2::<f32>().unwrap(),
            &[vec![8.0], vec![2.0]]
        ));
    }

    #[test]
    fn test_empty_incidence() {
        let device = Device::Cpu;
        let layer = HyperGat::new(HyperGatConfig::new(2, 4), &device).unwrap();
        let x = Tensor::ones((3, 2), DType::F32, &device).unwrap();
        let out = layer
            .forward_with_hyperedges(&x, &SparseStructure::new(3, 5))
            .unwrap();
        assert_eq!(out.hyperedges.dims(), &[5, 4]);
        assert_eq!(out.nodes.dims(), &[3, 4]);
        assert_eq!(out.nodes.sum_all().unwrap().to_scalar::<f32>().unwrap(), 0.0);
    }

    #[test]
    fn test_neighbor_normalization_averages() {
        let device = Device::Cpu;
        let mut config = HyperGatConfig::new(1, 1);
        config.normalization = Normalization::Neighbor;
        let layer = HyperGat::new(config, &device).unwrap();
        let one = Tensor::new(&[[1f32]], &device).unwrap();
        layer.set_weights(&one, &one).unwrap();
        let zero = Tensor::zeros((1, 1), DType::F32, &device).unwrap();
        let zero2 = Tensor::zeros((2, 1), DType::F32, &device).unwrap();
        layer.set_attention(&zero, &zero2).unwrap();

        let incidence = SparseStructure::from_pairs(2, 1, &[(0, 0), (1, 0)]).unwrap();
        let x = Tensor::new(&[[2f32], [6.0]], &device).unwrap();
        let out = layer.forward_with_hyperedges(&x, &incidence).unwrap();
        // Uniform attention over the two members.
        assert!(close(&out.hyperedges.to_vec2::<f32>().unwrap(), &[vec![4.0]]));
    }

    #[test]
    fn test_parameters_receive_gradients() {
        let device = Device::Cpu;
        let incidence =
            SparseStructure::from_pairs(3, 2, &[(0, 0), (1, 0), (1, 1), (2, 1)]).unwrap();
        let x = Tensor::new(&[[1f32, 0.0], [2.0, 1.0], [0.0, 3.0]], &device).unwrap();
        for aggregation in [Aggregation::IndexAdd, Aggregation::Segmented] {
            let config = HyperGatConfig {
                in_channels: 2,
                out_channels: 2,
                update_func: UpdateFunc::Sigmoid,
                aggregation,
                ..Default::default()
            };
            let layer = HyperGat::new(config, &device).unwrap();
            let loss = layer
                .forward(&x, &incidence)
                .unwrap()
                .sqr()
                .unwrap()
                .sum_all()
                .unwrap();
            let grads = loss.backward().unwrap();
            for (i, p) in layer.parameters().iter().enumerate() {
                assert!(
                    grads.get(p.as_tensor()).is_some(),
                    "{aggregation}: parameter {i} has no gradient"
                );
            }
        }
    }

    #[test]
    fn test_node_count_checked() {
        let device = Device::Cpu;
        let layer = HyperGat::new(HyperGatConfig::new(2, 2), &device).unwrap();
        let x = Tensor::ones((3, 2), DType::F32, &device).unwrap();
        let incidence = SparseStructure::from_pairs(4, 2, &[(0, 0)]).unwrap();
        assert!(matches!(
            layer.forward(&x, &incidence),
            Err(Error::DimensionMismatch { expected: 3, got: 4, .. })
        ));
    }
}
