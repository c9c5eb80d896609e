//! End-to-end behavior of both layers on small hand-checked structures.

use candle_core::{DType, Device, Tensor};
use toponet::{
    AttentionActivation, AttentionConfig, CellAttention, EdgeWeights, HyperGat, HyperGatConfig,
    SparseStructure, UpdateFunc,
};

fn x3() -> Tensor {
    Tensor::new(&[[1f32, 2.0], [3.0, 4.0], [5.0, 6.0]], &Device::Cpu).unwrap()
}

#[test]
fn zero_attention_tanh_sums_both_neighbors() {
    let device = Device::Cpu;
    let config = AttentionConfig {
        in_channels: 2,
        out_channels: 1,
        activation: AttentionActivation::Tanh,
        ..Default::default()
    };
    let layer = CellAttention::new(config, &device).unwrap();
    layer
        .set_projection(&Tensor::new(&[[1f32], [0.0]], &device).unwrap())
        .unwrap();
    let zero = Tensor::zeros((1, 1, 1), DType::F32, &device).unwrap();
    layer.set_attention(&zero, &zero).unwrap();

    let s = SparseStructure::from_coo(
        3,
        3,
        vec![1, 1],
        vec![0, 2],
        EdgeWeights::Scalar(vec![0.0, 0.0]),
    )
    .unwrap();
    let out = layer.forward(&x3(), &s).unwrap().to_vec2::<f32>().unwrap();
    assert_eq!(out, vec![vec![0.0], vec![1.0 + 5.0], vec![0.0]]);
}

#[test]
fn empty_structure_gives_zero_rows_for_both_head_modes() {
    let device = Device::Cpu;
    for concat in [true, false] {
        let config = AttentionConfig {
            in_channels: 2,
            out_channels: 3,
            heads: 4,
            concat,
            ..Default::default()
        };
        let layer = CellAttention::new(config, &device).unwrap();
        let out = layer.forward(&x3(), &SparseStructure::new(3, 3)).unwrap();
        assert_eq!(out.dims(), &[3, layer.output_channels()]);
        let values = out.flatten_all().unwrap().to_vec1::<f32>().unwrap();
        assert!(values.iter().all(|&v| v == 0.0));
    }
}

#[test]
fn single_head_concat_matches_mean() {
    let device = Device::Cpu;
    let s = SparseStructure::from_pairs(3, 3, &[(0, 1), (0, 2), (1, 2), (2, 0)]).unwrap();
    let mut config = AttentionConfig::new(2, 3);
    let concat = CellAttention::new(config.clone(), &device).unwrap();
    config.concat = false;
    let mean = CellAttention::new(config, &device).unwrap();

    let a = concat.forward(&x3(), &s).unwrap().to_vec2::<f32>().unwrap();
    let b = mean.forward(&x3(), &s).unwrap().to_vec2::<f32>().unwrap();
    assert_eq!(a, b);
}

#[test]
fn repeated_forward_is_bit_identical() {
    let device = Device::Cpu;
    let s = SparseStructure::from_pairs(3, 3, &[(0, 1), (0, 2), (1, 0), (2, 2), (2, 1)]).unwrap();
    let config = AttentionConfig {
        in_channels: 2,
        out_channels: 2,
        heads: 2,
        aggregation: toponet::Aggregation::Segmented,
        ..Default::default()
    };
    let layer = CellAttention::new(config, &device).unwrap();
    let first = layer.forward(&x3(), &s).unwrap().to_vec2::<f32>().unwrap();
    let second = layer.forward(&x3(), &s).unwrap().to_vec2::<f32>().unwrap();
    assert_eq!(first, second);
}

#[test]
fn same_seed_same_layer() {
    let device = Device::Cpu;
    let s = SparseStructure::from_pairs(3, 3, &[(0, 1), (1, 2)]).unwrap();
    let a = CellAttention::new(AttentionConfig::new(2, 2), &device).unwrap();
    let b = CellAttention::new(AttentionConfig::new(2, 2), &device).unwrap();
    assert_eq!(
        a.forward(&x3(), &s).unwrap().to_vec2::<f32>().unwrap(),
        b.forward(&x3(), &s).unwrap().to_vec2::<f32>().unwrap()
    );
}

#[test]
fn one_node_per_hyperedge_passes_stage_one_through_update() {
    let device = Device::Cpu;
    let config = HyperGatConfig {
        in_channels: 2,
        out_channels: 3,
        update_func: UpdateFunc::Sigmoid,
        ..Default::default()
    };
    let layer = HyperGat::new(config, &device).unwrap();
    let incidence = SparseStructure::from_pairs(3, 3, &[(0, 0), (1, 1), (2, 2)]).unwrap();
    let out = layer.forward_with_hyperedges(&x3(), &incidence).unwrap();

    let p1 = x3().matmul(layer.weight1().as_tensor()).unwrap();
    let expected: Vec<Vec<f32>> = p1
        .to_vec2::<f32>()
        .unwrap()
        .into_iter()
        .map(|row| row.into_iter().map(|v| 1.0 / (1.0 + (-v).exp())).collect())
        .collect();
    let got = out.hyperedges.to_vec2::<f32>().unwrap();
    for (g, e) in got.iter().zip(&expected) {
        for (a, b) in g.iter().zip(e) {
            assert!((a - b).abs() < 1e-5, "{a} vs {b}");
        }
    }
}

#[test]
fn hypergraph_isolated_node_gets_update_of_zero() {
    let device = Device::Cpu;
    let config = HyperGatConfig {
        in_channels: 2,
        out_channels: 2,
        update_func: UpdateFunc::Sigmoid,
        ..Default::default()
    };
    let layer = HyperGat::new(config, &device).unwrap();
    // Node 2 belongs to no hyperedge.
    let incidence = SparseStructure::from_pairs(3, 1, &[(0, 0), (1, 0)]).unwrap();
    let nodes = layer.forward(&x3(), &incidence).unwrap().to_vec2::<f32>().unwrap();
    assert_eq!(nodes[2], vec![0.5, 0.5]);
}
