//! Head combination.

use candle_core::Tensor;

use crate::Result;

/// `(N, H, C)` to `(N, H * C)` (head-major) when `concat`, else the mean
/// over heads, `(N, C)`.
pub fn combine_heads(acc: &Tensor, concat: bool) -> Result<Tensor> {
    let (n, h, c) = acc.dims3()?;
    if concat {
        Ok(acc.reshape((n, h * c))?)
    } else {
        Ok(acc.mean(1)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn test_concat_is_head_major() {
        let acc = Tensor::new(&[[[1f32, 2.0], [3.0, 4.0], [5.0, 6.0]]], &Device::Cpu).unwrap();
        let out = combine_heads(&acc, true).unwrap();
        assert_eq!(
            out.to_vec2::<f32>().unwrap(),
            vec![vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]]
        );
    }

    #[test]
    fn test_mean_over_heads() {
        let acc = Tensor::new(&[[[1f32, 2.0], [3.0, 4.0], [5.0, 6.0]]], &Device::Cpu).unwrap();
        let out = combine_heads(&acc, false).unwrap();
        assert_eq!(out.to_vec2::<f32>().unwrap(), vec![vec![3.0, 4.0]]);
    }

    #[test]
    fn test_single_head_concat_equals_mean() {
        let acc = Tensor::new(&[[[1.5f32, -2.0]], [[0.0, 7.0]]], &Device::Cpu).unwrap();
        let a = combine_heads(&acc, true).unwrap().to_vec2::<f32>().unwrap();
        let b = combine_heads(&acc, false).unwrap().to_vec2::<f32>().unwrap();
        assert_eq!(a, b);
    }
}
