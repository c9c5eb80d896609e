//! Dense projection of entity features into per-head space.

use candle_core::Tensor;

use crate::{Error, Result};

/// `X' = X W`, reshaped to `(N, heads, out_channels)`. No bias.
///
/// # Errors
///
/// [`Error::DimensionMismatch`] if `x` is not a matrix, its width differs
/// from the weight's input width, or the weight's output width does not
/// split evenly into `heads`.
pub fn project(x: &Tensor, weight: &Tensor, heads: usize) -> Result<Tensor> {
    check_rank(x, 2, "feature matrix rank")?;
    let (n, cin) = x.dims2()?;
    let (win, wout) = weight.dims2()?;
    if cin != win {
        return Err(Error::DimensionMismatch {
            context: "projection input width",
            expected: win,
            got: cin,
        });
    }
    if heads == 0 || wout % heads != 0 {
        return Err(Error::DimensionMismatch {
            context: "heads dividing projection output width",
            expected: heads,
            got: wout,
        });
    }
    Ok(x.matmul(weight)?.reshape((n, heads, wout / heads))?)
}

pub(crate) fn check_rank(x: &Tensor, rank: usize, context: &'static str) -> Result<()> {
    if x.rank() != rank {
        return Err(Error::DimensionMismatch {
            context,
            expected: rank,
            got: x.rank(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn test_project_splits_heads() {
        let device = Device::Cpu;
        let x = Tensor::new(&[[1f32, 2.0], [3.0, 4.0]], &device).unwrap();
        // Cin = 2, heads = 2, Cout = 2
        let w = Tensor::new(&[[1f32, 0.0, 1.0, 1.0], [0.0, 1.0, 0.0, 1.0]], &device).unwrap();
        let out = project(&x, &w, 2).unwrap();
        assert_eq!(out.dims(), &[2, 2, 2]);
        assert_eq!(
            out.to_vec3::<f32>().unwrap(),
            vec![
                vec![vec![1.0, 2.0], vec![1.0, 3.0]],
                vec![vec![3.0, 4.0], vec![3.0, 7.0]],
            ]
        );
    }

    #[test]
    fn test_project_rejects_width_mismatch() {
        let device = Device::Cpu;
        let x = Tensor::zeros((4, 3), candle_core::DType::F32, &device).unwrap();
        let w = Tensor::zeros((2, 4), candle_core::DType::F32, &device).unwrap();
        assert!(matches!(
            project(&x, &w, 1),
            Err(Error::DimensionMismatch {
                expected: 2,
                got: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_project_rejects_vectors() {
        let device = Device::Cpu;
        let x = Tensor::zeros(3, candle_core::DType::F32, &device).unwrap();
        let w = Tensor::zeros((3, 3), candle_core::DType::F32, &device).unwrap();
        assert!(project(&x, &w, 1).is_err());
    }
}
