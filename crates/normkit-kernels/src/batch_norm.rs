use num_traits::Float;
use rayon::prelude::*;

use crate::{error::KernelError, parallel::ExecutionStrategy};

/// A statistics buffer viewed as broadcast against a `[N, H, W, C]` input.
///
/// The buffer is either rank 1 (`[C]` or `[1]`, applied along the channel axis) or
/// rank 4 with every axis equal to the input's or equal to 1. Broadcast axes get a
/// zero stride, so the kernel never materializes the expanded buffer.
pub struct BroadcastParam<'a, T> {
    data: &'a [T],
    strides: [usize; 4],
}

impl<'a, T: Copy> BroadcastParam<'a, T> {
    /// Creates a broadcast view of `data`, which has shape `shape`, against `target`.
    ///
    /// # Errors
    ///
    /// * [`KernelError::InvalidShape`] if `shape` is neither rank 1 nor rank 4.
    /// * [`KernelError::LengthMismatch`] if `data` does not hold `shape`'s element count.
    /// * [`KernelError::BroadcastMismatch`] if an axis is neither 1 nor the target's size.
    ///
    /// # Example
    ///
    /// ```
    /// use normkit_kernels::BroadcastParam;
    ///
    /// let mean = [0.0f32, 1.0, 2.0];
    /// assert!(BroadcastParam::new(&mean, &[3], [2, 1, 4, 3]).is_ok());
    /// assert!(BroadcastParam::new(&mean, &[3], [2, 1, 3, 4]).is_err());
    /// ```
    pub fn new(data: &'a [T], shape: &[usize], target: [usize; 4]) -> Result<Self, KernelError> {
        let shape4 = match *shape {
            [c] => [1, 1, 1, c],
            [n, h, w, c] => [n, h, w, c],
            _ => return Err(KernelError::InvalidShape(shape.to_vec())),
        };

        let numel = shape4.iter().product::<usize>();
        if data.len() != numel {
            return Err(KernelError::LengthMismatch(numel, data.len()));
        }

        let mut strides = [0; 4];
        let mut stride = 1;
        for axis in (0..4).rev() {
            if shape4[axis] == target[axis] {
                strides[axis] = stride;
            } else if shape4[axis] != 1 {
                return Err(KernelError::BroadcastMismatch {
                    shape: shape.to_vec(),
                    target,
                });
            }
            stride *= shape4[axis];
        }

        Ok(Self { data, strides })
    }

    #[inline]
    fn get(&self, index: [usize; 4]) -> T {
        let offset = index
            .iter()
            .zip(self.strides.iter())
            .fold(0, |acc, (&idx, &stride)| acc + idx * stride);
        self.data[offset]
    }
}

/// Normalizes a `[N, H, W, C]` buffer with precomputed statistics.
///
/// Computes, for every element,
///
/// ```text
/// dst = offset + (src - mean) * scale / sqrt(variance + variance_epsilon)
/// ```
///
/// An absent `scale` is the identity (1) and an absent `offset` is the identity (0).
///
/// # Arguments
///
/// * `src` - Input buffer in row-major `[N, H, W, C]` order.
/// * `dst` - Output buffer, same length as `src`.
/// * `shape` - The `[N, H, W, C]` shape of both buffers.
/// * `mean`, `variance` - Statistics broadcast against `shape`.
/// * `scale`, `offset` - Optional affine parameters broadcast against `shape`.
/// * `variance_epsilon` - Added to the variance before the square root.
/// * `strategy` - Whether to walk rows on the Rayon pool or on the current thread.
///
/// # Errors
///
/// If `src` or `dst` does not hold `shape`'s element count, an error is returned.
///
/// # Example
///
/// ```
/// use normkit_kernels::{batch_norm_4d_kernel, BroadcastParam, ExecutionStrategy};
///
/// let shape = [1, 1, 2, 2];
/// let src = [1.0f32, 2.0, 3.0, 4.0];
/// let mut dst = [0.0f32; 4];
/// let mean = BroadcastParam::new(&[1.0, 2.0], &[2], shape).unwrap();
/// let variance = BroadcastParam::new(&[1.0, 1.0], &[2], shape).unwrap();
///
/// batch_norm_4d_kernel(&src, &mut dst, shape, &mean, &variance, None, None, 0.0, ExecutionStrategy::Serial)
///     .unwrap();
/// assert_eq!(dst, [0.0, 0.0, 2.0, 2.0]);
/// ```
#[allow(clippy::too_many_arguments)]
pub fn batch_norm_4d_kernel<T>(
    src: &[T],
    dst: &mut [T],
    shape: [usize; 4],
    mean: &BroadcastParam<'_, T>,
    variance: &BroadcastParam<'_, T>,
    scale: Option<&BroadcastParam<'_, T>>,
    offset: Option<&BroadcastParam<'_, T>>,
    variance_epsilon: T,
    strategy: ExecutionStrategy,
) -> Result<(), KernelError>
where
    T: Float + Send + Sync,
{
    let numel = shape.iter().product::<usize>();
    if src.len() != numel {
        return Err(KernelError::LengthMismatch(numel, src.len()));
    }
    if dst.len() != numel {
        return Err(KernelError::LengthMismatch(numel, dst.len()));
    }
    if numel == 0 {
        return Ok(());
    }

    let [_, rows, cols, channels] = shape;

    let normalize_row = |row: usize, src_row: &[T], dst_row: &mut [T]| {
        let (n, h, w) = (row / (rows * cols), (row / cols) % rows, row % cols);
        for (c, (&x, y)) in src_row.iter().zip(dst_row.iter_mut()).enumerate() {
            let index = [n, h, w, c];
            let inv_std = (variance.get(index) + variance_epsilon).sqrt().recip();
            let mut value = (x - mean.get(index)) * inv_std;
            if let Some(scale) = scale {
                value = value * scale.get(index);
            }
            if let Some(offset) = offset {
                value = value + offset.get(index);
            }
            *y = value;
        }
    };

    match strategy {
        ExecutionStrategy::Parallel => src
            .par_chunks_exact(channels)
            .zip(dst.par_chunks_exact_mut(channels))
            .enumerate()
            .for_each(|(row, (src_row, dst_row))| normalize_row(row, src_row, dst_row)),
        ExecutionStrategy::Serial => src
            .chunks_exact(channels)
            .zip(dst.chunks_exact_mut(channels))
            .enumerate()
            .for_each(|(row, (src_row, dst_row))| normalize_row(row, src_row, dst_row)),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::{batch_norm_4d_kernel, BroadcastParam};
    use crate::{error::KernelError, parallel::ExecutionStrategy};

    #[test]
    fn test_per_channel_statistics() -> Result<(), KernelError> {
        let shape = [1, 2, 1, 2];
        let src = [1.0f32, 10.0, 3.0, 30.0];
        let mut dst = [0.0f32; 4];

        let mean = BroadcastParam::new(&[2.0, 20.0], &[2], shape)?;
        let variance = BroadcastParam::new(&[4.0, 100.0], &[2], shape)?;

        batch_norm_4d_kernel(
            &src,
            &mut dst,
            shape,
            &mean,
            &variance,
            None,
            None,
            0.0,
            ExecutionStrategy::Serial,
        )?;

        assert_relative_eq!(dst[0], -0.5);
        assert_relative_eq!(dst[1], -1.0);
        assert_relative_eq!(dst[2], 0.5);
        assert_relative_eq!(dst[3], 1.0);
        Ok(())
    }

    #[test]
    fn test_scale_and_offset() -> Result<(), KernelError> {
        let shape = [1, 1, 1, 3];
        let src = [1.0f64, 2.0, 3.0];
        let mut dst = [0.0f64; 3];

        let mean = BroadcastParam::new(&[0.0], &[1], shape)?;
        let variance = BroadcastParam::new(&[1.0], &[1], shape)?;
        let scale = BroadcastParam::new(&[2.0, 3.0, 4.0], &[3], shape)?;
        let offset = BroadcastParam::new(&[0.5, 0.5, 0.5], &[3], shape)?;

        batch_norm_4d_kernel(
            &src,
            &mut dst,
            shape,
            &mean,
            &variance,
            Some(&scale),
            Some(&offset),
            0.0,
            ExecutionStrategy::Serial,
        )?;

        assert_eq!(dst, [2.5, 6.5, 12.5]);
        Ok(())
    }

    #[test]
    fn test_elementwise_statistics() -> Result<(), KernelError> {
        let shape = [1, 1, 2, 2];
        let src = [1.0f32, 2.0, 3.0, 4.0];
        let mut dst = [0.0f32; 4];

        let mean = BroadcastParam::new(&[1.0, 2.0, 3.0, 4.0], &[1, 1, 2, 2], shape)?;
        let variance = BroadcastParam::new(&[1.0, 1.0, 1.0, 1.0], &[1, 1, 2, 2], shape)?;

        batch_norm_4d_kernel(
            &src,
            &mut dst,
            shape,
            &mean,
            &variance,
            None,
            None,
            0.0,
            ExecutionStrategy::Parallel,
        )?;

        assert_eq!(dst, [0.0; 4]);
        Ok(())
    }

    #[test]
    fn test_rank4_broadcast_axis() -> Result<(), KernelError> {
        // mean varies along H only
        let shape = [1, 2, 2, 1];
        let src = [1.0f32, 1.0, 5.0, 5.0];
        let mut dst = [0.0f32; 4];

        let mean = BroadcastParam::new(&[1.0, 5.0], &[1, 2, 1, 1], shape)?;
        let variance = BroadcastParam::new(&[1.0], &[1], shape)?;

        batch_norm_4d_kernel(
            &src,
            &mut dst,
            shape,
            &mean,
            &variance,
            None,
            None,
            0.0,
            ExecutionStrategy::Serial,
        )?;

        assert_eq!(dst, [0.0; 4]);
        Ok(())
    }

    #[test]
    fn test_variance_epsilon() -> Result<(), KernelError> {
        let shape = [1, 1, 1, 1];
        let mut dst = [0.0f32];
        let mean = BroadcastParam::new(&[0.0], &[1], shape)?;
        let variance = BroadcastParam::new(&[0.0], &[1], shape)?;

        batch_norm_4d_kernel(
            &[1.0],
            &mut dst,
            shape,
            &mean,
            &variance,
            None,
            None,
            0.25,
            ExecutionStrategy::Serial,
        )?;

        assert_relative_eq!(dst[0], 2.0);
        Ok(())
    }

    #[test]
    fn test_parallel_matches_serial() -> Result<(), KernelError> {
        let shape = [2, 3, 4, 5];
        let numel = shape.iter().product::<usize>();
        let src: Vec<f32> = (0..numel).map(|i| (i as f32 * 0.37).sin()).collect();
        let mean_data: Vec<f32> = (0..5).map(|c| c as f32 * 0.1).collect();
        let variance_data: Vec<f32> = (0..5).map(|c| 1.0 + c as f32).collect();

        let mean = BroadcastParam::new(&mean_data, &[5], shape)?;
        let variance = BroadcastParam::new(&variance_data, &[5], shape)?;

        let mut serial = vec![0.0f32; numel];
        let mut parallel = vec![0.0f32; numel];
        for (dst, strategy) in [
            (&mut serial, ExecutionStrategy::Serial),
            (&mut parallel, ExecutionStrategy::Parallel),
        ] {
            batch_norm_4d_kernel(
                &src, dst, shape, &mean, &variance, None, None, 1e-3, strategy,
            )?;
        }

        assert_eq!(serial, parallel);
        Ok(())
    }

    #[test]
    fn test_broadcast_mismatch() {
        let res = BroadcastParam::new(&[0.0f32; 3], &[3], [1, 1, 2, 4]);
        assert_eq!(
            res.err(),
            Some(KernelError::BroadcastMismatch {
                shape: vec![3],
                target: [1, 1, 2, 4],
            })
        );
    }

    #[test]
    fn test_invalid_param_rank() {
        let res = BroadcastParam::new(&[0.0f32; 4], &[2, 2], [1, 1, 2, 2]);
        assert_eq!(res.err(), Some(KernelError::InvalidShape(vec![2, 2])));
    }

    #[test]
    fn test_length_mismatch() -> Result<(), KernelError> {
        let shape = [1, 1, 1, 2];
        let mean = BroadcastParam::new(&[0.0f32], &[1], shape)?;
        let variance = BroadcastParam::new(&[1.0f32], &[1], shape)?;
        let mut dst = [0.0f32; 2];
        let res = batch_norm_4d_kernel(
            &[1.0, 2.0, 3.0],
            &mut dst,
            shape,
            &mean,
            &variance,
            None,
            None,
            0.0,
            ExecutionStrategy::Serial,
        );
        assert_eq!(res, Err(KernelError::LengthMismatch(2, 3)));
        Ok(())
    }

    #[test]
    fn test_empty_input() -> Result<(), KernelError> {
        let shape = [1, 0, 1, 3];
        let mean = BroadcastParam::new(&[0.0f32; 3], &[3], shape)?;
        let variance = BroadcastParam::new(&[1.0f32; 3], &[3], shape)?;
        let mut dst: [f32; 0] = [];
        batch_norm_4d_kernel(
            &[],
            &mut dst,
            shape,
            &mean,
            &variance,
            None,
            None,
            0.0,
            ExecutionStrategy::Parallel,
        )?;
        Ok(())
    }
}
