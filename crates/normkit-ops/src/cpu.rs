use std::sync::Arc;

use normkit_kernels::{batch_norm_4d_kernel, BroadcastParam, ExecutionStrategy};
use normkit_tensor::Tensor;
use num_traits::{Float, NumCast};

use crate::{
    engine::{Engine, KernelAttrs, NamedTensors, BATCH_NORM_4D},
    error::EngineError,
    tape::{OpTape, Tape},
};

/// An [`Engine`] that runs kernels on the CPU.
///
/// Supports the [`BATCH_NORM_4D`] kernel. Rows are processed on the Rayon pool unless
/// [`CpuEngine::with_parallel`] turns that off.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use normkit_ops::{CpuEngine, OpTape};
///
/// let tape = Arc::new(OpTape::new());
/// let engine = CpuEngine::new().with_parallel(false).with_tape(tape.clone());
/// assert!(tape.is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CpuEngine {
    strategy: ExecutionStrategy,
    tape: Option<Arc<OpTape>>,
}

impl CpuEngine {
    /// Creates an engine with parallel execution and no tape.
    pub fn new() -> Self {
        Self::default()
    }

    /// Chooses between parallel and single-threaded kernel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.strategy = if parallel {
            ExecutionStrategy::Parallel
        } else {
            ExecutionStrategy::Serial
        };
        self
    }

    /// Records every public op call on `tape`.
    pub fn with_tape(mut self, tape: Arc<OpTape>) -> Self {
        self.tape = Some(tape);
        self
    }

    fn batch_norm_4d<T>(
        &self,
        inputs: &NamedTensors<T>,
        attrs: &KernelAttrs,
    ) -> Result<Tensor<T>, EngineError>
    where
        T: Float + Send + Sync,
    {
        let x = required(inputs, "x")?;
        let shape: [usize; 4] =
            x.shape()
                .try_into()
                .map_err(|_| EngineError::UnsupportedRank {
                    kernel: BATCH_NORM_4D.to_string(),
                    expected: 4,
                    actual: x.rank(),
                })?;

        let mean = required(inputs, "mean")?;
        let variance = required(inputs, "variance")?;
        let mean = BroadcastParam::new(mean.as_slice(), mean.shape(), shape)?;
        let variance = BroadcastParam::new(variance.as_slice(), variance.shape(), shape)?;
        let scale = inputs
            .get("scale")
            .map(|t| BroadcastParam::new(t.as_slice(), t.shape(), shape))
            .transpose()?;
        let offset = inputs
            .get("offset")
            .map(|t| BroadcastParam::new(t.as_slice(), t.shape(), shape))
            .transpose()?;

        let epsilon_name = "varianceEpsilon";
        let epsilon = attrs
            .get_float(epsilon_name)
            .ok_or_else(|| EngineError::MissingAttr {
                kernel: BATCH_NORM_4D.to_string(),
                name: epsilon_name.to_string(),
            })?;
        // float casts saturate to infinity instead of failing
        let converted = <T as NumCast>::from(epsilon)
            .filter(|converted: &T| converted.is_finite() || !epsilon.is_finite());
        let epsilon = converted.ok_or_else(|| EngineError::InvalidAttr {
            kernel: BATCH_NORM_4D.to_string(),
            name: epsilon_name.to_string(),
            reason: format!("{epsilon} is not representable in the element type"),
        })?;

        log::debug!("running {} on {:?} ({:?})", BATCH_NORM_4D, shape, self.strategy);

        let mut dst = vec![T::zero(); x.numel()];
        batch_norm_4d_kernel(
            x.as_slice(),
            &mut dst,
            shape,
            &mean,
            &variance,
            scale.as_ref(),
            offset.as_ref(),
            epsilon,
            self.strategy,
        )?;

        Ok(Tensor::from_shape_vec(x.shape(), dst)?)
    }
}

fn required<'a, T>(inputs: &'a NamedTensors<T>, name: &str) -> Result<&'a Tensor<T>, EngineError> {
    inputs.get(name).ok_or_else(|| EngineError::MissingInput {
        kernel: BATCH_NORM_4D.to_string(),
        name: name.to_string(),
    })
}

impl<T> Engine<T> for CpuEngine
where
    T: Float + Send + Sync,
{
    fn execute_kernel(
        &self,
        kernel: &str,
        inputs: &NamedTensors<T>,
        attrs: &KernelAttrs,
    ) -> Result<Tensor<T>, EngineError> {
        match kernel {
            BATCH_NORM_4D => self.batch_norm_4d(inputs, attrs),
            other => Err(EngineError::UnknownKernel(other.to_string())),
        }
    }

    fn tape(&self) -> Option<&dyn Tape> {
        self.tape.as_deref().map(|tape| tape as &dyn Tape)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use normkit_kernels::KernelError;
    use normkit_tensor::Tensor;

    use super::CpuEngine;
    use crate::{
        engine::{AttrValue, Engine, KernelAttrs, NamedTensors, BATCH_NORM_4D},
        error::EngineError,
    };

    fn attrs() -> KernelAttrs {
        KernelAttrs::new().with("varianceEpsilon", AttrValue::Float(0.0))
    }

    #[test]
    fn test_batch_norm_4d() -> Result<(), Box<dyn std::error::Error>> {
        let engine = CpuEngine::new();
        let inputs = NamedTensors::new()
            .with("x", Some(Tensor::<f32>::from_shape_vec(&[1, 1, 2, 2], vec![1.0, 2.0, 3.0, 4.0])?))
            .with("mean", Some(Tensor::from_shape_vec(&[2], vec![2.0, 3.0])?))
            .with("variance", Some(Tensor::from_shape_vec(&[2], vec![1.0, 4.0])?))
            .with("scale", None)
            .with("offset", Some(Tensor::from_shape_vec(&[1], vec![10.0])?));

        let out = engine.execute_kernel(BATCH_NORM_4D, &inputs, &attrs())?;

        assert_eq!(out.shape(), &[1, 1, 2, 2]);
        let expected = [9.0, 9.5, 11.0, 10.5];
        for (a, b) in out.iter().zip(expected.iter()) {
            assert_relative_eq!(*a, *b);
        }
        Ok(())
    }

    #[test]
    fn test_unknown_kernel() {
        let engine = CpuEngine::new();
        let res = engine.execute_kernel("Conv2D", &NamedTensors::<f32>::new(), &attrs());
        assert_eq!(res.unwrap_err(), EngineError::UnknownKernel("Conv2D".to_string()));
    }

    #[test]
    fn test_missing_input() {
        let engine = CpuEngine::new();
        let inputs = NamedTensors::new().with("x", Some(Tensor::<f32>::zeros(&[1, 1, 1, 1]).unwrap()));
        let res = engine.execute_kernel(BATCH_NORM_4D, &inputs, &attrs());
        assert_eq!(
            res.unwrap_err(),
            EngineError::MissingInput {
                kernel: BATCH_NORM_4D.to_string(),
                name: "mean".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_attr() {
        let engine = CpuEngine::new();
        let inputs = NamedTensors::new()
            .with("x", Some(Tensor::<f32>::zeros(&[1, 1, 1, 1]).unwrap()))
            .with("mean", Some(Tensor::zeros(&[1]).unwrap()))
            .with("variance", Some(Tensor::zeros(&[1]).unwrap()));
        let res = engine.execute_kernel(BATCH_NORM_4D, &inputs, &KernelAttrs::new());
        assert!(matches!(res, Err(EngineError::MissingAttr { .. })));
    }

    #[test]
    fn test_epsilon_out_of_range() {
        let engine = CpuEngine::new();
        let inputs = NamedTensors::new()
            .with("x", Some(Tensor::<f32>::zeros(&[1, 1, 1, 1]).unwrap()))
            .with("mean", Some(Tensor::zeros(&[1]).unwrap()))
            .with("variance", Some(Tensor::zeros(&[1]).unwrap()));
        let attrs = KernelAttrs::new().with("varianceEpsilon", AttrValue::Float(1e300));

        let res = engine.execute_kernel(BATCH_NORM_4D, &inputs, &attrs);
        assert!(matches!(
            res,
            Err(EngineError::InvalidAttr { ref name, .. }) if name == "varianceEpsilon"
        ));

        // the same value fits in f64
        let inputs = NamedTensors::new()
            .with("x", Some(Tensor::<f64>::zeros(&[1, 1, 1, 1]).unwrap()))
            .with("mean", Some(Tensor::zeros(&[1]).unwrap()))
            .with("variance", Some(Tensor::zeros(&[1]).unwrap()));
        assert!(engine.execute_kernel(BATCH_NORM_4D, &inputs, &attrs).is_ok());
    }

    #[test]
    fn test_unsupported_rank() {
        let engine = CpuEngine::new();
        let inputs = NamedTensors::new()
            .with("x", Some(Tensor::<f64>::zeros(&[1, 1, 1, 1, 2]).unwrap()))
            .with("mean", Some(Tensor::zeros(&[2]).unwrap()))
            .with("variance", Some(Tensor::zeros(&[2]).unwrap()));
        let res = engine.execute_kernel(BATCH_NORM_4D, &inputs, &attrs());
        assert_eq!(
            res.unwrap_err(),
            EngineError::UnsupportedRank {
                kernel: BATCH_NORM_4D.to_string(),
                expected: 4,
                actual: 5,
            }
        );
    }

    #[test]
    fn test_kernel_error_propagates() {
        let engine = CpuEngine::new().with_parallel(false);
        let inputs = NamedTensors::new()
            .with("x", Some(Tensor::<f32>::zeros(&[1, 1, 2, 3]).unwrap()))
            .with("mean", Some(Tensor::zeros(&[2]).unwrap()))
            .with("variance", Some(Tensor::zeros(&[3]).unwrap()));
        let res = engine.execute_kernel(BATCH_NORM_4D, &inputs, &attrs());
        assert_eq!(
            res.unwrap_err(),
            EngineError::Kernel(KernelError::BroadcastMismatch {
                shape: vec![2],
                target: [1, 1, 2, 3],
            })
        );
    }
}
