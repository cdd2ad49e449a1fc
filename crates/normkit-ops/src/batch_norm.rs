//! Batch normalization for inputs of any rank.
//!
//! [`batch_normalization`] accepts any rank. [`batch_normalization_2d`],
//! [`batch_normalization_3d`] and [`batch_normalization_4d`] first check that the input
//! and every statistics operand have the expected rank, so mistakes surface with a
//! rank-specific message. All four share one body that
//!
//! 1. checks the variance epsilon and that every operand broadcasts against the input,
//! 2. reshapes the input to rank 4 and the operands to rank 1 or 4,
//! 3. runs [`BATCH_NORM_4D`] on the engine,
//! 4. reshapes the result back to the input's shape.
//!
//! Reshapes never copy data, and nothing is computed here: the arithmetic lives in the
//! engine's kernel.

use normkit_tensor::Tensor;

use crate::{
    broadcast::{canonicalize_input, canonicalize_param, restore_input_shape},
    engine::{AttrValue, Engine, KernelAttrs, NamedTensors, BATCH_NORM_4D},
    error::BatchNormError,
    operand::Operand,
    rank::Rank,
    tape::recorded,
    validate::{validate_broadcast, validate_input_rank, validate_param_rank},
};

/// Default value added to the variance to avoid dividing by zero.
pub const DEFAULT_VARIANCE_EPSILON: f64 = 0.001;

/// Tunable settings of a batch normalization call.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase", default)
)]
pub struct BatchNormConfig {
    /// Value added to the variance before taking its square root.
    pub variance_epsilon: f64,
}

impl Default for BatchNormConfig {
    fn default() -> Self {
        Self {
            variance_epsilon: DEFAULT_VARIANCE_EPSILON,
        }
    }
}

/// The statistics and settings of a batch normalization call.
///
/// `mean` and `variance` are required. `scale` and `offset` are optional; when absent
/// the kernel applies no scaling and no shift.
///
/// # Example
///
/// ```
/// use normkit_ops::BatchNormParams;
/// use normkit_tensor::Tensor;
///
/// let mean = Tensor::<f32>::zeros(&[3]).unwrap();
/// let variance = Tensor::<f32>::from_shape_val(&[3], 1.0).unwrap();
/// let gamma = Tensor::<f32>::from_shape_val(&[3], 2.0).unwrap();
///
/// let params = BatchNormParams::new(&mean, &variance)
///     .with_scale(&gamma)
///     .with_variance_epsilon(1e-5);
/// assert!(params.offset.is_none());
/// ```
pub struct BatchNormParams<'a, T> {
    /// Mean, rank 1 (per channel) or the input's rank.
    pub mean: &'a Tensor<T>,
    /// Variance, rank 1 (per channel) or the input's rank.
    pub variance: &'a Tensor<T>,
    /// Optional scale.
    pub scale: Option<&'a Tensor<T>>,
    /// Optional offset.
    pub offset: Option<&'a Tensor<T>>,
    /// Value added to the variance; must not be negative.
    pub variance_epsilon: f64,
}

impl<'a, T> BatchNormParams<'a, T> {
    /// Creates the parameters with no scale, no offset and the default epsilon.
    pub fn new(mean: &'a Tensor<T>, variance: &'a Tensor<T>) -> Self {
        Self {
            mean,
            variance,
            scale: None,
            offset: None,
            variance_epsilon: DEFAULT_VARIANCE_EPSILON,
        }
    }

    /// Sets the scale.
    pub fn with_scale(mut self, scale: &'a Tensor<T>) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Sets the offset.
    pub fn with_offset(mut self, offset: &'a Tensor<T>) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Sets the variance epsilon.
    pub fn with_variance_epsilon(mut self, variance_epsilon: f64) -> Self {
        self.variance_epsilon = variance_epsilon;
        self
    }

    /// Applies the settings of `config`.
    pub fn with_config(self, config: &BatchNormConfig) -> Self {
        self.with_variance_epsilon(config.variance_epsilon)
    }

    fn operands(&self) -> [(Operand, Option<&'a Tensor<T>>); 4] {
        [
            (Operand::Mean, Some(self.mean)),
            (Operand::Variance, Some(self.variance)),
            (Operand::Scale, self.scale),
            (Operand::Offset, self.offset),
        ]
    }

    fn call_inputs<'b>(&self, x: &'b Tensor<T>) -> [(Operand, Option<&'b Tensor<T>>); 5]
    where
        'a: 'b,
    {
        let [mean, variance, scale, offset] = self.operands();
        [(Operand::X, Some(x)), mean, variance, scale, offset]
    }
}

impl<T> Clone for BatchNormParams<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for BatchNormParams<'_, T> {}

/// Batch normalization of an input of any rank.
///
/// Statistics of the input's rank are applied element-wise (with size-1 axes
/// broadcast); rank-1 statistics are applied per channel, the channel being the last
/// axis; scalars apply everywhere.
///
/// # Arguments
///
/// * `engine` - Executes the kernel.
/// * `x` - The input tensor.
/// * `params` - Statistics, optional scale and offset, and the variance epsilon.
///
/// # Returns
///
/// A tensor with the same shape as `x`.
///
/// # Errors
///
/// * [`BatchNormError::InvalidEpsilon`] if the epsilon is negative or NaN.
/// * [`BatchNormError::Shape`] if an operand cannot be broadcast against `x`.
/// * [`BatchNormError::Engine`] if the engine fails, unchanged.
///
/// # Example
///
/// ```
/// use normkit_ops::{batch_normalization, BatchNormParams, CpuEngine};
/// use normkit_tensor::Tensor;
///
/// let x = Tensor::<f32>::from_shape_vec(&[2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
/// let mean = Tensor::<f32>::from_shape_vec(&[2], vec![2.0, 3.0]).unwrap();
/// let variance = Tensor::<f32>::from_shape_val(&[2], 1.0).unwrap();
///
/// let params = BatchNormParams::new(&mean, &variance).with_variance_epsilon(0.0);
/// let y = batch_normalization(&CpuEngine::new(), &x, &params).unwrap();
/// assert_eq!(y.shape(), &[2, 2]);
/// assert_eq!(y.as_slice(), &[-1.0, -1.0, 1.0, 1.0]);
/// ```
pub fn batch_normalization<T, E>(
    engine: &E,
    x: &Tensor<T>,
    params: &BatchNormParams<'_, T>,
) -> Result<Tensor<T>, BatchNormError>
where
    E: Engine<T> + ?Sized,
{
    recorded(engine, "batchNormalization", &params.call_inputs(x), || {
        dispatch(engine, x, params)
    })
}

/// Batch normalization of a rank-2 input.
///
/// # Errors
///
/// [`crate::ShapeError::RankMismatch`] if `x` is not rank 2, or if a supplied
/// statistic is neither rank 2 nor rank 1. Otherwise as [`batch_normalization`].
pub fn batch_normalization_2d<T, E>(
    engine: &E,
    x: &Tensor<T>,
    params: &BatchNormParams<'_, T>,
) -> Result<Tensor<T>, BatchNormError>
where
    E: Engine<T> + ?Sized,
{
    recorded(engine, "batchNormalization2d", &params.call_inputs(x), || {
        dispatch_fixed_rank(engine, Rank::Two, x, params)
    })
}

/// Batch normalization of a rank-3 input.
///
/// # Errors
///
/// [`crate::ShapeError::RankMismatch`] if `x` is not rank 3, or if a supplied
/// statistic is neither rank 3 nor rank 1. Otherwise as [`batch_normalization`].
pub fn batch_normalization_3d<T, E>(
    engine: &E,
    x: &Tensor<T>,
    params: &BatchNormParams<'_, T>,
) -> Result<Tensor<T>, BatchNormError>
where
    E: Engine<T> + ?Sized,
{
    recorded(engine, "batchNormalization3d", &params.call_inputs(x), || {
        dispatch_fixed_rank(engine, Rank::Three, x, params)
    })
}

/// Batch normalization of a rank-4 input.
///
/// # Errors
///
/// [`crate::ShapeError::RankMismatch`] if `x` is not rank 4, or if a supplied
/// statistic is neither rank 4 nor rank 1. Otherwise as [`batch_normalization`].
pub fn batch_normalization_4d<T, E>(
    engine: &E,
    x: &Tensor<T>,
    params: &BatchNormParams<'_, T>,
) -> Result<Tensor<T>, BatchNormError>
where
    E: Engine<T> + ?Sized,
{
    recorded(engine, "batchNormalization4d", &params.call_inputs(x), || {
        dispatch_fixed_rank(engine, Rank::Four, x, params)
    })
}

fn dispatch_fixed_rank<T, E>(
    engine: &E,
    rank: Rank,
    x: &Tensor<T>,
    params: &BatchNormParams<'_, T>,
) -> Result<Tensor<T>, BatchNormError>
where
    E: Engine<T> + ?Sized,
{
    validate_input_rank(rank, x.rank())?;
    for (operand, param) in params.operands() {
        validate_param_rank(rank, operand, param.map(Tensor::rank))?;
    }
    dispatch(engine, x, params)
}

fn dispatch<T, E>(
    engine: &E,
    x: &Tensor<T>,
    params: &BatchNormParams<'_, T>,
) -> Result<Tensor<T>, BatchNormError>
where
    E: Engine<T> + ?Sized,
{
    let variance_epsilon = params.variance_epsilon;
    if variance_epsilon.is_nan() || variance_epsilon < 0.0 {
        return Err(BatchNormError::InvalidEpsilon(variance_epsilon));
    }
    for (operand, param) in params.operands() {
        if let Some(param) = param {
            validate_broadcast(x.shape(), operand, param.shape())?;
        }
    }

    let x4d = canonicalize_input(x)?;
    log::debug!("canonicalized x {:?} -> {:?}", x.shape(), x4d.shape());

    let mut inputs = NamedTensors::new();
    inputs.insert(Operand::X.name(), Some(x4d));
    for (operand, param) in params.operands() {
        inputs.insert(operand.name(), canonicalize_param(operand, param)?);
    }
    let attrs = KernelAttrs::new().with("varianceEpsilon", AttrValue::Float(variance_epsilon));

    let result = engine.execute_kernel(BATCH_NORM_4D, &inputs, &attrs)?;

    Ok(restore_input_shape(&result, x.shape())?)
}
