//! Canonicalization of operands for the rank-4 kernel.
//!
//! The input always becomes rank 4. A statistics operand becomes rank 4 when it has
//! rank 2 or 3, so that it lines up positionally with the canonical input, becomes
//! `[1]` when it is a scalar, and is left alone otherwise.
//!
//! | rank | input                | parameter            |
//! |------|----------------------|----------------------|
//! | 0    | `[1, 1, 1, 1]`       | `[1]`                |
//! | 1    | `[1, 1, 1, d0]`      | unchanged            |
//! | 2    | `[1, 1, d0, d1]`     | `[1, 1, d0, d1]`     |
//! | 3    | `[1, d0, d1, d2]`    | `[1, d0, d1, d2]`    |
//! | ≥ 4  | unchanged            | unchanged            |

use normkit_tensor::Tensor;

use crate::{error::ShapeError, operand::Operand, rank::Rank};

/// Returns the rank-4 shape the input is reshaped to.
///
/// # Example
///
/// ```
/// use normkit_ops::broadcast::canonical_input_shape;
///
/// assert_eq!(canonical_input_shape(&[]), vec![1, 1, 1, 1]);
/// assert_eq!(canonical_input_shape(&[5]), vec![1, 1, 1, 5]);
/// assert_eq!(canonical_input_shape(&[2, 3, 4]), vec![1, 2, 3, 4]);
/// ```
pub fn canonical_input_shape(shape: &[usize]) -> Vec<usize> {
    match Rank::of(shape.len()) {
        Rank::Zero | Rank::One => vec![1, 1, 1, shape.iter().product()],
        Rank::Two => vec![1, 1, shape[0], shape[1]],
        Rank::Three => vec![1, shape[0], shape[1], shape[2]],
        Rank::Four | Rank::Higher(_) => shape.to_vec(),
    }
}

/// Returns the shape a statistics operand is reshaped to.
///
/// # Example
///
/// ```
/// use normkit_ops::broadcast::canonical_param_shape;
///
/// assert_eq!(canonical_param_shape(&[]), vec![1]);
/// assert_eq!(canonical_param_shape(&[4]), vec![4]);
/// assert_eq!(canonical_param_shape(&[3, 4]), vec![1, 1, 3, 4]);
/// ```
pub fn canonical_param_shape(shape: &[usize]) -> Vec<usize> {
    match Rank::of(shape.len()) {
        Rank::Zero => vec![1],
        Rank::Two => vec![1, 1, shape[0], shape[1]],
        Rank::Three => vec![1, shape[0], shape[1], shape[2]],
        Rank::One | Rank::Four | Rank::Higher(_) => shape.to_vec(),
    }
}

/// Reshapes the input to its canonical rank-4 form without copying data.
///
/// # Errors
///
/// Only if the underlying reshape rejects the shape, which cannot happen for a
/// well-formed tensor since canonicalization preserves the element count.
pub fn canonicalize_input<T>(x: &Tensor<T>) -> Result<Tensor<T>, ShapeError> {
    reshape_operand(Operand::X, x, &canonical_input_shape(x.shape()))
}

/// Reshapes a statistics operand to its canonical form. Absent operands stay absent.
///
/// # Errors
///
/// Only if the underlying reshape rejects the shape.
pub fn canonicalize_param<T>(
    operand: Operand,
    param: Option<&Tensor<T>>,
) -> Result<Option<Tensor<T>>, ShapeError> {
    param
        .map(|p| reshape_operand(operand, p, &canonical_param_shape(p.shape())))
        .transpose()
}

/// Reshapes a kernel result back to the caller's original input shape.
///
/// # Errors
///
/// If the result does not hold as many elements as `shape`.
pub fn restore_input_shape<T>(result: &Tensor<T>, shape: &[usize]) -> Result<Tensor<T>, ShapeError> {
    reshape_operand(Operand::X, result, shape)
}

fn reshape_operand<T>(
    operand: Operand,
    tensor: &Tensor<T>,
    shape: &[usize],
) -> Result<Tensor<T>, ShapeError> {
    tensor
        .reshape(shape)
        .map_err(|source| ShapeError::Reshape { operand, source })
}
