//! Rank and shape validation.
//!
//! Fixed-rank entry points check ranks first, with rank-specific messages. Every
//! entry point then checks that each statistics operand broadcasts against the input
//! along the channel-last convention.

use crate::{broadcast::canonical_input_shape, error::ShapeError, operand::Operand, rank::Rank};

/// Op name used in error messages that are not tied to a fixed rank.
pub const GENERIC_OP: &str = "batchNorm";

/// Returns the op name used in error messages for a fixed-rank entry point.
pub fn op_name(rank: Rank) -> &'static str {
    match rank {
        Rank::Zero => "batchNorm0D",
        Rank::One => "batchNorm1D",
        Rank::Two => "batchNorm2D",
        Rank::Three => "batchNorm3D",
        Rank::Four => "batchNorm4D",
        Rank::Higher(_) => GENERIC_OP,
    }
}

/// Checks that the input has exactly the entry point's rank.
///
/// # Errors
///
/// [`ShapeError::RankMismatch`] naming `x` if the ranks differ.
pub fn validate_input_rank(rank: Rank, actual: usize) -> Result<(), ShapeError> {
    if actual != rank.ndim() {
        return Err(ShapeError::RankMismatch {
            op: op_name(rank),
            operand: Operand::X,
            expected: vec![rank.ndim()],
            actual,
        });
    }
    Ok(())
}

/// Checks that a statistics operand has the entry point's rank or rank 1.
///
/// Absent operands (`None`) are not checked.
///
/// # Errors
///
/// [`ShapeError::RankMismatch`] naming `operand` otherwise.
pub fn validate_param_rank(
    rank: Rank,
    operand: Operand,
    actual: Option<usize>,
) -> Result<(), ShapeError> {
    match actual {
        Some(actual) if actual != rank.ndim() && actual != 1 => Err(ShapeError::RankMismatch {
            op: op_name(rank),
            operand,
            expected: vec![rank.ndim(), 1],
            actual,
        }),
        _ => Ok(()),
    }
}

/// Checks that a statistics operand can be broadcast against the input.
///
/// The channel axis is the last axis of the canonical input. An operand is accepted when
///
/// * it is a scalar,
/// * it has rank 1 and length 1 or the channel count,
/// * it has the input's rank and each axis equals the input's or is 1.
///
/// # Errors
///
/// * [`ShapeError::Incompatible`] for a rank-1 or same-rank operand with mismatching sizes.
/// * [`ShapeError::RankMismatch`] for any other rank.
///
/// # Example
///
/// ```
/// use normkit_ops::{validate::validate_broadcast, Operand};
///
/// assert!(validate_broadcast(&[2, 3, 4], Operand::Mean, &[4]).is_ok());
/// assert!(validate_broadcast(&[2, 3, 4], Operand::Mean, &[3]).is_err());
/// assert!(validate_broadcast(&[2, 3], Operand::Mean, &[3, 3]).is_err());
/// ```
pub fn validate_broadcast(
    x_shape: &[usize],
    operand: Operand,
    shape: &[usize],
) -> Result<(), ShapeError> {
    let canonical = canonical_input_shape(x_shape);
    let channels = canonical[canonical.len() - 1];

    let compatible = match shape.len() {
        0 => true,
        // per channel; also covers the same-rank case of a rank-1 input
        1 => shape[0] == 1 || shape[0] == channels,
        r if r == x_shape.len() => shape
            .iter()
            .zip(x_shape.iter())
            .all(|(&p, &x)| p == x || p == 1),
        r => {
            return Err(ShapeError::RankMismatch {
                op: GENERIC_OP,
                operand,
                expected: vec![x_shape.len(), 1],
                actual: r,
            })
        }
    };

    if !compatible {
        return Err(ShapeError::Incompatible {
            operand,
            expected: x_shape.to_vec(),
            actual: shape.to_vec(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{validate_broadcast, validate_input_rank, validate_param_rank};
    use crate::{error::ShapeError, operand::Operand, rank::Rank};

    #[test]
    fn test_input_rank() {
        assert!(validate_input_rank(Rank::Two, 2).is_ok());
        assert_eq!(
            validate_input_rank(Rank::Three, 2),
            Err(ShapeError::RankMismatch {
                op: "batchNorm3D",
                operand: Operand::X,
                expected: vec![3],
                actual: 2,
            })
        );
    }

    #[test]
    fn test_param_rank() {
        assert!(validate_param_rank(Rank::Four, Operand::Mean, Some(4)).is_ok());
        assert!(validate_param_rank(Rank::Four, Operand::Mean, Some(1)).is_ok());
        assert!(validate_param_rank(Rank::Four, Operand::Scale, None).is_ok());
        assert_eq!(
            validate_param_rank(Rank::Four, Operand::Offset, Some(0)),
            Err(ShapeError::RankMismatch {
                op: "batchNorm4D",
                operand: Operand::Offset,
                expected: vec![4, 1],
                actual: 0,
            })
        );
    }

    #[test]
    fn test_broadcast_rank1() {
        assert!(validate_broadcast(&[2, 3, 4], Operand::Mean, &[4]).is_ok());
        assert!(validate_broadcast(&[2, 3, 4], Operand::Mean, &[1]).is_ok());
        assert_eq!(
            validate_broadcast(&[2, 3, 4], Operand::Mean, &[3]),
            Err(ShapeError::Incompatible {
                operand: Operand::Mean,
                expected: vec![2, 3, 4],
                actual: vec![3],
            })
        );
    }

    #[test]
    fn test_broadcast_same_rank() {
        assert!(validate_broadcast(&[2, 3], Operand::Variance, &[2, 3]).is_ok());
        assert!(validate_broadcast(&[2, 3], Operand::Variance, &[1, 3]).is_ok());
        assert!(validate_broadcast(&[2, 3], Operand::Variance, &[3, 3]).is_err());
    }

    #[test]
    fn test_broadcast_scalar_input() {
        assert!(validate_broadcast(&[], Operand::Mean, &[]).is_ok());
        assert!(validate_broadcast(&[], Operand::Mean, &[1]).is_ok());
        assert!(validate_broadcast(&[], Operand::Mean, &[2]).is_err());
    }

    #[test]
    fn test_broadcast_rank1_input() {
        assert!(validate_broadcast(&[5], Operand::Scale, &[5]).is_ok());
        assert!(validate_broadcast(&[5], Operand::Scale, &[4]).is_err());
    }

    #[test]
    fn test_broadcast_other_rank() {
        assert!(matches!(
            validate_broadcast(&[2, 3, 4], Operand::Mean, &[3, 4]),
            Err(ShapeError::RankMismatch { actual: 2, .. })
        ));
    }
}
