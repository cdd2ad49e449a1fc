use normkit_kernels::KernelError;
use normkit_tensor::TensorError;
use thiserror::Error;

use crate::operand::Operand;

fn describe_ranks(ranks: &[usize]) -> String {
    ranks
        .iter()
        .map(|r| format!("rank {r}"))
        .collect::<Vec<_>>()
        .join(" or ")
}

/// An error raised when operand shapes violate the dispatcher's contract.
#[derive(Error, Debug, PartialEq)]
pub enum ShapeError {
    /// An operand has a rank the entry point does not accept.
    #[error("Error in {op}: {operand} must be {} but got rank {actual}.", describe_ranks(.expected))]
    RankMismatch {
        /// Name of the operation that rejected the operand.
        op: &'static str,
        /// Role of the offending tensor.
        operand: Operand,
        /// The accepted ranks.
        expected: Vec<usize>,
        /// The rank received.
        actual: usize,
    },

    /// An operand has an accepted rank but cannot be broadcast against the input.
    #[error("{operand} with shape {actual:?} cannot be broadcast against input shape {expected:?}")]
    Incompatible {
        /// Role of the offending tensor.
        operand: Operand,
        /// Shape of the input.
        expected: Vec<usize>,
        /// Shape of the operand.
        actual: Vec<usize>,
    },

    /// Reshaping an operand to or from its canonical form failed.
    #[error("failed to reshape {operand}: {source}")]
    Reshape {
        /// Role of the tensor being reshaped.
        operand: Operand,
        /// The underlying tensor error.
        #[source]
        source: TensorError,
    },
}

/// An error raised by an [`Engine`](crate::Engine) while executing a kernel.
#[derive(Error, Debug, PartialEq)]
pub enum EngineError {
    /// No kernel is registered under the requested name.
    #[error("Kernel `{0}` is not registered")]
    UnknownKernel(String),

    /// A required input was not supplied.
    #[error("Kernel `{kernel}` requires input `{name}`")]
    MissingInput {
        /// The kernel name.
        kernel: String,
        /// The missing input name.
        name: String,
    },

    /// A required attribute was not supplied.
    #[error("Kernel `{kernel}` requires attribute `{name}`")]
    MissingAttr {
        /// The kernel name.
        kernel: String,
        /// The missing attribute name.
        name: String,
    },

    /// An attribute could not be converted to the kernel's element type.
    #[error("Kernel `{kernel}` cannot use attribute `{name}`: {reason}")]
    InvalidAttr {
        /// The kernel name.
        kernel: String,
        /// The attribute name.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The input rank is not supported by the kernel.
    #[error("Kernel `{kernel}` expects a rank {expected} input but got rank {actual}")]
    UnsupportedRank {
        /// The kernel name.
        kernel: String,
        /// The rank the kernel works on.
        expected: usize,
        /// The rank received.
        actual: usize,
    },

    /// The kernel itself failed.
    #[error(transparent)]
    Kernel(#[from] KernelError),

    /// Building the result tensor failed.
    #[error(transparent)]
    Tensor(#[from] TensorError),
}

/// An error type for batch normalization.
#[derive(Error, Debug, PartialEq)]
pub enum BatchNormError {
    /// Operand ranks or shapes are invalid.
    #[error(transparent)]
    Shape(#[from] ShapeError),

    /// The engine failed to execute the kernel.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The variance epsilon is negative or NaN.
    #[error("varianceEpsilon must be a non-negative number, got {0}")]
    InvalidEpsilon(f64),
}

#[cfg(test)]
mod tests {
    use super::{EngineError, ShapeError};
    use crate::operand::Operand;

    #[test]
    fn test_rank_mismatch_message() {
        let err = ShapeError::RankMismatch {
            op: "batchNorm2D",
            operand: Operand::Mean,
            expected: vec![2, 1],
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "Error in batchNorm2D: mean must be rank 2 or rank 1 but got rank 3."
        );

        let err = ShapeError::RankMismatch {
            op: "batchNorm4D",
            operand: Operand::X,
            expected: vec![4],
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "Error in batchNorm4D: x must be rank 4 but got rank 2."
        );
    }

    #[test]
    fn test_engine_error_message() {
        let err = EngineError::UnknownKernel("Conv2D".to_string());
        assert_eq!(err.to_string(), "Kernel `Conv2D` is not registered");
    }
}
