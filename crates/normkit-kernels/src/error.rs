use thiserror::Error;

/// An error type for kernel execution.
#[derive(Error, Debug, PartialEq)]
pub enum KernelError {
    /// Length mismatch between a buffer and the shape describing it.
    #[error("Length mismatch: expected {0} elements, got {1}")]
    LengthMismatch(usize, usize),

    /// A parameter buffer has a rank the kernel cannot broadcast.
    #[error("Invalid parameter shape {0:?}: expected rank 1 or rank 4")]
    InvalidShape(Vec<usize>),

    /// A parameter cannot be broadcast against the input.
    #[error("Parameter shape {shape:?} cannot be broadcast to {target:?}")]
    BroadcastMismatch {
        /// Shape of the parameter.
        shape: Vec<usize>,
        /// Shape of the input it was broadcast against.
        target: [usize; 4],
    },
}
