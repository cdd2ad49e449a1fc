#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Batch normalization kernel over `[N, H, W, C]` buffers.
pub mod batch_norm;

/// Error types for the kernels module.
pub mod error;

/// Execution strategies for the kernels.
pub mod parallel;

pub use batch_norm::{batch_norm_4d_kernel, BroadcastParam};
pub use error::KernelError;
pub use parallel::ExecutionStrategy;
