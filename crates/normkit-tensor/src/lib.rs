#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Overview
//!
//! `normkit-tensor` provides the tensor value the batch normalization dispatcher works on.
//! Unlike fixed-rank tensors, the rank here is a runtime property: a tensor may be a scalar,
//! a vector, or any N-dimensional array, and its rank can change through [`Tensor::reshape`].
//!
//! # Architecture
//!
//! - **Tensor**: shape and stride information over a shared storage
//! - **TensorStorage**: reference-counted, immutable memory buffer
//!
//! # Key Features
//!
//! - **Zero-copy reshaping**: [`Tensor::reshape`], [`Tensor::as1d`] and [`Tensor::as4d`] only
//!   relabel the shape; the new tensor shares the buffer of the original one
//! - **Value semantics**: tensors are never mutated in place, cloning is a reference count bump
//! - **Thread-safe**: tensors are `Send + Sync` whenever the element type is
//!
//! # Quick Start
//!
//! ```rust
//! use normkit_tensor::Tensor;
//!
//! let t = Tensor::<f32>::from_shape_vec(&[2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
//! assert_eq!(t.rank(), 2);
//!
//! // reshape to rank 4 without copying
//! let t4 = t.as4d(1, 1, 2, 3).unwrap();
//! assert_eq!(t4.shape(), &[1, 1, 2, 3]);
//! assert!(t4.shares_storage(&t));
//!
//! // scalars are rank 0 and hold a single element
//! let s = Tensor::scalar(0.5f32);
//! assert_eq!(s.rank(), 0);
//! assert_eq!(s.numel(), 1);
//! ```

/// Serde module for JSON/other format serialization and deserialization.
///
/// Available when the `serde` feature is enabled.
#[cfg(feature = "serde")]
pub mod serde;

/// Storage module containing the shared memory buffer.
pub mod storage;

/// Tensor module containing the main tensor implementation and error types.
pub mod tensor;

pub use crate::storage::TensorStorage;
pub use crate::tensor::{get_numel_from_shape, get_strides_from_shape, Tensor, TensorError};
