#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Overview
//!
//! Batch normalization is exposed for inputs of any rank. Every operand is first brought
//! to a canonical rank (4 for the input, 1 or 4 for the statistics), a single `BatchNorm4D`
//! kernel is executed through an [`Engine`], and the result is reshaped back to the input's
//! original shape.
//!
//! ```
//! use normkit_ops::{batch_normalization_3d, BatchNormParams, CpuEngine};
//! use normkit_tensor::Tensor;
//!
//! let engine = CpuEngine::new();
//! let x = Tensor::<f32>::from_shape_vec(&[1, 1, 4], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
//! let mean = Tensor::<f32>::from_shape_vec(&[4], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
//! let variance = Tensor::<f32>::from_shape_vec(&[4], vec![1.0; 4]).unwrap();
//!
//! let params = BatchNormParams::new(&mean, &variance);
//! let y = batch_normalization_3d(&engine, &x, &params).unwrap();
//! assert_eq!(y.shape(), &[1, 1, 4]);
//! assert!(y.iter().all(|v| *v == 0.0));
//! ```

/// Public batch normalization entry points and their argument bundle.
pub mod batch_norm;

/// Canonicalization of operands to the kernel's fixed ranks.
pub mod broadcast;

/// Reference CPU engine.
pub mod cpu;

/// Kernel execution contract.
pub mod engine;

/// Error types for the dispatcher.
pub mod error;

/// Operand roles.
pub mod operand;

/// Rank classes.
pub mod rank;

/// Op call recording.
pub mod tape;

/// Rank and shape validation.
pub mod validate;

pub use batch_norm::{
    batch_normalization, batch_normalization_2d, batch_normalization_3d,
    batch_normalization_4d, BatchNormConfig, BatchNormParams, DEFAULT_VARIANCE_EPSILON,
};
pub use cpu::CpuEngine;
pub use engine::{AttrValue, Engine, KernelAttrs, NamedTensors, BATCH_NORM_4D};
pub use error::{BatchNormError, EngineError, ShapeError};
pub use operand::Operand;
pub use rank::Rank;
pub use tape::{OpTape, Tape, TapeEntry};
