#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use normkit_tensor as tensor;

#[doc(inline)]
pub use normkit_kernels as kernels;

#[doc(inline)]
pub use normkit_ops as ops;
