//! The contract between the dispatcher and whatever executes kernels.
//!
//! The dispatcher never does arithmetic. It hands a kernel name, a bundle of named
//! tensors and a bundle of named attributes to an [`Engine`], and gets back a tensor.

use std::collections::BTreeMap;

use normkit_tensor::Tensor;

use crate::{error::EngineError, tape::Tape};

/// Name of the rank-4 batch normalization kernel.
pub const BATCH_NORM_4D: &str = "BatchNorm4D";

/// Kernel inputs keyed by name.
///
/// An entry may be present with no tensor. That marks an optional input the caller did
/// not supply, which kernels must treat as the identity rather than as zeros.
pub struct NamedTensors<T> {
    entries: BTreeMap<String, Option<Tensor<T>>>,
}

impl<T> NamedTensors<T> {
    /// Creates an empty bundle.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Adds an entry, replacing any previous entry with the same name.
    pub fn insert(&mut self, name: impl Into<String>, tensor: Option<Tensor<T>>) {
        self.entries.insert(name.into(), tensor);
    }

    /// Builder form of [`NamedTensors::insert`].
    pub fn with(mut self, name: impl Into<String>, tensor: Option<Tensor<T>>) -> Self {
        self.insert(name, tensor);
        self
    }

    /// Returns the tensor under `name`, or `None` if it is absent or was never inserted.
    pub fn get(&self, name: &str) -> Option<&Tensor<T>> {
        self.entries.get(name).and_then(Option::as_ref)
    }

    /// Returns `true` if an entry, present or absent, exists under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Iterates over the entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Tensor<T>>)> {
        self.entries
            .iter()
            .map(|(name, tensor)| (name.as_str(), tensor.as_ref()))
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the bundle has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for NamedTensors<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A kernel attribute value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttrValue {
    /// A real number.
    Float(f64),
    /// An integer.
    Int(i64),
}

/// Kernel attributes keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KernelAttrs {
    entries: BTreeMap<String, AttrValue>,
}

impl KernelAttrs {
    /// Creates an empty attribute bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an attribute, replacing any previous value.
    pub fn with(mut self, name: impl Into<String>, value: AttrValue) -> Self {
        self.entries.insert(name.into(), value);
        self
    }

    /// Returns the attribute under `name`.
    pub fn get(&self, name: &str) -> Option<AttrValue> {
        self.entries.get(name).copied()
    }

    /// Returns the attribute under `name` if it is a float.
    pub fn get_float(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            AttrValue::Float(v) => Some(v),
            _ => None,
        }
    }
}

/// Executes named kernels against already canonicalized operands.
///
/// Implementations own everything below the dispatcher: device placement, memory,
/// scheduling. A call is synchronous from the caller's point of view and its failure
/// is returned as is.
pub trait Engine<T> {
    /// Executes `kernel` with the given inputs and attributes.
    ///
    /// # Errors
    ///
    /// Any failure to find, validate or run the kernel.
    fn execute_kernel(
        &self,
        kernel: &str,
        inputs: &NamedTensors<T>,
        attrs: &KernelAttrs,
    ) -> Result<Tensor<T>, EngineError>;

    /// Returns the tape public op calls are recorded on, if any.
    fn tape(&self) -> Option<&dyn Tape> {
        None
    }
}
