use thiserror::Error;

use crate::storage::TensorStorage;

/// Error type for tensor operations.
///
/// This enum provides detailed error information for tensor creation
/// and shape manipulation.
#[derive(Error, Debug, PartialEq)]
pub enum TensorError {
    /// Tensor shape does not match the provided data.
    ///
    /// This error occurs when creating a tensor with data that doesn't match
    /// the specified shape. The shape must match the number of elements exactly.
    ///
    /// # Example
    /// ```ignore
    /// // Error: shape [2, 3] expects 6 elements, but got 5
    /// let tensor = Tensor::from_shape_vec(&[2, 3], vec![1, 2, 3, 4, 5])?;
    /// ```
    #[error("Shape mismatch: expected {expected} elements for shape, but got {actual} elements in data")]
    InvalidShape {
        /// Expected number of elements based on shape
        expected: usize,
        /// Actual number of elements in the data
        actual: usize,
    },

    /// Index exceeds tensor bounds.
    ///
    /// # Recommended Actions
    /// - Verify index is less than the dimension size
    /// - Use `tensor.shape()` to check valid bounds
    #[error("Index {index} out of bounds for dimension of size {size}")]
    IndexOutOfBounds {
        /// The invalid index that was attempted
        index: usize,
        /// The size of the dimension being indexed
        size: usize,
    },

    /// Tensor dimensions incompatible for the requested operation.
    ///
    /// Raised by [`Tensor::reshape`] when the target shape holds a different
    /// number of elements, and by indexing with the wrong number of coordinates.
    #[error("Dimension mismatch: {message}. Expected shape: {expected}, got: {actual}")]
    DimensionMismatch {
        /// Human-readable description of the mismatch
        message: String,
        /// Expected shape description
        expected: String,
        /// Actual shape description
        actual: String,
    },
}

impl TensorError {
    /// Creates an InvalidShape error with clear context.
    pub fn invalid_shape(expected: usize, actual: usize) -> Self {
        Self::InvalidShape { expected, actual }
    }

    /// Creates an IndexOutOfBounds error with clear context.
    pub fn index_out_of_bounds(index: usize, size: usize) -> Self {
        Self::IndexOutOfBounds { index, size }
    }

    /// Creates a DimensionMismatch error with described shapes.
    pub fn dimension_mismatch(
        message: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::DimensionMismatch {
            message: message.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// Computes the number of elements held by `shape`.
///
/// A rank-0 shape holds one element. The product of the non-zero dimensions must fit in a
/// `usize` even when another dimension is zero, so that the strides stay representable.
///
/// # Errors
///
/// If the element count overflows `usize`, an error is returned.
///
/// # Examples
///
/// ```rust
/// use normkit_tensor::get_numel_from_shape;
///
/// assert_eq!(get_numel_from_shape(&[2, 3]).unwrap(), 6);
/// assert_eq!(get_numel_from_shape(&[]).unwrap(), 1);
/// assert_eq!(get_numel_from_shape(&[2, 0, 3]).unwrap(), 0);
/// assert!(get_numel_from_shape(&[usize::MAX, 2]).is_err());
/// ```
pub fn get_numel_from_shape(shape: &[usize]) -> Result<usize, TensorError> {
    let nonzero = shape
        .iter()
        .filter(|&&dim| dim != 0)
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .ok_or_else(|| {
            TensorError::dimension_mismatch(
                "Element count overflows usize",
                format!("at most {} elements", usize::MAX),
                format!("{:?}", shape),
            )
        })?;
    if shape.contains(&0) {
        Ok(0)
    } else {
        Ok(nonzero)
    }
}

/// Computes the strides for a row-major (C-contiguous) tensor layout.
///
/// The rightmost dimension has stride 1, and each dimension's stride is the
/// product of all dimensions to its right. A rank-0 shape has no strides.
///
/// # Examples
///
/// ```rust
/// use normkit_tensor::get_strides_from_shape;
///
/// assert_eq!(get_strides_from_shape(&[2, 3]), vec![3, 1]);
/// assert_eq!(get_strides_from_shape(&[2, 3, 4]), vec![12, 4, 1]);
/// assert!(get_strides_from_shape(&[]).is_empty());
/// ```
pub fn get_strides_from_shape(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![0; shape.len()];
    let mut stride = 1;
    for i in (0..shape.len()).rev() {
        strides[i] = stride;
        stride *= shape[i];
    }
    strides
}

/// A multi-dimensional array with a rank known only at runtime.
///
/// `Tensor` combines a shared [`TensorStorage`] with a shape and the matching
/// row-major strides. Tensors behave like values: no operation mutates one in place,
/// and every shape transformation returns a new tensor over the same storage.
///
/// # Examples
///
/// ```rust
/// use normkit_tensor::Tensor;
///
/// let t = Tensor::<u8>::from_shape_vec(&[2, 2], vec![1, 2, 3, 4]).unwrap();
/// assert_eq!(t.shape(), &[2, 2]);
/// assert_eq!(t.get(&[1, 0]), Some(&3));
/// ```
pub struct Tensor<T> {
    storage: TensorStorage<T>,
    shape: Vec<usize>,
    strides: Vec<usize>,
}

impl<T> Tensor<T> {
    /// Creates a new tensor with the given shape and data.
    ///
    /// # Errors
    ///
    /// If the number of elements in the data does not match the shape, an error is returned.
    ///
    /// # Example
    ///
    /// ```
    /// use normkit_tensor::Tensor;
    ///
    /// let t = Tensor::<u8>::from_shape_vec(&[2, 2], vec![1, 2, 3, 4]).unwrap();
    /// assert_eq!(t.numel(), 4);
    /// assert_eq!(t.strides(), &[2, 1]);
    /// ```
    pub fn from_shape_vec(shape: &[usize], data: Vec<T>) -> Result<Self, TensorError> {
        let numel = get_numel_from_shape(shape)?;
        if numel != data.len() {
            return Err(TensorError::invalid_shape(numel, data.len()));
        }
        Ok(Self {
            storage: TensorStorage::from_vec(data),
            shape: shape.to_vec(),
            strides: get_strides_from_shape(shape),
        })
    }

    /// Creates a new tensor with the given shape, filled with a single value.
    ///
    /// # Errors
    ///
    /// If the element count of `shape` overflows `usize`, an error is returned.
    pub fn from_shape_val(shape: &[usize], value: T) -> Result<Self, TensorError>
    where
        T: Clone,
    {
        let numel = get_numel_from_shape(shape)?;
        Ok(Self {
            storage: TensorStorage::from_vec(vec![value; numel]),
            shape: shape.to_vec(),
            strides: get_strides_from_shape(shape),
        })
    }

    /// Creates a new tensor by evaluating `f` at every index, in row-major order.
    ///
    /// # Example
    ///
    /// ```
    /// use normkit_tensor::Tensor;
    ///
    /// let t = Tensor::from_shape_fn(&[2, 3], |index| index[0] * 10 + index[1]).unwrap();
    /// assert_eq!(t.as_slice(), &[0, 1, 2, 10, 11, 12]);
    /// ```
    ///
    /// # Errors
    ///
    /// If the element count of `shape` overflows `usize`, an error is returned.
    pub fn from_shape_fn<F>(shape: &[usize], f: F) -> Result<Self, TensorError>
    where
        F: Fn(&[usize]) -> T,
    {
        let numel = get_numel_from_shape(shape)?;
        let mut index = vec![0; shape.len()];
        let data: Vec<T> = (0..numel)
            .map(|i| {
                let mut j = i;
                for k in (0..shape.len()).rev() {
                    index[k] = j % shape[k];
                    j /= shape[k];
                }
                f(&index)
            })
            .collect();
        Ok(Self {
            storage: TensorStorage::from_vec(data),
            shape: shape.to_vec(),
            strides: get_strides_from_shape(shape),
        })
    }

    /// Creates a rank-0 tensor holding a single value.
    pub fn scalar(value: T) -> Self {
        Self {
            storage: TensorStorage::from_vec(vec![value]),
            shape: Vec::new(),
            strides: Vec::new(),
        }
    }

    /// Creates a new tensor filled with zeros.
    ///
    /// # Errors
    ///
    /// If the element count of `shape` overflows `usize`, an error is returned.
    pub fn zeros(shape: &[usize]) -> Result<Self, TensorError>
    where
        T: num_traits::Zero + Clone,
    {
        Self::from_shape_val(shape, T::zero())
    }

    /// Returns the shape of the tensor.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Returns the row-major strides of the tensor.
    #[inline]
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Returns the number of dimensions.
    #[inline]
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Returns the number of elements. A rank-0 tensor holds one element.
    #[inline]
    pub fn numel(&self) -> usize {
        self.storage.len()
    }

    /// Returns the underlying storage.
    pub fn storage(&self) -> &TensorStorage<T> {
        &self.storage
    }

    /// Returns the tensor data as a slice in row-major order.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.storage.as_slice()
    }

    /// Returns an iterator over the elements in row-major order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Consumes the tensor and returns its data.
    pub fn into_vec(self) -> Vec<T>
    where
        T: Clone,
    {
        self.storage.into_vec()
    }

    /// Returns `true` if both tensors are views of the same buffer.
    pub fn shares_storage(&self, other: &Self) -> bool {
        self.storage.ptr_eq(&other.storage)
    }

    /// Returns the offset of the element at `index` in the storage.
    ///
    /// Returns `None` if the index has the wrong rank or is out of bounds.
    pub fn get_iter_offset(&self, index: &[usize]) -> Option<usize> {
        if index.len() != self.rank() {
            return None;
        }
        let mut offset = 0;
        for ((&idx, &dim_size), &stride) in index.iter().zip(&self.shape).zip(&self.strides) {
            if idx >= dim_size {
                return None;
            }
            offset += idx * stride;
        }
        Some(offset)
    }

    /// Returns a reference to the element at `index`, or `None` if it is out of bounds.
    ///
    /// # Example
    ///
    /// ```
    /// use normkit_tensor::Tensor;
    ///
    /// let t = Tensor::<u8>::from_shape_vec(&[2, 2], vec![1, 2, 3, 4]).unwrap();
    /// assert_eq!(t.get(&[1, 1]), Some(&4));
    /// assert!(t.get(&[2, 0]).is_none());
    /// assert!(Tensor::scalar(7u8).get(&[]).is_some());
    /// ```
    pub fn get(&self, index: &[usize]) -> Option<&T> {
        self.get_iter_offset(index)
            .and_then(|i| self.as_slice().get(i))
    }

    /// Returns the multi-dimensional index of the element at `offset`.
    ///
    /// # Errors
    ///
    /// If the offset is not smaller than the number of elements, an error is returned.
    pub fn get_index(&self, offset: usize) -> Result<Vec<usize>, TensorError> {
        if offset >= self.numel() {
            return Err(TensorError::index_out_of_bounds(offset, self.numel()));
        }
        let mut index = vec![0; self.rank()];
        let mut remainder = offset;
        for (dim, &stride) in self.strides.iter().enumerate() {
            index[dim] = remainder / stride;
            remainder %= stride;
        }
        Ok(index)
    }

    /// Reshape the tensor to a new shape.
    ///
    /// The returned tensor shares the storage of `self`; no data is copied.
    ///
    /// # Errors
    ///
    /// If the number of elements in the new shape does not match the number of elements
    /// in the tensor, an error is returned.
    ///
    /// # Example
    ///
    /// ```
    /// use normkit_tensor::Tensor;
    ///
    /// let t = Tensor::<u8>::from_shape_vec(&[4], vec![1, 2, 3, 4]).unwrap();
    /// let t2 = t.reshape(&[2, 2]).unwrap();
    /// assert_eq!(t2.shape(), &[2, 2]);
    /// assert_eq!(t2.strides(), &[2, 1]);
    /// assert!(t.reshape(&[3]).is_err());
    /// ```
    pub fn reshape(&self, shape: &[usize]) -> Result<Self, TensorError> {
        let numel = get_numel_from_shape(shape)?;
        if numel != self.numel() {
            return Err(TensorError::dimension_mismatch(
                "Reshape operation requires same number of elements",
                format!("{:?} ({} elements)", shape, numel),
                format!("{:?} ({} elements)", self.shape, self.numel()),
            ));
        }

        Ok(Self {
            storage: self.storage.clone(),
            shape: shape.to_vec(),
            strides: get_strides_from_shape(shape),
        })
    }

    /// Reshape the tensor to rank 1, keeping every element.
    pub fn as1d(&self) -> Self {
        let numel = self.numel();
        Self {
            storage: self.storage.clone(),
            shape: vec![numel],
            strides: vec![1],
        }
    }

    /// Reshape the tensor to the rank-4 shape `[d0, d1, d2, d3]`.
    ///
    /// # Errors
    ///
    /// If the new shape holds a different number of elements, an error is returned.
    pub fn as4d(&self, d0: usize, d1: usize, d2: usize, d3: usize) -> Result<Self, TensorError> {
        self.reshape(&[d0, d1, d2, d3])
    }

    /// Apply a function to each element, producing a tensor of the same shape.
    pub fn map<U, F>(&self, f: F) -> Tensor<U>
    where
        F: Fn(&T) -> U,
    {
        let data: Vec<U> = self.as_slice().iter().map(f).collect();
        Tensor {
            storage: TensorStorage::from_vec(data),
            shape: self.shape.clone(),
            strides: self.strides.clone(),
        }
    }
}

impl<T> Clone for Tensor<T> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            shape: self.shape.clone(),
            strides: self.strides.clone(),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Tensor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape)
            .field("data", &self.as_slice())
            .finish()
    }
}
