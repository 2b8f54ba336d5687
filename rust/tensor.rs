//! N-dimensional arrays and strided views.
//!
//! This module provides:
//!
//! - [`Tensor`]: owned, row-major N-dimensional array
//! - [`TensorView`]: immutable strided view into a tensor
//! - [`TensorViewMut`]: mutable strided view into a tensor
//! - [`SliceRange`]: per-dimension slice specification
//!
//! Views borrow the tensor's buffer and describe a region of it through a
//! starting offset plus signed per-dimension strides, counted in elements.
//! Slicing, transposing and reshaping a view never copies.
//!
//! # Example
//!
//! ```rust
//! use numblas::{SliceRange, Tensor};
//!
//! let m = Tensor::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
//!
//! // Second column, as a 1-D view with stride 3
//! let column = m.slice(&[SliceRange::full(), SliceRange::index(1)]).unwrap();
//! assert_eq!(column.shape(), &[2]);
//! assert_eq!(column.stride(0), 3);
//!
//! // Transposed view, strides swapped
//! let t = m.t().unwrap();
//! assert_eq!(t.shape(), &[3, 2]);
//! assert_eq!(t.get(&[2, 1]), Some(&6.0));
//! ```

use crate::error::{LinalgError, Result, ShapeDescriptor, DEFAULT_MAX_RANK};

// region: Shape Helpers

/// Validates a shape and returns its element count.
fn checked_len(shape: &[usize]) -> Result<usize> {
    if shape.len() > DEFAULT_MAX_RANK {
        return Err(LinalgError::TooManyRanks { got: shape.len() });
    }
    if shape.iter().any(|&d| d == 0) {
        return Err(LinalgError::InvalidShape {
            shape: ShapeDescriptor::from_slice(shape),
            reason: "zero-sized dimension",
        });
    }
    Ok(shape.iter().product())
}

fn row_major_strides(shape: &[usize]) -> [isize; DEFAULT_MAX_RANK] {
    let mut strides = [0isize; DEFAULT_MAX_RANK];
    let mut stride = 1isize;
    for i in (0..shape.len()).rev() {
        strides[i] = stride;
        stride *= shape[i] as isize;
    }
    strides
}

fn shape_array(shape: &[usize]) -> [usize; DEFAULT_MAX_RANK] {
    let mut dims = [0usize; DEFAULT_MAX_RANK];
    dims[..shape.len()].copy_from_slice(shape);
    dims
}

/// Row-major walk over every multi-index of a shape.
struct Indices {
    index: [usize; DEFAULT_MAX_RANK],
    shape: [usize; DEFAULT_MAX_RANK],
    ndim: usize,
    remaining: usize,
}

impl Indices {
    fn new(shape: &[usize]) -> Self {
        Self {
            index: [0usize; DEFAULT_MAX_RANK],
            shape: shape_array(shape),
            ndim: shape.len(),
            remaining: shape.iter().product(),
        }
    }
}

impl Iterator for Indices {
    type Item = [usize; DEFAULT_MAX_RANK];

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let current = self.index;
        self.remaining -= 1;
        // Increment indices (row-major order)
        for d in (0..self.ndim).rev() {
            self.index[d] += 1;
            if self.index[d] < self.shape[d] {
                break;
            }
            self.index[d] = 0;
        }
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

/// Strided geometry shared by both view kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Geometry {
    offset: usize,
    shape: [usize; DEFAULT_MAX_RANK],
    strides: [isize; DEFAULT_MAX_RANK],
    ndim: usize,
    len: usize,
}

impl Geometry {
    fn contiguous(shape: &[usize]) -> Self {
        Self {
            offset: 0,
            shape: shape_array(shape),
            strides: row_major_strides(shape),
            ndim: shape.len(),
            len: shape.iter().product(),
        }
    }

    fn shape(&self) -> &[usize] {
        &self.shape[..self.ndim]
    }

    fn strides(&self) -> &[isize] {
        &self.strides[..self.ndim]
    }

    fn linear_index(&self, index: &[usize]) -> usize {
        let mut position = self.offset as isize;
        for (d, &i) in index.iter().enumerate() {
            position += i as isize * self.strides[d];
        }
        position as usize
    }

    fn checked_index(&self, index: &[usize]) -> Option<usize> {
        if index.len() != self.ndim {
            return None;
        }
        if index.iter().zip(self.shape()).any(|(&i, &d)| i >= d) {
            return None;
        }
        Some(self.linear_index(index))
    }

    fn is_contiguous(&self) -> bool {
        let mut expected_stride = 1isize;
        for i in (0..self.ndim).rev() {
            if self.shape[i] != 1 && self.strides[i] != expected_stride {
                return false;
            }
            expected_stride *= self.shape[i] as isize;
        }
        true
    }

    fn slice(&self, ranges: &[SliceRange]) -> Result<Self> {
        if ranges.len() != self.ndim {
            return Err(LinalgError::DimensionMismatch {
                expected: self.ndim,
                got: ranges.len(),
            });
        }

        let mut new_shape = [0usize; DEFAULT_MAX_RANK];
        let mut new_strides = [0isize; DEFAULT_MAX_RANK];
        let mut new_ndim = 0usize;
        let mut offset = self.offset as isize;

        for (dim, range) in ranges.iter().enumerate() {
            let dim_size = self.shape[dim];
            let dim_stride = self.strides[dim];

            match *range {
                SliceRange::Full => {
                    new_shape[new_ndim] = dim_size;
                    new_strides[new_ndim] = dim_stride;
                    new_ndim += 1;
                }
                SliceRange::Index(i) => {
                    if i >= dim_size {
                        return Err(LinalgError::IndexOutOfBounds {
                            index: i,
                            size: dim_size,
                        });
                    }
                    // Single index reduces dimension (doesn't add to new shape)
                    offset += i as isize * dim_stride;
                }
                SliceRange::Range { start, end } => {
                    if start > end || end > dim_size {
                        return Err(LinalgError::IndexOutOfBounds {
                            index: end,
                            size: dim_size,
                        });
                    }
                    new_shape[new_ndim] = end - start;
                    new_strides[new_ndim] = dim_stride;
                    new_ndim += 1;
                    offset += start as isize * dim_stride;
                }
                SliceRange::RangeStep { start, end, step } => {
                    if start >= dim_size || (end > dim_size && step > 0) {
                        return Err(LinalgError::IndexOutOfBounds {
                            index: if start >= dim_size { start } else { end },
                            size: dim_size,
                        });
                    }
                    if step == 0 {
                        return Err(LinalgError::InvalidShape {
                            shape: ShapeDescriptor::from_slice(self.shape()),
                            reason: "step cannot be zero",
                        });
                    }
                    let count = if step > 0 {
                        (end.saturating_sub(start) + (step as usize) - 1) / (step as usize)
                    } else {
                        let abs_step = step.unsigned_abs();
                        (start.saturating_sub(end) + abs_step - 1) / abs_step
                    };
                    new_shape[new_ndim] = count;
                    // Negative steps produce reversed views
                    new_strides[new_ndim] = dim_stride * step;
                    new_ndim += 1;
                    offset += start as isize * dim_stride;
                }
                SliceRange::Reversed => {
                    new_shape[new_ndim] = dim_size;
                    new_strides[new_ndim] = -dim_stride;
                    new_ndim += 1;
                    offset += (dim_size as isize - 1) * dim_stride;
                }
            }
        }

        if new_shape[..new_ndim].iter().any(|&d| d == 0) {
            return Err(LinalgError::InvalidShape {
                shape: ShapeDescriptor::from_slice(&new_shape[..new_ndim]),
                reason: "empty slice",
            });
        }

        Ok(Self {
            offset: offset as usize,
            shape: new_shape,
            strides: new_strides,
            ndim: new_ndim,
            len: new_shape[..new_ndim].iter().product(),
        })
    }

    fn transposed(&self) -> Result<Self> {
        if self.ndim != 2 {
            return Err(LinalgError::DimensionMismatch {
                expected: 2,
                got: self.ndim,
            });
        }
        let mut geometry = *self;
        geometry.shape.swap(0, 1);
        geometry.strides.swap(0, 1);
        Ok(geometry)
    }

    fn reshaped(&self, new_shape: &[usize]) -> Result<Self> {
        let new_len = checked_len(new_shape)?;
        if new_len != self.len {
            return Err(LinalgError::InvalidShape {
                shape: ShapeDescriptor::from_slice(new_shape),
                reason: "element count differs from the source",
            });
        }
        if !self.is_contiguous() {
            return Err(LinalgError::NonContiguous { op: "reshape" });
        }
        let mut geometry = Self::contiguous(new_shape);
        geometry.offset = self.offset;
        Ok(geometry)
    }

    fn with_axis(&self, axis: usize) -> Result<Self> {
        if axis > self.ndim {
            return Err(LinalgError::IndexOutOfBounds {
                index: axis,
                size: self.ndim + 1,
            });
        }
        if self.ndim == DEFAULT_MAX_RANK {
            return Err(LinalgError::TooManyRanks {
                got: self.ndim + 1,
            });
        }
        let stride = if axis < self.ndim {
            self.strides[axis] * self.shape[axis] as isize
        } else {
            1
        };
        let mut geometry = *self;
        for d in (axis..self.ndim).rev() {
            geometry.shape[d + 1] = self.shape[d];
            geometry.strides[d + 1] = self.strides[d];
        }
        geometry.shape[axis] = 1;
        geometry.strides[axis] = stride;
        geometry.ndim += 1;
        Ok(geometry)
    }
}

// endregion: Shape Helpers

// region: Tensor

/// N-dimensional array with owned, row-major storage.
///
/// Every dimension is positive; a tensor with no dimensions holds a single
/// scalar.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T> {
    data: Vec<T>,
    shape: [usize; DEFAULT_MAX_RANK],
    ndim: usize,
}

impl<T> Tensor<T> {
    /// Wraps an existing buffer, interpreted in row-major order.
    ///
    /// Returns `Err` if the shape is invalid or doesn't match the data length.
    pub fn try_from_vec(data: Vec<T>, shape: &[usize]) -> Result<Self> {
        let total = checked_len(shape)?;
        if data.len() != total {
            return Err(LinalgError::InvalidShape {
                shape: ShapeDescriptor::from_slice(shape),
                reason: "element count differs from the data length",
            });
        }
        Ok(Self {
            data,
            shape: shape_array(shape),
            ndim: shape.len(),
        })
    }

    /// Creates a 0-dimensional tensor holding one value.
    pub fn scalar(value: T) -> Self {
        Self {
            data: vec![value],
            shape: [0usize; DEFAULT_MAX_RANK],
            ndim: 0,
        }
    }

    /// Returns the shape of the array.
    pub fn shape(&self) -> &[usize] {
        &self.shape[..self.ndim]
    }

    /// Returns the number of dimensions.
    pub fn ndim(&self) -> usize {
        self.ndim
    }

    /// Returns the total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the stride in elements for the given dimension.
    pub fn stride(&self, dim: usize) -> isize {
        row_major_strides(self.shape())[dim]
    }

    /// Returns the underlying data as a slice.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Returns the underlying data as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Element at a multi-index, or `None` when out of bounds.
    pub fn get(&self, index: &[usize]) -> Option<&T> {
        let position = Geometry::contiguous(self.shape()).checked_index(index)?;
        self.data.get(position)
    }

    /// Mutable element at a multi-index, or `None` when out of bounds.
    pub fn get_mut(&mut self, index: &[usize]) -> Option<&mut T> {
        let position = Geometry::contiguous(self.shape()).checked_index(index)?;
        self.data.get_mut(position)
    }

    /// Returns a row of a 2D array.
    pub fn row(&self, i: usize) -> Option<&[T]> {
        if self.ndim != 2 {
            return None;
        }
        let (rows, cols) = (self.shape[0], self.shape[1]);
        if i >= rows {
            return None;
        }
        let start = i * cols;
        Some(&self.data[start..start + cols])
    }

    /// Create a view of the entire array.
    pub fn view(&self) -> TensorView<'_, T> {
        TensorView {
            data: &self.data,
            geometry: Geometry::contiguous(self.shape()),
        }
    }

    /// Create a mutable view of the entire array.
    pub fn view_mut(&mut self) -> TensorViewMut<'_, T> {
        let geometry = Geometry::contiguous(self.shape());
        TensorViewMut {
            data: &mut self.data,
            geometry,
        }
    }

    /// Slice the array along every dimension.
    ///
    /// # Example
    /// ```rust
    /// use numblas::{SliceRange, Tensor};
    ///
    /// let arr = Tensor::<f32>::new(&[4, 5], 1.0);
    ///
    /// // Rows 1..3, all columns
    /// let view = arr.slice(&[SliceRange::range(1, 3), SliceRange::full()]).unwrap();
    /// assert_eq!(view.shape(), &[2, 5]);
    ///
    /// // Row 0 (reduces to 1D)
    /// let row = arr.slice(&[SliceRange::index(0), SliceRange::full()]).unwrap();
    /// assert_eq!(row.ndim(), 1);
    /// ```
    pub fn slice(&self, ranges: &[SliceRange]) -> Result<TensorView<'_, T>> {
        self.view().slice(ranges)
    }

    /// Slice the array mutably along every dimension.
    pub fn slice_mut(&mut self, ranges: &[SliceRange]) -> Result<TensorViewMut<'_, T>> {
        self.view_mut().slice(ranges)
    }

    /// Transpose a 2D array (swaps strides, no data copy).
    pub fn t(&self) -> Result<TensorView<'_, T>> {
        self.view().t()
    }

    /// View the same elements under a new shape with the same element count.
    pub fn reshape(&self, new_shape: &[usize]) -> Result<TensorView<'_, T>> {
        self.view().reshape(new_shape)
    }
}

impl<T: Clone> Tensor<T> {
    /// Creates a new Tensor filled with a value.
    ///
    /// Returns `Err` if the shape is invalid.
    pub fn try_new(shape: &[usize], value: T) -> Result<Self> {
        let total = checked_len(shape)?;
        Self::try_from_vec(vec![value; total], shape)
    }

    /// Creates a Tensor from existing slice data.
    ///
    /// Returns `Err` if shape doesn't match data length.
    pub fn try_from_slice(data: &[T], shape: &[usize]) -> Result<Self> {
        Self::try_from_vec(data.to_vec(), shape)
    }

    /// Convenience constructor that panics on error.
    pub fn new(shape: &[usize], value: T) -> Self {
        Self::try_new(shape, value).expect("Tensor::new failed")
    }

    /// Convenience constructor that panics on error.
    pub fn from_slice(data: &[T], shape: &[usize]) -> Self {
        Self::try_from_slice(data, shape).expect("Tensor::from_slice failed")
    }
}

impl<T: Clone + num_traits::Zero> Tensor<T> {
    /// Creates a zero-filled Tensor.
    pub fn zeros(shape: &[usize]) -> Result<Self> {
        Self::try_new(shape, T::zero())
    }
}

impl<T: Copy> Tensor<T> {
    /// The only element of a single-element tensor, such as a vector dot product.
    pub fn item(&self) -> Option<T> {
        match self.data.as_slice() {
            [value] => Some(*value),
            _ => None,
        }
    }
}

impl<'a, T> From<&'a Tensor<T>> for TensorView<'a, T> {
    fn from(tensor: &'a Tensor<T>) -> Self {
        tensor.view()
    }
}

impl<'a, T> From<&'a mut Tensor<T>> for TensorViewMut<'a, T> {
    fn from(tensor: &'a mut Tensor<T>) -> Self {
        tensor.view_mut()
    }
}

// endregion: Tensor

// region: SliceRange

/// Represents a range specification for slicing along one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceRange {
    /// Full range (equivalent to `..`)
    Full,
    /// Single index (reduces dimension)
    Index(usize),
    /// Range from start to end exclusive (equivalent to `start..end`)
    Range { start: usize, end: usize },
    /// Range from start towards end (exclusive) with a signed step
    RangeStep {
        start: usize,
        end: usize,
        step: isize,
    },
    /// The whole dimension in reverse order
    Reversed,
}

impl SliceRange {
    /// Create a full range.
    pub fn full() -> Self {
        Self::Full
    }

    /// Create a single index.
    pub fn index(i: usize) -> Self {
        Self::Index(i)
    }

    /// Create a range from start to end.
    pub fn range(start: usize, end: usize) -> Self {
        Self::Range { start, end }
    }

    /// Create a range with step.
    pub fn range_step(start: usize, end: usize, step: isize) -> Self {
        Self::RangeStep { start, end, step }
    }

    /// Create a reversed full range.
    pub fn reversed() -> Self {
        Self::Reversed
    }
}

// endregion: SliceRange

// region: TensorView

/// A read-only view into a Tensor (doesn't own data).
///
/// Views provide zero-copy access to array subregions with potentially
/// different strides than the original array.
#[derive(Debug)]
pub struct TensorView<'a, T> {
    /// The whole borrowed buffer; the view addresses a subset of it.
    data: &'a [T],
    geometry: Geometry,
}

impl<'a, T> Clone for TensorView<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> Copy for TensorView<'a, T> {}

impl<'a, T> TensorView<'a, T> {
    /// Returns the shape of the view.
    pub fn shape(&self) -> &[usize] {
        self.geometry.shape()
    }

    /// Returns the number of dimensions.
    pub fn ndim(&self) -> usize {
        self.geometry.ndim
    }

    /// Returns the total number of elements.
    pub fn len(&self) -> usize {
        self.geometry.len
    }

    /// Returns true if the view has no elements.
    pub fn is_empty(&self) -> bool {
        self.geometry.len == 0
    }

    /// Returns the stride in elements for the given dimension.
    pub fn stride(&self, dim: usize) -> isize {
        self.geometry.strides[dim]
    }

    /// Returns all strides, in elements.
    pub fn strides(&self) -> &[isize] {
        self.geometry.strides()
    }

    /// Position of the first logical element inside the borrowed buffer.
    pub(crate) fn offset(&self) -> usize {
        self.geometry.offset
    }

    /// The whole borrowed buffer, including elements outside the view.
    pub(crate) fn buffer(&self) -> &'a [T] {
        self.data
    }

    /// Check if the entire view is contiguous in row-major order.
    pub fn is_contiguous(&self) -> bool {
        self.geometry.is_contiguous()
    }

    /// Convert to slice (only valid for contiguous views).
    pub fn as_contiguous_slice(&self) -> Option<&'a [T]> {
        if self.is_contiguous() {
            let start = self.geometry.offset;
            Some(&self.data[start..start + self.geometry.len])
        } else {
            None
        }
    }

    /// Element at a multi-index, or `None` when out of bounds.
    pub fn get(&self, index: &[usize]) -> Option<&'a T> {
        let position = self.geometry.checked_index(index)?;
        self.data.get(position)
    }

    /// Iterates over the elements in row-major logical order.
    pub fn iter(&self) -> Iter<'a, T> {
        Iter {
            data: self.data,
            geometry: self.geometry,
            indices: Indices::new(self.shape()),
        }
    }

    /// Slice the view along every dimension.
    pub fn slice(&self, ranges: &[SliceRange]) -> Result<Self> {
        Ok(Self {
            data: self.data,
            geometry: self.geometry.slice(ranges)?,
        })
    }

    /// Transpose a 2D view (swaps strides, no data copy).
    pub fn t(&self) -> Result<Self> {
        Ok(Self {
            data: self.data,
            geometry: self.geometry.transposed()?,
        })
    }

    /// Reshape the view (must have same total elements, contiguous only).
    pub fn reshape(&self, new_shape: &[usize]) -> Result<Self> {
        Ok(Self {
            data: self.data,
            geometry: self.geometry.reshaped(new_shape)?,
        })
    }

    /// Inserts a length-one axis at `axis`.
    pub fn insert_axis(&self, axis: usize) -> Result<Self> {
        Ok(Self {
            data: self.data,
            geometry: self.geometry.with_axis(axis)?,
        })
    }
}

impl<'a, T: Copy> TensorView<'a, T> {
    #[inline]
    pub(crate) fn at1(&self, i: usize) -> T {
        let position = self.geometry.offset as isize + i as isize * self.geometry.strides[0];
        self.data[position as usize]
    }

    #[inline]
    pub(crate) fn at2(&self, i: usize, j: usize) -> T {
        let position = self.geometry.offset as isize
            + i as isize * self.geometry.strides[0]
            + j as isize * self.geometry.strides[1];
        self.data[position as usize]
    }
}

impl<'a, T: Clone> TensorView<'a, T> {
    /// Copy the view contents to a new owned, row-major Tensor.
    pub fn to_owned(&self) -> Result<Tensor<T>> {
        match self.as_contiguous_slice() {
            Some(slice) => Tensor::try_from_slice(slice, self.shape()),
            None => Tensor::try_from_vec(self.iter().cloned().collect(), self.shape()),
        }
    }
}

/// Row-major iterator over the elements of a [`TensorView`].
pub struct Iter<'a, T> {
    data: &'a [T],
    geometry: Geometry,
    indices: Indices,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.indices.next()?;
        let position = self.geometry.linear_index(&index[..self.geometry.ndim]);
        Some(&self.data[position])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.indices.size_hint()
    }
}

impl<'a, T> ExactSizeIterator for Iter<'a, T> {}

// endregion: TensorView

// region: TensorViewMut

/// A mutable view into a Tensor.
#[derive(Debug)]
pub struct TensorViewMut<'a, T> {
    /// The whole borrowed buffer; the view addresses a subset of it.
    data: &'a mut [T],
    geometry: Geometry,
}

impl<'a, T> TensorViewMut<'a, T> {
    /// Returns the shape of the view.
    pub fn shape(&self) -> &[usize] {
        self.geometry.shape()
    }

    /// Returns the number of dimensions.
    pub fn ndim(&self) -> usize {
        self.geometry.ndim
    }

    /// Returns the total number of elements.
    pub fn len(&self) -> usize {
        self.geometry.len
    }

    /// Returns true if the view has no elements.
    pub fn is_empty(&self) -> bool {
        self.geometry.len == 0
    }

    /// Returns the stride in elements for the given dimension.
    pub fn stride(&self, dim: usize) -> isize {
        self.geometry.strides[dim]
    }

    /// Returns all strides, in elements.
    pub fn strides(&self) -> &[isize] {
        self.geometry.strides()
    }

    /// Position of the first logical element inside the borrowed buffer.
    pub(crate) fn offset(&self) -> usize {
        self.geometry.offset
    }

    /// The whole borrowed buffer, including elements outside the view.
    pub(crate) fn buffer_mut(&mut self) -> &mut [T] {
        self.data
    }

    /// Check if the entire view is contiguous in row-major order.
    pub fn is_contiguous(&self) -> bool {
        self.geometry.is_contiguous()
    }

    /// Read-only view of the same region.
    pub fn as_view(&self) -> TensorView<'_, T> {
        TensorView {
            data: self.data,
            geometry: self.geometry,
        }
    }

    /// Convert to slice (only valid for contiguous views).
    pub fn as_contiguous_slice_mut(&mut self) -> Option<&mut [T]> {
        if self.is_contiguous() {
            let start = self.geometry.offset;
            Some(&mut self.data[start..start + self.geometry.len])
        } else {
            None
        }
    }

    /// Slice the view along every dimension.
    pub fn slice(self, ranges: &[SliceRange]) -> Result<TensorViewMut<'a, T>> {
        let geometry = self.geometry.slice(ranges)?;
        Ok(TensorViewMut {
            data: self.data,
            geometry,
        })
    }

    /// Transpose a 2D view (swaps strides, no data copy).
    pub fn t(self) -> Result<TensorViewMut<'a, T>> {
        let geometry = self.geometry.transposed()?;
        Ok(TensorViewMut {
            data: self.data,
            geometry,
        })
    }

    #[inline]
    pub(crate) fn at1_mut(&mut self, i: usize) -> &mut T {
        let position = self.geometry.offset as isize + i as isize * self.geometry.strides[0];
        &mut self.data[position as usize]
    }

    #[inline]
    pub(crate) fn at2_mut(&mut self, i: usize, j: usize) -> &mut T {
        let position = self.geometry.offset as isize
            + i as isize * self.geometry.strides[0]
            + j as isize * self.geometry.strides[1];
        &mut self.data[position as usize]
    }
}

impl<'a, T: Clone> TensorViewMut<'a, T> {
    /// Overwrites every element of the view.
    pub fn fill(&mut self, value: T) {
        if let Some(slice) = self.as_contiguous_slice_mut() {
            slice.fill(value);
            return;
        }
        for index in Indices::new(self.geometry.shape()) {
            let position = self.geometry.linear_index(&index[..self.geometry.ndim]);
            self.data[position] = value.clone();
        }
    }

    /// Overwrites the view with row-major `source` data of the same length.
    pub fn assign_from_slice(&mut self, source: &[T]) -> Result<()> {
        if source.len() != self.geometry.len {
            return Err(LinalgError::InvalidShape {
                shape: ShapeDescriptor::from_slice(self.shape()),
                reason: "element count differs from the source",
            });
        }
        if let Some(slice) = self.as_contiguous_slice_mut() {
            slice.clone_from_slice(source);
            return Ok(());
        }
        let indices = Indices::new(self.geometry.shape());
        for (index, value) in indices.zip(source) {
            let position = self.geometry.linear_index(&index[..self.geometry.ndim]);
            self.data[position] = value.clone();
        }
        Ok(())
    }
}

// endregion: TensorViewMut

// region: Tests

#[cfg(test)]
mod tests {
    use super::*;

    fn arange(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64).collect()
    }

    #[test]
    fn tensor_creation() {
        let arr = Tensor::<f32>::try_new(&[3, 4], 1.0f32).unwrap();
        assert_eq!(arr.shape(), &[3, 4]);
        assert_eq!(arr.ndim(), 2);
        assert_eq!(arr.len(), 12);
        assert!(!arr.is_empty());
        assert_eq!(arr.stride(0), 4);
        assert_eq!(arr.stride(1), 1);
    }

    #[test]
    fn tensor_rejects_bad_shapes() {
        assert_eq!(
            Tensor::<f32>::try_new(&[1; 9], 0.0).unwrap_err(),
            LinalgError::TooManyRanks { got: 9 }
        );
        assert!(matches!(
            Tensor::<f32>::try_new(&[3, 0], 0.0),
            Err(LinalgError::InvalidShape { .. })
        ));
        assert!(matches!(
            Tensor::try_from_slice(&[1.0, 2.0, 3.0], &[2, 2]),
            Err(LinalgError::InvalidShape { .. })
        ));
    }

    #[test]
    fn tensor_from_slice() {
        let data = arange(12);
        let arr = Tensor::try_from_slice(&data, &[3, 4]).unwrap();
        assert_eq!(arr.shape(), &[3, 4]);
        assert_eq!(arr.as_slice(), &data[..]);
        assert_eq!(arr.get(&[2, 1]), Some(&9.0));
        assert_eq!(arr.get(&[3, 0]), None);
        assert_eq!(arr.get(&[0]), None);
    }

    #[test]
    fn tensor_row_access() {
        let arr = Tensor::try_from_slice(&arange(12), &[3, 4]).unwrap();
        assert_eq!(arr.row(0), Some(&[0.0, 1.0, 2.0, 3.0][..]));
        assert_eq!(arr.row(1), Some(&[4.0, 5.0, 6.0, 7.0][..]));
        assert_eq!(arr.row(3), None);
    }

    #[test]
    fn tensor_scalar_and_item() {
        let s = Tensor::scalar(35.0f64);
        assert_eq!(s.ndim(), 0);
        assert_eq!(s.len(), 1);
        assert_eq!(s.item(), Some(35.0));
        assert_eq!(Tensor::new(&[2], 1.0f64).item(), None);
    }

    #[test]
    fn tensor_slicing() {
        let arr = Tensor::<f32>::try_new(&[4, 5], 1.0f32).unwrap();

        let view = arr
            .slice(&[SliceRange::full(), SliceRange::full()])
            .unwrap();
        assert_eq!(view.shape(), &[4, 5]);

        let view = arr
            .slice(&[SliceRange::range(1, 3), SliceRange::full()])
            .unwrap();
        assert_eq!(view.shape(), &[2, 5]);
        assert!(view.is_contiguous());

        let view = arr
            .slice(&[SliceRange::index(0), SliceRange::full()])
            .unwrap();
        assert_eq!(view.shape(), &[5]);
        assert_eq!(view.ndim(), 1);
    }

    #[test]
    fn tensor_slicing_errors() {
        let arr = Tensor::<f32>::new(&[4, 5], 1.0);
        assert_eq!(
            arr.slice(&[SliceRange::full()]).unwrap_err(),
            LinalgError::DimensionMismatch {
                expected: 2,
                got: 1
            }
        );
        assert_eq!(
            arr.slice(&[SliceRange::index(4), SliceRange::full()])
                .unwrap_err(),
            LinalgError::IndexOutOfBounds { index: 4, size: 4 }
        );
        assert!(matches!(
            arr.slice(&[SliceRange::range(2, 2), SliceRange::full()]),
            Err(LinalgError::InvalidShape { .. })
        ));
        assert!(matches!(
            arr.slice(&[SliceRange::range_step(0, 4, 0), SliceRange::full()]),
            Err(LinalgError::InvalidShape { .. })
        ));
    }

    #[test]
    fn column_view_is_strided() {
        let m = Tensor::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
        let column = m
            .slice(&[SliceRange::full(), SliceRange::index(1)])
            .unwrap();
        assert_eq!(column.shape(), &[2]);
        assert_eq!(column.stride(0), 3);
        assert!(!column.is_contiguous());
        assert_eq!(column.iter().copied().collect::<Vec<_>>(), vec![2.0, 5.0]);
    }

    #[test]
    fn stepped_and_reversed_views() {
        let v = Tensor::from_slice(&arange(6), &[6]);

        let even = v.slice(&[SliceRange::range_step(0, 6, 2)]).unwrap();
        assert_eq!(even.iter().copied().collect::<Vec<_>>(), vec![0.0, 2.0, 4.0]);

        let down = v.slice(&[SliceRange::range_step(5, 0, -2)]).unwrap();
        assert_eq!(down.stride(0), -2);
        assert_eq!(down.iter().copied().collect::<Vec<_>>(), vec![5.0, 3.0, 1.0]);

        let reversed = v.slice(&[SliceRange::reversed()]).unwrap();
        assert_eq!(
            reversed.iter().copied().collect::<Vec<_>>(),
            vec![5.0, 4.0, 3.0, 2.0, 1.0, 0.0]
        );
    }

    #[test]
    fn tensor_transpose() {
        let arr = Tensor::from_slice(&arange(12), &[3, 4]);
        let transposed = arr.t().unwrap();
        assert_eq!(transposed.shape(), &[4, 3]);
        assert_eq!(transposed.strides(), &[1, 4]);
        assert_eq!(transposed.get(&[1, 2]), Some(&9.0));
        assert!(!transposed.is_contiguous());

        let v = Tensor::from_slice(&arange(3), &[3]);
        assert!(v.t().is_err());
    }

    #[test]
    fn tensor_reshape() {
        let arr = Tensor::<f32>::try_new(&[3, 4], 1.0f32).unwrap();
        let reshaped = arr.reshape(&[2, 6]).unwrap();
        assert_eq!(reshaped.shape(), &[2, 6]);
        assert_eq!(reshaped.len(), 12);
        assert!(arr.reshape(&[5, 2]).is_err());
        assert_eq!(
            arr.t().unwrap().reshape(&[12]).unwrap_err(),
            LinalgError::NonContiguous { op: "reshape" }
        );
    }

    #[test]
    fn insert_axis_keeps_elements() {
        let v = Tensor::from_slice(&arange(3), &[3]);
        let column = v.view().insert_axis(1).unwrap();
        assert_eq!(column.shape(), &[3, 1]);
        assert_eq!(column.get(&[2, 0]), Some(&2.0));
        let row = v.view().insert_axis(0).unwrap();
        assert_eq!(row.shape(), &[1, 3]);
        assert_eq!(row.get(&[0, 2]), Some(&2.0));
    }

    #[test]
    fn strided_view_to_owned() {
        let arr = Tensor::from_slice(&arange(6), &[2, 3]);
        let owned = arr.t().unwrap().to_owned().unwrap();
        assert_eq!(owned.shape(), &[3, 2]);
        assert_eq!(owned.as_slice(), &[0.0, 3.0, 1.0, 4.0, 2.0, 5.0]);
    }

    #[test]
    fn mutable_views_write_through() {
        let mut arr = Tensor::new(&[3, 3], 0.0f64);
        {
            let mut column = arr
                .slice_mut(&[SliceRange::full(), SliceRange::index(2)])
                .unwrap();
            column.fill(7.0);
        }
        assert_eq!(arr.get(&[0, 2]), Some(&7.0));
        assert_eq!(arr.get(&[2, 2]), Some(&7.0));
        assert_eq!(arr.get(&[2, 1]), Some(&0.0));

        let mut transposed = arr.view_mut().t().unwrap();
        transposed.assign_from_slice(&arange(9)).unwrap();
        assert_eq!(arr.get(&[1, 0]), Some(&1.0));
        assert_eq!(arr.get(&[0, 1]), Some(&3.0));
    }

    #[test]
    fn tensor_contiguous_check() {
        let arr = Tensor::<f32>::try_new(&[3, 4], 1.0f32).unwrap();
        let view = arr.view();
        assert!(view.is_contiguous());
        assert!(!arr.t().unwrap().is_contiguous());
    }
}

// endregion: Tests
