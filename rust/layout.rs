//! Classifies strided operands into what the native routines can consume.
//!
//! A 2-D view is usable without copying when its storage is row-major or
//! column-major with a positive leading dimension. Column-major storage is
//! described as the transpose of a row-major matrix, so callers only flip a
//! calling-convention flag. Anything else needs a contiguous copy, which is
//! signalled through [`LayoutCopyRequired`] and never reaches the user unless
//! copying is disabled.
//!
//! 1-D views are always usable: a negative stride becomes a negative
//! increment over a slice that starts at the lowest addressed element.

use core::ops::Range;

use crate::blas::Transpose;
use crate::tensor::TensorView;

/// Largest extent or increment the native integer arguments can carry.
const NATIVE_INDEX_MAX: usize = i32::MAX as usize;

/// The operand cannot be handed to a native routine without a contiguous copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LayoutCopyRequired;

/// Per-call description of a 2-D operand in native calling-convention terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutDescriptor {
    /// The stored block has no gaps between rows.
    pub is_contiguous: bool,
    /// Logical rows of the view.
    pub rows: usize,
    /// Logical columns of the view.
    pub cols: usize,
    /// Distance in elements between consecutive stored rows; never below the stored row length.
    pub leading_dimension: usize,
    /// `Yes` when the view is column-major and stored as its own transpose.
    pub transpose: Transpose,
    /// Number of logical elements.
    pub len: usize,
}

impl LayoutDescriptor {
    /// Describes a row-major buffer of the given shape with no gaps.
    pub(crate) fn contiguous(rows: usize, cols: usize) -> Self {
        Self {
            is_contiguous: true,
            rows,
            cols,
            leading_dimension: cols.max(1),
            transpose: Transpose::No,
            len: rows * cols,
        }
    }

    /// Rows and columns of the row-major block as it sits in memory.
    pub fn stored_dims(&self) -> (usize, usize) {
        match self.transpose {
            Transpose::No => (self.rows, self.cols),
            Transpose::Yes => (self.cols, self.rows),
        }
    }

    /// Buffer range covering the stored block when it begins at `offset`.
    pub(crate) fn span(&self, offset: usize) -> Range<usize> {
        let (rows, cols) = self.stored_dims();
        offset..offset + (rows - 1) * self.leading_dimension + cols
    }
}

/// Leading dimension of a row-major `rows x cols` view, if it is one.
fn row_major_ld(rows: usize, cols: usize, row_stride: isize, col_stride: isize) -> Option<usize> {
    if cols > 1 && col_stride != 1 {
        return None;
    }
    if rows > 1 {
        if row_stride < cols as isize {
            return None;
        }
        Some(row_stride as usize)
    } else {
        Some(cols.max(1))
    }
}

/// Describes a 2-D shape and stride pair, preferring the row-major reading.
pub(crate) fn describe(
    shape: &[usize],
    strides: &[isize],
) -> Result<LayoutDescriptor, LayoutCopyRequired> {
    let (rows, cols) = match *shape {
        [rows, cols] => (rows, cols),
        _ => return Err(LayoutCopyRequired),
    };
    let (row_stride, col_stride) = (strides[0], strides[1]);

    let (leading_dimension, transpose) = if let Some(ld) =
        row_major_ld(rows, cols, row_stride, col_stride)
    {
        (ld, Transpose::No)
    } else if let Some(ld) = row_major_ld(cols, rows, col_stride, row_stride) {
        (ld, Transpose::Yes)
    } else {
        return Err(LayoutCopyRequired);
    };

    if rows > NATIVE_INDEX_MAX || cols > NATIVE_INDEX_MAX || leading_dimension > NATIVE_INDEX_MAX {
        return Err(LayoutCopyRequired);
    }

    let stored_cols = match transpose {
        Transpose::No => cols,
        Transpose::Yes => rows,
    };
    Ok(LayoutDescriptor {
        is_contiguous: leading_dimension == stored_cols,
        rows,
        cols,
        leading_dimension,
        transpose,
        len: rows * cols,
    })
}

/// A 2-D operand ready for a native call.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BlasMatrix<'a, T> {
    pub data: &'a [T],
    pub layout: LayoutDescriptor,
}

impl<'a, T> BlasMatrix<'a, T> {
    /// Borrows a view whose layout was already described.
    pub fn from_view(view: TensorView<'a, T>, layout: LayoutDescriptor) -> Self {
        Self {
            data: &view.buffer()[layout.span(view.offset())],
            layout,
        }
    }

    /// Wraps a dense row-major buffer.
    pub fn contiguous(data: &'a [T], rows: usize, cols: usize) -> Self {
        Self {
            data,
            layout: LayoutDescriptor::contiguous(rows, cols),
        }
    }
}

/// Describes a 2-D view, or reports that it must be copied first.
pub(crate) fn describe_matrix<T>(
    view: TensorView<'_, T>,
) -> Result<BlasMatrix<'_, T>, LayoutCopyRequired> {
    let layout = describe(view.shape(), view.strides())?;
    Ok(BlasMatrix::from_view(view, layout))
}

/// Length and increment of a 1-D operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct VectorLayout {
    pub len: usize,
    pub inc: isize,
}

impl VectorLayout {
    /// Buffer range covering every element when the logical first one sits at `offset`.
    pub fn span(&self, offset: usize) -> Range<usize> {
        let reach = (self.len - 1) * self.inc.unsigned_abs();
        if self.inc >= 0 {
            offset..offset + reach + 1
        } else {
            offset - reach..offset + 1
        }
    }
}

/// Describes a 1-D operand of `len` elements spaced `stride` apart.
pub(crate) fn describe_vector_layout(
    len: usize,
    stride: isize,
) -> Result<VectorLayout, LayoutCopyRequired> {
    let inc = if len == 1 { 1 } else { stride };
    if len > NATIVE_INDEX_MAX || inc.unsigned_abs() > NATIVE_INDEX_MAX {
        return Err(LayoutCopyRequired);
    }
    Ok(VectorLayout { len, inc })
}

/// A 1-D operand ready for a native call.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BlasVector<'a, T> {
    pub data: &'a [T],
    pub len: usize,
    pub inc: isize,
}

/// Describes a 1-D view for a native call.
pub(crate) fn describe_vector<T>(
    view: TensorView<'_, T>,
) -> Result<BlasVector<'_, T>, LayoutCopyRequired> {
    if view.ndim() != 1 {
        return Err(LayoutCopyRequired);
    }
    let layout = describe_vector_layout(view.len(), view.stride(0))?;
    Ok(BlasVector {
        data: &view.buffer()[layout.span(view.offset())],
        len: layout.len,
        inc: layout.inc,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::{SliceRange, Tensor};

    fn arange(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64).collect()
    }

    #[test]
    fn row_major_view_is_ready() {
        let m = Tensor::from_slice(&arange(12), &[3, 4]);
        let blas = describe_matrix(m.view()).unwrap();
        assert_eq!(blas.layout.transpose, Transpose::No);
        assert_eq!(blas.layout.leading_dimension, 4);
        assert!(blas.layout.is_contiguous);
        assert_eq!(blas.layout.len, 12);
        assert_eq!(blas.data.len(), 12);
    }

    #[test]
    fn transposed_view_flips_the_flag() {
        let m = Tensor::from_slice(&arange(12), &[3, 4]);
        let blas = describe_matrix(m.t().unwrap()).unwrap();
        assert_eq!(blas.layout.rows, 4);
        assert_eq!(blas.layout.cols, 3);
        assert_eq!(blas.layout.transpose, Transpose::Yes);
        assert_eq!(blas.layout.leading_dimension, 4);
        assert_eq!(blas.layout.stored_dims(), (3, 4));
    }

    #[test]
    fn sub_block_keeps_parent_leading_dimension() {
        let m = Tensor::from_slice(&arange(20), &[4, 5]);
        let block = m
            .slice(&[SliceRange::range(1, 3), SliceRange::range(2, 5)])
            .unwrap();
        let blas = describe_matrix(block).unwrap();
        assert_eq!(blas.layout.leading_dimension, 5);
        assert!(!blas.layout.is_contiguous);
        assert_eq!(blas.data[0], 7.0);
        assert_eq!(blas.data.len(), 8);
        assert_eq!(blas.data[blas.data.len() - 1], 14.0);
    }

    #[test]
    fn gapped_and_reversed_views_need_a_copy() {
        let m = Tensor::from_slice(&arange(20), &[4, 5]);
        let every_other = m
            .slice(&[SliceRange::full(), SliceRange::range_step(0, 5, 2)])
            .unwrap();
        assert_eq!(describe_matrix(every_other).unwrap_err(), LayoutCopyRequired);

        let upside_down = m
            .slice(&[SliceRange::reversed(), SliceRange::full()])
            .unwrap();
        assert_eq!(describe_matrix(upside_down).unwrap_err(), LayoutCopyRequired);
    }

    #[test]
    fn singleton_dimensions_accept_any_stride() {
        let layout = describe(&[1, 4], &[99, 1]).unwrap();
        assert_eq!(layout.transpose, Transpose::No);
        assert_eq!(layout.leading_dimension, 4);

        let layout = describe(&[4, 1], &[3, 7]).unwrap();
        assert_eq!(layout.transpose, Transpose::No);
        assert_eq!(layout.leading_dimension, 3);

        // A strided row reads as a column-major 1 x 4 block
        let layout = describe(&[1, 4], &[12, 3]).unwrap();
        assert_eq!(layout.transpose, Transpose::Yes);
        assert_eq!(layout.leading_dimension, 3);
        assert_eq!(layout.span(0), 0..10);
    }

    #[test]
    fn vectors_are_always_ready() {
        let v = Tensor::from_slice(&arange(6), &[6]);
        let reversed = v.slice(&[SliceRange::reversed()]).unwrap();
        let blas = describe_vector(reversed).unwrap();
        assert_eq!(blas.inc, -1);
        assert_eq!(blas.len, 6);
        assert_eq!(blas.data, &arange(6)[..]);

        let m = Tensor::from_slice(&arange(6), &[2, 3]);
        let column = m
            .slice(&[SliceRange::full(), SliceRange::index(1)])
            .unwrap();
        let blas = describe_vector(column).unwrap();
        assert_eq!(blas.inc, 3);
        assert_eq!(blas.data, &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn vector_spans() {
        assert_eq!(VectorLayout { len: 3, inc: 2 }.span(1), 1..6);
        assert_eq!(VectorLayout { len: 3, inc: -2 }.span(5), 1..6);
        assert_eq!(describe_vector_layout(1, -7).unwrap().inc, 1);
    }
}
