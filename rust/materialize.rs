//! Output allocation, validation and staging.
//!
//! Outputs are validated before anything is written. Outputs the native
//! routines cannot address directly are staged through a dense temporary
//! that is scattered back once the kernel finishes.

use log::trace;

use crate::error::{LinalgError, Result, ShapeDescriptor};
use crate::scalars::Element;
use crate::tensor::{Tensor, TensorViewMut};

/// Allocates the zero-initialized result of an operation.
pub(crate) fn allocate<T: Element>(shape: &[usize]) -> Result<Tensor<T>> {
    Tensor::zeros(shape)
}

/// Fails unless a caller-supplied output has exactly the expected shape.
pub(crate) fn check_output(op: &'static str, got: &[usize], expected: &[usize]) -> Result<()> {
    if got == expected {
        Ok(())
    } else {
        Err(LinalgError::ShapeMismatch {
            op,
            expected: ShapeDescriptor::from_slice(expected),
            got: ShapeDescriptor::from_slice(got),
        })
    }
}

/// Zeroes an output that is about to be overwritten with `beta == 0`.
///
/// Stale contents, NaN included, must never leak into the result.
pub(crate) fn clear_for_overwrite<T: Element>(out: &mut TensorViewMut<'_, T>, beta: T) {
    if beta.is_zero() {
        trace!("zero-filling {} output elements", out.len());
        out.fill(T::zero());
    }
}

/// A dense temporary standing in for an output the native routines cannot address.
pub(crate) struct Staging<T> {
    buffer: Tensor<T>,
}

impl<T: Element> Staging<T> {
    /// Allocates the temporary, copying the current output in only when `beta` needs it.
    pub fn new(out: &TensorViewMut<'_, T>, beta: T) -> Result<Self> {
        trace!(
            "staging a {:?} output through a contiguous temporary",
            out.shape()
        );
        let buffer = if beta.is_zero() {
            Tensor::zeros(out.shape())?
        } else {
            out.as_view().to_owned()?
        };
        Ok(Self { buffer })
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.buffer.as_mut_slice()
    }

    /// Writes the temporary back into the output.
    pub fn scatter(self, out: &mut TensorViewMut<'_, T>) -> Result<()> {
        out.assign_from_slice(self.buffer.as_slice())
    }
}
