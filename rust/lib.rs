//! # NumBLAS - Linear Algebra over Strided Arrays with BLAS Dispatch
//!
//! * Inner and outer products, `gemm`, `gemv` and vector/matrix norms.
//! * Dispatches `f32` and `f64` work to native BLAS routines, everything else to generic kernels.
//! * Transposed and column-major views go to BLAS as flags, without copying.
//! * Strided views are copied into a temporary or computed in place by the generic kernels.
//! * Handles f64 double-, f32 single-, f16 half- and bf16 brain-float precision.
//!
//! ## Operations
//!
//! * [`dot`]: vector·vector, matrix·vector, vector·matrix and matrix·matrix products.
//! * [`outer`]: outer product of two vectors.
//! * [`norm`]: L1, L2/Frobenius, max/min absolute value, nonzero count and general p-norms.
//! * [`gemm`] and [`gemv`]: `out = alpha * op(a) * op(b) + beta * out` into a caller-supplied output.
//!
//! The free functions use [`Dispatcher::default`]. Build a [`Dispatcher`] from a
//! [`DispatchConfig`] to disable acceleration, reject strided operands instead of
//! copying them, or bound the size of implicit copies.
//!
//! # Example
//!
//! ```rust
//! use numblas::{NormOrder, SliceRange, Tensor};
//!
//! let m = Tensor::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
//! let x = Tensor::from_slice(&[1.0, 2.0, 3.0], &[3]);
//!
//! // Matrix-vector product
//! let y = numblas::dot(&m, &x).unwrap();
//! assert_eq!(y.as_slice(), &[14.0, 32.0]);
//!
//! // Column views are valid operands
//! let column = m.slice(&[SliceRange::full(), SliceRange::index(1)]).unwrap();
//! let v = Tensor::from_slice(&[1.0, 2.0], &[2]);
//! assert_eq!(numblas::dot(column, &v).unwrap().item(), Some(12.0));
//!
//! // Transposed product without copying
//! let mut gram = Tensor::new(&[3, 3], 0.0);
//! numblas::gemm(&m, &m, &mut gram, true, false, 1.0, 0.0).unwrap();
//! assert_eq!(gram.get(&[2, 2]), Some(&45.0));
//!
//! assert_eq!(numblas::norm(&x, NormOrder::L1).unwrap(), 6.0);
//! ```
//!
//! # Native Routines
//!
//! With the `blas` feature, `f32` and `f64` calls go through the `cblas` crate
//! to the platform library: OpenBLAS on Linux and Windows, Accelerate on macOS.
//! Set `NUMBLAS_BLAS_LIB` at build time to link a different library. Without the
//! feature, portable routines with the same calling convention are used.
//!
//! # Logging
//!
//! Dispatch decisions are emitted through the `log` facade at `debug` level,
//! implicit copies and output zero-filling at `trace` level. No logger is
//! installed by this crate.

pub mod blas;
mod dispatch;
mod error;
mod generic;
mod layout;
mod materialize;
pub mod scalars;
pub mod tensor;

pub use dispatch::{DispatchConfig, Dispatcher, NormOrder, StridedPolicy, DEFAULT_COPY_LIMIT};
pub use error::{LinalgError, Result, ShapeDescriptor, DEFAULT_MAX_RANK};
pub use layout::LayoutDescriptor;
pub use scalars::{bf16, f16, Dtype, Element};
pub use tensor::{SliceRange, Tensor, TensorView, TensorViewMut};

/// Inner product with the default [`Dispatcher`]; see [`Dispatcher::dot`].
pub fn dot<'a, 'b, T: Element>(
    a: impl Into<TensorView<'a, T>>,
    b: impl Into<TensorView<'b, T>>,
) -> Result<Tensor<T>> {
    Dispatcher::default().dot(a, b)
}

/// Outer product with the default [`Dispatcher`]; see [`Dispatcher::outer`].
pub fn outer<'a, 'b, T: Element>(
    a: impl Into<TensorView<'a, T>>,
    b: impl Into<TensorView<'b, T>>,
) -> Result<Tensor<T>> {
    Dispatcher::default().outer(a, b)
}

/// Norm of the flattened array with the default [`Dispatcher`]; see [`Dispatcher::norm`].
pub fn norm<'a, T: Element>(a: impl Into<TensorView<'a, T>>, order: NormOrder) -> Result<T> {
    Dispatcher::default().norm(a, order)
}

/// `out = alpha * op(a) * op(b) + beta * out` with the default [`Dispatcher`].
#[allow(clippy::too_many_arguments)]
pub fn gemm<'a, 'b, 'c, T: Element>(
    a: impl Into<TensorView<'a, T>>,
    b: impl Into<TensorView<'b, T>>,
    out: impl Into<TensorViewMut<'c, T>>,
    trans_a: bool,
    trans_b: bool,
    alpha: T,
    beta: T,
) -> Result<()> {
    Dispatcher::default().gemm(a, b, out, trans_a, trans_b, alpha, beta)
}

/// `out = alpha * op(a) * x + beta * out` with the default [`Dispatcher`].
pub fn gemv<'a, 'b, 'c, T: Element>(
    a: impl Into<TensorView<'a, T>>,
    x: impl Into<TensorView<'b, T>>,
    out: impl Into<TensorViewMut<'c, T>>,
    trans: bool,
    alpha: T,
    beta: T,
) -> Result<()> {
    Dispatcher::default().gemv(a, x, out, trans, alpha, beta)
}
