//! Operation dispatcher: validates operands, picks a kernel, marshals layouts.
//!
//! Every operation follows the same sequence:
//!
//! 1. Classify operands by rank and validate shapes, including any
//!    caller-supplied output. Nothing is written if this fails.
//! 2. Pick a path. Native routines run for `f32`/`f64` when acceleration is
//!    enabled. `f16`/`bf16` and disabled acceleration use the generic kernels.
//! 3. On the native path, describe each operand through the layout adapter.
//!    Row- or column-major operands are passed as-is with a transpose flag.
//!    Other strided operands are copied into a dense temporary, or handed to
//!    the generic kernels when the copy would exceed
//!    [`DispatchConfig::copy_limit`].
//!
//! Dispatch decisions are reported through `log::debug!`, copies and
//! zero-fills through `log::trace!`.

use log::{debug, trace};
use num_traits::NumCast;

use crate::blas::{Routines, Transpose};
use crate::error::{LinalgError, Result, ShapeDescriptor};
use crate::generic;
use crate::layout::{self, BlasMatrix, LayoutCopyRequired, LayoutDescriptor};
use crate::materialize::{self, Staging};
use crate::scalars::Element;
use crate::tensor::{Tensor, TensorView, TensorViewMut};

/// Default upper bound, in elements, on implicit contiguous copies.
pub const DEFAULT_COPY_LIMIT: usize = 1 << 24;

/// What to do with a strided operand the native routines cannot address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StridedPolicy {
    /// Materialize a contiguous temporary and continue.
    #[default]
    Copy,
    /// Fail with [`LinalgError::NonContiguous`].
    Reject,
}

/// Runtime knobs for a [`Dispatcher`].
///
/// # Example
///
/// ```rust
/// use numblas::{DispatchConfig, Dispatcher, StridedPolicy};
///
/// let dispatcher = Dispatcher::new(
///     DispatchConfig::default()
///         .strided(StridedPolicy::Reject)
///         .copy_limit(1 << 20),
/// );
/// assert_eq!(dispatcher.config().strided, StridedPolicy::Reject);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// `false` forces the generic kernels for every call.
    pub accelerate: bool,
    /// Handling of strided operands on the native path.
    pub strided: StridedPolicy,
    /// Temporaries larger than this many elements route to the generic kernels.
    pub copy_limit: usize,
    /// Vector products shorter than this use the generic kernel.
    pub dot_cutoff: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            accelerate: true,
            strided: StridedPolicy::Copy,
            copy_limit: DEFAULT_COPY_LIMIT,
            dot_cutoff: 0,
        }
    }
}

impl DispatchConfig {
    pub fn accelerate(mut self, enabled: bool) -> Self {
        self.accelerate = enabled;
        self
    }

    pub fn strided(mut self, policy: StridedPolicy) -> Self {
        self.strided = policy;
        self
    }

    pub fn copy_limit(mut self, elements: usize) -> Self {
        self.copy_limit = elements;
        self
    }

    pub fn dot_cutoff(mut self, elements: usize) -> Self {
        self.dot_cutoff = elements;
        self
    }
}

/// Order of a norm, computed over the flattened array.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum NormOrder {
    /// Sum of absolute values.
    L1,
    /// Euclidean norm.
    #[default]
    L2,
    /// Frobenius norm, the Euclidean norm of the flattened data.
    Fro,
    /// Largest absolute value.
    Inf,
    /// Smallest absolute value.
    NegInf,
    /// Number of nonzero elements.
    Zero,
    /// `(sum |x|^p)^(1/p)` for a positive `p`.
    P(f64),
}

impl NormOrder {
    /// Numeric order, as used in error messages.
    pub fn value(self) -> f64 {
        match self {
            NormOrder::L1 => 1.0,
            NormOrder::L2 | NormOrder::Fro => 2.0,
            NormOrder::Inf => f64::INFINITY,
            NormOrder::NegInf => f64::NEG_INFINITY,
            NormOrder::Zero => 0.0,
            NormOrder::P(p) => p,
        }
    }

    /// Routes the special values of `P` to their exact kernels.
    fn canonical(self, ndim: usize) -> Result<Self> {
        match self {
            NormOrder::P(p) if p.is_nan() || p <= 0.0 => {
                Err(LinalgError::InvalidNormOrder { order: p, ndim })
            }
            NormOrder::P(p) if p == 1.0 => Ok(NormOrder::L1),
            NormOrder::P(p) if p == 2.0 => Ok(NormOrder::L2),
            NormOrder::P(p) if p == f64::INFINITY => Ok(NormOrder::Inf),
            order => Ok(order),
        }
    }
}

impl From<f64> for NormOrder {
    fn from(order: f64) -> Self {
        if order == 1.0 {
            NormOrder::L1
        } else if order == 2.0 {
            NormOrder::L2
        } else if order == f64::INFINITY {
            NormOrder::Inf
        } else if order == f64::NEG_INFINITY {
            NormOrder::NegInf
        } else if order == 0.0 {
            NormOrder::Zero
        } else {
            NormOrder::P(order)
        }
    }
}

/// Operand rank, resolved once per call.
enum Operand<'a, T> {
    Vector(TensorView<'a, T>),
    Matrix(TensorView<'a, T>),
}

impl<'a, T> Operand<'a, T> {
    fn classify(op: &'static str, view: TensorView<'a, T>) -> Result<Self> {
        match view.ndim() {
            1 => Ok(Operand::Vector(view)),
            2 => Ok(Operand::Matrix(view)),
            got => Err(LinalgError::UnsupportedRank {
                op,
                expected: "1 or 2",
                got,
            }),
        }
    }
}

/// A matrix operand on its way to a native call.
enum Prepared<'a, T> {
    Ready(BlasMatrix<'a, T>),
    Copied(Tensor<T>),
}

impl<'a, T: Copy> Prepared<'a, T> {
    fn matrix(&self) -> BlasMatrix<'_, T> {
        match self {
            Prepared::Ready(matrix) => *matrix,
            Prepared::Copied(tensor) => {
                BlasMatrix::contiguous(tensor.as_slice(), tensor.shape()[0], tensor.shape()[1])
            }
        }
    }
}

/// Logical problem size of a matrix product.
#[derive(Debug, Clone, Copy)]
struct GemmDims {
    m: usize,
    n: usize,
    k: usize,
}

/// Shape of `op(a)` for a 2-D shape.
fn op_dims(shape: &[usize], trans: Transpose) -> (usize, usize) {
    match trans {
        Transpose::No => (shape[0], shape[1]),
        Transpose::Yes => (shape[1], shape[0]),
    }
}

fn expect_rank(op: &'static str, expected: &'static str, rank: usize, got: usize) -> Result<()> {
    if rank == got {
        Ok(())
    } else {
        Err(LinalgError::UnsupportedRank { op, expected, got })
    }
}

fn mismatch(op: &'static str, expected: &[usize], got: &[usize]) -> LinalgError {
    LinalgError::ShapeMismatch {
        op,
        expected: ShapeDescriptor::from_slice(expected),
        got: ShapeDescriptor::from_slice(got),
    }
}

fn transposed_if<'a, T>(view: TensorView<'a, T>, trans: Transpose) -> Result<TensorView<'a, T>> {
    match trans {
        Transpose::No => Ok(view),
        Transpose::Yes => view.t(),
    }
}

/// Issues a row-major gemm, writing into `c` described by `c_layout`.
#[allow(clippy::too_many_arguments)]
fn call_gemm<T: Copy>(
    routines: &Routines<T>,
    dims: GemmDims,
    a: BlasMatrix<'_, T>,
    ta: Transpose,
    b: BlasMatrix<'_, T>,
    tb: Transpose,
    alpha: T,
    beta: T,
    c: &mut [T],
    c_layout: LayoutDescriptor,
) {
    let GemmDims { m, n, k } = dims;
    let (lda, ldb, ldc) = (
        a.layout.leading_dimension,
        b.layout.leading_dimension,
        c_layout.leading_dimension,
    );
    match c_layout.transpose {
        Transpose::No => (routines.gemm)(
            ta, tb, m, n, k, alpha, a.data, lda, b.data, ldb, beta, c, ldc,
        ),
        // C is stored as its transpose, so compute C^T = op(B)^T * op(A)^T
        Transpose::Yes => (routines.gemm)(
            tb.flip(),
            ta.flip(),
            n,
            m,
            k,
            alpha,
            b.data,
            ldb,
            a.data,
            lda,
            beta,
            c,
            ldc,
        ),
    }
}

/// Entry point for the five linear-algebra operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dispatcher {
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(config: DispatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Inner product of vectors and matrices.
    ///
    /// | `a` | `b` | result |
    /// |---|---|---|
    /// | `[n]` | `[n]` | 0-d tensor, read with [`Tensor::item`] |
    /// | `[m, n]` | `[n]` | `[m]` |
    /// | `[m]` | `[m, n]` | `[n]` |
    /// | `[m, k]` | `[k, n]` | `[m, n]` |
    ///
    /// # Example
    ///
    /// ```rust
    /// use numblas::{Dispatcher, Tensor};
    ///
    /// let a = Tensor::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
    /// let x = Tensor::from_slice(&[1.0, 2.0, 3.0], &[3]);
    /// let y = Dispatcher::default().dot(&a, &x).unwrap();
    /// assert_eq!(y.as_slice(), &[14.0, 32.0]);
    /// ```
    pub fn dot<'a, 'b, T: Element>(
        &self,
        a: impl Into<TensorView<'a, T>>,
        b: impl Into<TensorView<'b, T>>,
    ) -> Result<Tensor<T>> {
        const OP: &str = "dot";
        let (a, b) = (a.into(), b.into());
        match (Operand::classify(OP, a)?, Operand::classify(OP, b)?) {
            (Operand::Vector(a), Operand::Vector(b)) => {
                if a.len() != b.len() {
                    return Err(mismatch(OP, a.shape(), b.shape()));
                }
                Ok(Tensor::scalar(self.vector_dot(OP, a, b)))
            }
            (Operand::Matrix(a), Operand::Vector(x)) => {
                let mut out = materialize::allocate(&[a.shape()[0]])?;
                self.gemv_into(OP, a, x, &mut out.view_mut(), Transpose::No, T::one(), T::zero())?;
                Ok(out)
            }
            (Operand::Vector(x), Operand::Matrix(b)) => {
                let mut out = materialize::allocate(&[b.shape()[1]])?;
                self.gemv_into(OP, b, x, &mut out.view_mut(), Transpose::Yes, T::one(), T::zero())?;
                Ok(out)
            }
            (Operand::Matrix(a), Operand::Matrix(b)) => {
                let mut out = materialize::allocate(&[a.shape()[0], b.shape()[1]])?;
                self.gemm_into(
                    OP,
                    a,
                    b,
                    &mut out.view_mut(),
                    Transpose::No,
                    Transpose::No,
                    T::one(),
                    T::zero(),
                )?;
                Ok(out)
            }
        }
    }

    /// Outer product of two vectors: `out[i, j] = a[i] * b[j]`.
    ///
    /// A length-1 `b` yields `a` as a column.
    pub fn outer<'a, 'b, T: Element>(
        &self,
        a: impl Into<TensorView<'a, T>>,
        b: impl Into<TensorView<'b, T>>,
    ) -> Result<Tensor<T>> {
        const OP: &str = "outer";
        let (a, b) = (a.into(), b.into());
        expect_rank(OP, "1", 1, a.ndim())?;
        expect_rank(OP, "1", 1, b.ndim())?;

        let mut out = materialize::allocate(&[a.len(), b.len()])?;
        if self.routines::<T>(OP).is_none() {
            debug!("{}: generic {}x{} outer product", OP, a.len(), b.len());
            generic::outer(a, b, &mut out.view_mut());
            return Ok(out);
        }

        // Rank-1 update: [p, 1] * [1, q]
        let column = a.insert_axis(1)?;
        let row = b.insert_axis(0)?;
        self.gemm_into(
            OP,
            column,
            row,
            &mut out.view_mut(),
            Transpose::No,
            Transpose::No,
            T::one(),
            T::zero(),
        )?;
        Ok(out)
    }

    /// Norm of the flattened array.
    ///
    /// `L1` is an exact sum of absolute values; `L2`/`Fro` use a scaled sum
    /// of squares. `P(p)` requires a positive `p`.
    pub fn norm<'a, T: Element>(&self, a: impl Into<TensorView<'a, T>>, order: NormOrder) -> Result<T> {
        const OP: &str = "norm";
        let a = a.into();
        let order = order.canonical(a.ndim())?;
        match order {
            NormOrder::L1 | NormOrder::L2 | NormOrder::Fro => {
                if let Some(value) = self.native_norm(OP, a, order) {
                    return Ok(value);
                }
                debug!("{}: generic {:?} norm over {} elements", OP, order, a.len());
                Ok(match order {
                    NormOrder::L1 => generic::asum(a),
                    _ => generic::nrm2(a),
                })
            }
            NormOrder::Inf => Ok(generic::max_abs(a)),
            NormOrder::NegInf => Ok(generic::min_abs(a)),
            NormOrder::Zero => {
                let count = generic::count_nonzero(a);
                Ok(<T as NumCast>::from(count).unwrap_or_else(T::infinity))
            }
            NormOrder::P(p) => {
                let exponent = <T as NumCast>::from(p).ok_or(LinalgError::InvalidNormOrder {
                    order: p,
                    ndim: a.ndim(),
                })?;
                Ok(generic::pnorm(a, exponent))
            }
        }
    }

    /// `out = alpha * op(a) * op(b) + beta * out`.
    ///
    /// With `beta == 0` the previous contents of `out` are ignored, NaN included.
    #[allow(clippy::too_many_arguments)]
    pub fn gemm<'a, 'b, 'c, T: Element>(
        &self,
        a: impl Into<TensorView<'a, T>>,
        b: impl Into<TensorView<'b, T>>,
        out: impl Into<TensorViewMut<'c, T>>,
        trans_a: bool,
        trans_b: bool,
        alpha: T,
        beta: T,
    ) -> Result<()> {
        let mut out = out.into();
        self.gemm_into(
            "gemm",
            a.into(),
            b.into(),
            &mut out,
            Transpose::from_flag(trans_a),
            Transpose::from_flag(trans_b),
            alpha,
            beta,
        )
    }

    /// `out = alpha * op(a) * x + beta * out`.
    ///
    /// With `beta == 0` the previous contents of `out` are ignored, NaN included.
    pub fn gemv<'a, 'b, 'c, T: Element>(
        &self,
        a: impl Into<TensorView<'a, T>>,
        x: impl Into<TensorView<'b, T>>,
        out: impl Into<TensorViewMut<'c, T>>,
        trans: bool,
        alpha: T,
        beta: T,
    ) -> Result<()> {
        let mut out = out.into();
        self.gemv_into(
            "gemv",
            a.into(),
            x.into(),
            &mut out,
            Transpose::from_flag(trans),
            alpha,
            beta,
        )
    }

    /// The native routine table, or `None` with the reason logged.
    fn routines<T: Element>(&self, op: &'static str) -> Option<Routines<T>> {
        if !self.config.accelerate {
            debug!("{}: acceleration disabled", op);
            return None;
        }
        let routines = T::routines();
        if routines.is_none() {
            debug!("{}: no native routines for {}", op, T::DTYPE);
        }
        routines
    }

    /// Whether a temporary of `len` elements may be materialized.
    fn may_copy(&self, op: &'static str, len: usize) -> Result<bool> {
        if self.config.strided == StridedPolicy::Reject {
            return Err(LinalgError::NonContiguous { op });
        }
        let limit = self.config.copy_limit.min(i32::MAX as usize);
        if len > limit {
            debug!(
                "{}: a {}-element copy exceeds the limit of {}, falling back",
                op, len, limit
            );
            return Ok(false);
        }
        Ok(true)
    }

    /// Describes a matrix operand, copying it when its strides require.
    ///
    /// `None` means the generic kernel has to take over.
    fn prepare<'v, T: Element>(
        &self,
        op: &'static str,
        view: TensorView<'v, T>,
    ) -> Result<Option<Prepared<'v, T>>> {
        match layout::describe_matrix(view) {
            Ok(matrix) => Ok(Some(Prepared::Ready(matrix))),
            Err(LayoutCopyRequired) => {
                if !self.may_copy(op, view.len())? {
                    return Ok(None);
                }
                trace!(
                    "{}: copying a {:?} operand with strides {:?}",
                    op,
                    view.shape(),
                    view.strides()
                );
                Ok(Some(Prepared::Copied(view.to_owned()?)))
            }
        }
    }

    fn vector_dot<T: Element>(&self, op: &'static str, a: TensorView<'_, T>, b: TensorView<'_, T>) -> T {
        let n = a.len();
        if n < self.config.dot_cutoff {
            debug!(
                "{}: {} elements is below the cutoff of {}",
                op, n, self.config.dot_cutoff
            );
        } else if let Some(routines) = self.routines::<T>(op) {
            if let (Ok(x), Ok(y)) = (layout::describe_vector(a), layout::describe_vector(b)) {
                debug!("{}: {}-element {} dot via {}", op, n, T::DTYPE, routines.name);
                return (routines.dot)(n, x.data, x.inc, y.data, y.inc);
            }
        }
        debug!("{}: generic {}-element dot", op, n);
        generic::dot(a, b)
    }

    fn native_norm<T: Element>(&self, op: &'static str, a: TensorView<'_, T>, order: NormOrder) -> Option<T> {
        let routines = self.routines::<T>(op)?;
        let (data, len, inc) = if a.ndim() == 1 {
            let vector = layout::describe_vector(a).ok()?;
            (vector.data, vector.len, vector.inc)
        } else {
            // Flattening a strided N-d view would need a copy; the generic kernel reads it in place
            let data = a.as_contiguous_slice()?;
            let vector = layout::describe_vector_layout(data.len(), 1).ok()?;
            (data, vector.len, vector.inc)
        };
        debug!("{}: {:?} norm over {} elements via {}", op, order, len, routines.name);
        Some(match order {
            NormOrder::L1 => (routines.asum)(len, data, inc),
            _ => (routines.nrm2)(len, data, inc),
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn gemm_into<T: Element>(
        &self,
        op: &'static str,
        a: TensorView<'_, T>,
        b: TensorView<'_, T>,
        out: &mut TensorViewMut<'_, T>,
        ta: Transpose,
        tb: Transpose,
        alpha: T,
        beta: T,
    ) -> Result<()> {
        expect_rank(op, "2", 2, a.ndim())?;
        expect_rank(op, "2", 2, b.ndim())?;
        expect_rank(op, "2", 2, out.ndim())?;

        let (m, k) = op_dims(a.shape(), ta);
        let (kb, n) = op_dims(b.shape(), tb);
        if kb != k {
            return Err(mismatch(op, &[k, n], &[kb, n]));
        }
        materialize::check_output(op, out.shape(), &[m, n])?;
        let dims = GemmDims { m, n, k };

        if let Some(routines) = self.routines::<T>(op) {
            if self.gemm_native(op, &routines, dims, a, b, out, ta, tb, alpha, beta)? {
                return Ok(());
            }
        }

        debug!("{}: generic {}x{} * {}x{} ({})", op, m, k, k, n, T::DTYPE);
        generic::gemm(transposed_if(a, ta)?, transposed_if(b, tb)?, out, alpha, beta);
        Ok(())
    }

    /// Runs a validated gemm natively; `false` leaves `out` untouched for the generic kernel.
    #[allow(clippy::too_many_arguments)]
    fn gemm_native<T: Element>(
        &self,
        op: &'static str,
        routines: &Routines<T>,
        dims: GemmDims,
        a: TensorView<'_, T>,
        b: TensorView<'_, T>,
        out: &mut TensorViewMut<'_, T>,
        ta: Transpose,
        tb: Transpose,
        alpha: T,
        beta: T,
    ) -> Result<bool> {
        let Some(a) = self.prepare(op, a)? else {
            return Ok(false);
        };
        let Some(b) = self.prepare(op, b)? else {
            return Ok(false);
        };
        let (a, b) = (a.matrix(), b.matrix());
        let ta = ta.compose(a.layout.transpose);
        let tb = tb.compose(b.layout.transpose);

        match layout::describe(out.shape(), out.strides()) {
            Ok(c_layout) => {
                materialize::clear_for_overwrite(out, beta);
                let offset = out.offset();
                let c = &mut out.buffer_mut()[c_layout.span(offset)];
                call_gemm(routines, dims, a, ta, b, tb, alpha, beta, c, c_layout);
            }
            Err(LayoutCopyRequired) => {
                if !self.may_copy(op, out.len())? {
                    return Ok(false);
                }
                let mut staging = Staging::new(out, beta)?;
                let c_layout = LayoutDescriptor::contiguous(dims.m, dims.n);
                call_gemm(
                    routines,
                    dims,
                    a,
                    ta,
                    b,
                    tb,
                    alpha,
                    beta,
                    staging.as_mut_slice(),
                    c_layout,
                );
                staging.scatter(out)?;
            }
        }
        debug!(
            "{}: {}x{} * {}x{} ({}, {:?}/{:?}) via {}",
            op, dims.m, dims.k, dims.k, dims.n, T::DTYPE, ta, tb, routines.name
        );
        Ok(true)
    }

    #[allow(clippy::too_many_arguments)]
    fn gemv_into<T: Element>(
        &self,
        op: &'static str,
        a: TensorView<'_, T>,
        x: TensorView<'_, T>,
        y: &mut TensorViewMut<'_, T>,
        trans: Transpose,
        alpha: T,
        beta: T,
    ) -> Result<()> {
        expect_rank(op, "2", 2, a.ndim())?;
        expect_rank(op, "1", 1, x.ndim())?;
        expect_rank(op, "1", 1, y.ndim())?;

        let (rows, cols) = op_dims(a.shape(), trans);
        if x.len() != cols {
            return Err(mismatch(op, &[cols], x.shape()));
        }
        materialize::check_output(op, y.shape(), &[rows])?;

        if let Some(routines) = self.routines::<T>(op) {
            if self.gemv_native(op, &routines, a, x, y, trans, alpha, beta)? {
                return Ok(());
            }
        }

        debug!("{}: generic {}x{} * {} ({})", op, rows, cols, cols, T::DTYPE);
        generic::gemv(transposed_if(a, trans)?, x, y, alpha, beta);
        Ok(())
    }

    /// Runs a validated gemv natively; `false` leaves `y` untouched for the generic kernel.
    #[allow(clippy::too_many_arguments)]
    fn gemv_native<T: Element>(
        &self,
        op: &'static str,
        routines: &Routines<T>,
        a: TensorView<'_, T>,
        x: TensorView<'_, T>,
        y: &mut TensorViewMut<'_, T>,
        trans: Transpose,
        alpha: T,
        beta: T,
    ) -> Result<bool> {
        let Some(a) = self.prepare(op, a)? else {
            return Ok(false);
        };
        let a = a.matrix();
        let (Ok(x), Ok(y_layout)) = (
            layout::describe_vector(x),
            layout::describe_vector_layout(y.len(), y.stride(0)),
        ) else {
            debug!("{}: vector extent exceeds the native index range", op);
            return Ok(false);
        };

        let trans = trans.compose(a.layout.transpose);
        let (stored_rows, stored_cols) = a.layout.stored_dims();
        materialize::clear_for_overwrite(y, beta);
        let offset = y.offset();
        let y_data = &mut y.buffer_mut()[y_layout.span(offset)];
        (routines.gemv)(
            trans,
            stored_rows,
            stored_cols,
            alpha,
            a.data,
            a.layout.leading_dimension,
            x.data,
            x.inc,
            beta,
            y_data,
            y_layout.inc,
        );
        debug!(
            "{}: {}x{} stored, {:?} ({}) via {}",
            op, stored_rows, stored_cols, trans, T::DTYPE, routines.name
        );
        Ok(true)
    }
}
