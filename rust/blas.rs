//! Call-through layer to the five native routines the dispatcher uses.
//!
//! Every routine follows the row-major CBLAS calling convention:
//!
//! - `gemm(ta, tb, m, n, k, alpha, a, lda, b, ldb, beta, c, ldc)`
//! - `gemv(ta, m, n, alpha, a, lda, x, incx, beta, y, incy)`
//! - `dot(n, x, incx, y, incy)`, `nrm2(n, x, incx)`, `asum(n, x, incx)`
//!
//! Buffers start at the lowest addressed element. A negative increment walks
//! the logical vector from the end of its slice backwards, as in reference
//! BLAS. Transposition is only ever a calling-convention flag; no routine
//! reorders the storage it is handed.
//!
//! With the `blas` feature the tables forward to the `cblas` crate and the
//! platform library linked by `build.rs`. Without it, a portable in-crate
//! implementation with the same argument conventions is used. In both cases a
//! zero `beta` means the output is never read.

use num_traits::Float;

/// Whether a stored matrix operand is used as-is or transposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transpose {
    No,
    Yes,
}

impl Transpose {
    /// Converts a user-facing `trans` flag.
    pub fn from_flag(transpose: bool) -> Self {
        if transpose {
            Transpose::Yes
        } else {
            Transpose::No
        }
    }

    /// The opposite flag.
    pub fn flip(self) -> Self {
        match self {
            Transpose::No => Transpose::Yes,
            Transpose::Yes => Transpose::No,
        }
    }

    /// Applies `other` on top of `self`: two transposes cancel out.
    pub fn compose(self, other: Transpose) -> Self {
        if other == Transpose::Yes {
            self.flip()
        } else {
            self
        }
    }
}

pub type GemmFn<T> = fn(
    Transpose,
    Transpose,
    usize,
    usize,
    usize,
    T,
    &[T],
    usize,
    &[T],
    usize,
    T,
    &mut [T],
    usize,
);
pub type GemvFn<T> = fn(Transpose, usize, usize, T, &[T], usize, &[T], isize, T, &mut [T], isize);
pub type DotFn<T> = fn(usize, &[T], isize, &[T], isize) -> T;
pub type Nrm2Fn<T> = fn(usize, &[T], isize) -> T;
pub type AsumFn<T> = fn(usize, &[T], isize) -> T;

/// A closed table of native routines for one element type.
#[derive(Clone, Copy)]
pub struct Routines<T> {
    /// Backend name, reported in dispatch logs.
    pub name: &'static str,
    pub gemm: GemmFn<T>,
    pub gemv: GemvFn<T>,
    pub dot: DotFn<T>,
    pub nrm2: Nrm2Fn<T>,
    pub asum: AsumFn<T>,
}

impl<T> core::fmt::Debug for Routines<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Routines").field("name", &self.name).finish()
    }
}

#[cfg(not(feature = "blas"))]
pub(crate) const F64_ROUTINES: Routines<f64> = portable::routines::<f64>();
#[cfg(not(feature = "blas"))]
pub(crate) const F32_ROUTINES: Routines<f32> = portable::routines::<f32>();

#[cfg(feature = "blas")]
pub(crate) const F64_ROUTINES: Routines<f64> = native::F64;
#[cfg(feature = "blas")]
pub(crate) const F32_ROUTINES: Routines<f32> = native::F32;

/// Position of the `i`-th logical element of a strided BLAS vector.
#[cfg_attr(feature = "blas", allow(dead_code))]
#[inline]
fn at(i: usize, n: usize, inc: isize) -> usize {
    if inc >= 0 {
        i * inc as usize
    } else {
        (n - 1 - i) * inc.unsigned_abs()
    }
}

// region: Portable

#[cfg_attr(feature = "blas", allow(dead_code))]
pub(crate) mod portable {
    use super::{at, Float, Routines, Transpose};

    pub(crate) const fn routines<T: Float + 'static>() -> Routines<T> {
        Routines {
            name: "portable",
            gemm: gemm::<T>,
            gemv: gemv::<T>,
            dot: dot::<T>,
            nrm2: nrm2::<T>,
            asum: asum::<T>,
        }
    }

    /// `C = alpha * op(A) * op(B) + beta * C` with row-major storage.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn gemm<T: Float>(
        ta: Transpose,
        tb: Transpose,
        m: usize,
        n: usize,
        k: usize,
        alpha: T,
        a: &[T],
        lda: usize,
        b: &[T],
        ldb: usize,
        beta: T,
        c: &mut [T],
        ldc: usize,
    ) {
        for i in 0..m {
            for j in 0..n {
                let mut sum = T::zero();
                for p in 0..k {
                    let a_ip = match ta {
                        Transpose::No => a[i * lda + p],
                        Transpose::Yes => a[p * lda + i],
                    };
                    let b_pj = match tb {
                        Transpose::No => b[p * ldb + j],
                        Transpose::Yes => b[j * ldb + p],
                    };
                    sum = sum + a_ip * b_pj;
                }
                let out = &mut c[i * ldc + j];
                *out = if beta.is_zero() {
                    alpha * sum
                } else {
                    alpha * sum + beta * *out
                };
            }
        }
    }

    /// `y = alpha * op(A) * x + beta * y` where `A` is stored `m x n`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn gemv<T: Float>(
        ta: Transpose,
        m: usize,
        n: usize,
        alpha: T,
        a: &[T],
        lda: usize,
        x: &[T],
        incx: isize,
        beta: T,
        y: &mut [T],
        incy: isize,
    ) {
        let (rows, cols) = match ta {
            Transpose::No => (m, n),
            Transpose::Yes => (n, m),
        };
        for i in 0..rows {
            let mut sum = T::zero();
            for j in 0..cols {
                let a_ij = match ta {
                    Transpose::No => a[i * lda + j],
                    Transpose::Yes => a[j * lda + i],
                };
                sum = sum + a_ij * x[at(j, cols, incx)];
            }
            let out = &mut y[at(i, rows, incy)];
            *out = if beta.is_zero() {
                alpha * sum
            } else {
                alpha * sum + beta * *out
            };
        }
    }

    pub(crate) fn dot<T: Float>(n: usize, x: &[T], incx: isize, y: &[T], incy: isize) -> T {
        (0..n).fold(T::zero(), |acc, i| {
            acc + x[at(i, n, incx)] * y[at(i, n, incy)]
        })
    }

    /// Euclidean norm via a scaled sum of squares, safe from overflow.
    pub(crate) fn nrm2<T: Float>(n: usize, x: &[T], incx: isize) -> T {
        let mut scale = T::zero();
        let mut ssq = T::one();
        let mut infinite = false;
        for i in 0..n {
            let value = x[at(i, n, incx)];
            if value.is_zero() {
                continue;
            }
            let magnitude = value.abs();
            if magnitude.is_infinite() {
                infinite = true;
                continue;
            }
            if scale < magnitude {
                let ratio = scale / magnitude;
                ssq = T::one() + ssq * ratio * ratio;
                scale = magnitude;
            } else {
                let ratio = magnitude / scale;
                ssq = ssq + ratio * ratio;
            }
        }
        let norm = scale * ssq.sqrt();
        // Infinity wins over finite values, NaN wins over infinity
        if infinite && !norm.is_nan() {
            T::infinity()
        } else {
            norm
        }
    }

    pub(crate) fn asum<T: Float>(n: usize, x: &[T], incx: isize) -> T {
        (0..n).fold(T::zero(), |acc, i| acc + x[at(i, n, incx)].abs())
    }
}

// endregion: Portable

// region: Native

#[cfg(feature = "blas")]
mod native {
    use super::{Routines, Transpose};
    use cblas::Layout;

    fn code(transpose: Transpose) -> cblas::Transpose {
        match transpose {
            Transpose::No => cblas::Transpose::None,
            Transpose::Yes => cblas::Transpose::Ordinary,
        }
    }

    macro_rules! native_routines {
        ($table:ident, $t:ty, $gemm:ident, $gemv:ident, $dot:ident, $nrm2:ident, $asum:ident) => {
            #[allow(clippy::too_many_arguments)]
            fn $gemm(
                ta: Transpose,
                tb: Transpose,
                m: usize,
                n: usize,
                k: usize,
                alpha: $t,
                a: &[$t],
                lda: usize,
                b: &[$t],
                ldb: usize,
                beta: $t,
                c: &mut [$t],
                ldc: usize,
            ) {
                // SAFETY: the layout adapter bounds every dimension by `i32::MAX`
                // and the slices cover the extents implied by the leading dimensions.
                unsafe {
                    cblas::$gemm(
                        Layout::RowMajor,
                        code(ta),
                        code(tb),
                        m as i32,
                        n as i32,
                        k as i32,
                        alpha,
                        a,
                        lda as i32,
                        b,
                        ldb as i32,
                        beta,
                        c,
                        ldc as i32,
                    )
                }
            }

            #[allow(clippy::too_many_arguments)]
            fn $gemv(
                ta: Transpose,
                m: usize,
                n: usize,
                alpha: $t,
                a: &[$t],
                lda: usize,
                x: &[$t],
                incx: isize,
                beta: $t,
                y: &mut [$t],
                incy: isize,
            ) {
                // SAFETY: see the matching gemm wrapper.
                unsafe {
                    cblas::$gemv(
                        Layout::RowMajor,
                        code(ta),
                        m as i32,
                        n as i32,
                        alpha,
                        a,
                        lda as i32,
                        x,
                        incx as i32,
                        beta,
                        y,
                        incy as i32,
                    )
                }
            }

            fn $dot(n: usize, x: &[$t], incx: isize, y: &[$t], incy: isize) -> $t {
                // SAFETY: both slices cover `n` strided elements.
                unsafe { cblas::$dot(n as i32, x, incx as i32, y, incy as i32) }
            }

            fn $nrm2(n: usize, x: &[$t], incx: isize) -> $t {
                // SAFETY: the slice covers `n` strided elements.
                unsafe { cblas::$nrm2(n as i32, x, incx as i32) }
            }

            fn $asum(n: usize, x: &[$t], incx: isize) -> $t {
                // SAFETY: the slice covers `n` strided elements.
                unsafe { cblas::$asum(n as i32, x, incx as i32) }
            }

            pub(super) const $table: Routines<$t> = Routines {
                name: "cblas",
                gemm: $gemm,
                gemv: $gemv,
                dot: $dot,
                nrm2: $nrm2,
                asum: $asum,
            };
        };
    }

    native_routines!(F64, f64, dgemm, dgemv, ddot, dnrm2, dasum);
    native_routines!(F32, f32, sgemm, sgemv, sdot, snrm2, sasum);
}

// endregion: Native

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transpose_flags_compose() {
        assert_eq!(Transpose::from_flag(true), Transpose::Yes);
        assert_eq!(Transpose::No.flip(), Transpose::Yes);
        assert_eq!(Transpose::Yes.compose(Transpose::Yes), Transpose::No);
        assert_eq!(Transpose::No.compose(Transpose::Yes), Transpose::Yes);
        assert_eq!(Transpose::Yes.compose(Transpose::No), Transpose::Yes);
    }

    #[test]
    fn strided_positions_follow_blas_convention() {
        assert_eq!(at(0, 4, 2), 0);
        assert_eq!(at(3, 4, 2), 6);
        assert_eq!(at(0, 4, -2), 6);
        assert_eq!(at(3, 4, -2), 0);
    }

    #[test]
    fn gemm_all_transpose_combinations() {
        let r = F64_ROUTINES;
        // A = [[1, 2, 3], [4, 5, 6]], B = [[1, 0], [0, 1], [1, 1]]
        let a = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let b = [1.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let mut c = [0.0; 4];
        (r.gemm)(Transpose::No, Transpose::No, 2, 2, 3, 1.0, &a, 3, &b, 2, 0.0, &mut c, 2);
        assert_eq!(c, [4.0, 5.0, 10.0, 11.0]);

        // A^T stored as 3x2, B^T stored as 2x3
        let at_ = [1.0, 4.0, 2.0, 5.0, 3.0, 6.0];
        let bt = [1.0, 0.0, 1.0, 0.0, 1.0, 1.0];
        let mut c = [0.0; 4];
        (r.gemm)(Transpose::Yes, Transpose::Yes, 2, 2, 3, 1.0, &at_, 2, &bt, 3, 0.0, &mut c, 2);
        assert_eq!(c, [4.0, 5.0, 10.0, 11.0]);

        let mut c = [1.0; 4];
        (r.gemm)(Transpose::Yes, Transpose::No, 2, 2, 3, 2.0, &at_, 2, &b, 2, 1.0, &mut c, 2);
        assert_eq!(c, [9.0, 11.0, 21.0, 23.0]);
    }

    #[test]
    fn portable_gemm_ignores_output_when_beta_is_zero() {
        let a = [1.0f32, 2.0, 3.0, 4.0];
        let mut c = [f32::NAN; 4];
        portable::gemm(Transpose::No, Transpose::No, 2, 2, 2, 1.0, &a, 2, &a, 2, 0.0, &mut c, 2);
        assert_eq!(c, [7.0, 10.0, 15.0, 22.0]);

        let x = [1.0f32, 1.0];
        let mut y = [f32::NAN; 2];
        portable::gemv(Transpose::No, 2, 2, 1.0, &a, 2, &x, 1, 0.0, &mut y, 1);
        assert_eq!(y, [3.0, 7.0]);
    }

    #[test]
    fn gemv_respects_transpose_and_increments() {
        let r = F64_ROUTINES;
        let a = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];

        let x = [1.0, 2.0, 3.0];
        let mut y = [0.0; 2];
        (r.gemv)(Transpose::No, 2, 3, 1.0, &a, 3, &x, 1, 0.0, &mut y, 1);
        assert_eq!(y, [14.0, 32.0]);

        let x = [1.0, 2.0];
        let mut y = [0.0; 3];
        (r.gemv)(Transpose::Yes, 2, 3, 1.0, &a, 3, &x, 1, 0.0, &mut y, 1);
        assert_eq!(y, [9.0, 12.0, 15.0]);

        // x = [3, 2, 1] read backwards from [1, _, 2, _, 3]
        let x = [1.0, 0.0, 2.0, 0.0, 3.0];
        let mut y = [0.0; 2];
        (r.gemv)(Transpose::No, 2, 3, 1.0, &a, 3, &x, -2, 0.0, &mut y, 1);
        assert_eq!(y, [10.0, 28.0]);
    }

    #[test]
    fn level_one_routines() {
        let r = F64_ROUTINES;
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [5.0, 4.0, 3.0, 2.0, 1.0];
        assert_eq!((r.dot)(5, &x, 1, &y, 1), 35.0);
        assert_eq!((r.dot)(5, &x, 1, &x, -1), 35.0);
        assert_eq!((r.dot)(3, &x, 2, &y, 2), 1.0 * 5.0 + 3.0 * 3.0 + 5.0 * 1.0);
        assert_eq!((r.asum)(4, &[-6.0, 4.0, -2.0, 1.0], 1), 13.0);
        let norm = (r.nrm2)(4, &[6.0, 4.0, 2.0, 1.0], 1);
        assert!((norm - 7.549_834_435_270_75).abs() < 1e-12);
    }

    #[test]
    fn portable_nrm2_avoids_overflow() {
        let x = [3e300f64, 4e300];
        let norm = portable::nrm2(2, &x, 1);
        assert!(norm.is_finite());
        assert!((norm / 5e300 - 1.0).abs() < 1e-12);
        assert_eq!(portable::nrm2(3, &[0.0f64; 3], 1), 0.0);
        assert!(portable::nrm2(2, &[1.0f64, f64::NAN], 1).is_nan());
    }

    #[test]
    fn portable_nrm2_with_infinities() {
        let inf = f64::INFINITY;
        assert_eq!(portable::nrm2(2, &[inf, inf], 1), inf);
        assert_eq!(portable::nrm2(3, &[1.0, -inf, inf], -1), inf);
        assert!(portable::nrm2(3, &[inf, f64::NAN, inf], 1).is_nan());
        assert!(portable::nrm2(2, &[f64::NAN, inf], 1).is_nan());
    }
}
