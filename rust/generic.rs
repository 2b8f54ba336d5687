//! Element-wise kernels for any shape, stride and floating-point type.
//!
//! These never touch native code and accept arbitrary strided views,
//! including reversed ones. They accumulate in the element type itself.
//! Callers validate shapes beforehand.

use num_traits::Float;

use crate::tensor::{TensorView, TensorViewMut};

/// Sum of element-wise products of two equally long 1-D views.
pub fn dot<T: Float>(a: TensorView<'_, T>, b: TensorView<'_, T>) -> T {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .fold(T::zero(), |acc, (&x, &y)| acc + x * y)
}

/// `y = alpha * a * x + beta * y` for a 2-D `a`; `y` is not read when `beta` is zero.
pub fn gemv<T: Float>(
    a: TensorView<'_, T>,
    x: TensorView<'_, T>,
    y: &mut TensorViewMut<'_, T>,
    alpha: T,
    beta: T,
) {
    let (rows, cols) = (a.shape()[0], a.shape()[1]);
    for i in 0..rows {
        let mut sum = T::zero();
        for j in 0..cols {
            sum = sum + a.at2(i, j) * x.at1(j);
        }
        let out = y.at1_mut(i);
        *out = blend(alpha * sum, beta, *out);
    }
}

/// `c = alpha * a * b + beta * c` for 2-D views; `c` is not read when `beta` is zero.
pub fn gemm<T: Float>(
    a: TensorView<'_, T>,
    b: TensorView<'_, T>,
    c: &mut TensorViewMut<'_, T>,
    alpha: T,
    beta: T,
) {
    let (m, k) = (a.shape()[0], a.shape()[1]);
    let n = b.shape()[1];
    for i in 0..m {
        for j in 0..n {
            let mut sum = T::zero();
            for p in 0..k {
                sum = sum + a.at2(i, p) * b.at2(p, j);
            }
            let out = c.at2_mut(i, j);
            *out = blend(alpha * sum, beta, *out);
        }
    }
}

/// `out[i, j] = a[i] * b[j]`.
pub fn outer<T: Float>(a: TensorView<'_, T>, b: TensorView<'_, T>, out: &mut TensorViewMut<'_, T>) {
    for i in 0..a.len() {
        let a_i = a.at1(i);
        for j in 0..b.len() {
            *out.at2_mut(i, j) = a_i * b.at1(j);
        }
    }
}

#[inline]
fn blend<T: Float>(product: T, beta: T, previous: T) -> T {
    if beta.is_zero() {
        product
    } else {
        product + beta * previous
    }
}

/// Sum of absolute values over every element, computed as a plain sum.
pub fn asum<T: Float>(a: TensorView<'_, T>) -> T {
    a.iter().fold(T::zero(), |acc, &x| acc + x.abs())
}

/// Euclidean norm over every element via a scaled sum of squares.
pub fn nrm2<T: Float>(a: TensorView<'_, T>) -> T {
    let mut scale = T::zero();
    let mut ssq = T::one();
    let mut infinite = false;
    for &value in a.iter() {
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

/// Largest absolute value; NaN if any element is NaN.
pub fn max_abs<T: Float>(a: TensorView<'_, T>) -> T {
    a.iter().fold(T::neg_infinity(), |acc, &x| {
        if x.is_nan() || acc.is_nan() {
            T::nan()
        } else {
            acc.max(x.abs())
        }
    })
}

/// Smallest absolute value; NaN if any element is NaN.
pub fn min_abs<T: Float>(a: TensorView<'_, T>) -> T {
    a.iter().fold(T::infinity(), |acc, &x| {
        if x.is_nan() || acc.is_nan() {
            T::nan()
        } else {
            acc.min(x.abs())
        }
    })
}

/// Number of nonzero elements.
pub fn count_nonzero<T: Float>(a: TensorView<'_, T>) -> usize {
    a.iter().filter(|x| !x.is_zero()).count()
}

/// `(sum |x|^p)^(1/p)` for a positive finite `p`.
pub fn pnorm<T: Float>(a: TensorView<'_, T>, p: T) -> T {
    a.iter()
        .fold(T::zero(), |acc, &x| acc + x.abs().powf(p))
        .powf(p.recip())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalars::f16;
    use crate::tensor::{SliceRange, Tensor};

    fn arange(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64).collect()
    }

    #[test]
    fn dot_over_strided_views() {
        let m = Tensor::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
        let column = m
            .slice(&[SliceRange::full(), SliceRange::index(1)])
            .unwrap();
        let v = Tensor::from_slice(&[1.0, 2.0], &[2]);
        assert_eq!(dot(column, v.view()), 12.0);

        let x = Tensor::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0], &[5]);
        let reversed = x.slice(&[SliceRange::reversed()]).unwrap();
        assert_eq!(dot(x.view(), reversed), 35.0);
    }

    #[test]
    fn gemm_reads_transposed_views() {
        let x = Tensor::from_slice(&[1.0, 2.0, 3.0, 1.0, 2.0, 3.0], &[2, 3]);
        let mut out = Tensor::new(&[3, 3], f64::NAN);
        gemm(x.t().unwrap(), x.view(), &mut out.view_mut(), 1.0, 0.0);
        assert_eq!(
            out.as_slice(),
            &[2.0, 4.0, 6.0, 4.0, 8.0, 12.0, 6.0, 12.0, 18.0]
        );
    }

    #[test]
    fn gemm_blends_with_beta() {
        let a = Tensor::from_slice(&[1.0, 2.0, 3.0, 4.0], &[2, 2]);
        let mut out = Tensor::new(&[2, 2], 1.0);
        gemm(a.view(), a.view(), &mut out.view_mut(), 0.5, 2.0);
        assert_eq!(out.as_slice(), &[5.5, 7.0, 9.5, 13.0]);
    }

    #[test]
    fn gemv_into_strided_output() {
        let a = Tensor::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
        let x = Tensor::from_slice(&[1.0, 2.0, 3.0], &[3]);
        let mut out = Tensor::new(&[4], -1.0);
        {
            let mut every_other = out
                .slice_mut(&[SliceRange::range_step(0, 4, 2)])
                .unwrap();
            gemv(a.view(), x.view(), &mut every_other, 1.0, 0.0);
        }
        assert_eq!(out.as_slice(), &[14.0, -1.0, 32.0, -1.0]);
    }

    #[test]
    fn outer_product() {
        let a = Tensor::from_slice(&[1.0, 1.0, 1.0], &[3]);
        let b = Tensor::from_slice(&arange(3), &[3]);
        let mut out = Tensor::new(&[3, 3], f64::NAN);
        outer(a.view(), b.view(), &mut out.view_mut());
        assert_eq!(out.as_slice(), &[0.0, 1.0, 2.0, 0.0, 1.0, 2.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn norms() {
        let a = Tensor::from_slice(&arange(15), &[3, 5]);
        assert_eq!(asum(a.view()), 105.0);
        assert!((nrm2(a.view()) - 31.859_064_644_147_98).abs() < 1e-9);
        assert_eq!(max_abs(a.view()), 14.0);
        assert_eq!(min_abs(a.view()), 0.0);
        assert_eq!(count_nonzero(a.view()), 14);
        // sum of cubes of 0..15 is 105^2
        assert!((pnorm(a.view(), 3.0) - 11025f64.cbrt()).abs() < 1e-9);

        let b = Tensor::from_slice(&[-3.0, 4.0], &[2]);
        assert_eq!(nrm2(b.view()), 5.0);
        assert_eq!(min_abs(b.view()), 3.0);
    }

    #[test]
    fn nan_propagates_through_norms() {
        let a = Tensor::from_slice(&[1.0, f64::NAN, 2.0], &[3]);
        assert!(nrm2(a.view()).is_nan());
        assert!(max_abs(a.view()).is_nan());
        assert!(min_abs(a.view()).is_nan());
    }

    #[test]
    fn infinities_saturate_euclidean_norm() {
        let inf = f64::INFINITY;
        let a = Tensor::from_slice(&[inf, 2.0, -inf, 3.0], &[2, 2]);
        assert_eq!(nrm2(a.view()), inf);
        assert_eq!(nrm2(a.t().unwrap()), inf);
        let b = Tensor::from_slice(&[inf, f64::NAN, inf], &[3]);
        assert!(nrm2(b.view()).is_nan());
    }

    #[test]
    fn half_precision_kernels() {
        let data: Vec<f16> = [1.0f32, 2.0, 3.0].iter().map(|&x| f16::from_f32(x)).collect();
        let v = Tensor::from_slice(&data, &[3]);
        assert_eq!(dot(v.view(), v.view()), f16::from_f32(14.0));
        assert_eq!(asum(v.view()), f16::from_f32(6.0));
    }
}
