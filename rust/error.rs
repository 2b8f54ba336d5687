//! Error types shared by the array container and the linear-algebra entry points.
//!
//! Structural problems (rank, shape) are reported before any kernel runs.
//! Element-type and layout problems never surface here: they are resolved by
//! falling back to the generic kernels or by copying into a temporary, unless
//! the caller configured [`StridedPolicy::Reject`](crate::StridedPolicy::Reject).

/// Default maximum rank for tensors.
pub const DEFAULT_MAX_RANK: usize = 8;

/// Fixed-size shape descriptor for error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeDescriptor {
    dims: [usize; DEFAULT_MAX_RANK],
    ndim: usize,
}

impl ShapeDescriptor {
    /// Create from a slice (truncates if > DEFAULT_MAX_RANK).
    pub fn from_slice(shape: &[usize]) -> Self {
        let mut dims = [0usize; DEFAULT_MAX_RANK];
        let ndim = shape.len().min(DEFAULT_MAX_RANK);
        dims[..ndim].copy_from_slice(&shape[..ndim]);
        Self { dims, ndim }
    }

    /// Return as a slice.
    pub fn as_slice(&self) -> &[usize] {
        &self.dims[..self.ndim]
    }
}

impl core::fmt::Display for ShapeDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[")?;
        for (i, &d) in self.as_slice().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, "]")
    }
}

/// Error type for array construction and linear-algebra operations.
#[derive(Debug, Clone, PartialEq)]
pub enum LinalgError {
    /// Operand or output dimensions are incompatible with the operation.
    ShapeMismatch {
        op: &'static str,
        expected: ShapeDescriptor,
        got: ShapeDescriptor,
    },
    /// Operand rank is outside what the operation accepts.
    UnsupportedRank {
        op: &'static str,
        expected: &'static str,
        got: usize,
    },
    /// A strided operand would need a contiguous copy and copying is disabled.
    NonContiguous { op: &'static str },
    /// Invalid shape specification.
    InvalidShape {
        shape: ShapeDescriptor,
        reason: &'static str,
    },
    /// Index out of bounds.
    IndexOutOfBounds { index: usize, size: usize },
    /// Expected a specific number of dimensions.
    DimensionMismatch { expected: usize, got: usize },
    /// Too many dimensions (exceeds DEFAULT_MAX_RANK).
    TooManyRanks { got: usize },
    /// The norm order is not defined for this input.
    InvalidNormOrder { order: f64, ndim: usize },
}

impl std::error::Error for LinalgError {}

impl core::fmt::Display for LinalgError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LinalgError::ShapeMismatch { op, expected, got } => {
                write!(f, "{}: shape mismatch: expected {}, got {}", op, expected, got)
            }
            LinalgError::UnsupportedRank { op, expected, got } => {
                write!(f, "{}: expected rank {}, got {}", op, expected, got)
            }
            LinalgError::NonContiguous { op } => {
                write!(f, "{}: operand is not BLAS-compatible and copying is disabled", op)
            }
            LinalgError::InvalidShape { shape, reason } => {
                write!(f, "invalid shape {}: {}", shape, reason)
            }
            LinalgError::IndexOutOfBounds { index, size } => {
                write!(f, "index {} out of bounds for size {}", index, size)
            }
            LinalgError::DimensionMismatch { expected, got } => {
                write!(f, "expected {} dimensions, got {}", expected, got)
            }
            LinalgError::TooManyRanks { got } => {
                write!(f, "too many ranks: {}", got)
            }
            LinalgError::InvalidNormOrder { order, ndim } => {
                write!(f, "norm order {} is invalid for a {}-d array", order, ndim)
            }
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, LinalgError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_descriptor_display() {
        let shape = ShapeDescriptor::from_slice(&[2, 3]);
        assert_eq!(format!("{}", shape), "[2, 3]");
        assert_eq!(format!("{}", ShapeDescriptor::from_slice(&[])), "[]");
    }

    #[test]
    fn shape_descriptor_truncates() {
        let shape = ShapeDescriptor::from_slice(&[1; 12]);
        assert_eq!(shape.as_slice().len(), DEFAULT_MAX_RANK);
    }

    #[test]
    fn error_display() {
        let err = LinalgError::ShapeMismatch {
            op: "gemm",
            expected: ShapeDescriptor::from_slice(&[3, 3]),
            got: ShapeDescriptor::from_slice(&[2, 2]),
        };
        assert_eq!(
            format!("{}", err),
            "gemm: shape mismatch: expected [3, 3], got [2, 2]"
        );

        let err = LinalgError::UnsupportedRank {
            op: "outer",
            expected: "1",
            got: 3,
        };
        assert_eq!(format!("{}", err), "outer: expected rank 1, got 3");

        let err = LinalgError::TooManyRanks { got: 10 };
        assert_eq!(format!("{}", err), "too many ranks: 10");
    }
}
