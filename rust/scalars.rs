//! Element types accepted by the linear-algebra entry points.
//!
//! - `f64` and `f32` have native routine tables and take the accelerated path.
//! - [`f16`] and [`bf16`] (re-exported from the `half` crate) are accepted
//!   everywhere but always run on the generic kernels.
//!
//! The [`Element`] trait is sealed: the set of element types is closed.

use core::fmt;

use num_traits::Float;

pub use half::{bf16, f16};

use crate::blas::{self, Routines};

/// Runtime tag for an element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dtype {
    F64,
    F32,
    F16,
    BF16,
}

impl Dtype {
    /// Short lowercase name, as used in log records.
    pub fn name(self) -> &'static str {
        match self {
            Dtype::F64 => "f64",
            Dtype::F32 => "f32",
            Dtype::F16 => "f16",
            Dtype::BF16 => "bf16",
        }
    }

    /// Whether native routines exist for this element type.
    pub fn has_native_routines(self) -> bool {
        matches!(self, Dtype::F64 | Dtype::F32)
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// Sealed trait pattern to prevent external implementations
mod private {
    pub trait Sealed {}
    impl Sealed for f64 {}
    impl Sealed for f32 {}
    impl Sealed for super::f16 {}
    impl Sealed for super::bf16 {}
}

/// A floating-point element type the dispatcher understands.
///
/// This trait is sealed - users cannot implement it for their own types.
pub trait Element:
    Float + Default + fmt::Debug + fmt::Display + Send + Sync + 'static + private::Sealed
{
    /// Runtime tag of the type.
    const DTYPE: Dtype;

    /// The native routine table, or `None` when only the generic kernels apply.
    fn routines() -> Option<Routines<Self>>;
}

impl Element for f64 {
    const DTYPE: Dtype = Dtype::F64;

    fn routines() -> Option<Routines<Self>> {
        Some(blas::F64_ROUTINES)
    }
}

impl Element for f32 {
    const DTYPE: Dtype = Dtype::F32;

    fn routines() -> Option<Routines<Self>> {
        Some(blas::F32_ROUTINES)
    }
}

impl Element for f16 {
    const DTYPE: Dtype = Dtype::F16;

    fn routines() -> Option<Routines<Self>> {
        None
    }
}

impl Element for bf16 {
    const DTYPE: Dtype = Dtype::BF16;

    fn routines() -> Option<Routines<Self>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_routines_only_for_single_and_double() {
        assert!(f64::routines().is_some());
        assert!(f32::routines().is_some());
        assert!(f16::routines().is_none());
        assert!(bf16::routines().is_none());
    }

    #[test]
    fn dtype_tags_agree_with_routines() {
        assert!(f64::DTYPE.has_native_routines());
        assert!(f32::DTYPE.has_native_routines());
        assert!(!f16::DTYPE.has_native_routines());
        assert!(!bf16::DTYPE.has_native_routines());
        assert_eq!(format!("{}", bf16::DTYPE), "bf16");
    }
}
