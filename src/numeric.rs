//! Numeric capability gating `sum`, `average` and `range`.

use num_traits::{Num, NumCast};

/// Element types that support arithmetic reductions.
///
/// Implemented for every primitive integer and float type.
pub trait Numeric: Num + NumCast + PartialOrd + Copy + Send + Sync + 'static {}

impl<T> Numeric for T where T: Num + NumCast + PartialOrd + Copy + Send + Sync + 'static {}
