//! Element types that can live in an exchanged field.

use bytemuck::Pod;
use num_traits::{Bounded, Float};
use std::fmt::Debug;

/// A plain-old-data field value.
///
/// Values travel bit-for-bit, so every element is `Pod`. Each type also names
/// the sentinel written into ghost slots whose donor data could not be
/// obtained.
pub trait FieldElement: Pod + Default + PartialEq + Debug + Send + Sync + 'static {
    /// Fill value for ghost slots without donor data.
    fn nonexistent() -> Self;

    /// Whether `self` is the [`nonexistent`](Self::nonexistent) sentinel.
    fn is_nonexistent(&self) -> bool;

    /// Additive inverse, used when a vector component is reversed. Unsigned
    /// elements carry no sign and are returned unchanged.
    fn reflect(self) -> Self;

    /// Bit-level equality (NaN payloads included).
    fn same_bits(&self, other: &Self) -> bool {
        bytemuck::bytes_of(self) == bytemuck::bytes_of(other)
    }
}

macro_rules! float_element {
    ($($t:ty),*) => {$(
        impl FieldElement for $t {
            #[inline]
            fn nonexistent() -> Self {
                <$t as Float>::nan()
            }
            #[inline]
            fn is_nonexistent(&self) -> bool {
                self.is_nan()
            }
            #[inline]
            fn reflect(self) -> Self {
                -self
            }
        }
    )*};
}

macro_rules! signed_element {
    ($($t:ty),*) => {$(
        impl FieldElement for $t {
            #[inline]
            fn nonexistent() -> Self {
                <$t as Bounded>::min_value()
            }
            #[inline]
            fn is_nonexistent(&self) -> bool {
                *self == <$t as Bounded>::min_value()
            }
            #[inline]
            fn reflect(self) -> Self {
                self.wrapping_neg()
            }
        }
    )*};
}

float_element!(f32, f64);
signed_element!(i32, i64);

impl FieldElement for u8 {
    #[inline]
    fn nonexistent() -> Self {
        <u8 as Bounded>::max_value()
    }
    #[inline]
    fn is_nonexistent(&self) -> bool {
        *self == u8::MAX
    }
    #[inline]
    fn reflect(self) -> Self {
        self
    }
}
