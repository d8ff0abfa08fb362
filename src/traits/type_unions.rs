use std::fmt::Debug;

use num_traits::{Float as NumFloat, NumCast, PrimInt, ToPrimitive};

use crate::impl_usize_conversions;

/// Trait for types valid as float elements in columnar arrays.
///
/// Extends and constrains the *num-traits* `Float` implementation to fit the
/// crate's type universe.
pub trait Float: NumFloat + Copy + Default + ToPrimitive + PartialEq + 'static {}
impl Float for f32 {}
impl Float for f64 {}

/// Trait for types valid as integer elements in columnar arrays, including
/// offsets, dictionary indices and union type ids.
pub trait Integer: PrimInt + Default + Debug + ToPrimitive + NumCast + 'static {
    /// Lossless cast to `usize`.
    fn to_usize(self) -> usize;

    /// Lossless cast from `usize`.
    fn from_usize(v: usize) -> Self;
}

impl_usize_conversions!(u8, u16, u32, u64, i8, i16, i32, i64);

/// Trait for types valid as fixed-width primitive array elements.
pub trait Primitive: Copy + Default + PartialEq + Debug + Send + Sync + 'static {}
impl Primitive for f32 {}
impl Primitive for f64 {}
impl Primitive for i8 {}
impl Primitive for i16 {}
impl Primitive for i32 {}
impl Primitive for i64 {}
impl Primitive for i128 {}
impl Primitive for u8 {}
impl Primitive for u16 {}
impl Primitive for u32 {}
impl Primitive for u64 {}
