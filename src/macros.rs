//! Construction macros for aligned vectors and common array shapes.

/// Implements the `Integer` usize conversions for a list of primitive types.
#[macro_export]
macro_rules! impl_usize_conversions {
    ($($t:ty),* $(,)?) => {
        $(
            impl Integer for $t {
                #[inline]
                fn to_usize(self) -> usize {
                    self as usize
                }

                #[inline]
                fn from_usize(v: usize) -> Self {
                    v as $t
                }
            }
        )*
    };
}

/// Constructs a [`Vec64`](crate::Vec64) with `vec!`-style syntax.
///
/// ```rust
/// use minstream::vec64;
///
/// let v = vec64![1i64, 2, 3];
/// assert_eq!(&v[..], &[1, 2, 3]);
/// let z = vec64![0u8; 4];
/// assert_eq!(z.len(), 4);
/// ```
#[macro_export]
macro_rules! vec64 {
    () => {
        $crate::Vec64::new()
    };
    ($elem:expr; $n:expr) => {{
        let mut v = $crate::Vec64::with_capacity($n);
        v.resize($n, $elem);
        v
    }};
    ($($x:expr),+ $(,)?) => {{
        let mut v = $crate::Vec64::new();
        $(v.push($x);)+
        v
    }};
}

/// Constructs an `Array` holding an `Int64` column.
#[macro_export]
macro_rules! arr_i64 {
    ($($x:expr),* $(,)?) => {
        $crate::Array::from_int64($crate::PrimitiveArray::from_slice(&[$($x),*]))
    };
}

/// Constructs an `Array` holding an `Int32` column.
#[macro_export]
macro_rules! arr_i32 {
    ($($x:expr),* $(,)?) => {
        $crate::Array::from_int32($crate::PrimitiveArray::from_slice(&[$($x),*]))
    };
}

/// Constructs an `Array` holding a `Float64` column.
#[macro_export]
macro_rules! arr_f64 {
    ($($x:expr),* $(,)?) => {
        $crate::Array::from_float64($crate::PrimitiveArray::from_slice(&[$($x),*]))
    };
}

/// Constructs an `Array` holding a `Boolean` column.
#[macro_export]
macro_rules! arr_bool {
    ($($x:expr),* $(,)?) => {
        $crate::Array::from_boolean($crate::BooleanArray::from_slice(&[$($x),*]))
    };
}

/// Constructs an `Array` holding a `String` (32-bit offsets) column.
#[macro_export]
macro_rules! arr_str32 {
    ($($x:expr),* $(,)?) => {
        $crate::Array::from_string32($crate::StringArray::<u32>::from_slice(&[$($x),*]))
    };
}
