use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::models::types::kind::ColumnKind;

/// Plain numeric element that a fixed-width column can be viewed as.
///
/// Implemented for the primitive integers and floats. The zerocopy bounds let
/// payload bytes be reinterpreted in place when they are suitably aligned, and
/// read by value when they are not.
pub trait NativeType:
    Copy + PartialEq + std::fmt::Debug + FromBytes + IntoBytes + Immutable + KnownLayout + 'static
{
    /// The column kind whose elements have this representation.
    const KIND: ColumnKind;
}

macro_rules! impl_native {
    ($($t:ty => $kind:ident),* $(,)?) => {
        $(
            impl NativeType for $t {
                const KIND: ColumnKind = ColumnKind::$kind;
            }
        )*
    };
}

impl_native!(
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
);
