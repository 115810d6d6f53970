// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Element types and typed access to raw tensor bytes.
//!
//! ## Why This Module Exists
//!
//! Tensor memory crosses the host/device boundary as untyped bytes. The copier
//! needs three things to move it safely:
//!
//! 1. **Type tags**: [`ElementType`] names the numeric type stored in a buffer
//! 2. **Typed access**: [`Element`] reads and writes one value at a byte offset
//! 3. **Casts**: [`CastInto`] converts one element type to another
//!
//! ## Design Decisions
//!
//! - **Native byte order**: buffers are host memory images, so values are read
//!   with `from_ne_bytes` and the same-type fast path stays bit-identical to a
//!   raw copy.
//!
//! - **Casts only where the table needs them**: `CastInto` is implemented for the
//!   pairs listed in [`crate::convert`] and nothing else, so an unsupported pair
//!   cannot be dispatched by accident.

use crate::error::{CoreError, Result};
use candle_core::DType;
use half::f16;

/// Numeric element type of a tensor buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementType {
    /// 64-bit IEEE float.
    F64,
    /// 32-bit IEEE float.
    F32,
    /// 16-bit IEEE half-precision float.
    F16,
    /// Signed 8-bit integer.
    I8,
    /// Unsigned 8-bit integer.
    U8,
    /// Signed 16-bit integer.
    I16,
    /// Unsigned 16-bit integer.
    U16,
    /// Signed 32-bit integer.
    I32,
    /// Unsigned 32-bit integer.
    U32,
    /// Signed 64-bit integer.
    I64,
    /// Unsigned 64-bit integer.
    U64,
}

impl ElementType {
    /// Every element type, in declaration order.
    pub const ALL: [ElementType; 11] = [
        Self::F64,
        Self::F32,
        Self::F16,
        Self::I8,
        Self::U8,
        Self::I16,
        Self::U16,
        Self::I32,
        Self::U32,
        Self::I64,
        Self::U64,
    ];

    /// Size in bytes of one element.
    ///
    /// ## Example
    ///
    /// ```rust
    /// use rust_ai_transfer::ElementType;
    ///
    /// assert_eq!(ElementType::F16.size(), 2);
    /// assert_eq!(ElementType::U64.size(), 8);
    /// ```
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::F16 | Self::I16 | Self::U16 => 2,
            Self::F32 | Self::I32 | Self::U32 => 4,
            Self::F64 | Self::I64 | Self::U64 => 8,
        }
    }

    /// Short lowercase name used in logs and error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::F64 => "f64",
            Self::F32 => "f32",
            Self::F16 => "f16",
            Self::I8 => "i8",
            Self::U8 => "u8",
            Self::I16 => "i16",
            Self::U16 => "u16",
            Self::I32 => "i32",
            Self::U32 => "u32",
            Self::I64 => "i64",
            Self::U64 => "u64",
        }
    }

    /// `true` for f16, f32 and f64.
    #[must_use]
    pub const fn is_floating_point(self) -> bool {
        matches!(self, Self::F16 | Self::F32 | Self::F64)
    }

    /// `true` for floats and signed integers.
    #[must_use]
    pub const fn is_signed(self) -> bool {
        !matches!(self, Self::U8 | Self::U16 | Self::U32 | Self::U64)
    }

    /// Bytes needed to hold `count` elements.
    #[must_use]
    pub const fn bytes_for(self, count: usize) -> usize {
        count * self.size()
    }

    /// Matching Candle dtype, if Candle has one.
    #[must_use]
    pub fn to_candle(self) -> Option<DType> {
        match self {
            Self::F64 => Some(DType::F64),
            Self::F32 => Some(DType::F32),
            Self::F16 => Some(DType::F16),
            Self::U8 => Some(DType::U8),
            Self::U32 => Some(DType::U32),
            Self::I64 => Some(DType::I64),
            _ => None,
        }
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<DType> for ElementType {
    type Error = CoreError;

    fn try_from(dtype: DType) -> Result<Self> {
        match dtype {
            DType::F64 => Ok(Self::F64),
            DType::F32 => Ok(Self::F32),
            DType::F16 => Ok(Self::F16),
            DType::U8 => Ok(Self::U8),
            DType::U32 => Ok(Self::U32),
            DType::I64 => Ok(Self::I64),
            other => Err(CoreError::UnsupportedDType(format!("{other:?}"))),
        }
    }
}

/// A Rust scalar that can live in a tensor buffer.
pub trait Element: Copy + Send + Sync + 'static {
    /// Tag of this type.
    const TYPE: ElementType;

    /// Size in bytes.
    const SIZE: usize;

    /// Read a value from the first `SIZE` bytes of `bytes`.
    fn read_ne(bytes: &[u8]) -> Self;

    /// Write the value into the first `SIZE` bytes of `out`.
    fn write_ne(self, out: &mut [u8]);
}

macro_rules! impl_element {
    ($($ty:ty => $tag:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                const TYPE: ElementType = ElementType::$tag;
                const SIZE: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn read_ne(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&bytes[..Self::SIZE]);
                    <$ty>::from_ne_bytes(raw)
                }

                #[inline]
                fn write_ne(self, out: &mut [u8]) {
                    out[..Self::SIZE].copy_from_slice(&self.to_ne_bytes());
                }
            }
        )*
    };
}

impl_element! {
    f64 => F64,
    f32 => F32,
    f16 => F16,
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
}

/// Numeric conversion from `Self` to `D`.
///
/// Follows Rust `as` semantics: float to integer truncates toward zero and
/// saturates at the bounds (NaN becomes 0), integer narrowing wraps, and
/// half-precision conversions round to nearest.
pub trait CastInto<D> {
    /// Convert the value.
    fn cast_into(self) -> D;
}

macro_rules! impl_as_cast {
    ($($src:ty => $dst:ty),* $(,)?) => {
        $(
            impl CastInto<$dst> for $src {
                #[inline]
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_possible_wrap,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss,
                    clippy::cast_lossless,
                    clippy::unnecessary_cast
                )]
                fn cast_into(self) -> $dst {
                    self as $dst
                }
            }
        )*
    };
}

impl_as_cast! {
    f64 => f32,
    i16 => f32,
    u16 => f32,
    u64 => i32,
    i64 => i32,
    u32 => i32,
    f32 => f64,
    i32 => i64,
    i32 => u64,
    i32 => u32,
    f32 => i16,
    f32 => u16,
    u32 => i64,
    u32 => u64,
    f32 => f32,
}

impl CastInto<f16> for f16 {
    #[inline]
    fn cast_into(self) -> f16 {
        self
    }
}

impl CastInto<f16> for f32 {
    #[inline]
    fn cast_into(self) -> f16 {
        f16::from_f32(self)
    }
}

impl CastInto<f32> for f16 {
    #[inline]
    fn cast_into(self) -> f32 {
        self.to_f32()
    }
}
