// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Type-converting, layout-aware byte copies.
//!
//! [`convert_and_copy`] moves `count` elements from a source byte buffer into a
//! contiguous destination, choosing one of three paths:
//!
//! 1. **memcpy**: same element type and unpadded source, a raw byte copy
//! 2. **flat**: unpadded source, each element cast in linear order
//! 3. **padded**: padded source, the destination's logical index space walked
//!    in `b, f, w, z, y, x` order with each source element located through the
//!    layout's affine offset function
//!
//! Paths 2 and 3 only exist for the element type pairs in the conversion table.
//! Every other pair fails with `CoreError::UnsupportedConversion` before any byte
//! is written.
//!
//! ## Supported Pairs
//!
//! ```text
//! f64 -> f32    i16 -> f32    u16 -> f32
//! u64 -> i32    i64 -> i32    u32 -> i32
//! f32 -> f64    i32 -> i64    i32 -> u64    i32 -> u32
//! f32 -> i16    f32 -> u16    u32 -> i64    u32 -> u64
//! f32 -> f32    f16 -> f16    f32 -> f16    f16 -> f32
//! ```
//!
//! The identity pairs route padded same-type copies through path 3.

use crate::dtype::{CastInto, Element, ElementType};
use crate::error::{CopySide, CoreError, Result};
use crate::layout::Layout;
use half::f16;
use std::collections::HashMap;
use std::sync::OnceLock;

/// `(source, destination)` element type pair.
pub type ConversionKey = (ElementType, ElementType);

type ConvertFn = fn(&[u8], &mut [u8], Region<'_>);

#[derive(Clone, Copy)]
enum Region<'a> {
    Flat(usize),
    Padded(&'a Layout),
}

fn convert<S, D>(src: &[u8], dst: &mut [u8], region: Region<'_>)
where
    S: Element + CastInto<D>,
    D: Element,
{
    let slots = dst.chunks_exact_mut(D::SIZE);
    match region {
        Region::Flat(count) => {
            for (raw, slot) in src.chunks_exact(S::SIZE).zip(slots).take(count) {
                let value: D = S::read_ne(raw).cast_into();
                value.write_ne(slot);
            }
        }
        Region::Padded(layout) => {
            for (offset, slot) in layout.physical_offsets().zip(slots) {
                let at = offset * S::SIZE;
                let value: D = S::read_ne(&src[at..at + S::SIZE]).cast_into();
                value.write_ne(slot);
            }
        }
    }
}

macro_rules! conversion_table {
    ($($src:ty => $dst:ty),* $(,)?) => {
        &[
            $(
                (
                    (<$src as Element>::TYPE, <$dst as Element>::TYPE),
                    convert::<$src, $dst> as ConvertFn,
                )
            ),*
        ]
    };
}

static SUPPORTED: &[(ConversionKey, ConvertFn)] = conversion_table! {
    // Inputs the device cannot consume directly
    f64 => f32,
    i16 => f32,
    u16 => f32,
    u64 => i32,
    i64 => i32,
    u32 => i32,

    // Outputs the device cannot produce directly
    f32 => f64,
    i32 => i64,
    i32 => u64,
    i32 => u32,
    f32 => i16,
    f32 => u16,
    u32 => i64,
    u32 => u64,

    // State conversions
    f32 => f32,
    f16 => f16,
    f32 => f16,
    f16 => f32,
};

fn table() -> &'static HashMap<ConversionKey, ConvertFn> {
    static TABLE: OnceLock<HashMap<ConversionKey, ConvertFn>> = OnceLock::new();
    TABLE.get_or_init(|| SUPPORTED.iter().copied().collect())
}

/// Every supported `(source, destination)` pair, in table order.
pub fn supported_conversions() -> impl Iterator<Item = ConversionKey> {
    SUPPORTED.iter().map(|(key, _)| *key)
}

/// `true` if `src -> dst` has a conversion.
#[must_use]
pub fn is_supported(src: ElementType, dst: ElementType) -> bool {
    table().contains_key(&(src, dst))
}

fn ensure_len(side: CopySide, actual: usize, required: usize) -> Result<()> {
    if actual < required {
        return Err(CoreError::buffer_too_small(side, required, actual));
    }
    Ok(())
}

/// Copy `count` elements from `src` into the contiguous `dst`, converting
/// element types and resolving `src_layout` padding as needed.
///
/// `count` is the destination's logical element count. `src_layout` describes
/// the source side only; the destination is always written densely from its
/// first byte.
///
/// # Errors
///
/// - `CoreError::UnsupportedConversion` if a conversion is required and the pair
///   is not in the table
/// - `CoreError::BufferTooSmall` if either buffer is shorter than the copy needs
/// - `CoreError::ElementCountMismatch` if a padded source layout does not hold
///   `count` logical elements
///
/// No destination byte is written when an error is returned.
///
/// # Example
///
/// ```rust
/// use rust_ai_transfer::{convert_and_copy, ElementType, Layout};
///
/// let src: Vec<u8> = [1.5f64, -2.0].iter().flat_map(|v| v.to_ne_bytes()).collect();
/// let mut dst = vec![0u8; 8];
/// let layout = Layout::flat(ElementType::F64, 2);
/// convert_and_copy(&src, ElementType::F64, &mut dst, ElementType::F32, 2, &layout)?;
/// assert_eq!(f32::from_ne_bytes([dst[0], dst[1], dst[2], dst[3]]), 1.5);
/// # Ok::<(), rust_ai_transfer::CoreError>(())
/// ```
pub fn convert_and_copy(
    src: &[u8],
    src_type: ElementType,
    dst: &mut [u8],
    dst_type: ElementType,
    count: usize,
    src_layout: &Layout,
) -> Result<()> {
    if count == 0 {
        return Ok(());
    }

    let padded = src_layout.is_padded();

    if src_type == dst_type && !padded {
        let bytes = src_type.bytes_for(count);
        ensure_len(CopySide::Source, src.len(), bytes)?;
        ensure_len(CopySide::Destination, dst.len(), bytes)?;
        tracing::trace!(target: "rust_ai::transfer", path = "memcpy", %src_type, count, bytes);
        dst[..bytes].copy_from_slice(&src[..bytes]);
        return Ok(());
    }

    let Some(convert) = table().get(&(src_type, dst_type)) else {
        tracing::error!(
            target: "rust_ai::transfer",
            %src_type,
            %dst_type,
            "Unsupported element types combination for copy"
        );
        return Err(CoreError::unsupported(src_type, dst_type));
    };

    ensure_len(CopySide::Destination, dst.len(), dst_type.bytes_for(count))?;

    if padded {
        if src_layout.count() != count {
            return Err(CoreError::ElementCountMismatch {
                expected: count,
                actual: src_layout.count(),
            });
        }
        ensure_len(
            CopySide::Source,
            src.len(),
            src_type.bytes_for(src_layout.physical_count()),
        )?;
        tracing::trace!(target: "rust_ai::transfer", path = "padded", %src_type, %dst_type, count);
        convert(src, dst, Region::Padded(src_layout));
    } else {
        ensure_len(CopySide::Source, src.len(), src_type.bytes_for(count))?;
        tracing::trace!(target: "rust_ai::transfer", path = "flat", %src_type, %dst_type, count);
        convert(src, dst, Region::Flat(count));
    }

    Ok(())
}
