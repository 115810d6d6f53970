// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Six-axis tensor layouts with optional padding.
//!
//! Every logical shape of rank <= 6 is decomposed into one batch axis, one
//! feature axis and four spatial axes (`x`, `y`, `z`, `w`, with `x` innermost).
//! Physical memory is pitched in `b, f, w, z, y, x` order. Padding adds extra
//! elements before and after each axis, which makes the mapping from a logical
//! index to a physical offset affine rather than contiguous.
//!
//! ## Canonical Mapping
//!
//! | rank | axes                |
//! |------|---------------------|
//! | 0-4  | `b, f, y, x`        |
//! | 5    | `b, f, z, y, x`     |
//! | 6    | `b, f, w, z, y, x`  |
//!
//! Missing trailing axes take size 1 (or 0 for padding amounts).

use crate::dtype::ElementType;
use crate::error::{CoreError, Result};

/// Largest logical rank a [`Layout`] can describe.
pub const MAX_RANK: usize = 6;

/// A value per canonical axis.
///
/// `spatial[0]` is `x`, `spatial[1]` is `y`, `spatial[2]` is `z` and
/// `spatial[3]` is `w`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TensorDims {
    /// Batch axis.
    pub batch: usize,
    /// Feature axis.
    pub feature: usize,
    /// Spatial axes, `x` first.
    pub spatial: [usize; 4],
}

impl TensorDims {
    /// Build from explicit per-axis values.
    #[must_use]
    pub const fn new(batch: usize, feature: usize, x: usize, y: usize, z: usize, w: usize) -> Self {
        Self {
            batch,
            feature,
            spatial: [x, y, z, w],
        }
    }

    /// Same value on every axis.
    #[must_use]
    pub const fn splat(value: usize) -> Self {
        Self::new(value, value, value, value, value, value)
    }

    /// Decompose a logical shape into the six canonical axes.
    ///
    /// Axes the shape does not name take `fill`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidLayout` if the rank exceeds [`MAX_RANK`].
    pub fn from_shape(shape: &[usize], fill: usize) -> Result<Self> {
        let mut dims = Self::splat(fill);
        let at = |i: usize| shape.get(i).copied().unwrap_or(fill);
        match shape.len() {
            0..=4 => {
                dims.batch = at(0);
                dims.feature = at(1);
                dims.spatial[1] = at(2);
                dims.spatial[0] = at(3);
            }
            5 => {
                dims.batch = at(0);
                dims.feature = at(1);
                dims.spatial[2] = at(2);
                dims.spatial[1] = at(3);
                dims.spatial[0] = at(4);
            }
            6 => {
                dims.batch = at(0);
                dims.feature = at(1);
                dims.spatial[3] = at(2);
                dims.spatial[2] = at(3);
                dims.spatial[1] = at(4);
                dims.spatial[0] = at(5);
            }
            rank => {
                return Err(CoreError::invalid_layout(format!(
                    "rank {rank} exceeds the {MAX_RANK} supported axes"
                )));
            }
        }
        Ok(dims)
    }

    /// Product of all six axes.
    #[must_use]
    pub fn count(&self) -> usize {
        self.physical_order().iter().product()
    }

    /// Axes in memory order: `b, f, w, z, y, x`.
    #[must_use]
    pub const fn physical_order(&self) -> [usize; 6] {
        [
            self.batch,
            self.feature,
            self.spatial[3],
            self.spatial[2],
            self.spatial[1],
            self.spatial[0],
        ]
    }

    const fn from_physical_order(axes: [usize; 6]) -> Self {
        Self::new(axes[0], axes[1], axes[5], axes[4], axes[3], axes[2])
    }

    fn zip_with(self, other: Self, f: impl Fn(usize, usize) -> usize) -> Self {
        let a = self.physical_order();
        let b = other.physical_order();
        Self::from_physical_order(std::array::from_fn(|i| f(a[i], b[i])))
    }
}

/// Extra elements before (`lower`) and after (`upper`) each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Padding {
    /// Elements before each axis.
    pub lower: TensorDims,
    /// Elements after each axis.
    pub upper: TensorDims,
}

impl Padding {
    /// Build from canonical per-axis amounts.
    #[must_use]
    pub const fn new(lower: TensorDims, upper: TensorDims) -> Self {
        Self { lower, upper }
    }

    /// Build from per-axis amounts given in logical shape order.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidLayout` if `lower` and `upper` differ in rank
    /// or exceed [`MAX_RANK`].
    pub fn from_shape_order(lower: &[usize], upper: &[usize]) -> Result<Self> {
        if lower.len() != upper.len() {
            return Err(CoreError::invalid_layout(format!(
                "padding rank mismatch: lower has {} axes, upper has {}",
                lower.len(),
                upper.len()
            )));
        }
        Ok(Self {
            lower: TensorDims::from_shape(lower, 0)?,
            upper: TensorDims::from_shape(upper, 0)?,
        })
    }

    /// `true` if no axis carries padding.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.lower == TensorDims::splat(0) && self.upper == TensorDims::splat(0)
    }
}

/// Element type, logical shape and padding of one buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    element_type: ElementType,
    shape: Vec<usize>,
    dims: TensorDims,
    padding: Option<Padding>,
}

impl Layout {
    /// Unpadded layout for `shape`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidLayout` if the rank exceeds [`MAX_RANK`].
    pub fn new(element_type: ElementType, shape: &[usize]) -> Result<Self> {
        Ok(Self {
            element_type,
            shape: shape.to_vec(),
            dims: TensorDims::from_shape(shape, 1)?,
            padding: None,
        })
    }

    /// Unpadded one-dimensional layout of `count` elements.
    #[must_use]
    pub fn flat(element_type: ElementType, count: usize) -> Self {
        Self {
            element_type,
            shape: vec![count],
            dims: TensorDims::new(count, 1, 1, 1, 1, 1),
            padding: None,
        }
    }

    /// Attach a padding descriptor.
    #[must_use]
    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = Some(padding);
        self
    }

    /// Element type stored in the buffer.
    #[must_use]
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// Logical shape.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Logical extents on the six canonical axes.
    #[must_use]
    pub fn dims(&self) -> TensorDims {
        self.dims
    }

    /// Padding descriptor, if any.
    #[must_use]
    pub fn padding(&self) -> Option<&Padding> {
        self.padding.as_ref()
    }

    /// `true` if any axis carries non-zero padding.
    #[must_use]
    pub fn is_padded(&self) -> bool {
        self.padding.is_some_and(|p| !p.is_zero())
    }

    /// Logical element count.
    #[must_use]
    pub fn count(&self) -> usize {
        self.dims.count()
    }

    /// Extents including padding on the six canonical axes.
    #[must_use]
    pub fn physical_dims(&self) -> TensorDims {
        match self.padding {
            Some(p) => self
                .dims
                .zip_with(p.lower, |a, b| a + b)
                .zip_with(p.upper, |a, b| a + b),
            None => self.dims,
        }
    }

    /// Elements the buffer occupies, padding included.
    #[must_use]
    pub fn physical_count(&self) -> usize {
        if self.count() == 0 {
            return 0;
        }
        self.physical_dims().count()
    }

    /// Bytes the buffer occupies, padding included.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.element_type.bytes_for(self.physical_count())
    }

    /// Physical element offset of a logical index.
    #[must_use]
    pub fn linear_offset(&self, index: TensorDims) -> usize {
        let lower = self.padding.map_or(TensorDims::splat(0), |p| p.lower);
        let idx = index.physical_order();
        let lower = lower.physical_order();
        let pitch = self.physical_dims().physical_order();

        (0..6).fold(0, |offset, axis| {
            offset * pitch[axis] + idx[axis] + lower[axis]
        })
    }

    /// Logical indices in traversal order `b, f, w, z, y, x` (`x` fastest).
    #[must_use]
    pub fn logical_indices(&self) -> LogicalIndices {
        LogicalIndices::new(self.dims)
    }

    /// Physical offsets of every logical element, in traversal order.
    pub fn physical_offsets(&self) -> impl Iterator<Item = usize> + '_ {
        self.logical_indices().map(|index| self.linear_offset(index))
    }
}

/// Iterator over the logical index space of a [`TensorDims`] extent.
#[derive(Debug, Clone)]
pub struct LogicalIndices {
    extent: [usize; 6],
    next: Option<[usize; 6]>,
}

impl LogicalIndices {
    fn new(extent: TensorDims) -> Self {
        let next = (extent.count() > 0).then_some([0; 6]);
        Self {
            extent: extent.physical_order(),
            next,
        }
    }
}

impl Iterator for LogicalIndices {
    type Item = TensorDims;

    fn next(&mut self) -> Option<TensorDims> {
        let current = self.next?;

        let mut following = current;
        let mut axis = 6;
        self.next = loop {
            if axis == 0 {
                break None;
            }
            axis -= 1;
            following[axis] += 1;
            if following[axis] < self.extent[axis] {
                break Some(following);
            }
            following[axis] = 0;
        };

        Some(TensorDims::from_physical_order(current))
    }
}
