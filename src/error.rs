// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Error types for tensor transfer and graph rewriting.
//!
//! ## Error Hierarchy
//!
//! ```text
//! CoreError
//! ├── UnsupportedConversion  - Element type pair missing from the conversion table
//! ├── BufferTooSmall         - Host or device bytes shorter than the copy needs
//! ├── ElementCountMismatch   - Padded source extent differs from the requested count
//! ├── NullBuffer             - Handle exposes no bytes for its advertised provenance
//! ├── InvalidLayout          - Rank or padding cannot be expressed in 6 axes
//! ├── InvalidConfig          - Configuration validation failures
//! ├── ShapeMismatch          - Tensor shape incompatibilities
//! ├── UnsupportedDType       - Candle dtype without an element type
//! └── Candle                - Underlying Candle errors
//! ```
//!
//! `UnsupportedConversion` and `NullBuffer` are caller bugs: retrying with the
//! same inputs reproduces them.

use crate::dtype::ElementType;
use thiserror::Error;

/// Result type alias for rust-ai-transfer operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Which side of a copy an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopySide {
    /// The buffer being read.
    Source,
    /// The buffer being written.
    Destination,
}

impl std::fmt::Display for CopySide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source => f.write_str("source"),
            Self::Destination => f.write_str("destination"),
        }
    }
}

/// Errors raised by the copier, layouts, configuration and interop.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CoreError {
    /// The `(src, dst)` element type pair has no conversion.
    ///
    /// Raised only when a real conversion is required, i.e. the types differ
    /// or the source layout is padded.
    #[error("unsupported element types combination for copy: {src} -> {dst}")]
    UnsupportedConversion {
        /// Source element type.
        src: ElementType,
        /// Destination element type.
        dst: ElementType,
    },

    /// A byte buffer is shorter than the copy requires.
    #[error("{side} buffer too small: need {required} bytes, have {actual}")]
    BufferTooSmall {
        /// Side of the copy.
        side: CopySide,
        /// Bytes the copy touches.
        required: usize,
        /// Bytes available.
        actual: usize,
    },

    /// Padded source layout does not describe `expected` logical elements.
    #[error("element count mismatch: copy requested {expected}, source layout holds {actual}")]
    ElementCountMismatch {
        /// Element count requested by the destination.
        expected: usize,
        /// Logical element count of the source layout.
        actual: usize,
    },

    /// Source and destination are the same device allocation and the copy
    /// would rewrite it in place.
    #[error("source and destination share one allocation: {src} -> {dst} needs distinct buffers")]
    AliasedBuffers {
        /// Source element type.
        src: ElementType,
        /// Destination element type.
        dst: ElementType,
    },

    /// A handle exposed no bytes for its provenance.
    #[error("{side} buffer is null")]
    NullBuffer {
        /// Side of the copy.
        side: CopySide,
    },

    /// Layout cannot be built from the given shape or padding.
    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    /// Invalid configuration parameter.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Tensor shape mismatch.
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Expected shape.
        expected: Vec<usize>,
        /// Actual shape received.
        actual: Vec<usize>,
    },

    /// A foreign dtype has no [`ElementType`] counterpart.
    #[error("unsupported dtype: {0}")]
    UnsupportedDType(String),

    /// Underlying Candle error.
    #[error("candle error: {0}")]
    Candle(#[from] candle_core::Error),
}

impl CoreError {
    /// Create an unsupported conversion error.
    #[must_use]
    pub fn unsupported(src: ElementType, dst: ElementType) -> Self {
        Self::UnsupportedConversion { src, dst }
    }

    /// Create a buffer size error.
    #[must_use]
    pub fn buffer_too_small(side: CopySide, required: usize, actual: usize) -> Self {
        Self::BufferTooSmall {
            side,
            required,
            actual,
        }
    }

    /// Create a null buffer error.
    #[must_use]
    pub fn null_buffer(side: CopySide) -> Self {
        Self::NullBuffer { side }
    }

    /// Create an invalid layout error.
    pub fn invalid_layout(msg: impl Into<String>) -> Self {
        Self::InvalidLayout(msg.into())
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a shape mismatch error.
    pub fn shape_mismatch(expected: impl Into<Vec<usize>>, actual: impl Into<Vec<usize>>) -> Self {
        Self::ShapeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}
